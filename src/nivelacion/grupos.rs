// Construcción de grupos de curso: tajadas de demanda por (facultad, sede,
// ramo) acotadas por el cupo efectivo. Los grupos sólo dimensionan secciones,
// no se persisten.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ConfigNivelacion;
use crate::models::{
    EstudianteNivelacion, GrupoCurso, GrupoFacultad, Modalidad, SEDE_VIRTUAL,
};
use crate::nivelacion::error::PlanError;

/// Parte una demanda `d` en tajadas de a lo más `c`: ceil(d/c) tajadas cuyos
/// tamaños suman `d`, la última puede ser menor. Demanda 0 no genera tajadas.
pub fn partir_en_cupos(d: usize, c: usize) -> Vec<usize> {
    let mut tajadas = Vec::new();
    let mut resto = d;
    while resto > 0 {
        let t = resto.min(c);
        tajadas.push(t);
        resto -= t;
    }
    tajadas
}

/// Construye los grupos de curso de toda la nómina.
///
/// - La demanda presencial se particiona por (facultad, sede) y se parte en
///   tajadas de cupo efectivo; la virtual se agrega por facultad y nunca se
///   parte (una sola tajada con el total).
/// - `overrides` puede forzar la modalidad de ids de grupo ya generados; un
///   id desconocido invalida la corrida completa, sin aplicación parcial.
/// - La salida queda ordenada por (facultad, sede, ramo, índice).
pub fn construir_grupos_curso(
    estudiantes: &[EstudianteNivelacion],
    ramos: &[String],
    config: &ConfigNivelacion,
    overrides: &BTreeMap<String, Modalidad>,
) -> Result<Vec<GrupoCurso>, PlanError> {
    config.validar()?;
    let cupo = config.cupo_efectivo();
    let catalogo: BTreeSet<&str> = ramos.iter().map(|r| r.as_str()).collect();

    // Demanda por clave, separada por modalidad efectiva. La virtual vive a
    // nivel de facultad bajo la sede reservada.
    let mut demanda_presencial: BTreeMap<(GrupoFacultad, String, String), usize> = BTreeMap::new();
    let mut demanda_virtual: BTreeMap<(GrupoFacultad, String), usize> = BTreeMap::new();

    for est in estudiantes {
        for ramo in &est.ramos_requeridos {
            if !catalogo.contains(ramo.as_str()) {
                return Err(PlanError::EntradaInvalida(format!(
                    "el estudiante {} requiere el ramo '{}' que no está en la lista de ramos",
                    est.rut, ramo
                )));
            }
            let modalidad = if config.forzar_presencial_en_distribucion {
                Modalidad::Presencial
            } else {
                est.modalidad
            };
            match modalidad {
                Modalidad::Presencial => {
                    *demanda_presencial
                        .entry((est.grupo_facultad, est.sede.clone(), ramo.clone()))
                        .or_default() += 1;
                }
                Modalidad::Virtual => {
                    *demanda_virtual
                        .entry((est.grupo_facultad, ramo.clone()))
                        .or_default() += 1;
                }
            }
        }
    }

    let provisorios = generar_unidades(&demanda_presencial, &demanda_virtual, cupo);

    if overrides.is_empty() {
        return Ok(provisorios);
    }

    // Validar todos los overrides antes de mover demanda: fail fast, nada a
    // medias.
    let ids: BTreeMap<&str, &GrupoCurso> =
        provisorios.iter().map(|g| (g.id.as_str(), g)).collect();
    for id in overrides.keys() {
        if !ids.contains_key(id.as_str()) {
            return Err(PlanError::OverrideDesconocido(id.clone()));
        }
    }

    // Aplicar overrides moviendo los tamaños entre los mapas de demanda y
    // regenerar: así la ley de partición (tajadas <= cupo, virtual sin
    // partir) se mantiene también para los grupos forzados.
    for (id, destino) in overrides {
        let grupo = ids[id.as_str()];
        if grupo.modalidad == *destino {
            continue;
        }
        match (grupo.modalidad, destino) {
            (Modalidad::Presencial, Modalidad::Virtual) => {
                let clave = (grupo.grupo_facultad, grupo.sede.clone(), grupo.ramo.clone());
                if let Some(d) = demanda_presencial.get_mut(&clave) {
                    *d -= grupo.tamano;
                    if *d == 0 {
                        demanda_presencial.remove(&clave);
                    }
                }
                *demanda_virtual
                    .entry((grupo.grupo_facultad, grupo.ramo.clone()))
                    .or_default() += grupo.tamano;
            }
            (Modalidad::Virtual, Modalidad::Presencial) => {
                let clave = (grupo.grupo_facultad, grupo.ramo.clone());
                if let Some(d) = demanda_virtual.get_mut(&clave) {
                    *d -= grupo.tamano;
                    if *d == 0 {
                        demanda_virtual.remove(&clave);
                    }
                }
                // Un grupo virtual no tiene sede real: el grupo forzado a
                // presencial queda bajo la sede reservada.
                *demanda_presencial
                    .entry((grupo.grupo_facultad, SEDE_VIRTUAL.to_string(), grupo.ramo.clone()))
                    .or_default() += grupo.tamano;
            }
            _ => {}
        }
    }

    Ok(generar_unidades(&demanda_presencial, &demanda_virtual, cupo))
}

fn generar_unidades(
    demanda_presencial: &BTreeMap<(GrupoFacultad, String, String), usize>,
    demanda_virtual: &BTreeMap<(GrupoFacultad, String), usize>,
    cupo: usize,
) -> Vec<GrupoCurso> {
    let mut unidades = Vec::new();

    for ((facultad, sede, ramo), &d) in demanda_presencial {
        for (i, tamano) in partir_en_cupos(d, cupo).into_iter().enumerate() {
            let indice = i + 1;
            unidades.push(GrupoCurso {
                id: GrupoCurso::armar_id(*facultad, sede, ramo, indice),
                grupo_facultad: *facultad,
                sede: sede.clone(),
                ramo: ramo.clone(),
                indice,
                tamano,
                modalidad: Modalidad::Presencial,
            });
        }
    }

    for ((facultad, ramo), &d) in demanda_virtual {
        if d == 0 {
            continue;
        }
        unidades.push(GrupoCurso {
            id: GrupoCurso::armar_id(*facultad, SEDE_VIRTUAL, ramo, 1),
            grupo_facultad: *facultad,
            sede: SEDE_VIRTUAL.to_string(),
            ramo: ramo.clone(),
            indice: 1,
            tamano: d,
            modalidad: Modalidad::Virtual,
        });
    }

    unidades.sort_by(|a, b| {
        (a.grupo_facultad, &a.sede, &a.ramo, a.indice)
            .cmp(&(b.grupo_facultad, &b.sede, &b.ramo, b.indice))
    });
    unidades
}
