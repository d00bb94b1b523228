// Resúmenes derivados: vistas de sólo lectura sobre grupos, nómina y plan.
// No guardan estado propio.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::ConfigNivelacion;
use crate::models::{
    EstudianteNivelacion, GrupoCurso, GrupoFacultad, Modalidad, PlanNivelacion,
};

#[derive(Debug, Clone, Serialize)]
pub struct ResumenRamo {
    pub ramo: String,
    pub demanda: usize,
    pub grupos: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumenFacultad {
    pub facultad: GrupoFacultad,
    pub total_demanda: usize,
    pub total_grupos: usize,
    pub ramos: Vec<ResumenRamo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumenGrupos {
    pub facultades: Vec<ResumenFacultad>,
    pub total_demanda: usize,
    pub total_grupos: usize,
}

/// Conteo de grupos y demanda por facultad y ramo. Una facultad cuyo único
/// ramo es el de bienvenida queda fuera de los totales: ese ramo no es
/// nivelación real.
pub fn construir_resumen_grupos(
    grupos: &[GrupoCurso],
    config: &ConfigNivelacion,
) -> ResumenGrupos {
    let mut por_facultad: BTreeMap<GrupoFacultad, BTreeMap<String, (usize, usize)>> =
        BTreeMap::new();
    for g in grupos {
        let entrada =
            por_facultad.entry(g.grupo_facultad).or_default().entry(g.ramo.clone()).or_default();
        entrada.0 += g.tamano;
        entrada.1 += 1;
    }

    let mut facultades = Vec::new();
    let mut total_demanda = 0;
    let mut total_grupos = 0;
    for (facultad, ramos) in por_facultad {
        let solo_bienvenida =
            ramos.len() == 1 && ramos.contains_key(&config.ramo_bienvenida);
        if solo_bienvenida {
            continue;
        }
        let mut filas: Vec<ResumenRamo> = ramos
            .into_iter()
            .map(|(ramo, (demanda, grupos))| ResumenRamo { ramo, demanda, grupos })
            .collect();
        // mayor demanda primero, como los rankings de consultas
        filas.sort_by(|a, b| b.demanda.cmp(&a.demanda).then(a.ramo.cmp(&b.ramo)));
        let td: usize = filas.iter().map(|r| r.demanda).sum();
        let tg: usize = filas.iter().map(|r| r.grupos).sum();
        total_demanda += td;
        total_grupos += tg;
        facultades.push(ResumenFacultad {
            facultad,
            total_demanda: td,
            total_grupos: tg,
            ramos: filas,
        });
    }

    ResumenGrupos { facultades, total_demanda, total_grupos }
}

#[derive(Debug, Clone, Serialize)]
pub struct NecesidadPrograma {
    pub carrera: String,
    pub modalidad: Modalidad,
    pub total_estudiantes: usize,
    pub demanda_por_ramo: BTreeMap<String, usize>,
}

/// Reporte de necesidades por programa, agrupado por (carrera, modalidad
/// DECLARADA). La distribución de secciones puede forzar presencial; este
/// reporte conserva a propósito lo declarado en la nómina.
pub fn resumen_necesidades_programa(
    estudiantes: &[EstudianteNivelacion],
) -> Vec<NecesidadPrograma> {
    let mut mapa: BTreeMap<(String, Modalidad), (usize, BTreeMap<String, usize>)> =
        BTreeMap::new();
    for est in estudiantes {
        if est.ramos_requeridos.is_empty() {
            continue;
        }
        let entrada = mapa.entry((est.carrera.clone(), est.modalidad)).or_default();
        entrada.0 += 1;
        for ramo in &est.ramos_requeridos {
            *entrada.1.entry(ramo.clone()).or_default() += 1;
        }
    }
    mapa.into_iter()
        .map(|((carrera, modalidad), (total, demanda))| NecesidadPrograma {
            carrera,
            modalidad,
            total_estudiantes: total,
            demanda_por_ramo: demanda,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumenSeccion {
    pub codigo: String,
    pub facultad: GrupoFacultad,
    pub sede: String,
    pub modalidad: Modalidad,
    pub total_estudiantes: usize,
    pub inscritos_por_ramo: BTreeMap<String, usize>,
}

/// Vista por sección del plan terminado.
pub fn resumen_plan(plan: &PlanNivelacion) -> Vec<ResumenSeccion> {
    plan.secciones
        .iter()
        .map(|sec| {
            let inscritos: BTreeMap<String, usize> = sec
                .ramos
                .iter()
                .map(|r| (r.clone(), sec.inscritos_en(r)))
                .filter(|(_, n)| *n > 0)
                .collect();
            ResumenSeccion {
                codigo: sec.codigo.clone(),
                facultad: sec.grupo_facultad,
                sede: sec.sede.clone(),
                modalidad: sec.modalidad,
                total_estudiantes: sec.total_estudiantes(),
                inscritos_por_ramo: inscritos,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SEDE_VIRTUAL;

    fn grupo(
        facultad: GrupoFacultad,
        sede: &str,
        ramo: &str,
        indice: usize,
        tamano: usize,
        modalidad: Modalidad,
    ) -> GrupoCurso {
        GrupoCurso {
            id: GrupoCurso::armar_id(facultad, sede, ramo, indice),
            grupo_facultad: facultad,
            sede: sede.to_string(),
            ramo: ramo.to_string(),
            indice,
            tamano,
            modalidad,
        }
    }

    #[test]
    fn test_resumen_excluye_facultad_solo_bienvenida() {
        let cfg = ConfigNivelacion::default();
        let grupos = vec![
            grupo(GrupoFacultad::Fica, "IC", "MATEMATICA", 1, 45, Modalidad::Presencial),
            grupo(GrupoFacultad::Fica, "IC", "MATEMATICA", 2, 3, Modalidad::Presencial),
            grupo(GrupoFacultad::Salud, "IC", &cfg.ramo_bienvenida, 1, 20, Modalidad::Presencial),
        ];
        let resumen = construir_resumen_grupos(&grupos, &cfg);
        assert_eq!(resumen.facultades.len(), 1);
        assert_eq!(resumen.facultades[0].facultad, GrupoFacultad::Fica);
        assert_eq!(resumen.total_demanda, 48);
        assert_eq!(resumen.total_grupos, 2);
    }

    #[test]
    fn test_resumen_cuenta_virtual() {
        let cfg = ConfigNivelacion::default();
        let grupos = vec![
            grupo(GrupoFacultad::Fica, SEDE_VIRTUAL, "MATEMATICA", 1, 29, Modalidad::Virtual),
        ];
        let resumen = construir_resumen_grupos(&grupos, &cfg);
        assert_eq!(resumen.total_demanda, 29);
        assert_eq!(resumen.total_grupos, 1);
    }

    #[test]
    fn test_necesidades_usa_modalidad_declarada() {
        let est = EstudianteNivelacion {
            rut: "1.001".to_string(),
            carrera: "ENFERMERIA".to_string(),
            grupo_facultad: GrupoFacultad::Salud,
            sede: "IC".to_string(),
            modalidad: Modalidad::Virtual,
            ramos_requeridos: ["BIOLOGIA".to_string()].into_iter().collect(),
        };
        let filas = resumen_necesidades_programa(&[est]);
        assert_eq!(filas.len(), 1);
        // aunque la distribución fuerce presencial, el reporte conserva lo declarado
        assert_eq!(filas[0].modalidad, Modalidad::Virtual);
        assert_eq!(filas[0].demanda_por_ramo["BIOLOGIA"], 1);
    }
}
