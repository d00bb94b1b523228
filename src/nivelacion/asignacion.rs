// Solver de asignación: reparte cada (estudiante, ramo) pendiente en exactamente
// una sección que ofrezca el ramo, sin superar el cupo por (sección, ramo) y
// manteniendo juntas las carreras. Pre-pase virtual por facultad, luego pase
// presencial fila por fila con un cursor explícito sobre las candidatas.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ConfigNivelacion;
use crate::models::{
    EstudianteNivelacion, GrupoCurso, GrupoFacultad, Modalidad, SeccionPlanificada, SEDE_VIRTUAL,
};
use crate::nivelacion::error::PlanError;
use crate::nivelacion::normalizar::normalize_name;

/// Estado de una corrida del solver. Los mapas son explícitos y se pasan por
/// referencia a las rutinas auxiliares: cada transición queda auditable.
struct EstadoAsignacion {
    /// rut -> ramos aún sin sección
    pendientes: BTreeMap<String, BTreeSet<String>>,
    /// rut -> ramos ya cubiertos (en alguna sección)
    cobertura: BTreeMap<String, BTreeSet<String>>,
}

impl EstadoAsignacion {
    fn nuevo(estudiantes: &[EstudianteNivelacion]) -> Self {
        let mut pendientes = BTreeMap::new();
        for est in estudiantes {
            if !est.ramos_requeridos.is_empty() {
                pendientes.insert(est.rut.clone(), est.ramos_requeridos.clone());
            }
        }
        EstadoAsignacion { pendientes, cobertura: BTreeMap::new() }
    }

    /// Registra la asignación de `ramo` para `rut` en `seccion`. Cubrir dos
    /// veces el mismo par es un defecto del solver, no de la entrada.
    fn asignar(
        &mut self,
        seccion: &mut SeccionPlanificada,
        rut: &str,
        ramo: &str,
    ) -> Result<(), PlanError> {
        let cubiertos = self.cobertura.entry(rut.to_string()).or_default();
        if !cubiertos.insert(ramo.to_string()) {
            return Err(PlanError::InvarianteViolada(format!(
                "el par ({}, {}) se asignó dos veces",
                rut, ramo
            )));
        }
        seccion.estudiantes.entry(rut.to_string()).or_default().insert(ramo.to_string());
        if let Some(p) = self.pendientes.get_mut(rut) {
            p.remove(ramo);
            if p.is_empty() {
                self.pendientes.remove(rut);
            }
        }
        Ok(())
    }

    fn pendiente(&self, rut: &str, ramo: &str) -> bool {
        self.pendientes.get(rut).is_some_and(|p| p.contains(ramo))
    }
}

/// Sede efectiva de un estudiante para armar las filas de distribución.
fn sede_efectiva(est: &EstudianteNivelacion, config: &ConfigNivelacion) -> String {
    if config.forzar_presencial_en_distribucion || est.modalidad == Modalidad::Presencial {
        est.sede.clone()
    } else {
        SEDE_VIRTUAL.to_string()
    }
}

/// Ejecuta la asignación completa sobre las secciones sintetizadas. Devuelve
/// el mapa de cobertura (rut -> ramos cubiertos) para la verificación de
/// postcondición.
pub fn asignar_cursos(
    estudiantes: &[EstudianteNivelacion],
    grupos: &[GrupoCurso],
    secciones: &mut [SeccionPlanificada],
    config: &ConfigNivelacion,
) -> Result<BTreeMap<String, BTreeSet<String>>, PlanError> {
    let mut estado = EstadoAsignacion::nuevo(estudiantes);

    // filas: (facultad, sede efectiva) -> ruts en orden estable
    let mut filas: BTreeMap<(GrupoFacultad, String), Vec<&EstudianteNivelacion>> = BTreeMap::new();
    for est in estudiantes {
        if est.ramos_requeridos.is_empty() {
            continue;
        }
        filas.entry((est.grupo_facultad, sede_efectiva(est, config))).or_default().push(est);
    }
    for lista in filas.values_mut() {
        lista.sort_by(|a, b| a.rut.cmp(&b.rut));
    }

    // índices de secciones candidatas por fila (en orden de síntesis) y de la
    // sección virtual por facultad
    let mut candidatas: BTreeMap<(GrupoFacultad, String), Vec<usize>> = BTreeMap::new();
    let mut virtual_por_facultad: BTreeMap<GrupoFacultad, usize> = BTreeMap::new();
    for (ix, sec) in secciones.iter().enumerate() {
        match sec.modalidad {
            Modalidad::Presencial => {
                candidatas.entry((sec.grupo_facultad, sec.sede.clone())).or_default().push(ix);
            }
            Modalidad::Virtual => {
                virtual_por_facultad.insert(sec.grupo_facultad, ix);
            }
        }
    }

    // cupos virtuales por (facultad, ramo), desde los tamaños de grupo virtual
    let mut cupo_virtual: BTreeMap<GrupoFacultad, BTreeMap<String, usize>> = BTreeMap::new();
    for g in grupos {
        if g.modalidad == Modalidad::Virtual {
            *cupo_virtual.entry(g.grupo_facultad).or_default().entry(g.ramo.clone()).or_default() +=
                g.tamano;
        }
    }

    // --- Pre-pase virtual, una vez por facultad, antes de lo presencial ---
    let facultades: BTreeSet<GrupoFacultad> = filas.keys().map(|(f, _)| *f).collect();
    for facultad in &facultades {
        let Some(cupos) = cupo_virtual.get_mut(facultad) else { continue };
        let Some(&ix_virtual) = virtual_por_facultad.get(facultad) else { continue };
        // primero las filas sin candidatas presenciales (sus estudiantes sólo
        // pueden servirse virtualmente), después el resto por sede
        let mut filas_fac: Vec<(&String, &Vec<&EstudianteNivelacion>)> = filas
            .iter()
            .filter(|((f, _), _)| f == facultad)
            .map(|((_, sede), lista)| (sede, lista))
            .collect();
        filas_fac.sort_by_key(|(sede, _)| {
            let tiene_candidatas = candidatas
                .get(&(*facultad, (*sede).clone()))
                .is_some_and(|c| !c.is_empty());
            (tiene_candidatas, (*sede).clone())
        });
        for (_sede, lista) in filas_fac {
            pre_pase_virtual(lista, cupos, &mut secciones[ix_virtual], &mut estado)?;
        }
    }

    // --- Pase presencial, fila por fila ---
    for ((facultad, sede), lista) in filas.iter() {
        let cand = candidatas.get(&(*facultad, sede.clone())).cloned().unwrap_or_default();
        if cand.is_empty() {
            // fila sin secciones presenciales (p. ej. facultad sólo virtual):
            // todo lo pendiente se redirige a la sección virtual de la facultad
            redirigir_a_virtual(lista, *facultad, &virtual_por_facultad, secciones, &mut estado)?;
            continue;
        }
        asignar_fila(lista, &cand, secciones, &mut estado)?;
    }

    Ok(estado.cobertura)
}

/// Consume cupos virtuales de la facultad: prefiere estudiantes con más ramos
/// virtual-cubribles, luego con más necesidad total, y desempata por rut.
fn pre_pase_virtual(
    lista: &[&EstudianteNivelacion],
    cupos: &mut BTreeMap<String, usize>,
    seccion_virtual: &mut SeccionPlanificada,
    estado: &mut EstadoAsignacion,
) -> Result<(), PlanError> {
    let mut orden: Vec<(usize, usize, &str)> = lista
        .iter()
        .filter_map(|est| {
            let pend = estado.pendientes.get(&est.rut)?;
            let cubribles =
                pend.iter().filter(|r| cupos.get(r.as_str()).copied().unwrap_or(0) > 0).count();
            if cubribles == 0 {
                return None;
            }
            Some((cubribles, pend.len(), est.rut.as_str()))
        })
        .collect();
    orden.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)).then(a.2.cmp(b.2)));

    for (_, _, rut) in orden {
        let rut = rut.to_string();
        let pend: Vec<String> = match estado.pendientes.get(&rut) {
            Some(p) => p.iter().cloned().collect(),
            None => continue,
        };
        for ramo in pend {
            let Some(c) = cupos.get_mut(&ramo) else { continue };
            if *c == 0 {
                continue;
            }
            *c -= 1;
            estado.asignar(seccion_virtual, &rut, &ramo)?;
        }
    }
    Ok(())
}

/// Fallback de fila sin candidatas presenciales: redirige lo pendiente a la
/// sección virtual de la facultad, que absorbe los ramos que haga falta.
fn redirigir_a_virtual(
    lista: &[&EstudianteNivelacion],
    facultad: GrupoFacultad,
    virtual_por_facultad: &BTreeMap<GrupoFacultad, usize>,
    secciones: &mut [SeccionPlanificada],
    estado: &mut EstadoAsignacion,
) -> Result<(), PlanError> {
    let Some(&ix) = virtual_por_facultad.get(&facultad) else {
        // ni secciones presenciales ni virtual: infactible, nombrar al primero
        for est in lista {
            if let Some(pend) = estado.pendientes.get(&est.rut) {
                if let Some(ramo) = pend.iter().next() {
                    return Err(PlanError::SinSeccionParaRamo {
                        rut: est.rut.clone(),
                        ramo: ramo.clone(),
                        demanda: lista
                            .iter()
                            .filter(|e| estado.pendiente(&e.rut, ramo))
                            .count(),
                        capacidad_total: 0,
                    });
                }
            }
        }
        return Ok(());
    };

    for est in lista {
        let pend: Vec<String> = match estado.pendientes.get(&est.rut) {
            Some(p) => p.iter().cloned().collect(),
            None => continue,
        };
        for ramo in pend {
            secciones[ix].ramos.insert(ramo.clone());
            estado.asignar(&mut secciones[ix], &est.rut, &ramo)?;
        }
    }
    Ok(())
}

/// Asigna los pendientes presenciales de una fila. Procesa primero los ramos
/// con menos secciones candidatas (más restringidos), desempatando por mayor
/// demanda agregada y luego por nombre; dentro de un ramo recorre los grupos
/// de carrera de mayor a menor con un cursor que avanza cuando la candidata
/// actual agota su cupo para el ramo.
fn asignar_fila(
    lista: &[&EstudianteNivelacion],
    cand: &[usize],
    secciones: &mut [SeccionPlanificada],
    estado: &mut EstadoAsignacion,
) -> Result<(), PlanError> {
    // demanda por ramo y candidatas que lo ofrecen
    let mut demanda: BTreeMap<String, usize> = BTreeMap::new();
    for est in lista {
        if let Some(pend) = estado.pendientes.get(&est.rut) {
            for ramo in pend {
                *demanda.entry(ramo.clone()).or_default() += 1;
            }
        }
    }

    let ofrecen = |secciones: &[SeccionPlanificada], ramo: &str| -> Vec<usize> {
        cand.iter().copied().filter(|&ix| secciones[ix].ramos.contains(ramo)).collect()
    };

    // fallo rápido: ramo demandado sin ninguna candidata que lo ofrezca
    for (ramo, &d) in &demanda {
        if d > 0 && ofrecen(secciones, ramo).is_empty() {
            let bloqueado = lista
                .iter()
                .find(|e| estado.pendiente(&e.rut, ramo))
                .map(|e| e.rut.clone())
                .unwrap_or_default();
            return Err(PlanError::SinSeccionParaRamo {
                rut: bloqueado,
                ramo: ramo.clone(),
                demanda: d,
                capacidad_total: 0,
            });
        }
    }

    // ramos más restringidos primero; a igual cantidad de candidatas, mayor
    // demanda primero; el nombre cierra el desempate
    let mut ramos: Vec<String> = demanda.keys().cloned().collect();
    ramos.sort_by(|a, b| {
        let ca = ofrecen(secciones, a).len();
        let cb = ofrecen(secciones, b).len();
        ca.cmp(&cb).then(demanda[b].cmp(&demanda[a])).then(a.cmp(b))
    });

    for ramo in ramos {
        let cand_ramo = ofrecen(secciones, &ramo);

        // agrupar los que aún necesitan el ramo por carrera normalizada
        let mut carreras: BTreeMap<String, Vec<&EstudianteNivelacion>> = BTreeMap::new();
        for est in lista {
            if estado.pendiente(&est.rut, &ramo) {
                carreras.entry(normalize_name(&est.carrera)).or_default().push(est);
            }
        }
        let mut grupos_carrera: Vec<(String, Vec<&EstudianteNivelacion>)> =
            carreras.into_iter().collect();
        grupos_carrera.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));

        let mut cursor = 0usize;
        for (_carrera, grupo) in grupos_carrera {
            for est in grupo {
                // preferencia: si ya está en una candidata que ofrece el ramo
                // y con cupo, se queda ahí (concentra su carga en pocas
                // secciones sin ser restricción dura)
                let quedarse = cand_ramo.iter().copied().find(|&ix| {
                    secciones[ix].estudiantes.contains_key(&est.rut)
                        && secciones[ix].tiene_cupo_para(&ramo)
                });
                if let Some(ix) = quedarse {
                    estado.asignar(&mut secciones[ix], &est.rut, &ramo)?;
                    continue;
                }

                while cursor < cand_ramo.len()
                    && !secciones[cand_ramo[cursor]].tiene_cupo_para(&ramo)
                {
                    cursor += 1;
                }
                if cursor >= cand_ramo.len() {
                    let demanda_actual = lista
                        .iter()
                        .filter(|e| estado.pendiente(&e.rut, &ramo))
                        .count();
                    let capacidad_total: usize = cand_ramo
                        .iter()
                        .map(|&ix| secciones[ix].cupo_efectivo().unwrap_or(usize::MAX))
                        .sum();
                    return Err(PlanError::CupoAgotado {
                        rut: est.rut.clone(),
                        ramo: ramo.clone(),
                        demanda: demanda_actual,
                        capacidad_total,
                    });
                }
                let ix = cand_ramo[cursor];
                estado.asignar(&mut secciones[ix], &est.rut, &ramo)?;
            }
        }
    }
    Ok(())
}

/// Postcondición del solver: cada (estudiante, ramo) requerido aparece en la
/// cobertura y en exactamente una sección del plan. Una violación es un
/// defecto del algoritmo y aborta la corrida; nunca se degrada a devolver un
/// plan incompleto.
pub fn verificar_cobertura(
    estudiantes: &[EstudianteNivelacion],
    secciones: &[SeccionPlanificada],
    cobertura: &BTreeMap<String, BTreeSet<String>>,
) -> Result<(), PlanError> {
    // conteo real por par en el plan
    let mut veces: BTreeMap<(String, String), usize> = BTreeMap::new();
    for sec in secciones {
        for (rut, ramos) in &sec.estudiantes {
            for ramo in ramos {
                *veces.entry((rut.clone(), ramo.clone())).or_default() += 1;
            }
        }
    }

    for est in estudiantes {
        for ramo in &est.ramos_requeridos {
            let cubierto =
                cobertura.get(&est.rut).is_some_and(|rs| rs.contains(ramo));
            if !cubierto {
                return Err(PlanError::InvarianteViolada(format!(
                    "el par ({}, {}) quedó sin cubrir",
                    est.rut, ramo
                )));
            }
            match veces.get(&(est.rut.clone(), ramo.clone())) {
                Some(1) => {}
                Some(n) => {
                    return Err(PlanError::InvarianteViolada(format!(
                        "el par ({}, {}) aparece en {} secciones",
                        est.rut, ramo, n
                    )));
                }
                None => {
                    return Err(PlanError::InvarianteViolada(format!(
                        "el par ({}, {}) está en cobertura pero no en el plan",
                        est.rut, ramo
                    )));
                }
            }
        }
    }
    Ok(())
}
