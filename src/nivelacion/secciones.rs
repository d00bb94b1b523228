// Síntesis de secciones a partir de los grupos de curso: cáscaras
// presenciales por fila (facultad, sede) más una sección virtual de desborde
// por facultad. La codificación es determinista para que re-ejecutar sobre la
// misma nómina reutilice los mismos identificadores.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ConfigNivelacion;
use crate::models::{
    EstudianteNivelacion, GrupoCurso, GrupoFacultad, Modalidad, SeccionPlanificada, SEDE_VIRTUAL,
};

/// Letra de rango estilo planilla: 1 -> "A", 26 -> "Z", 27 -> "AA", ...
pub fn letra_rango(n: usize) -> String {
    debug_assert!(n >= 1);
    let mut n = n;
    let mut letras = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letras.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letras.iter().rev().collect()
}

fn armar_codigo(rango: usize, modalidad: Modalidad, facultad: GrupoFacultad, sede: &str) -> String {
    format!("{}{}{}-{}", letra_rango(rango), modalidad.letra(), facultad.letra(), sede)
}

/// Convierte los grupos en cáscaras de sección concretas.
///
/// Presencial: por cada fila (facultad, sede) se crean
/// `max(pico de grupos por ramo, ceil(estudiantes de la fila / cupo))`
/// secciones; la sección i ofrece el ramo C si la fila tiene >= i grupos de
/// C, y una sección que quedaría sin ramos hereda el/los ramos con el pico de
/// grupos de la fila. Virtual: exactamente una sección por facultad con
/// grupos virtuales, ofreciendo la unión de sus ramos.
pub fn sintetizar_secciones(
    grupos: &[GrupoCurso],
    estudiantes: &[EstudianteNivelacion],
    config: &ConfigNivelacion,
) -> Vec<SeccionPlanificada> {
    let cupo = config.cupo_efectivo();

    // grupos presenciales por fila, contados por ramo
    let mut filas: BTreeMap<(GrupoFacultad, String), BTreeMap<String, usize>> = BTreeMap::new();
    // ramos virtuales por facultad
    let mut virtuales: BTreeMap<GrupoFacultad, BTreeSet<String>> = BTreeMap::new();

    for g in grupos {
        match g.modalidad {
            Modalidad::Presencial => {
                *filas
                    .entry((g.grupo_facultad, g.sede.clone()))
                    .or_default()
                    .entry(g.ramo.clone())
                    .or_default() += 1;
            }
            Modalidad::Virtual => {
                virtuales.entry(g.grupo_facultad).or_default().insert(g.ramo.clone());
            }
        }
    }

    // estudiantes distintos por fila con al menos un ramo pendiente; la
    // modalidad efectiva decide en qué fila cuentan
    let mut cabezas: BTreeMap<(GrupoFacultad, String), usize> = BTreeMap::new();
    for est in estudiantes {
        if est.ramos_requeridos.is_empty() {
            continue;
        }
        let presencial = config.forzar_presencial_en_distribucion
            || est.modalidad == Modalidad::Presencial;
        if presencial {
            *cabezas.entry((est.grupo_facultad, est.sede.clone())).or_default() += 1;
        }
    }

    let mut secciones = Vec::new();

    for ((facultad, sede), conteo_ramos) in &filas {
        let pico = conteo_ramos.values().copied().max().unwrap_or(0);
        let cabeza = cabezas.get(&(*facultad, sede.clone())).copied().unwrap_or(0);
        let por_cabezas = cabeza.div_ceil(cupo);
        let cantidad = pico.max(por_cabezas).max(1);

        // ramos con el pico de grupos: herencia para secciones que de otro
        // modo quedarían vacías
        let ramos_pico: BTreeSet<String> = conteo_ramos
            .iter()
            .filter(|&(_, &c)| c == pico)
            .map(|(r, _)| r.clone())
            .collect();

        for i in 1..=cantidad {
            let mut ramos: BTreeSet<String> = conteo_ramos
                .iter()
                .filter(|&(_, &c)| c >= i)
                .map(|(r, _)| r.clone())
                .collect();
            if ramos.is_empty() {
                ramos = ramos_pico.clone();
            }
            secciones.push(SeccionPlanificada {
                codigo: armar_codigo(i, Modalidad::Presencial, *facultad, sede),
                grupo_facultad: *facultad,
                sede: sede.clone(),
                modalidad: Modalidad::Presencial,
                cupo_inicial: config.cupo_inicial,
                cupo_extra: config.cupo_extra,
                ramos,
                estudiantes: BTreeMap::new(),
            });
        }
    }

    for (facultad, ramos) in &virtuales {
        secciones.push(SeccionPlanificada {
            codigo: armar_codigo(1, Modalidad::Virtual, *facultad, SEDE_VIRTUAL),
            grupo_facultad: *facultad,
            sede: SEDE_VIRTUAL.to_string(),
            modalidad: Modalidad::Virtual,
            cupo_inicial: config.cupo_inicial,
            cupo_extra: 0,
            ramos: ramos.clone(),
            estudiantes: BTreeMap::new(),
        });
    }

    secciones
}

/// Depura y recodifica el plan una vez cerrada la asignación: descarta las
/// secciones sin estudiantes, reordena (facultad, modalidad presencial antes
/// que virtual, sede, código) y reasigna el rango alfabético dentro de cada
/// (facultad, modalidad, sede). Con la misma entrada produce los mismos
/// códigos, lo que hace idempotente la aplicación posterior.
pub fn depurar_y_recodificar(secciones: Vec<SeccionPlanificada>) -> Vec<SeccionPlanificada> {
    let mut vivas: Vec<SeccionPlanificada> =
        secciones.into_iter().filter(|s| s.total_estudiantes() > 0).collect();

    // largo antes que orden lexicográfico: "Z" < "AA" como rango
    vivas.sort_by(|a, b| {
        (a.grupo_facultad, a.modalidad, &a.sede, a.codigo.len(), &a.codigo)
            .cmp(&(b.grupo_facultad, b.modalidad, &b.sede, b.codigo.len(), &b.codigo))
    });

    let mut rango: BTreeMap<(GrupoFacultad, Modalidad, String), usize> = BTreeMap::new();
    for sec in vivas.iter_mut() {
        let clave = (sec.grupo_facultad, sec.modalidad, sec.sede.clone());
        let r = rango.entry(clave).or_insert(0);
        *r += 1;
        sec.codigo = armar_codigo(*r, sec.modalidad, sec.grupo_facultad, &sec.sede);
    }

    vivas
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use crate::nivelacion::grupos::construir_grupos_curso;

    fn estudiante(rut: &str, sede: &str, ramos: &[&str]) -> EstudianteNivelacion {
        EstudianteNivelacion {
            rut: rut.to_string(),
            carrera: "INGENIERIA CIVIL".to_string(),
            grupo_facultad: GrupoFacultad::Fica,
            sede: sede.to_string(),
            modalidad: Modalidad::Presencial,
            ramos_requeridos: ramos.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn config_45() -> ConfigNivelacion {
        ConfigNivelacion { cupo_inicial: 45, cupo_extra: 0, ..Default::default() }
    }

    #[test]
    fn test_letra_rango() {
        assert_eq!(letra_rango(1), "A");
        assert_eq!(letra_rango(2), "B");
        assert_eq!(letra_rango(26), "Z");
        assert_eq!(letra_rango(27), "AA");
        assert_eq!(letra_rango(28), "AB");
        assert_eq!(letra_rango(52), "AZ");
        assert_eq!(letra_rango(53), "BA");
    }

    #[test]
    fn test_48_estudiantes_producen_dos_secciones() {
        let estudiantes: Vec<_> =
            (0..48).map(|i| estudiante(&format!("10.{:03}", i), "IC", &["MATEMATICA"])).collect();
        let ramos = vec!["MATEMATICA".to_string()];
        let cfg = config_45();
        let grupos =
            construir_grupos_curso(&estudiantes, &ramos, &cfg, &BTreeMap::new()).unwrap();
        let secciones = sintetizar_secciones(&grupos, &estudiantes, &cfg);
        assert_eq!(secciones.len(), 2);
        assert!(secciones.iter().all(|s| s.ramos.contains("MATEMATICA")));
        assert_eq!(secciones[0].codigo, "APF-IC");
        assert_eq!(secciones[1].codigo, "BPF-IC");
    }

    #[test]
    fn test_seccion_extra_por_cabezas_hereda_ramos_pico() {
        // 50 estudiantes, 25 piden LENGUAJE y 25 MATEMATICA: un grupo por
        // ramo (pico 1) pero ceil(50/45) = 2 secciones; la segunda hereda los
        // ramos con pico para no quedar vacía
        let mut estudiantes = Vec::new();
        for i in 0..25 {
            estudiantes.push(estudiante(&format!("20.{:03}", i), "IC", &["LENGUAJE"]));
        }
        for i in 25..50 {
            estudiantes.push(estudiante(&format!("20.{:03}", i), "IC", &["MATEMATICA"]));
        }
        let ramos = vec!["LENGUAJE".to_string(), "MATEMATICA".to_string()];
        let cfg = config_45();
        let grupos =
            construir_grupos_curso(&estudiantes, &ramos, &cfg, &BTreeMap::new()).unwrap();
        let secciones = sintetizar_secciones(&grupos, &estudiantes, &cfg);
        assert_eq!(secciones.len(), 2);
        assert!(!secciones[1].ramos.is_empty());
        assert_eq!(secciones[1].ramos, secciones[0].ramos);
    }

    #[test]
    fn test_seccion_i_ofrece_ramo_con_suficientes_grupos() {
        // MATEMATICA demanda 48 (2 grupos), LENGUAJE demanda 20 (1 grupo):
        // la sección B sólo ofrece MATEMATICA
        let mut estudiantes: Vec<_> =
            (0..48).map(|i| estudiante(&format!("30.{:03}", i), "IC", &["MATEMATICA"])).collect();
        for i in 0..20 {
            estudiantes.push(estudiante(&format!("31.{:03}", i), "IC", &["LENGUAJE"]));
        }
        let ramos = vec!["MATEMATICA".to_string(), "LENGUAJE".to_string()];
        let cfg = config_45();
        let grupos =
            construir_grupos_curso(&estudiantes, &ramos, &cfg, &BTreeMap::new()).unwrap();
        let secciones = sintetizar_secciones(&grupos, &estudiantes, &cfg);
        assert_eq!(secciones.len(), 2);
        assert!(secciones[0].ramos.contains("LENGUAJE"));
        assert!(secciones[0].ramos.contains("MATEMATICA"));
        assert!(!secciones[1].ramos.contains("LENGUAJE"));
        assert!(secciones[1].ramos.contains("MATEMATICA"));
    }

    #[test]
    fn test_depurar_descarta_vacias_y_recodifica() {
        let estudiantes: Vec<_> =
            (0..48).map(|i| estudiante(&format!("40.{:03}", i), "IC", &["MATEMATICA"])).collect();
        let ramos = vec!["MATEMATICA".to_string()];
        let cfg = config_45();
        let grupos =
            construir_grupos_curso(&estudiantes, &ramos, &cfg, &BTreeMap::new()).unwrap();
        let mut secciones = sintetizar_secciones(&grupos, &estudiantes, &cfg);
        // sólo la segunda sección recibe estudiantes
        secciones[1]
            .estudiantes
            .entry("40.000".to_string())
            .or_default()
            .insert("MATEMATICA".to_string());
        let plan = depurar_y_recodificar(secciones);
        assert_eq!(plan.len(), 1);
        // la sobreviviente pasa a ser el rango A
        assert_eq!(plan[0].codigo, "APF-IC");
    }
}
