/// TEST: propiedades del plan de nivelación completo
///
/// Verifica sobre una nómina realista:
/// - cupos: ningún (sección, ramo) supera el cupo efectivo
/// - cobertura: cada (estudiante, ramo) requerido queda en exactamente una
///   sección que ofrece el ramo
/// - determinismo: dos corridas (incluso con la nómina permutada) producen
///   un plan byte a byte idéntico
/// - escenario 48 presencial + 29 virtual con cupo 45
use std::collections::{BTreeMap, BTreeSet};

use nivelador::nivelacion::{
    asignar_cursos, construir_resumen_grupos, ejecutar_planificacion, partir_en_cupos,
};
use nivelador::{
    ConfigNivelacion, EstudianteNivelacion, GrupoFacultad, Modalidad, PlanError,
    SeccionPlanificada,
};

fn estudiante(
    rut: &str,
    carrera: &str,
    facultad: GrupoFacultad,
    sede: &str,
    modalidad: Modalidad,
    ramos: &[&str],
) -> EstudianteNivelacion {
    EstudianteNivelacion {
        rut: rut.to_string(),
        carrera: carrera.to_string(),
        grupo_facultad: facultad,
        sede: sede.to_string(),
        modalidad,
        ramos_requeridos: ramos.iter().map(|r| r.to_string()).collect(),
    }
}

/// Nómina mixta: dos facultades, dos sedes, varias carreras y ramos.
fn nomina_realista() -> (Vec<EstudianteNivelacion>, Vec<String>) {
    let mut estudiantes = Vec::new();
    for i in 0..60 {
        estudiantes.push(estudiante(
            &format!("11.{:03}", i),
            if i % 3 == 0 { "OBRAS CIVILES" } else { "INFORMATICA" },
            GrupoFacultad::Fica,
            "IC",
            Modalidad::Presencial,
            if i % 2 == 0 { &["MATEMATICA", "FISICA"] } else { &["MATEMATICA"] },
        ));
    }
    for i in 0..25 {
        estudiantes.push(estudiante(
            &format!("12.{:03}", i),
            "INFORMATICA",
            GrupoFacultad::Fica,
            "PV",
            Modalidad::Presencial,
            &["MATEMATICA"],
        ));
    }
    for i in 0..50 {
        estudiantes.push(estudiante(
            &format!("13.{:03}", i),
            if i % 2 == 0 { "ENFERMERIA" } else { "KINESIOLOGIA" },
            GrupoFacultad::Salud,
            "IC",
            Modalidad::Presencial,
            &["BIOLOGIA", "QUIMICA"],
        ));
    }
    let ramos = vec![
        "MATEMATICA".to_string(),
        "FISICA".to_string(),
        "BIOLOGIA".to_string(),
        "QUIMICA".to_string(),
    ];
    (estudiantes, ramos)
}

#[test]
fn test_cupos_y_cobertura() {
    let (estudiantes, ramos) = nomina_realista();
    let cfg = ConfigNivelacion { cupo_inicial: 45, cupo_extra: 0, ..Default::default() };
    let plan = ejecutar_planificacion(&estudiantes, &ramos, &cfg, &BTreeMap::new()).unwrap();

    println!("Plan con {} secciones", plan.secciones.len());
    for sec in &plan.secciones {
        println!("  {}  {} estudiantes", sec.codigo, sec.total_estudiantes());
    }

    // cupos por (sección, ramo)
    for sec in &plan.secciones {
        if let Some(c) = sec.cupo_efectivo() {
            for ramo in &sec.ramos {
                assert!(
                    sec.inscritos_en(ramo) <= c,
                    "sección {} supera el cupo en {}",
                    sec.codigo,
                    ramo
                );
            }
        }
    }

    // cobertura exacta: cada par requerido en exactamente una sección
    let mut veces: BTreeMap<(String, String), usize> = BTreeMap::new();
    for sec in &plan.secciones {
        for (rut, asignados) in &sec.estudiantes {
            for ramo in asignados {
                assert!(sec.ramos.contains(ramo), "sección {} no ofrece {}", sec.codigo, ramo);
                *veces.entry((rut.clone(), ramo.clone())).or_default() += 1;
            }
        }
    }
    let mut esperados = 0;
    for est in &estudiantes {
        for ramo in &est.ramos_requeridos {
            esperados += 1;
            assert_eq!(
                veces.get(&(est.rut.clone(), ramo.clone())),
                Some(&1),
                "par ({}, {}) mal cubierto",
                est.rut,
                ramo
            );
        }
    }
    assert_eq!(veces.len(), esperados);

    // ninguna sección vacía sobrevive
    assert!(plan.secciones.iter().all(|s| s.total_estudiantes() > 0));
}

#[test]
fn test_determinismo_byte_a_byte() {
    let (estudiantes, ramos) = nomina_realista();
    let cfg = ConfigNivelacion { cupo_inicial: 45, cupo_extra: 0, ..Default::default() };

    let plan_a = ejecutar_planificacion(&estudiantes, &ramos, &cfg, &BTreeMap::new()).unwrap();

    // misma nómina en orden inverso: el plan no puede cambiar
    let mut invertida = estudiantes.clone();
    invertida.reverse();
    let plan_b = ejecutar_planificacion(&invertida, &ramos, &cfg, &BTreeMap::new()).unwrap();

    let json_a = serde_json::to_string(&plan_a).unwrap();
    let json_b = serde_json::to_string(&plan_b).unwrap();
    assert_eq!(json_a, json_b);

    // los códigos también son estables entre corridas
    let codigos: Vec<&str> = plan_a.secciones.iter().map(|s| s.codigo.as_str()).collect();
    let codigos_b: Vec<&str> = plan_b.secciones.iter().map(|s| s.codigo.as_str()).collect();
    assert_eq!(codigos, codigos_b);
}

#[test]
fn test_escenario_48_presencial_29_virtual() {
    // 48 presenciales en (FICA, IC) y 13 + 16 declarados virtuales en otras
    // sedes, cupo 45, sin forzado presencial: la demanda presencial parte en
    // [45, 3] (2 secciones) y la virtual colapsa en un grupo de 29
    let mut estudiantes = Vec::new();
    for i in 0..48 {
        estudiantes.push(estudiante(
            &format!("20.{:03}", i),
            "OBRAS CIVILES",
            GrupoFacultad::Fica,
            "IC",
            Modalidad::Presencial,
            &["MATEMATICA"],
        ));
    }
    for i in 0..13 {
        estudiantes.push(estudiante(
            &format!("21.{:03}", i),
            "INFORMATICA",
            GrupoFacultad::Fica,
            "PV",
            Modalidad::Virtual,
            &["MATEMATICA"],
        ));
    }
    for i in 0..16 {
        estudiantes.push(estudiante(
            &format!("22.{:03}", i),
            "INFORMATICA",
            GrupoFacultad::Fica,
            "LR",
            Modalidad::Virtual,
            &["MATEMATICA"],
        ));
    }
    let ramos = vec!["MATEMATICA".to_string()];
    let cfg = ConfigNivelacion {
        cupo_inicial: 45,
        cupo_extra: 0,
        forzar_presencial_en_distribucion: false,
        ..Default::default()
    };
    let plan = ejecutar_planificacion(&estudiantes, &ramos, &cfg, &BTreeMap::new()).unwrap();

    let presenciales: Vec<&SeccionPlanificada> =
        plan.secciones.iter().filter(|s| s.modalidad == Modalidad::Presencial).collect();
    let virtuales: Vec<&SeccionPlanificada> =
        plan.secciones.iter().filter(|s| s.modalidad == Modalidad::Virtual).collect();

    assert_eq!(presenciales.len(), 2);
    assert_eq!(virtuales.len(), 1);
    let tamanos: BTreeSet<usize> =
        presenciales.iter().map(|s| s.inscritos_en("MATEMATICA")).collect();
    assert_eq!(tamanos, [3usize, 45].into_iter().collect());
    assert_eq!(virtuales[0].inscritos_en("MATEMATICA"), 29);

    assert_eq!(presenciales[0].codigo, "APF-IC");
    assert_eq!(presenciales[1].codigo, "BPF-IC");
    assert_eq!(virtuales[0].codigo, "AVF-VIRTUAL");
}

#[test]
fn test_infactibilidad_nombra_al_bloqueado() {
    // una sección armada a mano que no ofrece el ramo demandado: el error
    // debe nombrar al estudiante y al ramo exactos, no fallar genérico
    let est = estudiante(
        "31.001",
        "OBRAS CIVILES",
        GrupoFacultad::Fica,
        "IC",
        Modalidad::Presencial,
        &["FISICA"],
    );
    let cfg = ConfigNivelacion { cupo_inicial: 45, cupo_extra: 0, ..Default::default() };
    let mut secciones = vec![SeccionPlanificada {
        codigo: "APF-IC".to_string(),
        grupo_facultad: GrupoFacultad::Fica,
        sede: "IC".to_string(),
        modalidad: Modalidad::Presencial,
        cupo_inicial: 45,
        cupo_extra: 0,
        ramos: ["MATEMATICA".to_string()].into_iter().collect(),
        estudiantes: BTreeMap::new(),
    }];
    let err = asignar_cursos(&[est], &[], &mut secciones, &cfg).unwrap_err();
    match err {
        PlanError::SinSeccionParaRamo { rut, ramo, demanda, capacidad_total } => {
            assert_eq!(rut, "31.001");
            assert_eq!(ramo, "FISICA");
            assert_eq!(demanda, 1);
            assert_eq!(capacidad_total, 0);
        }
        otro => panic!("se esperaba SinSeccionParaRamo, vino: {}", otro),
    }
}

#[test]
fn test_ley_de_particion_de_grupos() {
    for (d, c) in [(48usize, 45usize), (90, 45), (1, 45), (45, 45), (137, 40)] {
        let tajadas = partir_en_cupos(d, c);
        assert_eq!(tajadas.len(), d.div_ceil(c));
        assert_eq!(tajadas.iter().sum::<usize>(), d);
        assert!(tajadas.iter().all(|&t| t <= c));
    }
}

#[test]
fn test_resumen_excluye_bienvenida() {
    // SALUD sólo demanda el ramo de bienvenida: queda fuera de los totales
    let cfg = ConfigNivelacion { cupo_inicial: 45, cupo_extra: 0, ..Default::default() };
    let mut estudiantes = vec![estudiante(
        "41.001",
        "ENFERMERIA",
        GrupoFacultad::Salud,
        "IC",
        Modalidad::Presencial,
        &[],
    )];
    estudiantes[0].ramos_requeridos.insert(cfg.ramo_bienvenida.clone());
    for i in 0..10 {
        estudiantes.push(estudiante(
            &format!("42.{:03}", i),
            "INFORMATICA",
            GrupoFacultad::Fica,
            "IC",
            Modalidad::Presencial,
            &["MATEMATICA"],
        ));
    }
    let ramos = vec![cfg.ramo_bienvenida.clone(), "MATEMATICA".to_string()];
    let grupos = nivelador::nivelacion::construir_grupos_curso(
        &estudiantes,
        &ramos,
        &cfg,
        &BTreeMap::new(),
    )
    .unwrap();
    let resumen = construir_resumen_grupos(&grupos, &cfg);
    assert_eq!(resumen.facultades.len(), 1);
    assert_eq!(resumen.facultades[0].facultad, GrupoFacultad::Fica);
    assert_eq!(resumen.total_demanda, 10);
}
