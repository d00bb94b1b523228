// --- Planificador de Nivelación - Archivo principal ---
//
// Trabajo batch: lee la nómina normalizada (JSON), corre la planificación y
// opcionalmente aplica el plan a la base configurada por entorno.

use std::collections::BTreeMap;
use std::env;
use std::error::Error;
use std::fs;
use std::process;

use nivelador::aplicador::{aplicar_plan, contar_filas, init_db, open_plan_db};
use nivelador::nivelacion::{ejecutar_planificacion, resumen_plan};
use nivelador::{ConfigNivelacion, EstudianteNivelacion, Modalidad};

fn main() {
    println!("=== Planificador de Nivelación ===");
    if let Err(e) = ejecutar() {
        eprintln!("ERROR: {}", e);
        process::exit(1);
    }
}

fn uso() -> ! {
    eprintln!(
        "uso: nivelador <nomina.json> [--overrides <overrides.json>] \
         [--aplicar <periodo_id> --catalogo <catalogo.json>]"
    );
    process::exit(2);
}

fn ejecutar() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        uso();
    }
    let nomina_path = args[1].clone();
    let mut overrides_path: Option<String> = None;
    let mut periodo_id: Option<i64> = None;
    let mut catalogo_path: Option<String> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--overrides" => {
                i += 1;
                overrides_path = Some(args.get(i).cloned().unwrap_or_else(|| uso()));
            }
            "--aplicar" => {
                i += 1;
                let v = args.get(i).cloned().unwrap_or_else(|| uso());
                periodo_id = Some(v.parse().map_err(|_| format!("periodo_id inválido: {}", v))?);
            }
            "--catalogo" => {
                i += 1;
                catalogo_path = Some(args.get(i).cloned().unwrap_or_else(|| uso()));
            }
            _ => uso(),
        }
        i += 1;
    }

    let contenido = fs::read_to_string(&nomina_path)
        .map_err(|e| format!("no se pudo leer la nómina '{}': {}", nomina_path, e))?;
    let estudiantes: Vec<EstudianteNivelacion> = serde_json::from_str(&contenido)?;

    // lista de ramos en orden de primera aparición en la nómina
    let mut ramos: Vec<String> = Vec::new();
    for est in &estudiantes {
        for ramo in &est.ramos_requeridos {
            if !ramos.contains(ramo) {
                ramos.push(ramo.clone());
            }
        }
    }

    let overrides: BTreeMap<String, Modalidad> = match &overrides_path {
        Some(p) => {
            let s = fs::read_to_string(p)
                .map_err(|e| format!("no se pudo leer overrides '{}': {}", p, e))?;
            serde_json::from_str(&s)?
        }
        None => BTreeMap::new(),
    };

    let config = ConfigNivelacion::desde_entorno()?;
    println!(
        "Nómina: {} estudiantes, {} ramos, cupo {}+{}",
        estudiantes.len(),
        ramos.len(),
        config.cupo_inicial,
        config.cupo_extra
    );

    let plan = ejecutar_planificacion(&estudiantes, &ramos, &config, &overrides)?;
    println!("Plan: {} secciones", plan.secciones.len());
    for fila in resumen_plan(&plan) {
        println!(
            "  {}  {} {} {}  {} estudiantes",
            fila.codigo, fila.facultad, fila.sede, fila.modalidad, fila.total_estudiantes
        );
    }

    if let Some(periodo) = periodo_id {
        let catalogo_path = catalogo_path
            .ok_or("--aplicar requiere --catalogo con el mapa ramo -> id externo")?;
        let s = fs::read_to_string(&catalogo_path)
            .map_err(|e| format!("no se pudo leer el catálogo '{}': {}", catalogo_path, e))?;
        let catalogo: BTreeMap<String, i64> = serde_json::from_str(&s)?;

        init_db()?;
        let mut db = open_plan_db()?;
        let resumen = aplicar_plan(&mut db, &plan, &estudiantes, &catalogo, periodo)?;
        println!("Aplicado al período {}:", periodo);
        println!("{}", serde_json::to_string_pretty(&resumen)?);
        let conteo = contar_filas(&mut db, periodo)?;
        println!(
            "Filas en base: {} secciones, {} vínculos de ramo, {} inscripciones",
            conteo.secciones, conteo.seccion_ramos, conteo.inscripciones
        );
    }

    Ok(())
}
