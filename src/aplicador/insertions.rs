// Aplicación del plan a la base: una sola transacción, escrituras
// insert-if-absent y contadores creados/omitidos como testigo de
// idempotencia. Nunca borra filas preexistentes.

use std::collections::BTreeMap;

use chrono::Utc;
use postgres::{Client, NoTls};
use rusqlite::{params, Connection};

use crate::aplicador::db::PlanDb;
use crate::models::{EstudianteNivelacion, PlanNivelacion, ResumenAplicacion};
use crate::nivelacion::error::PlanError;
use crate::nivelacion::normalizar::sugerencia_cercana;

// Filas ya resueltas contra el catálogo, listas para insertar en cualquiera
// de los dos backends.
struct FilasPlan {
    estudiantes: Vec<(String, String, String, String)>,
    secciones: Vec<(String, String, String, String, i64, i64)>,
    seccion_ramos: Vec<(String, i64)>,
    inscripciones: Vec<(String, String, i64)>,
}

/// Aplica un plan terminado al período `periodo_id`.
///
/// Dentro de una única transacción: upsert de estudiantes por rut, de
/// secciones por (código, período), e inserción ignore-duplicados de los
/// vínculos sección-ramo y sección-estudiante-ramo. Repetir la llamada con el
/// mismo plan no crea filas nuevas; el `ResumenAplicacion` devuelto lo
/// atestigua. Un ramo sin id en el catálogo aborta antes de escribir nada.
pub fn aplicar_plan(
    db: &mut PlanDb,
    plan: &PlanNivelacion,
    estudiantes: &[EstudianteNivelacion],
    catalogo_ramos: &BTreeMap<String, i64>,
    periodo_id: i64,
) -> Result<ResumenAplicacion, PlanError> {
    let filas = preparar_filas(plan, estudiantes, catalogo_ramos)?;
    match db {
        PlanDb::Sqlite(conn) => aplicar_sqlite(conn, &filas, periodo_id),
        PlanDb::PostgresConfig(url) => aplicar_postgres(url.clone(), filas, periodo_id),
    }
}

/// Resuelve nombres de ramo contra el catálogo y aplana el plan en filas.
/// Falla antes de cualquier escritura si un ramo no tiene id, sugiriendo el
/// más parecido del catálogo.
fn preparar_filas(
    plan: &PlanNivelacion,
    estudiantes: &[EstudianteNivelacion],
    catalogo_ramos: &BTreeMap<String, i64>,
) -> Result<FilasPlan, PlanError> {
    let resolver = |ramo: &str| -> Result<i64, PlanError> {
        catalogo_ramos.get(ramo).copied().ok_or_else(|| {
            let sugerencia =
                match sugerencia_cercana(ramo, catalogo_ramos.keys().map(|k| k.as_str())) {
                    Some(s) => format!(" (¿quiso decir '{}'?)", s),
                    None => String::new(),
                };
            PlanError::RamoSinCatalogo { ramo: ramo.to_string(), sugerencia }
        })
    };

    let por_rut: BTreeMap<&str, &EstudianteNivelacion> =
        estudiantes.iter().map(|e| (e.rut.as_str(), e)).collect();

    let mut filas = FilasPlan {
        estudiantes: Vec::new(),
        secciones: Vec::new(),
        seccion_ramos: Vec::new(),
        inscripciones: Vec::new(),
    };

    // estudiantes del plan, una vez cada uno, en orden de rut
    let mut ruts: Vec<&str> = plan
        .secciones
        .iter()
        .flat_map(|s| s.estudiantes.keys().map(|r| r.as_str()))
        .collect();
    ruts.sort_unstable();
    ruts.dedup();
    for rut in ruts {
        let est = por_rut.get(rut).ok_or_else(|| {
            PlanError::EntradaInvalida(format!(
                "el plan contiene al estudiante {} que no está en la nómina",
                rut
            ))
        })?;
        filas.estudiantes.push((
            est.rut.clone(),
            est.carrera.clone(),
            est.grupo_facultad.as_str().to_string(),
            est.sede.clone(),
        ));
    }

    for sec in &plan.secciones {
        filas.secciones.push((
            sec.codigo.clone(),
            sec.grupo_facultad.as_str().to_string(),
            sec.sede.clone(),
            sec.modalidad.to_string(),
            sec.cupo_inicial as i64,
            sec.cupo_extra as i64,
        ));
        for ramo in &sec.ramos {
            filas.seccion_ramos.push((sec.codigo.clone(), resolver(ramo)?));
        }
        for (rut, ramos) in &sec.estudiantes {
            for ramo in ramos {
                filas.inscripciones.push((sec.codigo.clone(), rut.clone(), resolver(ramo)?));
            }
        }
    }

    Ok(filas)
}

fn aplicar_sqlite(
    conn: &mut Connection,
    filas: &FilasPlan,
    periodo_id: i64,
) -> Result<ResumenAplicacion, PlanError> {
    let ts = Utc::now().to_rfc3339();
    let mut resumen = ResumenAplicacion::default();
    let tx = conn.transaction()?;

    for (rut, carrera, facultad, sede) in &filas.estudiantes {
        let n = tx.execute(
            "INSERT OR IGNORE INTO estudiantes (rut, carrera, grupo_facultad, sede, creado_ts)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![rut, carrera, facultad, sede, ts],
        )?;
        resumen.estudiantes.registrar(n);
    }

    for (codigo, facultad, sede, modalidad, cupo_inicial, cupo_extra) in &filas.secciones {
        let n = tx.execute(
            "INSERT OR IGNORE INTO secciones
             (codigo, periodo_id, grupo_facultad, sede, modalidad, cupo_inicial, cupo_extra, creado_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![codigo, periodo_id, facultad, sede, modalidad, cupo_inicial, cupo_extra, ts],
        )?;
        resumen.secciones.registrar(n);
    }

    for (codigo, ramo_id) in &filas.seccion_ramos {
        let n = tx.execute(
            "INSERT OR IGNORE INTO seccion_ramos (seccion_codigo, periodo_id, ramo_id)
             VALUES (?1, ?2, ?3)",
            params![codigo, periodo_id, ramo_id],
        )?;
        resumen.seccion_ramos.registrar(n);
    }

    for (codigo, rut, ramo_id) in &filas.inscripciones {
        let n = tx.execute(
            "INSERT OR IGNORE INTO inscripciones
             (seccion_codigo, periodo_id, rut, ramo_id, creado_ts)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![codigo, periodo_id, rut, ramo_id, ts],
        )?;
        resumen.inscripciones.registrar(n);
    }

    tx.commit()?;
    Ok(resumen)
}

fn aplicar_postgres(
    url: String,
    filas: FilasPlan,
    periodo_id: i64,
) -> Result<ResumenAplicacion, PlanError> {
    // toda la transacción corre en un hilo dedicado
    let handle = std::thread::spawn(move || -> Result<ResumenAplicacion, String> {
        let ts = Utc::now().to_rfc3339();
        let mut client = Client::connect(&url, NoTls).map_err(|e| e.to_string())?;
        let mut tx = client.transaction().map_err(|e| e.to_string())?;
        let mut resumen = ResumenAplicacion::default();

        for (rut, carrera, facultad, sede) in &filas.estudiantes {
            let n = tx
                .execute(
                    "INSERT INTO estudiantes (rut, carrera, grupo_facultad, sede, creado_ts)
                     VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING",
                    &[rut, carrera, facultad, sede, &ts],
                )
                .map_err(|e| e.to_string())?;
            resumen.estudiantes.registrar(n as usize);
        }

        for (codigo, facultad, sede, modalidad, cupo_inicial, cupo_extra) in &filas.secciones {
            let n = tx
                .execute(
                    "INSERT INTO secciones
                     (codigo, periodo_id, grupo_facultad, sede, modalidad, cupo_inicial, cupo_extra, creado_ts)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) ON CONFLICT DO NOTHING",
                    &[codigo, &periodo_id, facultad, sede, modalidad, cupo_inicial, cupo_extra, &ts],
                )
                .map_err(|e| e.to_string())?;
            resumen.secciones.registrar(n as usize);
        }

        for (codigo, ramo_id) in &filas.seccion_ramos {
            let n = tx
                .execute(
                    "INSERT INTO seccion_ramos (seccion_codigo, periodo_id, ramo_id)
                     VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
                    &[codigo, &periodo_id, ramo_id],
                )
                .map_err(|e| e.to_string())?;
            resumen.seccion_ramos.registrar(n as usize);
        }

        for (codigo, rut, ramo_id) in &filas.inscripciones {
            let n = tx
                .execute(
                    "INSERT INTO inscripciones (seccion_codigo, periodo_id, rut, ramo_id, creado_ts)
                     VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING",
                    &[codigo, &periodo_id, rut, ramo_id, &ts],
                )
                .map_err(|e| e.to_string())?;
            resumen.inscripciones.registrar(n as usize);
        }

        tx.commit().map_err(|e| e.to_string())?;
        Ok(resumen)
    });

    match handle.join() {
        Ok(res) => res.map_err(PlanError::Persistencia),
        Err(e) => Err(PlanError::Persistencia(format!("thread join error: {:?}", e))),
    }
}
