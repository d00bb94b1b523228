// Consultas de verificación sobre la base del plan. Sólo lectura: sirven al
// reporte post-aplicación del binario y a los tests de idempotencia.

use postgres::{Client, NoTls};
use serde::Serialize;

use crate::aplicador::db::PlanDb;
use crate::nivelacion::error::PlanError;

/// Conteo bruto de filas por tabla. Comparar antes/después de re-aplicar un
/// plan demuestra que nada se borró ni se duplicó.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConteoFilas {
    pub estudiantes: i64,
    pub secciones: i64,
    pub seccion_ramos: i64,
    pub inscripciones: i64,
}

pub fn contar_filas(db: &mut PlanDb, periodo_id: i64) -> Result<ConteoFilas, PlanError> {
    match db {
        PlanDb::Sqlite(conn) => {
            let estudiantes: i64 =
                conn.query_row("SELECT COUNT(*) FROM estudiantes", [], |r| r.get(0))?;
            let secciones: i64 = conn.query_row(
                "SELECT COUNT(*) FROM secciones WHERE periodo_id = ?1",
                [periodo_id],
                |r| r.get(0),
            )?;
            let seccion_ramos: i64 = conn.query_row(
                "SELECT COUNT(*) FROM seccion_ramos WHERE periodo_id = ?1",
                [periodo_id],
                |r| r.get(0),
            )?;
            let inscripciones: i64 = conn.query_row(
                "SELECT COUNT(*) FROM inscripciones WHERE periodo_id = ?1",
                [periodo_id],
                |r| r.get(0),
            )?;
            Ok(ConteoFilas { estudiantes, secciones, seccion_ramos, inscripciones })
        }
        PlanDb::PostgresConfig(url) => {
            let url = url.clone();
            let handle = std::thread::spawn(move || -> Result<ConteoFilas, String> {
                let mut client = Client::connect(&url, NoTls).map_err(|e| e.to_string())?;
                let consulta = |client: &mut Client, sql: &str| -> Result<i64, String> {
                    let row =
                        client.query_one(sql, &[&periodo_id]).map_err(|e| e.to_string())?;
                    Ok(row.get(0))
                };
                let row = client
                    .query_one("SELECT COUNT(*) FROM estudiantes", &[])
                    .map_err(|e| e.to_string())?;
                let estudiantes: i64 = row.get(0);
                let secciones = consulta(
                    &mut client,
                    "SELECT COUNT(*) FROM secciones WHERE periodo_id = $1",
                )?;
                let seccion_ramos = consulta(
                    &mut client,
                    "SELECT COUNT(*) FROM seccion_ramos WHERE periodo_id = $1",
                )?;
                let inscripciones = consulta(
                    &mut client,
                    "SELECT COUNT(*) FROM inscripciones WHERE periodo_id = $1",
                )?;
                Ok(ConteoFilas { estudiantes, secciones, seccion_ramos, inscripciones })
            });
            match handle.join() {
                Ok(res) => res.map_err(PlanError::Persistencia),
                Err(e) => Err(PlanError::Persistencia(format!("thread join error: {:?}", e))),
            }
        }
    }
}

/// Filas {seccion, inscritos} ordenadas de mayor a menor, estilo ranking.
pub fn inscritos_por_seccion(
    db: &mut PlanDb,
    periodo_id: i64,
) -> Result<serde_json::Value, PlanError> {
    let mut filas: Vec<(String, i64)> = match db {
        PlanDb::Sqlite(conn) => {
            let mut stmt = conn.prepare(
                "SELECT seccion_codigo, COUNT(DISTINCT rut) FROM inscripciones
                 WHERE periodo_id = ?1 GROUP BY seccion_codigo",
            )?;
            let rows = stmt.query_map([periodo_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            out
        }
        PlanDb::PostgresConfig(url) => {
            let url = url.clone();
            let handle = std::thread::spawn(move || -> Result<Vec<(String, i64)>, String> {
                let mut client = Client::connect(&url, NoTls).map_err(|e| e.to_string())?;
                let rows = client
                    .query(
                        "SELECT seccion_codigo, COUNT(DISTINCT rut) FROM inscripciones
                         WHERE periodo_id = $1 GROUP BY seccion_codigo",
                        &[&periodo_id],
                    )
                    .map_err(|e| e.to_string())?;
                Ok(rows.iter().map(|r| (r.get(0), r.get(1))).collect())
            });
            match handle.join() {
                Ok(res) => res.map_err(PlanError::Persistencia)?,
                Err(e) => {
                    return Err(PlanError::Persistencia(format!("thread join error: {:?}", e)));
                }
            }
        }
    };

    filas.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let arr: Vec<serde_json::Value> = filas
        .into_iter()
        .map(|(seccion, inscritos)| serde_json::json!({"seccion": seccion, "inscritos": inscritos}))
        .collect();
    Ok(serde_json::Value::Array(arr))
}
