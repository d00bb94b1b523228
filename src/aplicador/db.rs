use rusqlite::Connection;
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;

// Cliente Postgres para soportar una base remota
use postgres::{Client, NoTls};

use crate::nivelacion::error::PlanError;

/// Abstracción sencilla para la base del plan: SQLite local o Postgres
/// remoto. Para Postgres guardamos la URL y ejecutamos cada operación en un
/// hilo dedicado para no pelear con runtimes ajenos.
pub enum PlanDb {
    Sqlite(Connection),
    /// Contiene la URL completa (postgres://...)
    PostgresConfig(String),
}

impl fmt::Debug for PlanDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanDb::Sqlite(_) => write!(f, "PlanDb::Sqlite(..)"),
            PlanDb::PostgresConfig(_) => write!(f, "PlanDb::PostgresConfig(..)"),
        }
    }
}

// cargar .env si existe
fn load_dotenv() {
    let _ = dotenv::dotenv();
}

/// Ruta del archivo SQLite del plan. Respeta NIVELADOR_DB_PATH /
/// NIVELADOR_DB_URL (sqlite:// o file://); para URLs remotas devuelve la
/// ruta por defecto.
pub fn plan_db_path() -> PathBuf {
    load_dotenv();
    if let Ok(p) = env::var("NIVELADOR_DB_PATH") {
        PathBuf::from(p)
    } else if let Ok(p) = env::var("NIVELADOR_DB_URL") {
        if p.starts_with("sqlite://") {
            PathBuf::from(p.trim_start_matches("sqlite://"))
        } else if p.starts_with("file://") {
            PathBuf::from(p.trim_start_matches("file://"))
        } else {
            PathBuf::from("nivelador/plan.db")
        }
    } else {
        PathBuf::from("nivelador/plan.db")
    }
}

/// Abre la conexión del plan aceptando sqlite://, file:// y postgres:// URLs.
pub fn open_plan_db() -> Result<PlanDb, PlanError> {
    load_dotenv();
    if let Ok(url) = env::var("NIVELADOR_DB_URL") {
        if url.starts_with("sqlite://") {
            let conn = Connection::open(url.trim_start_matches("sqlite://"))?;
            return Ok(PlanDb::Sqlite(conn));
        } else if url.starts_with("file://") {
            let conn = Connection::open(url.trim_start_matches("file://"))?;
            return Ok(PlanDb::Sqlite(conn));
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            // Sólo guardamos la URL; la conexión real ocurre en el sitio de
            // la operación, dentro de su hilo dedicado.
            return Ok(PlanDb::PostgresConfig(url));
        } else {
            return Err(PlanError::Persistencia(format!(
                "NIVELADOR_DB_URL usa un esquema no soportado: {}",
                url
            )));
        }
    }

    let conn = Connection::open(plan_db_path())?;
    Ok(PlanDb::Sqlite(conn))
}

const TABLAS_SQLITE: &str = "
CREATE TABLE IF NOT EXISTS estudiantes (
    rut TEXT PRIMARY KEY,
    carrera TEXT NOT NULL,
    grupo_facultad TEXT NOT NULL,
    sede TEXT,
    creado_ts TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS secciones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    codigo TEXT NOT NULL,
    periodo_id INTEGER NOT NULL,
    grupo_facultad TEXT NOT NULL,
    sede TEXT NOT NULL,
    modalidad TEXT NOT NULL,
    cupo_inicial INTEGER NOT NULL,
    cupo_extra INTEGER NOT NULL,
    creado_ts TEXT NOT NULL,
    UNIQUE(codigo, periodo_id)
);

CREATE TABLE IF NOT EXISTS seccion_ramos (
    seccion_codigo TEXT NOT NULL,
    periodo_id INTEGER NOT NULL,
    ramo_id INTEGER NOT NULL,
    UNIQUE(seccion_codigo, periodo_id, ramo_id)
);

CREATE TABLE IF NOT EXISTS inscripciones (
    seccion_codigo TEXT NOT NULL,
    periodo_id INTEGER NOT NULL,
    rut TEXT NOT NULL,
    ramo_id INTEGER NOT NULL,
    creado_ts TEXT NOT NULL,
    UNIQUE(seccion_codigo, periodo_id, rut, ramo_id)
);";

const TABLAS_POSTGRES: &str = "
CREATE TABLE IF NOT EXISTS estudiantes (
    rut TEXT PRIMARY KEY,
    carrera TEXT NOT NULL,
    grupo_facultad TEXT NOT NULL,
    sede TEXT,
    creado_ts TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS secciones (
    id BIGSERIAL PRIMARY KEY,
    codigo TEXT NOT NULL,
    periodo_id BIGINT NOT NULL,
    grupo_facultad TEXT NOT NULL,
    sede TEXT NOT NULL,
    modalidad TEXT NOT NULL,
    cupo_inicial BIGINT NOT NULL,
    cupo_extra BIGINT NOT NULL,
    creado_ts TEXT NOT NULL,
    UNIQUE(codigo, periodo_id)
);

CREATE TABLE IF NOT EXISTS seccion_ramos (
    seccion_codigo TEXT NOT NULL,
    periodo_id BIGINT NOT NULL,
    ramo_id BIGINT NOT NULL,
    UNIQUE(seccion_codigo, periodo_id, ramo_id)
);

CREATE TABLE IF NOT EXISTS inscripciones (
    seccion_codigo TEXT NOT NULL,
    periodo_id BIGINT NOT NULL,
    rut TEXT NOT NULL,
    ramo_id BIGINT NOT NULL,
    creado_ts TEXT NOT NULL,
    UNIQUE(seccion_codigo, periodo_id, rut, ramo_id)
);";

/// Crea las tablas del plan sobre una conexión SQLite ya abierta. Expuesto
/// para que los tests trabajen contra una base en memoria.
pub fn crear_tablas_sqlite(conn: &Connection) -> Result<(), PlanError> {
    conn.execute_batch(TABLAS_SQLITE)?;
    Ok(())
}

/// Inicializa la base del plan (directorio + tablas) según el entorno.
pub fn init_db() -> Result<(), PlanError> {
    load_dotenv();
    // con sqlite local asegurar que el directorio exista
    let url_local = match env::var("NIVELADOR_DB_URL") {
        Ok(url) => url.starts_with("sqlite://") || url.starts_with("file://"),
        Err(_) => true,
    };
    let usa_sqlite_local = url_local || env::var("NIVELADOR_DB_PATH").is_ok();
    if usa_sqlite_local {
        let db_path = plan_db_path();
        if let Some(dir) = db_path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)
                    .map_err(|e| PlanError::Persistencia(e.to_string()))?;
            }
        }
    }

    match open_plan_db()? {
        PlanDb::Sqlite(conn) => crear_tablas_sqlite(&conn),
        PlanDb::PostgresConfig(url) => {
            // creación de tablas en un hilo dedicado
            let handle = std::thread::spawn(move || -> Result<(), String> {
                let mut client = Client::connect(&url, NoTls).map_err(|e| e.to_string())?;
                client.batch_execute(TABLAS_POSTGRES).map_err(|e| e.to_string())?;
                Ok(())
            });
            match handle.join() {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(PlanError::Persistencia(e)),
                Err(e) => Err(PlanError::Persistencia(format!("thread join error: {:?}", e))),
            }
        }
    }
}
