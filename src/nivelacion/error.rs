// Taxonomía de errores de la planificación.
//
// Tres familias con tratamiento distinto:
// - errores de entrada/configuración: abortan antes de calcular nada;
// - infactibilidades: abortan con contexto suficiente (estudiante, ramo,
//   demanda y capacidad) para decidir si subir cupos o agregar secciones;
// - invariantes violadas: defecto del propio algoritmo, nunca se degradan a
//   un plan incompleto.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("configuración inválida: {0}")]
    ConfigInvalida(String),

    #[error("entrada inválida: {0}")]
    EntradaInvalida(String),

    #[error("override de modalidad referencia un grupo inexistente: '{0}'")]
    OverrideDesconocido(String),

    /// Un ramo con demanda no tiene ninguna sección candidata que lo ofrezca.
    #[error(
        "sin sección candidata para el ramo '{ramo}': estudiante {rut} queda bloqueado \
         (demanda {demanda}, capacidad total {capacidad_total})"
    )]
    SinSeccionParaRamo {
        rut: String,
        ramo: String,
        demanda: usize,
        capacidad_total: usize,
    },

    /// Las secciones candidatas existen pero el cupo agregado no alcanza.
    #[error(
        "cupo agotado para el ramo '{ramo}': estudiante {rut} sin sección \
         (demanda {demanda}, capacidad total {capacidad_total})"
    )]
    CupoAgotado {
        rut: String,
        ramo: String,
        demanda: usize,
        capacidad_total: usize,
    },

    #[error("invariante violada en el solver: {0}")]
    InvarianteViolada(String),

    #[error("ramo '{ramo}' sin id en el catálogo externo{sugerencia}")]
    RamoSinCatalogo { ramo: String, sugerencia: String },

    #[error("error de persistencia: {0}")]
    Persistencia(String),
}

impl From<rusqlite::Error> for PlanError {
    fn from(e: rusqlite::Error) -> Self {
        PlanError::Persistencia(e.to_string())
    }
}

impl From<postgres::Error> for PlanError {
    fn from(e: postgres::Error) -> Self {
        PlanError::Persistencia(e.to_string())
    }
}
