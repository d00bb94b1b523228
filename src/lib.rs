// Biblioteca raíz del crate `nivelador`.
// Reexporta los módulos principales y proporciona una función de conveniencia
// `planificar` que orquesta el flujo completo con la configuración por defecto.
pub mod config;
pub mod models;
pub mod nivelacion;
pub mod aplicador;

pub use config::ConfigNivelacion;
pub use models::{
    EstudianteNivelacion, GrupoCurso, GrupoFacultad, Modalidad, PlanNivelacion,
    ResumenAplicacion, SeccionPlanificada,
};
pub use nivelacion::{ejecutar_planificacion, PlanError};

use std::collections::BTreeMap;

/// Planifica con la configuración por defecto y sin overrides de modalidad.
pub fn planificar(
    estudiantes: &[EstudianteNivelacion],
    ramos: &[String],
) -> Result<PlanNivelacion, PlanError> {
    ejecutar_planificacion(estudiantes, ramos, &ConfigNivelacion::default(), &BTreeMap::new())
}
