// Módulo de alto nivel de la planificación de nivelación.
// Declarar submódulos (archivos en la carpeta `src/nivelacion`)
pub mod error;
pub mod normalizar;
pub mod grupos;
pub mod secciones;
pub mod asignacion;
pub mod resumen;

// Reexportar sólo la API pública que se quiere exponer desde aquí
pub use error::PlanError;
pub use grupos::{construir_grupos_curso, partir_en_cupos};
pub use secciones::{depurar_y_recodificar, sintetizar_secciones};
pub use asignacion::{asignar_cursos, verificar_cobertura};
pub use resumen::{construir_resumen_grupos, resumen_necesidades_programa, resumen_plan};

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ConfigNivelacion;
use crate::models::{EstudianteNivelacion, Modalidad, PlanNivelacion};

/// Orquesta la corrida completa: valida, construye grupos, sintetiza
/// secciones, asigna, depura/recodifica y verifica la postcondición. Puro y
/// de un solo hilo: misma entrada, mismo plan, byte a byte.
pub fn ejecutar_planificacion(
    estudiantes: &[EstudianteNivelacion],
    ramos: &[String],
    config: &ConfigNivelacion,
    overrides: &BTreeMap<String, Modalidad>,
) -> Result<PlanNivelacion, PlanError> {
    config.validar()?;

    // ruts duplicados romperían las claves de asignación: error de entrada
    let mut vistos = BTreeSet::new();
    for est in estudiantes {
        if !vistos.insert(est.rut.as_str()) {
            return Err(PlanError::EntradaInvalida(format!(
                "rut duplicado en la nómina: {}",
                est.rut
            )));
        }
    }

    let grupos = construir_grupos_curso(estudiantes, ramos, config, overrides)?;
    let mut secciones = sintetizar_secciones(&grupos, estudiantes, config);
    let cobertura = asignar_cursos(estudiantes, &grupos, &mut secciones, config)?;

    let plan = PlanNivelacion { secciones: depurar_y_recodificar(secciones) };
    verificar_cobertura(estudiantes, &plan.secciones, &cobertura)?;
    Ok(plan)
}
