// Estructuras de datos principales del plan de nivelación

use std::collections::{BTreeMap, BTreeSet};
use serde::{Deserialize, Serialize};

/// Sede reservada para las secciones/grupos virtuales: la demanda virtual se
/// agrega a nivel de facultad, no de sede.
pub const SEDE_VIRTUAL: &str = "VIRTUAL";

/// Modalidad de dictado. El orden de las variantes importa: presencial antes
/// que virtual al reordenar el plan final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modalidad {
    Presencial,
    Virtual,
}

impl Modalidad {
    /// Letra usada en el código de sección ("P"/"V")
    pub fn letra(&self) -> char {
        match self {
            Modalidad::Presencial => 'P',
            Modalidad::Virtual => 'V',
        }
    }
}

impl std::fmt::Display for Modalidad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modalidad::Presencial => write!(f, "PRESENCIAL"),
            Modalidad::Virtual => write!(f, "VIRTUAL"),
        }
    }
}

/// Agrupación gruesa de facultades usada para armar secciones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GrupoFacultad {
    #[serde(rename = "FICA")]
    Fica,
    #[serde(rename = "SALUD")]
    Salud,
}

impl GrupoFacultad {
    /// Letra usada en el código de sección ("F"/"S")
    pub fn letra(&self) -> char {
        match self {
            GrupoFacultad::Fica => 'F',
            GrupoFacultad::Salud => 'S',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GrupoFacultad::Fica => "FICA",
            GrupoFacultad::Salud => "SALUD",
        }
    }
}

impl std::fmt::Display for GrupoFacultad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GrupoFacultad {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FICA" => Ok(GrupoFacultad::Fica),
            "SALUD" => Ok(GrupoFacultad::Salud),
            other => Err(format!("grupo de facultad desconocido: '{}'", other)),
        }
    }
}

/// Registro de estudiante ya normalizado (la lectura de la planilla ocurre
/// fuera de este crate). Inmutable durante toda la planificación.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstudianteNivelacion {
    /// Identificador nacional (rut), clave natural del estudiante
    pub rut: String,
    pub carrera: String,
    pub grupo_facultad: GrupoFacultad,
    /// Nombre corto canónico de la sede (p. ej. "IC")
    pub sede: String,
    /// Modalidad declarada en la nómina; la distribución puede forzarla a
    /// presencial según configuración
    pub modalidad: Modalidad,
    /// Ramos de nivelación que el estudiante debe cursar
    pub ramos_requeridos: BTreeSet<String>,
}

/// Una tajada de demanda de un ramo dentro de una (facultad, sede), acotada
/// por el cupo efectivo cuando es presencial. Artefacto de dimensionamiento:
/// no se persiste, sólo dimensiona secciones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrupoCurso {
    /// Id estable "FACULTAD|SEDE|RAMO|N" (N correlativo desde 1)
    pub id: String,
    pub grupo_facultad: GrupoFacultad,
    pub sede: String,
    pub ramo: String,
    pub indice: usize,
    pub tamano: usize,
    pub modalidad: Modalidad,
}

impl GrupoCurso {
    pub fn armar_id(facultad: GrupoFacultad, sede: &str, ramo: &str, indice: usize) -> String {
        format!("{}|{}|{}|{}", facultad.as_str(), sede, ramo, indice)
    }
}

/// Sección por crear (o reutilizar) con su asignación de estudiantes.
/// La sintetiza `secciones`, la muta sólo el solver de asignación y queda
/// inmutable una vez cerrado el plan.
#[derive(Debug, Clone, Serialize)]
pub struct SeccionPlanificada {
    pub codigo: String,
    pub grupo_facultad: GrupoFacultad,
    pub sede: String,
    pub modalidad: Modalidad,
    pub cupo_inicial: usize,
    /// Cupo extra sobre el inicial; en una sección virtual 0 significa
    /// desborde ilimitado
    pub cupo_extra: usize,
    /// Ramos que esta sección ofrece
    pub ramos: BTreeSet<String>,
    /// rut -> subconjunto de sus ramos cubiertos en ESTA sección
    pub estudiantes: BTreeMap<String, BTreeSet<String>>,
}

impl SeccionPlanificada {
    /// Cupo efectivo por ramo. `None` = sin tope (virtual).
    pub fn cupo_efectivo(&self) -> Option<usize> {
        match self.modalidad {
            Modalidad::Presencial => Some(self.cupo_inicial + self.cupo_extra),
            Modalidad::Virtual => None,
        }
    }

    /// Cantidad de estudiantes distintos con `ramo` asignado en esta sección
    pub fn inscritos_en(&self, ramo: &str) -> usize {
        self.estudiantes.values().filter(|rs| rs.contains(ramo)).count()
    }

    /// ¿Queda cupo para un estudiante más en `ramo`?
    pub fn tiene_cupo_para(&self, ramo: &str) -> bool {
        match self.cupo_efectivo() {
            None => true,
            Some(c) => self.inscritos_en(ramo) < c,
        }
    }

    pub fn total_estudiantes(&self) -> usize {
        self.estudiantes.len()
    }
}

/// Plan terminado: secciones ya depuradas (sin secciones vacías) y
/// recodificadas de forma determinista.
#[derive(Debug, Clone, Serialize)]
pub struct PlanNivelacion {
    pub secciones: Vec<SeccionPlanificada>,
}

impl PlanNivelacion {
    /// Pares (rut, ramo) cubiertos en todo el plan, en orden estable
    pub fn pares_cubiertos(&self) -> BTreeSet<(String, String)> {
        let mut pares = BTreeSet::new();
        for sec in &self.secciones {
            for (rut, ramos) in &sec.estudiantes {
                for ramo in ramos {
                    pares.insert((rut.clone(), ramo.clone()));
                }
            }
        }
        pares
    }
}

/// Contador creados/omitidos de una categoría al aplicar el plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContadorAplicacion {
    pub creados: usize,
    pub omitidos: usize,
}

impl ContadorAplicacion {
    pub fn registrar(&mut self, filas_insertadas: usize) {
        if filas_insertadas > 0 {
            self.creados += 1;
        } else {
            self.omitidos += 1;
        }
    }
}

/// Testigo de idempotencia que devuelve `aplicar_plan`: en una segunda
/// aplicación del mismo plan todos los `creados` deben quedar en 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResumenAplicacion {
    pub estudiantes: ContadorAplicacion,
    pub secciones: ContadorAplicacion,
    pub seccion_ramos: ContadorAplicacion,
    pub inscripciones: ContadorAplicacion,
}
