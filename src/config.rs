// Configuración de la planificación de nivelación.
//
// Los valores por defecto se pueden sobreescribir vía variables de entorno
// (cargadas con dotenv, igual que la configuración de base de datos).

use serde::{Deserialize, Serialize};

use crate::nivelacion::error::PlanError;

/// Ramo de bienvenida por defecto: las facultades cuyo único ramo es éste se
/// excluyen de los totales del resumen de grupos.
pub const RAMO_BIENVENIDA_DEFAULT: &str = "BIENVENIDA UNIVERSITARIA";

const CUPO_INICIAL_DEFAULT: usize = 45;
const CUPO_EXTRA_DEFAULT: usize = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigNivelacion {
    /// Cupo base de una sección presencial (>= 1)
    pub cupo_inicial: usize,
    /// Cupo extra tolerado por sobre el inicial
    pub cupo_extra: usize,
    /// Regla de negocio heredada del sistema fuente: para la distribución en
    /// secciones la modalidad rendida se fuerza a presencial, sin importar la
    /// columna de modalidad declarada de la nómina. La modalidad declarada
    /// sigue alimentando el reporte de necesidades por programa. NO es un
    /// bug: apagar este flag hace que la agrupación respete la modalidad
    /// declarada.
    pub forzar_presencial_en_distribucion: bool,
    /// Nombre canónico del ramo de bienvenida/inducción
    pub ramo_bienvenida: String,
}

impl Default for ConfigNivelacion {
    fn default() -> Self {
        ConfigNivelacion {
            cupo_inicial: CUPO_INICIAL_DEFAULT,
            cupo_extra: CUPO_EXTRA_DEFAULT,
            forzar_presencial_en_distribucion: true,
            ramo_bienvenida: RAMO_BIENVENIDA_DEFAULT.to_string(),
        }
    }
}

impl ConfigNivelacion {
    /// Cupo efectivo por (sección, ramo) presencial
    pub fn cupo_efectivo(&self) -> usize {
        self.cupo_inicial + self.cupo_extra
    }

    /// Valida la configuración antes de planificar. Nada se calcula con una
    /// configuración inválida.
    pub fn validar(&self) -> Result<(), PlanError> {
        if self.cupo_inicial < 1 {
            return Err(PlanError::ConfigInvalida(format!(
                "cupo_inicial debe ser >= 1 (recibido {})",
                self.cupo_inicial
            )));
        }
        if self.ramo_bienvenida.trim().is_empty() {
            return Err(PlanError::ConfigInvalida(
                "ramo_bienvenida no puede ser vacío".to_string(),
            ));
        }
        Ok(())
    }

    /// Construye la configuración leyendo NIVELADOR_CUPO_INICIAL /
    /// NIVELADOR_CUPO_EXTRA / NIVELADOR_RAMO_BIENVENIDA del entorno si
    /// existen. Usada por el binario batch; la librería recibe valores
    /// explícitos.
    pub fn desde_entorno() -> Result<Self, PlanError> {
        let _ = dotenv::dotenv();
        let mut cfg = ConfigNivelacion::default();
        if let Ok(v) = std::env::var("NIVELADOR_CUPO_INICIAL") {
            cfg.cupo_inicial = v.parse().map_err(|_| {
                PlanError::ConfigInvalida(format!("NIVELADOR_CUPO_INICIAL inválido: '{}'", v))
            })?;
        }
        if let Ok(v) = std::env::var("NIVELADOR_CUPO_EXTRA") {
            cfg.cupo_extra = v.parse().map_err(|_| {
                PlanError::ConfigInvalida(format!("NIVELADOR_CUPO_EXTRA inválido: '{}'", v))
            })?;
        }
        if let Ok(v) = std::env::var("NIVELADOR_RAMO_BIENVENIDA") {
            cfg.ramo_bienvenida = v;
        }
        cfg.validar()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_valida() {
        assert!(ConfigNivelacion::default().validar().is_ok());
    }

    #[test]
    fn test_cupo_cero_invalido() {
        let cfg = ConfigNivelacion { cupo_inicial: 0, ..Default::default() };
        assert!(matches!(cfg.validar(), Err(PlanError::ConfigInvalida(_))));
    }
}
