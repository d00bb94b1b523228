pub mod db;
pub mod insertions;
pub mod queries;

pub use db::{crear_tablas_sqlite, init_db, open_plan_db, PlanDb};
pub use insertions::aplicar_plan;
pub use queries::{contar_filas, inscritos_por_seccion, ConteoFilas};
