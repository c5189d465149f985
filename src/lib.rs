// Biblioteca raíz del crate `flotila`.
// Ingesta de exportaciones de servicio (Excel) y planificación de
// mantenimiento por kilómetros o por fecha.
pub mod error;
pub mod models;
pub mod excel;
pub mod schedule;
pub mod store;
pub mod config;
pub mod logging;
pub mod server;

pub use error::{FlotilaError, Result};
pub use models::{ServiceRecord, ServiceStatus, VehicleServiceSet};

/// Ejecuta el servidor HTTP (reexport para facilitar uso desde `main`)
pub use server::run_server;

use std::path::Path;
use tracing::info;

/// Ingesta completa de un directorio: lee los libros, escribe el artefacto JSON
/// en `output` y, si hay almacén, publica un documento por vehículo.
pub fn run_ingest(
    dir: &Path,
    output: &Path,
    store: Option<&dyn store::DocumentStore>,
) -> Result<VehicleServiceSet> {
    let set = excel::ingest_directory(&excel::CalamineReader, dir);
    excel::write_artifact(&set, output)?;
    info!("artefacto escrito en {}", output.display());
    if let Some(store) = store {
        let n = store::publish_service_sets(store, &set)?;
        info!("{} vehículos publicados", n);
    }
    Ok(set)
}
