//! Módulo `excel`: ingesta de exportaciones de servicio.
//!
//! Submódulos:
//! - `cell`: valor de celda etiquetado y parseo de números/fechas
//! - `io`: trait `SheetReader`, lector calamine y helpers de archivos
//! - `names`: tabla ordenada de nombres canónicos
//! - `servis`: algoritmo por fila de un libro por vehículo
//! - `combined`: libro único con columna de placa

pub mod cell;
pub mod combined;
pub mod io;
pub mod names;
pub mod servis;

pub use cell::CellValue;
pub use combined::ingest_combined;
pub use io::{list_service_files, normalize_plate, plate_from_path, CalamineReader, SheetReader};
pub use names::normalize_service_name;
pub use servis::{parse_service_row, parse_service_rows, resolve_interval, IntervalResolution};

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::models::VehicleServiceSet;

/// Ingesta de una lista de libros (uno por vehículo, placa = nombre de archivo).
/// Un libro ilegible se registra y se omite; el resto del lote continúa.
pub fn ingest_files<R: SheetReader + ?Sized>(reader: &R, files: &[PathBuf]) -> VehicleServiceSet {
    let mut set = VehicleServiceSet::new();
    for path in files {
        let Some(plate) = plate_from_path(path) else {
            warn!("{}: no se pudo derivar la placa del nombre, se omite", path.display());
            continue;
        };
        let rows = match reader.read_rows(path) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("{}: no se pudo leer el libro: {}", path.display(), e);
                continue;
            }
        };
        let services = parse_service_rows(&rows);
        if services.is_empty() {
            continue;
        }
        set.entry(plate).or_default().extend(services);
    }
    set
}

/// Ingesta de todos los libros de servicio de un directorio. Si el directorio
/// no existe se devuelve un conjunto vacío.
pub fn ingest_directory<R: SheetReader + ?Sized>(reader: &R, dir: &Path) -> VehicleServiceSet {
    let files = match list_service_files(dir) {
        Ok(f) => f,
        Err(e) => {
            error!("no se pudo leer el directorio de servicios: {}", e);
            return VehicleServiceSet::new();
        }
    };
    let set = ingest_files(reader, &files);
    info!(
        "{} libros leídos desde {}: {} vehículos con servicios",
        files.len(),
        dir.display(),
        set.len()
    );
    set
}

/// Escribe el artefacto JSON `placa -> [servicio]`.
pub fn write_artifact(set: &VehicleServiceSet, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }
    let json = serde_json::to_string_pretty(set)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn read_artifact(path: &Path) -> Result<VehicleServiceSet> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
