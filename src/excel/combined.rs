//! Libro combinado: una sola hoja con filas de todos los vehículos y una
//! columna de placa (SPZ). El resto de columnas sigue el formato por vehículo.

use std::path::Path;
use tracing::{debug, info};

use crate::error::{FlotilaError, Result};
use crate::excel::cell::CellValue;
use crate::excel::io::{normalize_header, normalize_plate, SheetReader};
use crate::excel::servis::{find_signal_column, parse_service_row};
use crate::models::VehicleServiceSet;

const PLATE_HEADERS: &[&str] = &["spz", "špz", "plate"];

/// Columna de placa según el encabezado.
pub fn find_plate_column(header: &[CellValue]) -> Option<usize> {
    header.iter().position(|h| {
        let norm = normalize_header(&h.as_text());
        PLATE_HEADERS.iter().any(|k| norm.contains(k))
    })
}

/// Agrupa las filas por placa manteniendo el orden de aparición dentro de
/// cada vehículo.
pub fn parse_combined_rows(rows: &[Vec<CellValue>]) -> Result<VehicleServiceSet> {
    let mut set = VehicleServiceSet::new();
    let Some(header) = rows.first() else {
        return Ok(set);
    };
    let plate_idx = find_plate_column(header).ok_or_else(|| FlotilaError::MissingColumn("SPZ".to_string()))?;
    let signal_idx = find_signal_column(header);

    for row in rows.iter().skip(1) {
        let plate = row.get(plate_idx).map(|c| normalize_plate(&c.as_text())).unwrap_or_default();
        if plate.is_empty() {
            continue;
        }
        if let Some(record) = parse_service_row(row, signal_idx) {
            set.entry(plate).or_default().push(record);
        }
    }
    debug!("libro combinado: {} vehículos", set.len());
    Ok(set)
}

/// Lee un libro combinado completo.
pub fn ingest_combined<R: SheetReader + ?Sized>(reader: &R, path: &Path) -> Result<VehicleServiceSet> {
    let rows = reader.read_rows(path)?;
    let set = parse_combined_rows(&rows)?;
    info!(
        "{}: {} vehículos, {} servicios",
        path.display(),
        set.len(),
        set.values().map(Vec::len).sum::<usize>()
    );
    Ok(set)
}
