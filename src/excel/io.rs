use calamine::{open_workbook_auto, Reader};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FlotilaError, Result};
use crate::excel::cell::CellValue;

/// Fuente de filas de una hoja. La ingesta sólo depende de este trait; los
/// tests inyectan lectores en memoria.
pub trait SheetReader {
    /// Devuelve la primera hoja como filas de celdas, fila 0 = encabezado.
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<CellValue>>>;
}

/// Lector basado en `calamine::open_workbook_auto` (xls/xlsx/xlsb/ods).
#[derive(Debug, Default, Clone, Copy)]
pub struct CalamineReader;

impl SheetReader for CalamineReader {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<CellValue>>> {
        let mut workbook = open_workbook_auto(path)?;
        let names = workbook.sheet_names().to_owned();
        let primera_hoja = names
            .first()
            .ok_or_else(|| FlotilaError::EmptyWorkbook(path.display().to_string()))?;
        let range = workbook.worksheet_range(primera_hoja)?;

        // El rango empieza en la primera celda usada; rellenar columnas a la
        // izquierda para que las posiciones B/C/D/... se mantengan.
        let col_offset = range.start().map(|(_, c)| c as usize).unwrap_or(0);
        let rows = range
            .rows()
            .map(|r| {
                let mut row_vec: Vec<CellValue> = vec![CellValue::Empty; col_offset];
                row_vec.extend(r.iter().map(CellValue::from));
                row_vec
            })
            .collect();
        Ok(rows)
    }
}

/// Normaliza encabezados eliminando espacios y pasando a minúsculas.
pub fn normalize_header(s: &str) -> String {
    s.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect()
}

/// Placa normalizada: sin espacios y en mayúsculas ("zc 352 bp" -> "ZC352BP").
pub fn normalize_plate(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Placa a partir del nombre de archivo (`ZC 352 BP.xls` -> `ZC352BP`).
pub fn plate_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let plate = normalize_plate(stem);
    if plate.is_empty() { None } else { Some(plate) }
}

fn is_service_workbook(name: &str) -> bool {
    // ignorar ocultos y temporales del editor (.~lock, ~$, backups terminados en ~)
    if name.starts_with('.') || name.starts_with('~') || name.ends_with('~') {
        return false;
    }
    let lower = name.to_lowercase();
    lower.ends_with(".xls") || lower.ends_with(".xlsx")
}

/// Lista los libros de servicio (`.xls`/`.xlsx`) de un directorio, ordenados
/// por nombre. Error si el directorio no se puede leer.
pub fn list_service_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FlotilaError::MissingDirectory(dir.display().to_string()));
    }
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)?.flatten() {
        let p = entry.path();
        if !p.is_file() {
            continue;
        }
        let name = match p.file_name().and_then(|s| s.to_str()) {
            Some(s) => s,
            None => continue,
        };
        if is_service_workbook(name) {
            files.push(p);
        }
    }
    files.sort();
    Ok(files)
}
