//! Lectura de filas de servicio de una exportación por vehículo.
//!
//! Columnas esperadas (fila 0 = encabezado):
//! B nombre, C código de intervalo (R/M/D), D norma (número o fecha),
//! G fecha de cambio, H fecha de la última realización, y una columna
//! "Signalizovať" localizada por encabezado (E si no aparece).

use chrono::NaiveDate;

use crate::excel::cell::CellValue;
use crate::excel::names::normalize_service_name;
use crate::models::{IntervalType, IntervalValue, LastPerformed, ServiceRecord};

pub const COL_NAME: usize = 1;
pub const COL_INTERVAL_CODE: usize = 2;
pub const COL_NORM: usize = 3;
pub const COL_SIGNAL_FALLBACK: usize = 4;
pub const COL_CHANGED: usize = 6;
pub const COL_LAST_DONE: usize = 7;

const SIGNAL_KEYWORD: &str = "signal";

/// Intervalo por defecto (días) para normas con fecha literal sin última realización.
pub const DEFAULT_DATE_INTERVAL_DAYS: i64 = 365;

/// A partir de esta magnitud la rama heredada interpreta kilómetros.
pub const LEGACY_KM_FLOOR: f64 = 999.0;

static EMPTY: CellValue = CellValue::Empty;

/// Cómo se resolvió el tipo de intervalo de una fila.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntervalResolution {
    /// Código explícito en la columna C; tiene prioridad sobre todo lo demás.
    Explicit(IntervalType),
    /// Fecha literal en la columna D sin código en C.
    LiteralDate(NaiveDate),
    /// Inferido desde la magnitud numérica.
    Inferred(IntervalType),
    /// Magnitudes ambiguas (366..999, y 31..32 sin entero): días por debajo de
    /// 999, km desde 999.
    Legacy(IntervalType),
}

impl IntervalResolution {
    pub fn interval_type(&self) -> IntervalType {
        match self {
            IntervalResolution::Explicit(t)
            | IntervalResolution::Inferred(t)
            | IntervalResolution::Legacy(t) => *t,
            IntervalResolution::LiteralDate(_) => IntervalType::AbsoluteDate,
        }
    }
}

/// Código de la columna C: R/ROK año, D/DEN día, M/MESIAC mes (en ese orden).
pub fn parse_interval_code(raw: &str) -> Option<IntervalType> {
    let s = raw.trim().to_uppercase();
    if s.is_empty() {
        return None;
    }
    if s == "R" || s.contains("ROK") {
        Some(IntervalType::Year)
    } else if s == "D" || s.contains("DEN") {
        Some(IntervalType::Day)
    } else if s == "M" || s.contains("MESIAC") {
        Some(IntervalType::Month)
    } else {
        None
    }
}

/// Inferencia desde la magnitud: 1..=31 y 32..=365 días, >= 1000 km, el resto
/// sin decidir. Los valores entre 31 y 32 no entran en ningún tramo.
pub fn infer_interval_type(n: f64) -> Option<IntervalType> {
    if (1.0..=31.0).contains(&n) || (32.0..=365.0).contains(&n) {
        Some(IntervalType::Day)
    } else if n >= 1000.0 {
        Some(IntervalType::Distance)
    } else {
        None
    }
}

/// Resuelve el tipo de intervalo de una fila. `None` si la norma no es ni
/// fecha ni número y tampoco hay código explícito.
pub fn resolve_interval(code: &CellValue, norm: &CellValue) -> Option<IntervalResolution> {
    if let Some(t) = parse_interval_code(&code.as_text()) {
        return Some(IntervalResolution::Explicit(t));
    }
    if let Some(d) = norm.literal_date() {
        return Some(IntervalResolution::LiteralDate(d));
    }
    let n = norm.as_number()?;
    if let Some(t) = infer_interval_type(n) {
        return Some(IntervalResolution::Inferred(t));
    }
    let legacy = if n < LEGACY_KM_FLOOR {
        IntervalType::AbsoluteDate
    } else {
        IntervalType::Distance
    };
    Some(IntervalResolution::Legacy(legacy))
}

/// Índice de la columna de aviso: primer encabezado que contiene "signal",
/// o la columna E.
pub fn find_signal_column(header: &[CellValue]) -> usize {
    header
        .iter()
        .position(|h| h.as_text().to_lowercase().contains(SIGNAL_KEYWORD))
        .unwrap_or(COL_SIGNAL_FALLBACK)
}

fn cell(row: &[CellValue], idx: usize) -> &CellValue {
    row.get(idx).unwrap_or(&EMPTY)
}

/// Convierte una fila de datos en `ServiceRecord`. Devuelve `None` para filas
/// sin nombre o sin norma utilizable ("sin norma no hay tarea").
pub fn parse_service_row(row: &[CellValue], signal_idx: usize) -> Option<ServiceRecord> {
    let raw_name = cell(row, COL_NAME).as_text();
    if raw_name.is_empty() {
        return None;
    }

    let norm = cell(row, COL_NORM);
    let last_done = cell(row, COL_LAST_DONE)
        .as_date()
        .or_else(|| cell(row, COL_CHANGED).as_date());

    let resolution = resolve_interval(cell(row, COL_INTERVAL_CODE), norm)?;
    let (interval_type, interval_value) = match resolution {
        IntervalResolution::LiteralDate(due) => {
            let days = match last_done {
                Some(last) => (due - last).num_days().max(1),
                None => DEFAULT_DATE_INTERVAL_DAYS,
            };
            (IntervalType::AbsoluteDate, IntervalValue::Magnitude(days as f64))
        }
        other => {
            let n = norm.as_number().filter(|n| *n > 0.0)?;
            let t = other.interval_type();
            if t == IntervalType::Distance && n.fract() != 0.0 {
                return None;
            }
            (t, IntervalValue::Magnitude(n))
        }
    };

    Some(ServiceRecord {
        name: normalize_service_name(&raw_name),
        interval_type,
        interval_value,
        reminder_threshold: cell(row, signal_idx).as_number(),
        last_performed: last_done.map(|d| LastPerformed {
            date: Some(d),
            odometer: None,
        }),
    })
}

/// Lee todas las filas de datos de una hoja (fila 0 = encabezado) en orden.
/// Las filas inválidas se omiten sin interrumpir la hoja; los nombres
/// repetidos se conservan.
pub fn parse_service_rows(rows: &[Vec<CellValue>]) -> Vec<ServiceRecord> {
    if rows.len() < 2 {
        return Vec::new();
    }
    let signal_idx = find_signal_column(&rows[0]);
    rows[1..]
        .iter()
        .filter_map(|row| parse_service_row(row, signal_idx))
        .collect()
}
