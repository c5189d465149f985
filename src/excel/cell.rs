//! Valor de celda etiquetado y helpers de clasificación.
//!
//! Las exportaciones mezclan texto, números y fechas en las mismas columnas;
//! todo el parseo de celdas pasa por `CellValue`.

use calamine::Data;
use chrono::{Days, NaiveDate};

/// Mayor serial de Excel válido (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl From<&Data> for CellValue {
    fn from(d: &Data) -> Self {
        match d {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(s) => {
                if s.trim().is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(s.clone())
                }
            }
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Text(b.to_string()),
            // calamine aplica el sistema del libro (1900 o 1904)
            Data::DateTime(dt) if dt.is_duration() => CellValue::Number(dt.as_f64()),
            Data::DateTime(dt) => dt
                .as_datetime()
                .map(|t| CellValue::Date(t.date()))
                .unwrap_or(CellValue::Empty),
            Data::DateTimeIso(s) => parse_date_text(s)
                .map(CellValue::Date)
                .unwrap_or_else(|| CellValue::Text(s.clone())),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Texto recortado de la celda (equivalente a `cell_to_string`).
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => crate::models::format_number(*n),
            CellValue::Date(d) => d.format("%d.%m.%Y").to_string(),
        }
    }

    /// Número de la celda. El texto se limpia antes de parsear ("1 234" -> 1234).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => parse_number_text(s),
            _ => None,
        }
    }

    /// Fecha literal en la celda de norma: fecha nativa o texto `D[D].M[M].YYYY`.
    /// Los números nunca cuentan como fecha aquí.
    pub fn literal_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Text(s) => parse_dotted_date(s.trim()),
            _ => None,
        }
    }

    /// Fecha en columnas históricas (G/H): además acepta ISO y seriales de Excel.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Text(s) => parse_date_text(s),
            CellValue::Number(n) => excel_serial_to_date(*n),
            CellValue::Empty => None,
        }
    }
}

/// Elimina todo lo que no sea dígito, punto o signo menos y parsea el resto.
/// Una cadena que queda vacía no es un número.
pub fn parse_number_text(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// `D[D].M[M].YYYY` estricto.
pub fn parse_dotted_date(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    let (d, m, y) = (parts[0], parts[1], parts[2]);
    let digits = |p: &str, min: usize, max: usize| {
        p.len() >= min && p.len() <= max && p.chars().all(|c| c.is_ascii_digit())
    };
    if !digits(d, 1, 2) || !digits(m, 1, 2) || !digits(y, 4, 4) {
        return None;
    }
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

/// Fechas en texto libre: `15.06.2024`, `15.06.2024 10:30`, `2024-06-15`,
/// `2024-06-15T00:00:00.000Z`.
pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let first = s.split_whitespace().next().unwrap_or("");
    if let Some(d) = parse_dotted_date(first) {
        return Some(d);
    }
    let iso = s.get(..10)?;
    NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok()
}

/// Serial de Excel (sistema 1900) a fecha. La parte horaria se descarta.
/// Solo para números sueltos; las celdas con formato de fecha llegan ya
/// convertidas por calamine.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    let days = serial.floor() as u64;
    // Excel cuenta el inexistente 29/02/1900: antes de él la base se corre un día
    let base = if days < 61 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    base.checked_add_days(Days::new(days))
}
