// Estructuras de datos principales

use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::excel::cell::{parse_date_text, parse_number_text};

/// Mapa placa normalizada -> servicios en el orden de las filas del origen.
pub type VehicleServiceSet = BTreeMap<String, Vec<ServiceRecord>>;

/// Unidad del intervalo de mantenimiento. Se serializa con los códigos del
/// artefacto JSON: `km`, `day`, `month`, `year`, `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalType {
    #[serde(rename = "km")]
    Distance,
    #[serde(rename = "day")]
    Day,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "year")]
    Year,
    /// Fecha fija, o intervalo en días heredado de la ingesta.
    #[serde(rename = "date")]
    AbsoluteDate,
}

impl IntervalType {
    pub fn is_date_based(self) -> bool {
        !matches!(self, IntervalType::Distance)
    }
}

/// Magnitud del intervalo ("norma") o una fecha objetivo literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntervalValue {
    Magnitude(f64),
    Date(NaiveDate),
}

impl IntervalValue {
    pub fn magnitude(&self) -> Option<f64> {
        match self {
            IntervalValue::Magnitude(n) => Some(*n),
            IntervalValue::Date(_) => None,
        }
    }
}

impl Serialize for IntervalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            IntervalValue::Magnitude(n) => serialize_number(*n, serializer),
            IntervalValue::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for IntervalValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(IntervalValue::Magnitude(n)),
            Raw::Text(t) => {
                if let Some(d) = parse_date_text(&t) {
                    Ok(IntervalValue::Date(d))
                } else if let Some(n) = parse_number_text(&t) {
                    Ok(IntervalValue::Magnitude(n))
                } else {
                    Err(de::Error::custom(format!("invalid interval '{}'", t)))
                }
            }
        }
    }
}

/// Última evidencia de realización del servicio.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LastPerformed {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(
        rename = "km",
        alias = "odometer",
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_number"
    )]
    pub odometer: Option<f64>,
}

impl LastPerformed {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.odometer.is_none()
    }
}

/// Una tarea de mantenimiento de un vehículo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub interval_type: IntervalType,
    #[serde(rename = "interval")]
    pub interval_value: IntervalValue,
    /// Margen de aviso ("Signalizovať"), en km o en días según el tipo.
    #[serde(
        rename = "reminder",
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_number"
    )]
    pub reminder_threshold: Option<f64>,
    #[serde(rename = "lastService", default, skip_serializing_if = "Option::is_none")]
    pub last_performed: Option<LastPerformed>,
}

impl ServiceRecord {
    /// Evidencia utilizable: `None` si no hay registro o si está vacío.
    pub fn evidence(&self) -> Option<&LastPerformed> {
        self.last_performed.as_ref().filter(|l| !l.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Pending,
    Urgent,
    Overdue,
}

/// Próximo punto de vencimiento: lectura de odómetro o fecha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NextTarget {
    Odometer(f64),
    Date(NaiveDate),
}

impl Serialize for NextTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NextTarget::Odometer(km) => serialize_number(*km, serializer),
            NextTarget::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Estado calculado de un servicio. Nunca se persiste.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub next_target: NextTarget,
    #[serde(serialize_with = "serialize_f64")]
    pub remaining: f64,
    pub classification: Classification,
    pub display_value: String,
}

/// Formatea un número sin decimales cuando es entero (15000, no 15000.0).
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn serialize_number<S: Serializer>(n: f64, serializer: S) -> Result<S::Ok, S::Error> {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        serializer.serialize_i64(n as i64)
    } else {
        serializer.serialize_f64(n)
    }
}

fn serialize_f64<S: Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serialize_number(*n, serializer)
}

fn serialize_opt_number<S: Serializer>(n: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match n {
        Some(v) => serialize_number(*v, serializer),
        None => serializer.serialize_none(),
    }
}

// Acepta "2024-06-15", "2024-06-15T00:00:00.000Z" y "15.06.2024".
fn deserialize_opt_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_date_text(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid date '{}'", s))),
    }
}
