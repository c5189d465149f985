//! Planificador de mantenimiento.
//!
//! Función pura sobre un `ServiceRecord`, el odómetro actual y la fecha de
//! hoy. Sin estado compartido: se puede llamar en paralelo sin restricciones.

pub mod board;

use chrono::{Days, Months, NaiveDate};

use crate::models::{
    format_number, Classification, IntervalType, IntervalValue, NextTarget, ServiceRecord, ServiceStatus,
};

/// Margen urgente para servicios por kilómetros.
pub const URGENT_KM: f64 = 5000.0;
/// Margen urgente para servicios por fecha.
pub const URGENT_DAYS: f64 = 30.0;

/// Clasifica lo que falta: vencido si <= 0, urgente hasta `urgent_limit`.
pub fn classify(remaining: f64, urgent_limit: f64) -> Classification {
    if remaining <= 0.0 {
        Classification::Overdue
    } else if remaining <= urgent_limit {
        Classification::Urgent
    } else {
        Classification::Pending
    }
}

/// Suma un intervalo calendario. Meses y años se recortan al último día válido
/// del mes destino (31/01 + 1 mes = 29/02 en año bisiesto); días y el tipo
/// `date` suman días naturales.
pub fn add_interval(from: NaiveDate, interval_type: IntervalType, units: u32) -> Option<NaiveDate> {
    match interval_type {
        IntervalType::Day | IntervalType::AbsoluteDate => from.checked_add_days(Days::new(units as u64)),
        IntervalType::Month => from.checked_add_months(Months::new(units)),
        IntervalType::Year => from.checked_add_months(Months::new(units.checked_mul(12)?)),
        IntervalType::Distance => None,
    }
}

/// Estado del servicio. `None` si la entrada no permite calcularlo
/// (intervalo no positivo, odómetro negativo, fechas fuera de rango).
pub fn compute_status(record: &ServiceRecord, current_odometer: Option<f64>, today: NaiveDate) -> Option<ServiceStatus> {
    let odometer = match current_odometer {
        Some(v) if !v.is_finite() || v < 0.0 => return None,
        Some(v) => v,
        None => 0.0,
    };
    if record.interval_type.is_date_based() {
        date_status(record, today)
    } else {
        distance_status(record, odometer)
    }
}

fn distance_status(record: &ServiceRecord, odometer: f64) -> Option<ServiceStatus> {
    let interval = record.interval_value.magnitude().filter(|n| n.is_finite() && *n > 0.0)?;

    let Some(last) = record.evidence() else {
        return Some(ServiceStatus {
            next_target: NextTarget::Odometer(odometer + interval),
            remaining: interval,
            classification: Classification::Pending,
            display_value: format!("+{}", format_number(interval)),
        });
    };

    let last_km = last.odometer.unwrap_or(0.0);
    if !last_km.is_finite() {
        return None;
    }
    let next = last_km + interval;
    let remaining = next - odometer;
    let display_value = if remaining > 0.0 {
        format!("+{}", format_number(remaining))
    } else {
        format_number(remaining)
    };
    Some(ServiceStatus {
        next_target: NextTarget::Odometer(next),
        remaining,
        classification: classify(remaining, URGENT_KM),
        display_value,
    })
}

fn date_status(record: &ServiceRecord, today: NaiveDate) -> Option<ServiceStatus> {
    // fecha objetivo fija: no depende de la última realización
    if let IntervalValue::Date(due) = record.interval_value {
        return Some(days_status(due, today));
    }

    let magnitude = record.interval_value.magnitude().filter(|n| n.is_finite())?;
    let units = magnitude.trunc();
    if units < 1.0 || units > u32::MAX as f64 {
        return None;
    }
    let units = units as u32;

    let Some(last) = record.evidence() else {
        return Some(ServiceStatus {
            next_target: NextTarget::Date(add_interval(today, record.interval_type, units)?),
            remaining: magnitude,
            classification: Classification::Pending,
            display_value: format!("+{}d", format_number(magnitude)),
        });
    };

    let next = add_interval(last.date?, record.interval_type, units)?;
    Some(days_status(next, today))
}

fn days_status(next: NaiveDate, today: NaiveDate) -> ServiceStatus {
    let remaining = (next - today).num_days() as f64;
    let display_value = if remaining > 0.0 {
        format!("+{}d", format_number(remaining))
    } else {
        format!("{}d", format_number(remaining))
    };
    ServiceStatus {
        next_target: NextTarget::Date(next),
        remaining,
        classification: classify(remaining, URGENT_DAYS),
        display_value,
    }
}
