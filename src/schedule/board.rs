//! Tablero de vencimientos: agrupa por categoría los servicios cuyo margen
//! restante ya entró en la ventana de aviso.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::excel::names::{first_match, Pattern, Rule};
use crate::models::{format_number, IntervalType, IntervalValue, NextTarget, ServiceRecord};
use crate::schedule::compute_status;

/// Aviso por defecto para servicios por kilómetros.
pub const DEFAULT_REMINDER_KM: f64 = 15000.0;
/// Aviso por defecto para servicios por fecha (días).
pub const DEFAULT_REMINDER_DAYS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Stk,
    Tachograph,
    Calibration,
    Geometry,
    LCertificate,
    Dpf,
    EngineOil,
    DifferentialOil,
    TransmissionOil,
    AnnualTractor,
    AnnualTrailer,
    BrakeCheck,
    Other,
    Personal,
}

// "ek" sólo como palabra: "(ek)" o "ek" suelto
fn is_emission(n: &str) -> bool {
    n.contains("emisná kontrola") || n.split(|c: char| !c.is_alphanumeric()).any(|w| w == "ek")
}

fn is_annual_tractor(n: &str) -> bool {
    n.contains("roč") && (n.contains("taha") || n.contains("ťaha"))
}

fn is_annual_trailer(n: &str) -> bool {
    n.contains("roč") && (n.contains("náv") || n.contains("naves"))
}

fn is_brake_check(n: &str) -> bool {
    let kontrola_br = n.contains("kontrola")
        && ["brz", "brź", "brd", "brŕ"].iter().any(|p| n.contains(p));
    kontrola_br || ["brzd", "brźd", "bŕzd"].iter().any(|p| n.contains(p))
}

const CATEGORY_RULES: &[Rule<Category>] = &[
    Rule { pattern: Pattern::Any(&["stk", "technická kontrola"]), result: Category::Stk },
    Rule { pattern: Pattern::Custom(is_emission), result: Category::Stk },
    Rule { pattern: Pattern::Any(&["tach"]), result: Category::Tachograph },
    Rule { pattern: Pattern::Any(&["ciach"]), result: Category::Calibration },
    Rule { pattern: Pattern::Any(&["geometri"]), result: Category::Geometry },
    Rule { pattern: Pattern::Any(&["l-cert"]), result: Category::LCertificate },
    Rule { pattern: Pattern::Any(&["dpf"]), result: Category::Dpf },
    Rule { pattern: Pattern::All(&["motor", "olej"]), result: Category::EngineOil },
    Rule { pattern: Pattern::All(&["difer", "olej"]), result: Category::DifferentialOil },
    Rule { pattern: Pattern::All(&["prevod", "olej"]), result: Category::TransmissionOil },
    Rule { pattern: Pattern::Custom(is_annual_tractor), result: Category::AnnualTractor },
    Rule { pattern: Pattern::Custom(is_annual_trailer), result: Category::AnnualTrailer },
    Rule { pattern: Pattern::Custom(is_brake_check), result: Category::BrakeCheck },
];

/// Categoría del tablero según el nombre del servicio.
pub fn categorize(name: &str) -> Category {
    first_match(CATEGORY_RULES, name).unwrap_or(Category::Other)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    fn urgency(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    /// Alta si ya venció, media dentro de la mitad del aviso, baja el resto.
    pub fn from_remaining(remaining: f64, reminder: f64) -> Priority {
        if remaining <= 0.0 {
            Priority::High
        } else if remaining <= (reminder / 2.0).floor().max(1.0) {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

/// Lo que el tablero necesita saber de un vehículo.
#[derive(Debug, Clone, Default)]
pub struct VehicleSnapshot {
    pub plate: String,
    pub odometer: Option<f64>,
    /// Colección de origen del vehículo (`trucks`, `trailers`, `cars`, `other`...).
    pub collection_source: Option<String>,
    pub services: Vec<ServiceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardEntry {
    pub id: String,
    pub vehicle: String,
    pub name: String,
    pub category: Category,
    pub target: NextTarget,
    pub remaining: f64,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl BoardEntry {
    fn target_date(&self) -> Option<NaiveDate> {
        match self.target {
            NextTarget::Date(d) => Some(d),
            NextTarget::Odometer(_) => None,
        }
    }
}

pub type Board = BTreeMap<Category, Vec<BoardEntry>>;

fn board_entry(snapshot: &VehicleSnapshot, record: &ServiceRecord, today: NaiveDate) -> Option<BoardEntry> {
    let fixed_date = matches!(record.interval_value, IntervalValue::Date(_));
    if record.evidence().is_none() && !fixed_date {
        return None;
    }
    let status = compute_status(record, snapshot.odometer, today)?;

    let reminder = record.reminder_threshold.unwrap_or(match record.interval_type {
        IntervalType::Distance => DEFAULT_REMINDER_KM,
        _ => DEFAULT_REMINDER_DAYS,
    });
    if status.remaining > reminder {
        return None;
    }

    let mut category = categorize(&record.name);
    let personal = matches!(snapshot.collection_source.as_deref(), Some("cars") | Some("other"));
    if personal && category != Category::Stk && category != Category::LCertificate {
        category = Category::Personal;
    }

    let note = match status.next_target {
        NextTarget::Odometer(_) => Some(format!("Zostáva {} km", format_number(status.remaining))),
        NextTarget::Date(_) => None,
    };

    Some(BoardEntry {
        id: format!("{}_{}", snapshot.plate, record.name),
        vehicle: snapshot.plate.clone(),
        name: record.name.clone(),
        category,
        target: status.next_target,
        remaining: status.remaining,
        priority: Priority::from_remaining(status.remaining, reminder),
        note,
    })
}

#[derive(Default)]
struct StkGroup {
    stk: Option<BoardEntry>,
    ek: Option<BoardEntry>,
    rest: Vec<BoardEntry>,
}

fn merge_pair(plate: &str, stk: BoardEntry, ek: BoardEntry) -> Vec<BoardEntry> {
    let (date, source, priority) = match (stk.target_date(), ek.target_date()) {
        (Some(a), Some(b)) => {
            let priority = if stk.priority.urgency() > ek.priority.urgency() {
                stk.priority
            } else {
                ek.priority
            };
            if a < b { (a, &stk, priority) } else { (b, &ek, priority) }
        }
        (Some(a), None) => (a, &stk, stk.priority),
        (None, Some(b)) => (b, &ek, stk.priority),
        (None, None) => return vec![stk, ek],
    };
    let merged = BoardEntry {
        id: format!("{}_STK_EK", plate),
        vehicle: plate.to_string(),
        name: "STK + EK".to_string(),
        category: Category::Stk,
        target: NextTarget::Date(date),
        remaining: source.remaining,
        priority,
        note: Some("STK + EK".to_string()),
    };
    vec![merged]
}

/// Une por vehículo la primera entrada STK con la primera EK. El resto de
/// entradas STK/EK se mantiene tal cual.
pub fn merge_stk_ek(entries: Vec<BoardEntry>) -> Vec<BoardEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: BTreeMap<String, StkGroup> = BTreeMap::new();

    for entry in entries {
        let lower = entry.name.to_lowercase();
        let is_stk = lower.contains("stk") || lower.contains("technická");
        let is_ek = is_emission(&lower);
        if !groups.contains_key(&entry.vehicle) {
            order.push(entry.vehicle.clone());
        }
        let group = groups.entry(entry.vehicle.clone()).or_default();
        if is_stk && group.stk.is_none() {
            group.stk = Some(entry);
        } else if is_ek && group.ek.is_none() {
            group.ek = Some(entry);
        } else {
            group.rest.push(entry);
        }
    }

    let mut out = Vec::new();
    for plate in order {
        let Some(group) = groups.remove(&plate) else { continue };
        match (group.stk, group.ek) {
            (Some(stk), Some(ek)) => out.extend(merge_pair(&plate, stk, ek)),
            (Some(one), None) | (None, Some(one)) => out.push(one),
            (None, None) => {}
        }
        out.extend(group.rest);
    }
    out
}

/// Construye el tablero completo para la fecha `today`.
pub fn build_board(vehicles: &[VehicleSnapshot], today: NaiveDate) -> Board {
    let mut board = Board::new();
    for snapshot in vehicles {
        for record in &snapshot.services {
            if let Some(entry) = board_entry(snapshot, record, today) {
                board.entry(entry.category).or_default().push(entry);
            }
        }
    }
    if let Some(stk) = board.remove(&Category::Stk) {
        board.insert(Category::Stk, merge_stk_ek(stk));
    }
    board
}
