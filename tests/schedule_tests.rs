use chrono::NaiveDate;
use flotila::models::{Classification, IntervalType, IntervalValue, LastPerformed, NextTarget, ServiceRecord};
use flotila::schedule::compute_status;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn km_record(interval: f64, last_km: Option<f64>) -> ServiceRecord {
    ServiceRecord {
        name: "Výmena oleja v Motore".to_string(),
        interval_type: IntervalType::Distance,
        interval_value: IntervalValue::Magnitude(interval),
        reminder_threshold: None,
        last_performed: last_km.map(|km| LastPerformed { date: None, odometer: Some(km) }),
    }
}

fn dated_record(interval_type: IntervalType, interval: f64, last: Option<NaiveDate>) -> ServiceRecord {
    ServiceRecord {
        name: "Technická kontrola (STK)".to_string(),
        interval_type,
        interval_value: IntervalValue::Magnitude(interval),
        reminder_threshold: None,
        last_performed: last.map(|d| LastPerformed { date: Some(d), odometer: None }),
    }
}

#[test]
fn distance_scenario_one_km_left_is_urgent() {
    let rec = km_record(15000.0, Some(100000.0));
    let st = compute_status(&rec, Some(114999.0), date(2024, 1, 1)).unwrap();
    assert_eq!(st.next_target, NextTarget::Odometer(115000.0));
    assert_eq!(st.remaining, 1.0);
    assert_eq!(st.classification, Classification::Urgent);
    assert_eq!(st.display_value, "+1");
}

#[test]
fn distance_target_ignores_current_odometer() {
    let rec = km_record(30000.0, Some(250000.0));
    for km in [0.0, 250000.0, 400000.0] {
        let st = compute_status(&rec, Some(km), date(2024, 1, 1)).unwrap();
        assert_eq!(st.next_target, NextTarget::Odometer(280000.0));
    }
}

#[test]
fn distance_classification_boundaries() {
    let rec = km_record(10000.0, Some(0.0));
    let today = date(2024, 1, 1);
    let cases = [
        (10000.0, 0.0, Classification::Overdue, "0"),
        (9999.0, 1.0, Classification::Urgent, "+1"),
        (5000.0, 5000.0, Classification::Urgent, "+5000"),
        (4999.0, 5001.0, Classification::Pending, "+5001"),
        (12500.0, -2500.0, Classification::Overdue, "-2500"),
    ];
    for (odometer, remaining, class, display) in cases {
        let st = compute_status(&rec, Some(odometer), today).unwrap();
        assert_eq!(st.remaining, remaining);
        assert_eq!(st.classification, class, "remaining {}", remaining);
        assert_eq!(st.display_value, display);
    }
}

#[test]
fn missing_last_odometer_counts_from_zero() {
    let mut rec = km_record(15000.0, None);
    rec.last_performed = Some(LastPerformed { date: Some(date(2024, 1, 1)), odometer: None });
    let st = compute_status(&rec, Some(14000.0), date(2024, 2, 1)).unwrap();
    assert_eq!(st.next_target, NextTarget::Odometer(15000.0));
    assert_eq!(st.remaining, 1000.0);
}

#[test]
fn month_interval_clamps_to_end_of_february() {
    let rec = dated_record(IntervalType::Month, 1.0, Some(date(2024, 1, 31)));
    let st = compute_status(&rec, None, date(2024, 2, 1)).unwrap();
    assert_eq!(st.next_target, NextTarget::Date(date(2024, 2, 29)));
    assert_eq!(st.remaining, 28.0);
    assert_eq!(st.classification, Classification::Urgent);
    assert_eq!(st.display_value, "+28d");
}

#[test]
fn year_interval_and_day_classification() {
    let rec = dated_record(IntervalType::Year, 1.0, Some(date(2023, 6, 15)));
    let today = date(2024, 5, 1);
    let st = compute_status(&rec, None, today).unwrap();
    assert_eq!(st.next_target, NextTarget::Date(date(2024, 6, 15)));
    assert_eq!(st.remaining, 45.0);
    assert_eq!(st.classification, Classification::Pending);

    let st = compute_status(&rec, None, date(2024, 6, 15)).unwrap();
    assert_eq!(st.classification, Classification::Overdue);
    assert_eq!(st.display_value, "0d");

    let st = compute_status(&rec, None, date(2024, 5, 16)).unwrap();
    assert_eq!(st.remaining, 30.0);
    assert_eq!(st.classification, Classification::Urgent);

    let st = compute_status(&rec, None, date(2024, 7, 1)).unwrap();
    assert_eq!(st.display_value, "-16d");
}

#[test]
fn legacy_date_interval_adds_days() {
    let rec = dated_record(IntervalType::AbsoluteDate, 366.0, Some(date(2023, 6, 15)));
    let st = compute_status(&rec, None, date(2024, 6, 1)).unwrap();
    assert_eq!(st.next_target, NextTarget::Date(date(2024, 6, 15)));
    assert_eq!(st.remaining, 14.0);
}

#[test]
fn fixed_target_date_ignores_last_performed() {
    let rec = ServiceRecord {
        name: "L-Certifikát".to_string(),
        interval_type: IntervalType::AbsoluteDate,
        interval_value: IntervalValue::Date(date(2027, 10, 17)),
        reminder_threshold: None,
        last_performed: Some(LastPerformed { date: Some(date(2020, 1, 1)), odometer: None }),
    };
    let st = compute_status(&rec, None, date(2027, 10, 7)).unwrap();
    assert_eq!(st.next_target, NextTarget::Date(date(2027, 10, 17)));
    assert_eq!(st.remaining, 10.0);
    assert_eq!(st.display_value, "+10d");
}

#[test]
fn no_evidence_falls_back_to_full_interval() {
    let st = compute_status(&km_record(15000.0, None), Some(80000.0), date(2024, 1, 1)).unwrap();
    assert_eq!(st.next_target, NextTarget::Odometer(95000.0));
    assert_eq!(st.remaining, 15000.0);
    assert_eq!(st.classification, Classification::Pending);
    assert_eq!(st.display_value, "+15000");

    let rec = dated_record(IntervalType::Day, 24.0, None);
    let st = compute_status(&rec, None, date(2024, 1, 1)).unwrap();
    assert_eq!(st.next_target, NextTarget::Date(date(2024, 1, 25)));
    assert_eq!(st.remaining, 24.0);
    assert_eq!(st.classification, Classification::Pending);
    assert_eq!(st.display_value, "+24d");

    // registro vacío cuenta como sin evidencia
    let mut rec = km_record(15000.0, None);
    rec.last_performed = Some(LastPerformed::default());
    let st = compute_status(&rec, Some(1000.0), date(2024, 1, 1)).unwrap();
    assert_eq!(st.remaining, 15000.0);
}

#[test]
fn malformed_input_gives_no_status() {
    let today = date(2024, 1, 1);
    assert!(compute_status(&km_record(15000.0, Some(1000.0)), Some(-5.0), today).is_none());
    assert!(compute_status(&km_record(15000.0, Some(1000.0)), Some(f64::NAN), today).is_none());
    assert!(compute_status(&km_record(0.0, Some(1000.0)), Some(2000.0), today).is_none());
    assert!(compute_status(&dated_record(IntervalType::Month, 0.5, Some(today)), None, today).is_none());
    assert!(compute_status(&dated_record(IntervalType::Day, f64::INFINITY, Some(today)), None, today).is_none());

    // fecha esperada pero sólo hay odómetro
    let mut rec = dated_record(IntervalType::Year, 1.0, None);
    rec.last_performed = Some(LastPerformed { date: None, odometer: Some(1000.0) });
    assert!(compute_status(&rec, None, today).is_none());
}
