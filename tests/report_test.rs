//! Reports over committed measurements.

use qc_station::model::{NewMeasurement, Validity};
use qc_station::report;
use qc_station::store::{MeasurementFilter, Store};
use tempfile::TempDir;

fn row(order_id: i64, operator: &str, date: &str, names: &str, values: &str) -> NewMeasurement {
    NewMeasurement {
        order_id,
        component_name: "Battery".into(),
        part_number: "PN-100".into(),
        parameter_names: names.into(),
        operator_name: operator.into(),
        date: date.into(),
        time: "09:30:00".into(),
        values: values.into(),
        validity: Validity::Valid,
    }
}

fn populated() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("login.db")).unwrap();
    let order = store
        .create_order(
            "Battery",
            "PN-100",
            &["Voltage".to_string(), "Resistance".to_string()],
        )
        .unwrap()
        .order;
    store
        .commit_measurements(&[
            row(order.id, "Alice", "2025-04-01", "Voltage,Resistance", "4.0,12"),
            row(order.id, "Bob", "2025-04-02", "Voltage", "4.1"),
            row(order.id, "Alice", "2025-04-05", "Voltage", "4.2"),
        ])
        .unwrap();
    (dir, store)
}

#[test]
fn expanded_report_has_one_row_per_parameter() {
    let (_dir, store) = populated();
    let rows = report::generate(&store, &MeasurementFilter::default(), true).unwrap();
    let flat: Vec<(&str, &str)> = rows
        .iter()
        .map(|r| (r.parameter.as_str(), r.value.as_str()))
        .collect();
    assert_eq!(
        flat,
        vec![
            ("Voltage", "4.0"),
            ("Resistance", "12"),
            ("Voltage", "4.1"),
            ("Voltage", "4.2"),
        ]
    );
    assert_eq!(rows.last().unwrap().index, 4);
}

#[test]
fn report_filters_by_date_operator_and_part() {
    let (_dir, store) = populated();

    let filter = MeasurementFilter {
        from: Some("2025-04-02".into()),
        to: Some("2025-04-05".into()),
        operator: Some("Alice".into()),
        part_number: Some("PN-100".into()),
    };
    let rows = report::generate(&store, &filter, false).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, "4.2");

    let none = MeasurementFilter {
        part_number: Some("PN-200".into()),
        ..Default::default()
    };
    assert!(report::generate(&store, &none, false).unwrap().is_empty());
}

#[test]
fn report_rejects_malformed_dates() {
    let (_dir, store) = populated();
    let filter = MeasurementFilter {
        from: Some("April 1".into()),
        ..Default::default()
    };
    assert!(report::generate(&store, &filter, false).is_err());
}

#[test]
fn filter_choices_list_committed_operators_and_parts() {
    let (_dir, store) = populated();
    let choices = report::filter_choices(&store).unwrap();
    assert_eq!(choices.operators, vec!["Alice", "Bob"]);
    assert_eq!(choices.part_numbers, vec!["PN-100"]);

    let empty = tempfile::tempdir().unwrap();
    let fresh = Store::open(empty.path().join("login.db")).unwrap();
    assert_eq!(
        report::filter_choices(&fresh).unwrap(),
        report::FilterChoices::default()
    );
}
