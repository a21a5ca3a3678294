//! Serial numbering and transactional commit across sessions.

use qc_station::capture::{AutoConfirm, CaptureSession, CommitOutcome, Selection};
use qc_station::error::CaptureError;
use qc_station::instrument::mock::ScriptedConnector;
use qc_station::instrument::LinkSettings;
use qc_station::model::{NewMeasurement, Validity};
use qc_station::store::Store;
use tempfile::TempDir;

fn station() -> (TempDir, Store, i64) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("login.db")).unwrap();
    let order = store
        .create_order("Battery", "PN-100", &["Voltage".to_string()])
        .unwrap()
        .order;
    (dir, store, order.id)
}

fn session(store: &Store, operator: &str) -> CaptureSession {
    let mut session = CaptureSession::new(store.clone(), operator);
    session
        .select(Selection::new("Battery", "PN-100", &["Voltage"]))
        .unwrap();
    session
}

fn stage(session: &mut CaptureSession, values: &[&str]) {
    for value in values {
        let link = ScriptedConnector::new(LinkSettings::new("COM3", 9600)).respond(*value);
        session.capture(&link).unwrap();
    }
}

fn committed_serials(outcome: CommitOutcome) -> Vec<i64> {
    match outcome {
        CommitOutcome::Committed(rows) => rows.iter().map(|r| r.serial_number).collect(),
        CommitOutcome::Declined => panic!("commit was declined"),
    }
}

fn seed_history(store: &Store, order_id: i64, count: usize) {
    let rows: Vec<NewMeasurement> = (0..count)
        .map(|_| NewMeasurement {
            order_id,
            component_name: "Battery".into(),
            part_number: "PN-100".into(),
            parameter_names: "Voltage".into(),
            operator_name: "Night Shift".into(),
            date: "2025-04-01".into(),
            time: "23:00:00".into(),
            values: "4.0".into(),
            validity: Validity::Valid,
        })
        .collect();
    store.commit_measurements(&rows).unwrap();
}

#[test]
fn next_serials_follow_the_persisted_maximum() {
    let (_dir, store, order_id) = station();
    seed_history(&store, order_id, 7);

    let mut session = session(&store, "Operator User");
    stage(&mut session, &["4.0", "4.1"]);
    let staged: Vec<i64> = session
        .staging()
        .oldest_first()
        .map(|r| r.serial_number)
        .collect();
    assert_eq!(staged, vec![8, 9]);

    let serials = committed_serials(session.commit(&mut AutoConfirm(true)).unwrap());
    assert_eq!(serials, vec![8, 9]);
    assert_eq!(store.max_serial(order_id).unwrap(), 9);
}

#[test]
fn concurrent_sessions_never_share_a_serial() {
    let (_dir, store, order_id) = station();
    let mut first = session(&store, "Alice");
    let mut second = session(&store, "Bob");

    // Both sessions prime their caches from the same empty history
    stage(&mut first, &["4.0", "4.1"]);
    stage(&mut second, &["4.2"]);

    let a = committed_serials(first.commit(&mut AutoConfirm(true)).unwrap());
    let b = committed_serials(second.commit(&mut AutoConfirm(true)).unwrap());
    assert_eq!(a, vec![1, 2]);
    assert_eq!(b, vec![3]);

    // The second session's cache caught up with what the store assigned
    stage(&mut second, &["4.3"]);
    assert_eq!(second.staging().iter().next().unwrap().serial_number, 4);

    let previous = store.previous_entries("PN-100", "Battery", "Voltage").unwrap();
    let serials: Vec<i64> = previous.iter().map(|m| m.serial_number).collect();
    assert_eq!(serials, vec![3, 2, 1]);
    assert_eq!(store.max_serial(order_id).unwrap(), 3);
}

#[test]
fn declined_confirmation_writes_nothing() {
    let (_dir, store, order_id) = station();
    let mut session = session(&store, "Operator User");
    stage(&mut session, &["4.0"]);

    let outcome = session.commit(&mut AutoConfirm(false)).unwrap();
    assert_eq!(outcome, CommitOutcome::Declined);
    assert_eq!(session.staging().len(), 1);
    assert_eq!(store.max_serial(order_id).unwrap(), 0);
}

#[test]
fn failed_commit_keeps_staging_and_writes_no_rows() {
    let (_dir, store, order_id) = station();
    let mut session = session(&store, "Operator User");
    stage(&mut session, &["4.0", "4.1"]);

    store
        .connect()
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_second BEFORE INSERT ON measuredValues
             WHEN NEW.value = '4.1' BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();

    let err = session.commit(&mut AutoConfirm(true)).unwrap_err();
    assert!(matches!(err, CaptureError::Persistence(_)));
    assert!(err.to_string().starts_with("Error submitting data"));
    assert_eq!(session.staging().len(), 2);
    assert!(store
        .previous_entries("PN-100", "Battery", "Voltage")
        .unwrap()
        .is_empty());

    // Retry once the fault is gone
    store
        .connect()
        .unwrap()
        .execute_batch("DROP TRIGGER reject_second;")
        .unwrap();
    let serials = committed_serials(session.commit(&mut AutoConfirm(true)).unwrap());
    assert_eq!(serials, vec![1, 2]);
    assert!(session.staging().is_empty());
    assert_eq!(store.max_serial(order_id).unwrap(), 2);
}

#[test]
fn empty_staging_cannot_be_committed() {
    let (_dir, store, _) = station();
    let mut session = session(&store, "Operator User");
    assert!(matches!(
        session.commit(&mut AutoConfirm(true)),
        Err(CaptureError::NothingStaged)
    ));
}
