use qc_station::validation::*;

#[test]
fn test_is_valid_baud_rate() {
    assert!(is_valid_baud_rate(9600, true).is_ok());
    assert!(is_valid_baud_rate(14400, false).is_ok());
    assert!(is_valid_baud_rate(14400, true).is_err());
    assert!(is_valid_baud_rate(0, false).is_err());
}

#[test]
fn test_is_valid_path() {
    assert!(is_valid_path("/some/path").is_ok());
    assert!(is_valid_path("").is_err());
    assert!(is_valid_path("path/with\0/null.txt").is_err());
}

#[test]
fn test_is_in_range() {
    assert!(is_in_range(5, 1..=10).is_ok());
    assert!(is_in_range(11, 1..=10).is_err());
}

#[test]
fn test_is_not_empty() {
    assert!(is_not_empty("hello").is_ok());
    assert!(is_not_empty("").is_err());
    assert!(is_not_empty("   ").is_err());
}

#[test]
fn test_is_valid_log_level() {
    assert!(is_valid_log_level("debug").is_ok());
    assert!(is_valid_log_level("verbose").is_err());
}

#[test]
fn test_is_valid_date() {
    assert!(is_valid_date("2025-04-03").is_ok());
    assert!(is_valid_date("2025-02-30").is_err());
    assert!(is_valid_date("03/04/2025").is_err());
}

#[test]
fn test_is_ordered_bound() {
    assert!(is_ordered_bound(Some(3.0), Some(4.5)).is_ok());
    assert!(is_ordered_bound(Some(4.5), Some(4.5)).is_ok());
    assert!(is_ordered_bound(None, Some(1.0)).is_ok());
    assert!(is_ordered_bound(None, None).is_ok());
    assert!(is_ordered_bound(Some(5.0), Some(1.0)).is_err());
    assert!(is_ordered_bound(Some(f64::NAN), None).is_err());
}
