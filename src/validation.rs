//! Small validators shared by configuration loading and the CLI.
use std::ops::RangeInclusive;

/// Baud rates accepted by the station's instruments.
pub const STANDARD_BAUD_RATES: [u32; 9] =
    [1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 250000];

/// Validates a serial baud rate.
///
/// Any non-zero rate is accepted when `strict` is false; otherwise the rate
/// must be one of [`STANDARD_BAUD_RATES`].
pub fn is_valid_baud_rate(baud: u32, strict: bool) -> Result<(), &'static str> {
    if baud == 0 {
        return Err("Baud rate must be greater than 0");
    }
    if strict && !STANDARD_BAUD_RATES.contains(&baud) {
        return Err("Baud rate is not a standard rate");
    }
    Ok(())
}

/// Validates if a given string is a valid file path.
///
/// # Arguments
///
/// * `path` - The string to validate.
///
/// # Returns
///
/// * `Ok(())` if the file path is valid.
/// * `Err(&'static str)` if the file path is invalid.
pub fn is_valid_path(path: &str) -> Result<(), &'static str> {
    if path.is_empty() {
        return Err("File path cannot be empty");
    }
    if path.contains('\0') {
        return Err("File path cannot contain null bytes");
    }
    Ok(())
}

/// Validates if a given value is within a specified numeric range.
pub fn is_in_range<T: PartialOrd>(value: T, range: RangeInclusive<T>) -> Result<(), &'static str> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err("Value is outside the specified range")
    }
}

/// Validates if a given string is not empty after trimming whitespace.
pub fn is_not_empty(value: &str) -> Result<(), &'static str> {
    if !value.trim().is_empty() {
        Ok(())
    } else {
        Err("Value cannot be empty")
    }
}

/// Validates a log level name as understood by `tracing`.
pub fn is_valid_log_level(level: &str) -> Result<(), &'static str> {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err("Log level must be one of: trace, debug, info, warn, error"),
    }
}

/// Validates a `YYYY-MM-DD` date as used by the measurement table.
pub fn is_valid_date(value: &str) -> Result<(), &'static str> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| "Date must be formatted as YYYY-MM-DD")
}

/// Validates that an optional (low, high) pair is ordered.
pub fn is_ordered_bound(low: Option<f64>, high: Option<f64>) -> Result<(), &'static str> {
    match (low, high) {
        (Some(l), Some(h)) if l > h => Err("Low bound must not exceed high bound"),
        (Some(l), _) if l.is_nan() => Err("Low bound must be a number"),
        (_, Some(h)) if h.is_nan() => Err("High bound must be a number"),
        _ => Ok(()),
    }
}
