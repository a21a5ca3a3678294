//! Numeric and range checks on a raw instrument response.

use crate::error::CaptureError;
use crate::model::Bound;

/// Parse `raw` and check it against `bound`. Both limits are inclusive.
///
/// ```
/// use qc_station::capture::validator::validate;
/// use qc_station::model::Bound;
///
/// assert_eq!(validate("4.5", "Voltage", "PN-100", Bound::between(3.0, 4.5)).unwrap(), 4.5);
/// assert!(validate("5.0", "Voltage", "PN-100", Bound::between(3.0, 4.5)).is_err());
/// ```
pub fn validate(
    raw: &str,
    parameter: &str,
    part_number: &str,
    bound: Bound,
) -> Result<f64, CaptureError> {
    let value: f64 = raw
        .trim()
        .parse()
        .ok()
        .filter(|v: &f64| !v.is_nan())
        .ok_or_else(|| CaptureError::ValueFormat {
            part_number: part_number.to_string(),
            parameter: parameter.to_string(),
            raw: raw.to_string(),
        })?;

    if let Some(low) = bound.low {
        if value < low {
            return Err(CaptureError::BelowRange {
                part_number: part_number.to_string(),
                parameter: parameter.to_string(),
                value,
                low,
            });
        }
    }
    if let Some(high) = bound.high {
        if value > high {
            return Err(CaptureError::AboveRange {
                part_number: part_number.to_string(),
                parameter: parameter.to_string(),
                value,
                high,
            });
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PART: &str = "PN-100";

    #[test]
    fn test_unbounded_accepts_any_number() {
        for raw in ["-1e9", "0", "4.0", " 12.5 ", "1e300"] {
            assert!(validate(raw, "Voltage", PART, Bound::UNBOUNDED).is_ok(), "{raw}");
        }
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let bound = Bound::between(3.0, 4.5);
        assert_eq!(validate("3.0", "Voltage", PART, bound).unwrap(), 3.0);
        assert_eq!(validate("4.5", "Voltage", PART, bound).unwrap(), 4.5);
    }

    #[test]
    fn test_below_and_above() {
        let bound = Bound::between(3.0, 4.5);
        let err = validate("2.9", "Voltage", PART, bound).unwrap_err();
        assert!(matches!(err, CaptureError::BelowRange { low, .. } if low == 3.0));

        let err = validate("5.0", "Voltage", PART, bound).unwrap_err();
        assert!(matches!(err, CaptureError::AboveRange { high, .. } if high == 4.5));
        assert_eq!(
            err.to_string(),
            "Measured value 5 for Voltage (part number PN-100) is above maximum allowed 4.5. \
             Entry not added."
        );
    }

    #[test]
    fn test_one_sided_bounds() {
        let low_only = Bound {
            low: Some(1.0),
            high: None,
        };
        assert!(validate("1000", "Voltage", PART, low_only).is_ok());
        assert!(validate("0.5", "Voltage", PART, low_only).is_err());

        let high_only = Bound {
            low: None,
            high: Some(1.0),
        };
        assert!(validate("-1000", "Voltage", PART, high_only).is_ok());
        assert!(validate("1.5", "Voltage", PART, high_only).is_err());
    }

    #[test]
    fn test_non_numeric_is_a_format_error() {
        for raw in ["abc", "", "4.0V", "NaN"] {
            let err = validate(raw, "Resistance", PART, Bound::UNBOUNDED).unwrap_err();
            assert!(matches!(err, CaptureError::ValueFormat { .. }), "{raw}");
        }
    }
}
