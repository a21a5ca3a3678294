//! Policies that flag a committed row `Valid` or `Invalid`.

use crate::config::ValidityConfig;
use crate::model::Validity;

/// Decides the validity flag stored with a row.
pub trait ValidityPolicy {
    /// Flag for a row holding `values`, one per parameter.
    fn assess(&self, values: &[&str]) -> Validity;
}

/// `Valid` when every value is a number above the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    threshold: f64,
}

impl ThresholdPolicy {
    /// Policy with the given threshold.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The threshold in use.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::new(ValidityConfig::default().threshold)
    }
}

impl From<&ValidityConfig> for ThresholdPolicy {
    fn from(config: &ValidityConfig) -> Self {
        Self::new(config.threshold)
    }
}

impl ValidityPolicy for ThresholdPolicy {
    fn assess(&self, values: &[&str]) -> Validity {
        let all_above = !values.is_empty()
            && values.iter().all(|v| {
                v.trim()
                    .parse::<f64>()
                    .map(|v| v > self.threshold)
                    .unwrap_or(false)
            });
        if all_above {
            Validity::Valid
        } else {
            Validity::Invalid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_policy() {
        let policy = ThresholdPolicy::default();
        assert_eq!(policy.threshold(), 0.5);
        assert_eq!(policy.assess(&["4.0", "12"]), Validity::Valid);
        assert_eq!(policy.assess(&["4.0", "0.5"]), Validity::Invalid);
        assert_eq!(policy.assess(&["4.0", "x"]), Validity::Invalid);
        assert_eq!(policy.assess(&[]), Validity::Invalid);
    }

    #[test]
    fn test_threshold_from_config() {
        let policy = ThresholdPolicy::from(&ValidityConfig { threshold: 5.0 });
        assert_eq!(policy.assess(&["4.0"]), Validity::Invalid);
    }
}
