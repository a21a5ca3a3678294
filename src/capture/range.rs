//! Acceptable-range lookup for a captured parameter.

use crate::model::Bound;
use crate::store::Store;
use tracing::{debug, warn};

/// Resolves the acceptable range of a parameter.
pub trait RangeResolver {
    /// The bound for (component, part number, parameter).
    ///
    /// Returns [`Bound::UNBOUNDED`] when no range applies.
    fn resolve(&self, component: &str, part_number: &str, parameter: &str) -> Bound;
}

/// Reads ranges from the station database.
///
/// A missing order or parameter means no range check. So does a failed
/// lookup: the failure is logged and capture proceeds unchecked.
#[derive(Debug, Clone)]
pub struct StoreRangeResolver {
    store: Store,
}

impl StoreRangeResolver {
    /// Resolve against `store`.
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl RangeResolver for StoreRangeResolver {
    fn resolve(&self, component: &str, part_number: &str, parameter: &str) -> Bound {
        let lookup = self
            .store
            .find_order(component, part_number)
            .and_then(|order| match order {
                Some(order) => self.store.parameter(order.id, parameter),
                None => Ok(None),
            });

        match lookup {
            Ok(Some(spec)) => spec.bound(),
            Ok(None) => {
                debug!(component, part_number, parameter, "no range defined");
                Bound::UNBOUNDED
            }
            Err(e) => {
                warn!(
                    component,
                    part_number,
                    parameter,
                    error = %e,
                    "range lookup failed, capturing without range check"
                );
                Bound::UNBOUNDED
            }
        }
    }
}

/// Fixed ranges keyed by parameter name, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct FixedRanges {
    ranges: Vec<(String, Bound)>,
}

impl FixedRanges {
    /// No ranges at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a range for `parameter`.
    pub fn with(mut self, parameter: impl Into<String>, bound: Bound) -> Self {
        self.ranges.push((parameter.into(), bound));
        self
    }
}

impl RangeResolver for FixedRanges {
    fn resolve(&self, _component: &str, _part_number: &str, parameter: &str) -> Bound {
        self.ranges
            .iter()
            .find(|(name, _)| name == parameter)
            .map(|(_, bound)| *bound)
            .unwrap_or(Bound::UNBOUNDED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::temp_store;
    use tracing_test::traced_test;

    #[test]
    fn test_store_resolver_reads_configured_range() {
        let (_dir, store) = temp_store();
        store
            .create_order("Battery", "PN-100", &["Voltage".to_string()])
            .unwrap();
        store
            .set_bounds("Battery", "PN-100", "Voltage", Some(3.0), Some(4.5))
            .unwrap();

        let resolver = StoreRangeResolver::new(store);
        assert_eq!(
            resolver.resolve("Battery", "PN-100", "Voltage"),
            Bound::between(3.0, 4.5)
        );
    }

    #[test]
    fn test_store_resolver_is_unbounded_on_miss() {
        let (_dir, store) = temp_store();
        store
            .create_order("Battery", "PN-100", &["Voltage".to_string()])
            .unwrap();

        let resolver = StoreRangeResolver::new(store);
        assert!(resolver
            .resolve("Battery", "PN-100", "Voltage")
            .is_unbounded());
        assert!(resolver
            .resolve("Battery", "PN-100", "Resistance")
            .is_unbounded());
        assert!(resolver.resolve("Cell", "PN-1", "Voltage").is_unbounded());
    }

    #[test]
    #[traced_test]
    fn test_store_resolver_is_unbounded_on_storage_error() {
        let (_dir, store) = temp_store();
        store.create_order("Battery", "PN-100", &[]).unwrap();
        store
            .connect()
            .unwrap()
            .execute_batch("DROP TABLE parametersDetails;")
            .unwrap();

        let resolver = StoreRangeResolver::new(store);
        assert!(resolver
            .resolve("Battery", "PN-100", "Voltage")
            .is_unbounded());
        assert!(logs_contain("range lookup failed"));
    }

    #[test]
    fn test_fixed_ranges() {
        let ranges = FixedRanges::new().with("Voltage", Bound::between(1.0, 2.0));
        assert_eq!(ranges.resolve("", "", "Voltage"), Bound::between(1.0, 2.0));
        assert!(ranges.resolve("", "", "Resistance").is_unbounded());
    }
}
