//! Domain types shared by the store, the capture pipeline and the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator used for multi-parameter names and values in one row.
pub const FIELD_SEPARATOR: &str = ",";

/// A production order: one component / part number pair to be measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned identifier
    pub id: i64,
    /// Component name, e.g. "Battery"
    pub component_name: String,
    /// Part number, e.g. "PN-100"
    pub part_number: String,
    /// Who placed the order, its dates and quantity
    #[serde(flatten)]
    pub details: OrderDetails,
}

/// Optional bookkeeping recorded with an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    /// Person or customer who placed the order
    pub ordered_by: Option<String>,
    /// Order date, `YYYY-MM-DD`
    pub order_date: Option<String>,
    /// Due date, `YYYY-MM-DD`, not before the order date
    pub due_date: Option<String>,
    /// Number of components ordered, at least 1
    pub quantity: Option<i64>,
}

impl OrderDetails {
    /// True when nothing beyond component and part number was recorded.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A measurable parameter of an order with its optional acceptable range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Row identifier
    pub id: i64,
    /// Owning order
    pub order_id: i64,
    /// Parameter name, e.g. "Voltage"
    pub name: String,
    /// Lowest acceptable value, if constrained
    pub low: Option<f64>,
    /// Highest acceptable value, if constrained
    pub high: Option<f64>,
}

impl ParameterSpec {
    /// The acceptable range of this parameter.
    pub fn bound(&self) -> Bound {
        Bound {
            low: self.low,
            high: self.high,
        }
    }
}

/// An order together with its parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    /// The order
    pub order: Order,
    /// Its parameters, in definition order
    pub parameters: Vec<ParameterSpec>,
}

/// An acceptable (low, high) range; either side may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    /// Inclusive lower limit
    pub low: Option<f64>,
    /// Inclusive upper limit
    pub high: Option<f64>,
}

impl Bound {
    /// No limit on either side.
    pub const UNBOUNDED: Bound = Bound {
        low: None,
        high: None,
    };

    /// A range limited on both sides.
    pub fn between(low: f64, high: f64) -> Self {
        Self {
            low: Some(low),
            high: Some(high),
        }
    }

    /// Whether neither side is limited.
    pub fn is_unbounded(&self) -> bool {
        self.low.is_none() && self.high.is_none()
    }
}

impl fmt::Display for Bound {
    /// Formats as `low - high`, leaving out missing sides; empty when unbounded.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.low, self.high) {
            (Some(low), Some(high)) => write!(f, "{low} - {high}"),
            (Some(low), None) => write!(f, "{low} - "),
            (None, Some(high)) => write!(f, " - {high}"),
            (None, None) => Ok(()),
        }
    }
}

/// Validity flag stored with each measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validity {
    /// Passed the validity policy
    Valid,
    /// Failed the validity policy
    Invalid,
}

impl Validity {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Validity::Valid => "Valid",
            Validity::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Validity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Valid" => Ok(Validity::Valid),
            "Invalid" => Ok(Validity::Invalid),
            other => Err(format!("unknown validity flag '{other}'")),
        }
    }
}

/// A measurement row about to be committed. The serial number is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMeasurement {
    /// Order being measured
    pub order_id: i64,
    /// Component name
    pub component_name: String,
    /// Part number
    pub part_number: String,
    /// Comma-joined parameter names
    pub parameter_names: String,
    /// Display name of the operator
    pub operator_name: String,
    /// Capture date, `YYYY-MM-DD`
    pub date: String,
    /// Capture time, `HH:MM:SS`
    pub time: String,
    /// Comma-joined values, parallel to `parameter_names`
    pub values: String,
    /// Validity flag
    pub validity: Validity,
}

/// A committed measurement row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Order being measured
    pub order_id: i64,
    /// Per-order component serial number
    pub serial_number: i64,
    /// Component name
    pub component_name: String,
    /// Part number
    pub part_number: String,
    /// Comma-joined parameter names
    pub parameter_names: String,
    /// Display name of the operator
    pub operator_name: String,
    /// Capture date
    pub date: String,
    /// Capture time
    pub time: String,
    /// Comma-joined values
    pub values: String,
    /// Validity flag as stored
    pub validity: String,
}

impl Measurement {
    /// Pairs each parameter name with its value.
    ///
    /// Missing values (ragged rows from hand edits) are reported as empty strings.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let values: Vec<&str> = self.values.split(FIELD_SEPARATOR).collect();
        self.parameter_names
            .split(FIELD_SEPARATOR)
            .enumerate()
            .map(|(i, name)| {
                let value = values.get(i).copied().unwrap_or_default();
                (name.trim().to_string(), value.trim().to_string())
            })
            .collect()
    }
}

/// Employee role, stored as `employee_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages user accounts
    Admin,
    /// Sets acceptable ranges
    Supervisor,
    /// Defines orders and parameters
    Manufacturer,
    /// Captures measurements
    Operator,
}

impl Role {
    /// All roles, in the order accounts are seeded.
    pub const ALL: [Role; 4] = [
        Role::Admin,
        Role::Supervisor,
        Role::Manufacturer,
        Role::Operator,
    ];

    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Supervisor => "supervisor",
            Role::Manufacturer => "manufacturer",
            Role::Operator => "operator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::error::AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "supervisor" => Ok(Role::Supervisor),
            "manufacturer" => Ok(Role::Manufacturer),
            "operator" => Ok(Role::Operator),
            other => Err(crate::error::AuthError::UnknownRole(other.to_string())),
        }
    }
}

/// A user account without its credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Row identifier
    pub id: i64,
    /// Display name, stamped on measurements as the operator identity
    pub name: String,
    /// Login name
    pub username: String,
    /// Role
    pub role: Role,
}
