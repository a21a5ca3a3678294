//! Custom error types for the application.
//!
//! This module defines the error enums used across the station. Using the
//! `thiserror` crate, each layer gets its own error type and the top-level
//! [`QcError`] consolidates them for the command-line front end.
//!
//! ## Error Hierarchy
//!
//! - **[`StoreError`]**: failures of the SQLite store, either driver errors from `rusqlite`
//!   or domain conflicts such as an unknown order or inverted bounds.
//! - **[`LinkError`]**: low-level instrument link failures (open, write, read, decode).
//!   These carry no capture context and are wrapped by the session.
//! - **[`CaptureError`]**: the capture pipeline taxonomy. Communication, value format,
//!   range violations and persistence failures. None of these is fatal; the session
//!   returns to its capture-ready state after reporting one.
//! - **[`AuthError`]**: credential and role checks.
//! - **[`QcError`]**: the application-wide error, created from all of the above with `?`.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, QcError>;

/// Errors raised by the SQLite store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("No order for component '{component}' with part number '{part_number}'")]
    UnknownOrder {
        component: String,
        part_number: String,
    },

    #[error("Order {0} does not exist")]
    UnknownOrderId(i64),

    #[error("Order {order_id} has no parameter named '{parameter}'")]
    UnknownParameter { order_id: i64, parameter: String },

    #[error("Order already exists for component '{component}' with part number '{part_number}'")]
    DuplicateOrder {
        component: String,
        part_number: String,
    },

    #[error("Order {order_id} already has a parameter named '{parameter}'")]
    DuplicateParameter { order_id: i64, parameter: String },

    #[error("Order {0} already has measurements and can no longer be changed")]
    OrderLocked(i64),

    #[error("Low bound {low} is above high bound {high}")]
    InvertedBounds { low: f64, high: f64 },

    #[error("User '{0}' does not exist")]
    UnknownUser(String),

    #[error("Username '{0}' is already taken")]
    DuplicateUser(String),

    #[error("Invalid input: {0}")]
    Invalid(String),
}

/// Failure of a single instrument link operation.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("failed to open port: {0}")]
    Open(String),

    #[error("failed to write command: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to read response: {0}")]
    Read(#[source] std::io::Error),

    #[error("response is not valid text: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    SerialFeatureDisabled,

    #[error("instrument task failed: {0}")]
    Task(String),
}

/// Errors of the capture pipeline (read, validate, stage, commit).
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error(
        "Communication error on {port} @ {baud} baud sending '{command}' \
         (part number {part_number}, parameter {parameter}): {source}"
    )]
    Communication {
        port: String,
        baud: u32,
        command: String,
        part_number: String,
        parameter: String,
        #[source]
        source: LinkError,
    },

    #[error(
        "Could not convert measured value '{raw}' for {parameter} (part number {part_number}) \
         to a number. Entry not added."
    )]
    ValueFormat {
        part_number: String,
        parameter: String,
        raw: String,
    },

    #[error(
        "Measured value {value} for {parameter} (part number {part_number}) is below minimum \
         allowed {low}. Entry not added."
    )]
    BelowRange {
        part_number: String,
        parameter: String,
        value: f64,
        low: f64,
    },

    #[error(
        "Measured value {value} for {parameter} (part number {part_number}) is above maximum \
         allowed {high}. Entry not added."
    )]
    AboveRange {
        part_number: String,
        parameter: String,
        value: f64,
        high: f64,
    },

    #[error("Error submitting data: {0}")]
    Persistence(#[from] StoreError),

    #[error("Please select a component, a part number and at least one parameter")]
    IncompleteSelection,

    #[error("No new data to submit")]
    NothingStaged,
}

impl CaptureError {
    /// Whether the error is one of the range violations.
    pub fn is_range_violation(&self) -> bool {
        matches!(
            self,
            CaptureError::BelowRange { .. } | CaptureError::AboveRange { .. }
        )
    }
}

/// Authentication and authorisation failures.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Role '{role}' may not {action}")]
    Forbidden { role: String, action: String },

    #[error("Unknown role '{0}'")]
    UnknownRole(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Application-wide error.
#[derive(Error, Debug)]
pub enum QcError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "storage_csv")]
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

impl From<figment::Error> for QcError {
    fn from(value: figment::Error) -> Self {
        QcError::Config(Box::new(value))
    }
}

impl From<rusqlite::Error> for QcError {
    fn from(value: rusqlite::Error) -> Self {
        QcError::Store(StoreError::Sqlite(value))
    }
}
