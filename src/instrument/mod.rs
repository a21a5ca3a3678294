//! Instrument link abstractions and implementations.
//!
//! The capture session talks to a measuring instrument through two traits:
//!
//! - [`Connector`] knows the link settings and opens a fresh [`Instrument`] for one
//!   capture action. The session drops the instrument (closing the port) when the
//!   action completes.
//! - [`Instrument`] sends one ASCII query and returns the raw textual response.
//!
//! Implementations:
//!
//! - [`serial::SerialConnector`]: RS-232/USB-serial instruments via the `serialport` crate.
//! - [`mock::ScriptedConnector`]: replays canned responses, used by tests.
//! - [`mock::SimulatedConnector`]: produces random readings within a range, for
//!   exercising the station without hardware.
//! - [`async_link::AsyncInstrument`]: runs any instrument on Tokio's blocking pool.

use crate::error::LinkError;
use std::fmt;
use std::time::Duration;

pub mod async_link;
pub mod mock;
pub mod serial;

/// Line terminator appended to every outbound command.
pub const COMMAND_TERMINATOR: &str = "\r\n";

/// Everything needed to reach an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSettings {
    /// Port name (e.g. "COM3", "/dev/ttyUSB0")
    pub port: String,
    /// Baud rate
    pub baud: u32,
    /// Fixed wait between writing a query and draining the response
    pub settle: Duration,
    /// Upper bound on a single read call
    pub read_timeout: Duration,
}

impl LinkSettings {
    /// Settings with the station's default timing (200 ms settle, 1 s read timeout).
    pub fn new(port: impl Into<String>, baud: u32) -> Self {
        Self {
            port: port.into(),
            baud,
            settle: Duration::from_millis(200),
            read_timeout: Duration::from_secs(1),
        }
    }

    /// Override the settle interval.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Override the read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl fmt::Display for LinkSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} baud", self.port, self.baud)
    }
}

/// An open link to a measuring instrument.
pub trait Instrument: Send {
    /// Send `command` (without terminator) and return the trimmed response text.
    fn query(&mut self, command: &str) -> Result<String, LinkError>;
}

/// Opens instrument links for a capture action.
pub trait Connector {
    /// Link settings, reported in communication errors.
    fn settings(&self) -> &LinkSettings;

    /// Open a new link. Single attempt, no retry.
    fn open(&self) -> Result<Box<dyn Instrument>, LinkError>;
}

/// Builds the measurement query for a parameter.
///
/// `Voltage` and `Resistance` map to the instrument's abbreviated mnemonics;
/// anything else is upper-cased verbatim.
///
/// ```
/// use qc_station::instrument::measure_command;
///
/// assert_eq!(measure_command("Voltage"), ":MEAS:VOLT?");
/// assert_eq!(measure_command("current"), ":MEAS:CURRENT?");
/// ```
pub fn measure_command(parameter: &str) -> String {
    match parameter.trim().to_lowercase().as_str() {
        "voltage" => ":MEAS:VOLT?".to_string(),
        "resistance" => ":MEAS:RES?".to_string(),
        other => format!(":MEAS:{}?", other.to_uppercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_command_mapping() {
        assert_eq!(measure_command("Voltage"), ":MEAS:VOLT?");
        assert_eq!(measure_command("RESISTANCE"), ":MEAS:RES?");
        assert_eq!(measure_command(" Capacitance "), ":MEAS:CAPACITANCE?");
    }

    #[test]
    fn test_link_settings_defaults() {
        let settings = LinkSettings::new("COM3", 9600);
        assert_eq!(settings.settle, Duration::from_millis(200));
        assert_eq!(settings.to_string(), "COM3 @ 9600 baud");

        let settings = settings.with_settle(Duration::ZERO);
        assert_eq!(settings.settle, Duration::ZERO);
    }
}
