//! Serial link for RS-232/USB-serial instruments.
//!
//! Protocol: the query is written followed by CR/LF, the link waits a fixed
//! settle interval, then drains whatever bytes the port has buffered. There is
//! no response delimiter and no retry.

use super::{Connector, Instrument, LinkSettings};
use crate::error::LinkError;
#[cfg(feature = "instrument_serial")]
use super::COMMAND_TERMINATOR;
#[cfg(feature = "instrument_serial")]
use tracing::{debug, trace};

#[cfg(feature = "instrument_serial")]
use serialport::SerialPort;

/// Opens [`SerialInstrument`] links with fixed settings.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    settings: LinkSettings,
}

impl SerialConnector {
    /// Create a connector for the given link.
    pub fn new(settings: LinkSettings) -> Self {
        Self { settings }
    }
}

impl Connector for SerialConnector {
    fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    fn open(&self) -> Result<Box<dyn Instrument>, LinkError> {
        Ok(Box::new(SerialInstrument::open(&self.settings)?))
    }
}

/// An open serial port. The port closes when this value is dropped.
#[cfg_attr(not(feature = "instrument_serial"), allow(dead_code))]
pub struct SerialInstrument {
    port_name: String,
    settle: std::time::Duration,
    #[cfg(feature = "instrument_serial")]
    port: Box<dyn SerialPort>,
}

impl SerialInstrument {
    /// Open the port described by `settings`.
    #[cfg(feature = "instrument_serial")]
    pub fn open(settings: &LinkSettings) -> Result<Self, LinkError> {
        let port = serialport::new(&settings.port, settings.baud)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|e| LinkError::Open(e.to_string()))?;
        debug!(port = %settings.port, baud = settings.baud, "serial port opened");
        Ok(Self {
            port_name: settings.port.clone(),
            settle: settings.settle,
            port,
        })
    }

    /// Serial support is compiled out; opening always fails.
    #[cfg(not(feature = "instrument_serial"))]
    pub fn open(_settings: &LinkSettings) -> Result<Self, LinkError> {
        Err(LinkError::SerialFeatureDisabled)
    }
}

#[cfg(feature = "instrument_serial")]
impl Instrument for SerialInstrument {
    fn query(&mut self, command: &str) -> Result<String, LinkError> {
        use std::io::{Read, Write};

        let wire = format!("{command}{COMMAND_TERMINATOR}");
        trace!(port = %self.port_name, command = %wire.escape_default(), "sending");

        self.port
            .write_all(wire.as_bytes())
            .map_err(LinkError::Write)?;
        self.port.flush().map_err(LinkError::Write)?;

        std::thread::sleep(self.settle);

        let available = self
            .port
            .bytes_to_read()
            .map_err(|e| LinkError::Read(e.into()))?;
        let mut buffer = vec![0u8; available as usize];
        if !buffer.is_empty() {
            self.port.read_exact(&mut buffer).map_err(LinkError::Read)?;
        }

        let response = String::from_utf8(buffer)?.trim().to_string();
        trace!(port = %self.port_name, response = %response.escape_default(), "received");
        Ok(response)
    }
}

#[cfg(not(feature = "instrument_serial"))]
impl Instrument for SerialInstrument {
    fn query(&mut self, _command: &str) -> Result<String, LinkError> {
        Err(LinkError::SerialFeatureDisabled)
    }
}

/// Names of the serial ports present on this machine.
#[cfg(feature = "instrument_serial")]
pub fn available_ports() -> Result<Vec<String>, LinkError> {
    let ports = serialport::available_ports().map_err(|e| LinkError::Open(e.to_string()))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Serial support is compiled out.
#[cfg(not(feature = "instrument_serial"))]
pub fn available_ports() -> Result<Vec<String>, LinkError> {
    Err(LinkError::SerialFeatureDisabled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_port_fails_without_panicking() {
        let settings = LinkSettings::new("/dev/qc-station-no-such-port", 9600);
        let connector = SerialConnector::new(settings.clone());
        assert_eq!(connector.settings(), &settings);
        assert!(connector.open().is_err());
    }

    #[cfg(not(feature = "instrument_serial"))]
    #[test]
    fn test_serial_disabled_reports_feature() {
        let connector = SerialConnector::new(LinkSettings::new("COM3", 9600));
        assert!(matches!(
            connector.open(),
            Err(LinkError::SerialFeatureDisabled)
        ));
        assert!(matches!(
            available_ports(),
            Err(LinkError::SerialFeatureDisabled)
        ));
    }
}
