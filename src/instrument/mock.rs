//! Instruments that need no hardware.
//!
//! [`ScriptedConnector`] replays a queue of canned responses and records every
//! command it receives. [`SimulatedConnector`] returns random readings drawn
//! from a per-command range, mirroring the station's "simulate" mode.

use super::{Connector, Instrument, LinkSettings};
use crate::error::LinkError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Script {
    responses: VecDeque<Result<String, String>>,
    sent: Vec<String>,
    opens: usize,
}

/// Replays queued responses, in order, across every link it opens.
///
/// Clones share the same script, so a test can keep a handle and inspect
/// [`ScriptedConnector::sent`] after the session used it.
#[derive(Debug, Clone)]
pub struct ScriptedConnector {
    settings: LinkSettings,
    script: Arc<Mutex<Script>>,
    fail_open: Option<String>,
}

impl ScriptedConnector {
    /// A connector with an empty script.
    pub fn new(settings: LinkSettings) -> Self {
        Self {
            settings,
            script: Arc::new(Mutex::new(Script::default())),
            fail_open: None,
        }
    }

    /// Queue a successful response.
    pub fn respond(self, response: impl Into<String>) -> Self {
        self.push(Ok(response.into()));
        self
    }

    /// Queue a read failure.
    pub fn fail_read(self, reason: impl Into<String>) -> Self {
        self.push(Err(reason.into()));
        self
    }

    /// Make every `open` fail with `reason`.
    pub fn fail_open(mut self, reason: impl Into<String>) -> Self {
        self.fail_open = Some(reason.into());
        self
    }

    /// Commands received so far, without terminators.
    pub fn sent(&self) -> Vec<String> {
        self.script
            .lock()
            .map(|s| s.sent.clone())
            .unwrap_or_default()
    }

    /// Number of links opened so far.
    pub fn opens(&self) -> usize {
        self.script.lock().map(|s| s.opens).unwrap_or_default()
    }

    /// Responses still queued.
    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .map(|s| s.responses.len())
            .unwrap_or_default()
    }

    fn push(&self, response: Result<String, String>) {
        if let Ok(mut script) = self.script.lock() {
            script.responses.push_back(response);
        }
    }
}

impl Connector for ScriptedConnector {
    fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    fn open(&self) -> Result<Box<dyn Instrument>, LinkError> {
        if let Some(reason) = &self.fail_open {
            return Err(LinkError::Open(reason.clone()));
        }
        let mut script = self
            .script
            .lock()
            .map_err(|_| LinkError::Open("script lock poisoned".into()))?;
        script.opens += 1;
        Ok(Box::new(ScriptedInstrument {
            script: Arc::clone(&self.script),
        }))
    }
}

struct ScriptedInstrument {
    script: Arc<Mutex<Script>>,
}

impl Instrument for ScriptedInstrument {
    fn query(&mut self, command: &str) -> Result<String, LinkError> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| LinkError::Task("script lock poisoned".into()))?;
        script.sent.push(command.to_string());
        match script.responses.pop_front() {
            Some(Ok(response)) => Ok(response.trim().to_string()),
            Some(Err(reason)) => Err(LinkError::Read(std::io::Error::other(reason))),
            None => Ok(String::new()),
        }
    }
}

/// Default simulated range when none is registered for a command.
pub const DEFAULT_SIMULATED_RANGE: (f64, f64) = (2.0, 5.0);

/// Produces random readings, uniformly drawn from a per-command range.
#[derive(Debug, Clone)]
pub struct SimulatedConnector {
    settings: LinkSettings,
    ranges: HashMap<String, (f64, f64)>,
    seed: Option<u64>,
}

impl SimulatedConnector {
    /// A simulator answering every command with [`DEFAULT_SIMULATED_RANGE`].
    pub fn new(settings: LinkSettings) -> Self {
        Self {
            settings,
            ranges: HashMap::new(),
            seed: None,
        }
    }

    /// Draw values for `command` from `low..=high`.
    pub fn with_range(mut self, command: impl Into<String>, low: f64, high: f64) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        self.ranges.insert(command.into(), (low, high));
        self
    }

    /// Use a fixed seed so readings are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Connector for SimulatedConnector {
    fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    fn open(&self) -> Result<Box<dyn Instrument>, LinkError> {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Box::new(SimulatedInstrument {
            ranges: self.ranges.clone(),
            rng,
        }))
    }
}

struct SimulatedInstrument {
    ranges: HashMap<String, (f64, f64)>,
    rng: StdRng,
}

impl Instrument for SimulatedInstrument {
    fn query(&mut self, command: &str) -> Result<String, LinkError> {
        let (low, high) = self
            .ranges
            .get(command)
            .copied()
            .unwrap_or(DEFAULT_SIMULATED_RANGE);
        let value = if low == high {
            low
        } else {
            self.rng.gen_range(low..=high)
        };
        // Rounded for display, clamped so rounding never leaves the range
        let value = ((value * 1000.0).round() / 1000.0).clamp(low, high);
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LinkSettings {
        LinkSettings::new("SIM", 9600)
    }

    #[test]
    fn scripted_replays_in_order_and_records_commands() {
        let connector = ScriptedConnector::new(settings())
            .respond(" 4.0\r\n")
            .fail_read("timeout");
        let mut link = connector.open().unwrap();

        assert_eq!(link.query(":MEAS:VOLT?").unwrap(), "4.0");
        assert!(matches!(
            link.query(":MEAS:RES?"),
            Err(LinkError::Read(_))
        ));
        assert_eq!(connector.sent(), vec![":MEAS:VOLT?", ":MEAS:RES?"]);
        assert_eq!(connector.opens(), 1);
        assert_eq!(connector.remaining(), 0);
    }

    #[test]
    fn scripted_open_failure() {
        let connector = ScriptedConnector::new(settings()).fail_open("busy");
        assert!(matches!(connector.open(), Err(LinkError::Open(reason)) if reason == "busy"));
    }

    #[test]
    fn simulated_values_stay_within_range() {
        let connector = SimulatedConnector::new(settings())
            .with_range(":MEAS:VOLT?", 4.5, 3.0)
            .with_seed(7);
        let mut link = connector.open().unwrap();
        for _ in 0..50 {
            let value: f64 = link.query(":MEAS:VOLT?").unwrap().parse().unwrap();
            assert!((3.0..=4.5).contains(&value), "{value} out of range");
        }
        let fallback: f64 = link.query(":MEAS:RES?").unwrap().parse().unwrap();
        assert!((2.0..=5.0).contains(&fallback));
    }
}
