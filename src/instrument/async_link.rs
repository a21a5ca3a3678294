//! Async access to a blocking instrument link.
//!
//! The station's capture loop is synchronous, but hosts that already run a
//! Tokio runtime can wrap any [`Instrument`] here. Each query runs on Tokio's
//! blocking pool so the settle wait never stalls the async executor.

use super::Instrument;
use crate::error::LinkError;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A cloneable async handle to an open instrument.
#[derive(Clone)]
pub struct AsyncInstrument {
    inner: Arc<Mutex<Box<dyn Instrument>>>,
}

impl AsyncInstrument {
    /// Wrap an open instrument link.
    pub fn new(instrument: Box<dyn Instrument>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(instrument)),
        }
    }

    /// Send a query and await the response.
    ///
    /// Concurrent callers are serialised on the link.
    pub async fn query(&self, command: &str) -> Result<String, LinkError> {
        let inner = Arc::clone(&self.inner);
        let command = command.to_string();

        tokio::task::spawn_blocking(move || {
            let mut instrument = inner.blocking_lock();
            instrument.query(&command)
        })
        .await
        .map_err(|e| LinkError::Task(e.to_string()))?
    }
}
