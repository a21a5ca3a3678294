//! Confirmed commit of the staging table.

use super::session::CaptureSession;
use crate::error::CaptureError;
use crate::model::{Measurement, NewMeasurement};
use chrono::{Local, NaiveDateTime};
use std::io::{self, BufRead, Write};
use tracing::{info, warn};

/// Question asked before anything is written.
pub const CONFIRM_PROMPT: &str = "Are you sure you want to submit the new data?";

/// Asks the operator a yes/no question.
pub trait Confirm {
    /// `true` to proceed.
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Fixed answer, for `--yes` and tests.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> bool {
        self.0
    }
}

/// Prompts on a writer and reads the answer from a line reader.
///
/// Only `y` or `yes` (any case) confirms. Read errors count as "no".
pub struct PromptConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    /// Prompt on `output`, read from `input`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl PromptConfirm<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr, read from stdin.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn confirm(&mut self, prompt: &str) -> bool {
        if write!(self.output, "{prompt} [y/N] ")
            .and_then(|_| self.output.flush())
            .is_err()
        {
            return false;
        }
        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

/// Result of a commit request.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Rows written, with the serial numbers the store assigned
    Committed(Vec<Measurement>),
    /// The operator said no; nothing was written
    Declined,
}

impl CaptureSession {
    /// Commit every staged reading, stamped with the current local time.
    pub fn commit(&mut self, confirm: &mut dyn Confirm) -> Result<CommitOutcome, CaptureError> {
        self.commit_at(confirm, Local::now().naive_local())
    }

    /// Commit every staged reading, stamped with `at`.
    ///
    /// Rows are written oldest first in a single transaction. On failure
    /// nothing is written and the staging table is left for a retry.
    pub fn commit_at(
        &mut self,
        confirm: &mut dyn Confirm,
        at: NaiveDateTime,
    ) -> Result<CommitOutcome, CaptureError> {
        if self.staging.is_empty() {
            return Err(CaptureError::NothingStaged);
        }
        if !confirm.confirm(CONFIRM_PROMPT) {
            info!(staged = self.staging.len(), "commit declined");
            return Ok(CommitOutcome::Declined);
        }

        let date = at.format("%Y-%m-%d").to_string();
        let time = at.format("%H:%M:%S").to_string();
        let rows: Vec<NewMeasurement> = self
            .staging
            .oldest_first()
            .map(|staged| NewMeasurement {
                order_id: staged.order_id,
                component_name: staged.component_name.clone(),
                part_number: staged.part_number.clone(),
                parameter_names: staged.parameter_names.clone(),
                operator_name: self.operator.clone(),
                date: date.clone(),
                time: time.clone(),
                values: staged.values.clone(),
                validity: self.policy.assess(&staged.value_list()),
            })
            .collect();

        let committed = self.store.commit_measurements(&rows).map_err(|e| {
            warn!(error = %e, staged = rows.len(), "commit failed, staging kept");
            CaptureError::from(e)
        })?;

        for row in &committed {
            self.sequencer.observe(row.order_id, row.serial_number);
        }
        self.staging.clear();
        if let Err(e) = self.refresh_previous() {
            warn!(error = %e, "could not reload previous entries");
        }
        info!(
            rows = committed.len(),
            operator = %self.operator,
            "new data submitted"
        );
        Ok(CommitOutcome::Committed(committed))
    }
}
