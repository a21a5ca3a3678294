//! Measurement capture pipeline.
//!
//! A capture action flows through these pieces in order:
//!
//! 1. the [`CaptureSession`] opens the instrument once and queries each
//!    selected parameter
//! 2. [`range::RangeResolver`] looks up the acceptable range
//! 3. [`validator::validate`] parses the response and enforces the range
//! 4. [`sequencer::SerialSequencer`] hands out a provisional serial number
//! 5. the batch lands in the [`staging::StagingTable`]
//!
//! After the operator confirms, [`CaptureSession::commit`] writes the staged
//! rows in one transaction, with the validity flag chosen by a
//! [`validity::ValidityPolicy`].

pub mod commit;
pub mod range;
pub mod sequencer;
pub mod session;
pub mod staging;
pub mod validator;
pub mod validity;

pub use commit::{AutoConfirm, CommitOutcome, Confirm, PromptConfirm};
pub use range::{RangeResolver, StoreRangeResolver};
pub use session::{CaptureSession, Selection};
pub use staging::{StagedReading, StagingTable};
pub use validity::{ThresholdPolicy, ValidityPolicy};
