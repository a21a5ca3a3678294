//! Operator capture session: selection, reading, validation and staging.

use super::range::{RangeResolver, StoreRangeResolver};
use super::sequencer::SerialSequencer;
use super::staging::{StagedReading, StagingTable};
use super::validator::validate;
use super::validity::{ThresholdPolicy, ValidityPolicy};
use crate::error::{CaptureError, LinkError, StoreError};
use crate::instrument::{measure_command, Connector, LinkSettings};
use crate::model::{Measurement, FIELD_SEPARATOR};
use crate::store::Store;
use tracing::{info, warn};

/// What the operator is measuring. Unset fields mean "nothing selected".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Component name
    pub component: Option<String>,
    /// Part number
    pub part_number: Option<String>,
    /// Parameters, in the order they will be read
    pub parameters: Vec<String>,
}

impl Selection {
    /// A fully specified selection.
    pub fn new(
        component: impl Into<String>,
        part_number: impl Into<String>,
        parameters: &[&str],
    ) -> Self {
        Self {
            component: Some(component.into()),
            part_number: Some(part_number.into()),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Whether component, part number and at least one parameter are set.
    pub fn is_complete(&self) -> bool {
        self.component.is_some() && self.part_number.is_some() && !self.parameters.is_empty()
    }

    /// Parameter names as stored in a row.
    pub fn joined_parameters(&self) -> String {
        self.parameters.join(FIELD_SEPARATOR)
    }
}

/// State of one operator's capture screen.
///
/// Capture and commit failures never poison the session: after an error it
/// is ready for the next capture with staging as it was.
pub struct CaptureSession {
    pub(super) store: Store,
    pub(super) operator: String,
    pub(super) selection: Selection,
    pub(super) resolver: Box<dyn RangeResolver>,
    pub(super) policy: Box<dyn ValidityPolicy>,
    pub(super) sequencer: SerialSequencer,
    pub(super) staging: StagingTable,
    pub(super) previous: Vec<Measurement>,
}

impl CaptureSession {
    /// New session for `operator` (the display name stamped on committed rows).
    pub fn new(store: Store, operator: impl Into<String>) -> Self {
        Self {
            resolver: Box::new(StoreRangeResolver::new(store.clone())),
            policy: Box::new(ThresholdPolicy::default()),
            store,
            operator: operator.into(),
            selection: Selection::default(),
            sequencer: SerialSequencer::new(),
            staging: StagingTable::new(),
            previous: Vec::new(),
        }
    }

    /// Replace the range resolver.
    pub fn with_resolver(mut self, resolver: impl RangeResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Replace the validity policy.
    pub fn with_policy(mut self, policy: impl ValidityPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Operator display name.
    pub fn operator(&self) -> &str {
        &self.operator
    }

    /// Current selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Staged readings.
    pub fn staging(&self) -> &StagingTable {
        &self.staging
    }

    /// Committed rows for the current selection, newest serial first.
    pub fn previous_entries(&self) -> &[Measurement] {
        &self.previous
    }

    /// Change the selection and reload the committed rows shown for it.
    pub fn select(&mut self, selection: Selection) -> Result<(), StoreError> {
        self.selection = selection;
        self.refresh_previous()
    }

    /// Reload committed rows for the current selection.
    pub fn refresh_previous(&mut self) -> Result<(), StoreError> {
        self.previous = match (&self.selection.component, &self.selection.part_number) {
            (Some(component), Some(part)) if !self.selection.parameters.is_empty() => self
                .store
                .previous_entries(part, component, &self.selection.joined_parameters())?,
            _ => Vec::new(),
        };
        Ok(())
    }

    /// Read every selected parameter once and stage the batch if all values pass.
    ///
    /// The link is opened once for the batch and closed on return. The first
    /// failing parameter aborts the batch; nothing is staged and no serial is used.
    pub fn capture(&mut self, connector: &dyn Connector) -> Result<StagedReading, CaptureError> {
        let result = self.read_batch(connector);
        match &result {
            Ok(reading) => info!(
                order_id = reading.order_id,
                serial = reading.serial_number,
                parameters = %reading.parameter_names,
                values = %reading.values,
                "reading staged"
            ),
            Err(e) if e.is_range_violation() => warn!(error = %e, "reading out of range"),
            Err(e) => warn!(error = %e, "capture failed"),
        }
        result
    }

    fn read_batch(&mut self, connector: &dyn Connector) -> Result<StagedReading, CaptureError> {
        let (component, part_number) =
            match (&self.selection.component, &self.selection.part_number) {
                (Some(c), Some(p)) if !self.selection.parameters.is_empty() => {
                    (c.clone(), p.clone())
                }
                _ => return Err(CaptureError::IncompleteSelection),
            };
        let parameters = self.selection.parameters.clone();

        let order = self
            .store
            .find_order(&component, &part_number)?
            .ok_or_else(|| StoreError::UnknownOrder {
                component: component.clone(),
                part_number: part_number.clone(),
            })?;

        let settings = connector.settings().clone();
        let communication = |parameter: &str, command: &str, source: LinkError| {
            communication_error(&settings, &part_number, parameter, command, source)
        };

        let mut instrument = connector
            .open()
            .map_err(|e| communication(&parameters[0], &measure_command(&parameters[0]), e))?;

        let mut values = Vec::with_capacity(parameters.len());
        let mut ranges = Vec::with_capacity(parameters.len());
        for parameter in &parameters {
            let command = measure_command(parameter);
            let raw = instrument
                .query(&command)
                .map_err(|e| communication(parameter, &command, e))?;
            let bound = self.resolver.resolve(&component, &part_number, parameter);
            validate(&raw, parameter, &part_number, bound)?;
            values.push(raw);
            ranges.push(bound.to_string());
        }
        drop(instrument);

        let serial_number = self.sequencer.advance(&self.store, order.id)?;
        let reading = StagedReading {
            order_id: order.id,
            serial_number,
            component_name: component,
            part_number,
            parameter_names: parameters.join(FIELD_SEPARATOR),
            values: values.join(FIELD_SEPARATOR),
            ranges: ranges.join(FIELD_SEPARATOR),
        };
        self.staging.stage(reading.clone());
        Ok(reading)
    }
}

fn communication_error(
    settings: &LinkSettings,
    part_number: &str,
    parameter: &str,
    command: &str,
    source: LinkError,
) -> CaptureError {
    CaptureError::Communication {
        port: settings.port.clone(),
        baud: settings.baud,
        command: command.to_string(),
        part_number: part_number.to_string(),
        parameter: parameter.to_string(),
        source,
    }
}
