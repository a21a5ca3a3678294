//! Measurement reports for supervisors, manufacturers and admins.
//!
//! A report is the filtered list of committed rows, numbered from 1. With
//! expansion on, a multi-parameter row becomes one report row per parameter.
//! Reports render as an aligned text table, JSON, or CSV (behind the
//! `storage_csv` feature).

use crate::error::AppResult;
use crate::model::Measurement;
use crate::store::{MeasurementFilter, Store};
use serde::Serialize;
use std::io::Write;
#[cfg(feature = "storage_csv")]
use std::path::Path;
use tracing::debug;

/// One line of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// 1-based row number
    #[serde(rename = "Sl No")]
    pub index: usize,
    /// Capture date
    #[serde(rename = "Date")]
    pub date: String,
    /// Capture time
    #[serde(rename = "Time")]
    pub time: String,
    /// Operator display name
    #[serde(rename = "Operator")]
    pub operator: String,
    /// Part number
    #[serde(rename = "Part No")]
    pub part_number: String,
    /// Component serial number
    #[serde(rename = "Serial No")]
    pub serial_number: i64,
    /// Parameter name, or comma-joined names when not expanded
    #[serde(rename = "Parameter")]
    pub parameter: String,
    /// Value, or comma-joined values when not expanded
    #[serde(rename = "Value")]
    pub value: String,
    /// Validity flag
    #[serde(rename = "Validity")]
    pub validity: String,
}

const HEADERS: [&str; 9] = [
    "Sl No",
    "Date",
    "Time",
    "Operator",
    "Part No",
    "Serial No",
    "Parameter",
    "Value",
    "Validity",
];

/// Build report rows from committed measurements.
pub fn build(measurements: &[Measurement], expand: bool) -> Vec<ReportRow> {
    let mut rows = Vec::new();
    for m in measurements {
        let pairs = if expand {
            m.pairs()
        } else {
            vec![(m.parameter_names.clone(), m.values.clone())]
        };
        for (parameter, value) in pairs {
            rows.push(ReportRow {
                index: rows.len() + 1,
                date: m.date.clone(),
                time: m.time.clone(),
                operator: m.operator_name.clone(),
                part_number: m.part_number.clone(),
                serial_number: m.serial_number,
                parameter,
                value,
                validity: m.validity.clone(),
            });
        }
    }
    rows
}

/// Query the store and build the report.
pub fn generate(
    store: &Store,
    filter: &MeasurementFilter,
    expand: bool,
) -> AppResult<Vec<ReportRow>> {
    let measurements = store.measurements(filter)?;
    debug!(?filter, rows = measurements.len(), "report query");
    Ok(build(&measurements, expand))
}

/// Values a report can be filtered on.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterChoices {
    /// Operators with committed rows
    pub operators: Vec<String>,
    /// Part numbers with committed rows
    pub part_numbers: Vec<String>,
}

/// The operators and part numbers present in committed measurements.
pub fn filter_choices(store: &Store) -> AppResult<FilterChoices> {
    Ok(FilterChoices {
        operators: store.operator_names()?,
        part_numbers: store.measured_part_numbers()?,
    })
}

/// Write rows as an aligned text table.
pub fn write_table(rows: &[ReportRow], mut out: impl Write) -> AppResult<()> {
    let cells: Vec<[String; 9]> = rows
        .iter()
        .map(|r| {
            [
                r.index.to_string(),
                r.date.clone(),
                r.time.clone(),
                r.operator.clone(),
                r.part_number.clone(),
                r.serial_number.to_string(),
                r.parameter.clone(),
                r.value.clone(),
                r.validity.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    writeln!(out, "{}", aligned(&HEADERS, &widths))?;
    for row in &cells {
        let fields: Vec<&str> = row.iter().map(String::as_str).collect();
        writeln!(out, "{}", aligned(&fields, &widths))?;
    }
    Ok(())
}

fn aligned(fields: &[&str], widths: &[usize]) -> String {
    fields
        .iter()
        .zip(widths)
        .map(|(field, &width)| format!("{field:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Write rows as a JSON array.
pub fn write_json(rows: &[ReportRow], mut out: impl Write) -> AppResult<()> {
    serde_json::to_writer_pretty(&mut out, rows)?;
    writeln!(out)?;
    Ok(())
}

/// Export rows to a CSV file with a header line.
#[cfg(feature = "storage_csv")]
pub fn export_csv(rows: &[ReportRow], path: &Path) -> AppResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    tracing::info!(path = %path.display(), rows = rows.len(), "report exported");
    Ok(())
}

/// Export rows to a CSV file with a header line.
#[cfg(not(feature = "storage_csv"))]
pub fn export_csv(_rows: &[ReportRow], _path: &std::path::Path) -> AppResult<()> {
    Err(crate::error::QcError::FeatureNotEnabled("storage_csv".to_string()))
}
