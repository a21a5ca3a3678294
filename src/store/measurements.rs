//! Measurement rows: serial reservation, commit, previous entries and reports.

use super::{text_column, Store};
use crate::error::StoreError;
use crate::model::{Measurement, NewMeasurement};
use crate::validation;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use std::collections::BTreeMap;
use tracing::{debug, info};

const MEASUREMENT_COLUMNS: &str = "orderId, componentSerialNumber, componentName, partNumber, \
     parameterName, operatorName, date, time, value, isValid";

fn measurement_from_row(row: &Row<'_>) -> rusqlite::Result<Measurement> {
    Ok(Measurement {
        order_id: row.get(0)?,
        serial_number: row.get(1)?,
        component_name: row.get(2)?,
        part_number: row.get(3)?,
        parameter_names: row.get(4)?,
        operator_name: row.get(5)?,
        date: row.get(6)?,
        time: row.get(7)?,
        values: text_column(row, 8)?,
        validity: row.get(9)?,
    })
}

/// Highest serial number ever handed out for an order, persisted or reserved.
fn highest_serial(conn: &Connection, order_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT MAX(
             COALESCE((SELECT lastSerial FROM serialCounters WHERE orderId = ?1), 0),
             COALESCE((SELECT MAX(componentSerialNumber) FROM measuredValues WHERE orderId = ?1), 0)
         )",
        params![order_id],
        |row| row.get(0),
    )
}

/// Filter for the report view. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementFilter {
    /// Earliest capture date, inclusive (`YYYY-MM-DD`)
    pub from: Option<String>,
    /// Latest capture date, inclusive (`YYYY-MM-DD`)
    pub to: Option<String>,
    /// Operator display name
    pub operator: Option<String>,
    /// Part number
    pub part_number: Option<String>,
}

impl MeasurementFilter {
    /// Check date fields before they reach SQL.
    pub fn validate(&self) -> Result<(), StoreError> {
        for date in [&self.from, &self.to].into_iter().flatten() {
            validation::is_valid_date(date)
                .map_err(|e| StoreError::Invalid(format!("{date}: {e}")))?;
        }
        Ok(())
    }

    fn where_clause(&self) -> (String, Vec<String>) {
        let mut clauses = Vec::new();
        let mut args = Vec::new();
        if let Some(from) = &self.from {
            clauses.push("date >= ?");
            args.push(from.clone());
        }
        if let Some(to) = &self.to {
            clauses.push("date <= ?");
            args.push(to.clone());
        }
        if let Some(operator) = &self.operator {
            clauses.push("operatorName = ?");
            args.push(operator.clone());
        }
        if let Some(part) = &self.part_number {
            clauses.push("partNumber = ?");
            args.push(part.clone());
        }
        if clauses.is_empty() {
            (String::new(), args)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), args)
        }
    }
}

impl Store {
    /// Highest serial number used for an order; 0 when none.
    pub fn max_serial(&self, order_id: i64) -> Result<i64, StoreError> {
        let conn = self.connect()?;
        Ok(highest_serial(&conn, order_id)?)
    }

    /// Persist rows in the given order, assigning each the next serial number of its order.
    ///
    /// Runs as one IMMEDIATE transaction: the write lock is taken before the
    /// counters are read, so concurrent stations cannot hand out the same
    /// serial. Any failure rolls back every row of the call.
    pub fn commit_measurements(
        &self,
        rows: &[NewMeasurement],
    ) -> Result<Vec<Measurement>, StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut next: BTreeMap<i64, i64> = BTreeMap::new();
        let mut committed = Vec::with_capacity(rows.len());

        for row in rows {
            let serial = match next.get(&row.order_id) {
                Some(last) => last + 1,
                None => highest_serial(&tx, row.order_id)? + 1,
            };
            next.insert(row.order_id, serial);

            tx.execute(
                &format!(
                    "INSERT INTO measuredValues ({MEASUREMENT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    row.order_id,
                    serial,
                    row.component_name,
                    row.part_number,
                    row.parameter_names,
                    row.operator_name,
                    row.date,
                    row.time,
                    row.values,
                    row.validity.as_str(),
                ],
            )?;
            debug!(order_id = row.order_id, serial, "measurement row inserted");

            committed.push(Measurement {
                order_id: row.order_id,
                serial_number: serial,
                component_name: row.component_name.clone(),
                part_number: row.part_number.clone(),
                parameter_names: row.parameter_names.clone(),
                operator_name: row.operator_name.clone(),
                date: row.date.clone(),
                time: row.time.clone(),
                values: row.values.clone(),
                validity: row.validity.as_str().to_string(),
            });
        }

        for (order_id, last) in &next {
            tx.execute(
                "INSERT INTO serialCounters (orderId, lastSerial) VALUES (?1, ?2)
                 ON CONFLICT(orderId) DO UPDATE SET lastSerial = excluded.lastSerial",
                params![order_id, last],
            )?;
        }
        tx.commit()?;

        info!(rows = committed.len(), "measurements committed");
        Ok(committed)
    }

    /// Committed rows for a part / component / joined parameter list, newest serial first.
    pub fn previous_entries(
        &self,
        part_number: &str,
        component: &str,
        parameter_names: &str,
    ) -> Result<Vec<Measurement>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM measuredValues
             WHERE partNumber = ?1 AND componentName = ?2 AND parameterName = ?3
             ORDER BY componentSerialNumber DESC"
        ))?;
        let rows = stmt.query_map(
            params![part_number, component, parameter_names],
            measurement_from_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Rows matching a report filter, ordered by date, time, operator, part and parameters.
    pub fn measurements(&self, filter: &MeasurementFilter) -> Result<Vec<Measurement>, StoreError> {
        filter.validate()?;
        let (clause, args) = filter.where_clause();
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM measuredValues{clause}
             ORDER BY date, time, operatorName, partNumber, parameterName"
        ))?;
        let rows = stmt.query_map(params_from_iter(args.iter()), measurement_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Operators that have committed at least one row.
    pub fn operator_names(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT operatorName FROM measuredValues ORDER BY operatorName")?;
        let names = stmt.query_map([], |row| row.get(0))?;
        Ok(names.collect::<Result<Vec<_>, _>>()?)
    }

    /// Part numbers with at least one committed row.
    pub fn measured_part_numbers(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT partNumber FROM measuredValues ORDER BY partNumber")?;
        let parts = stmt.query_map([], |row| row.get(0))?;
        Ok(parts.collect::<Result<Vec<_>, _>>()?)
    }
}
