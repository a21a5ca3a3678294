//! Orders and parameter specs.

use super::{is_constraint_violation, Store};
use crate::error::StoreError;
use crate::model::{Order, OrderDetails, OrderSummary, ParameterSpec};
use crate::validation;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

const ORDER_COLUMNS: &str =
    "orderId, componentName, partNumber, orderBy, orderDate, dueDate, quantity";

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        component_name: row.get(1)?,
        part_number: row.get(2)?,
        details: OrderDetails {
            ordered_by: row.get(3)?,
            order_date: row.get(4)?,
            due_date: row.get(5)?,
            quantity: row.get(6)?,
        },
    })
}

fn parameter_from_row(row: &Row<'_>) -> rusqlite::Result<ParameterSpec> {
    Ok(ParameterSpec {
        id: row.get(0)?,
        order_id: row.get(1)?,
        name: row.get(2)?,
        low: row.get(3)?,
        high: row.get(4)?,
    })
}

fn required(field: &str, value: &str) -> Result<String, StoreError> {
    validation::is_not_empty(value)
        .map(|_| value.trim().to_string())
        .map_err(|e| StoreError::Invalid(format!("{field}: {e}")))
}

/// Trim the details and check dates and quantity.
fn checked_details(details: &OrderDetails) -> Result<OrderDetails, StoreError> {
    let invalid = |field: &str, e: &str| StoreError::Invalid(format!("{field}: {e}"));
    let ordered_by = match details.ordered_by.as_deref() {
        Some(name) => Some(required("ordered by", name)?),
        None => None,
    };
    for (field, date) in [
        ("order date", &details.order_date),
        ("due date", &details.due_date),
    ] {
        if let Some(date) = date {
            validation::is_valid_date(date).map_err(|e| invalid(field, e))?;
        }
    }
    if let (Some(ordered), Some(due)) = (&details.order_date, &details.due_date) {
        let parse = |date: &str| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok();
        if parse(due) < parse(ordered) {
            return Err(invalid("due date", "must not be before the order date"));
        }
    }
    if let Some(quantity) = details.quantity {
        if quantity < 1 {
            return Err(invalid("quantity", "must be a whole number of at least 1"));
        }
    }
    Ok(OrderDetails {
        ordered_by,
        ..details.clone()
    })
}

fn insert_parameter(conn: &Connection, order_id: i64, name: &str) -> Result<(), StoreError> {
    let name = required("parameter name", name)?;
    conn.execute(
        "INSERT INTO parametersDetails (orderId, parameterName) VALUES (?1, ?2)",
        params![order_id, name],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            StoreError::DuplicateParameter {
                order_id,
                parameter: name.clone(),
            }
        } else {
            e.into()
        }
    })?;
    Ok(())
}

fn find_order_on(
    conn: &Connection,
    component: &str,
    part_number: &str,
) -> Result<Option<Order>, StoreError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE componentName = ?1 AND partNumber = ?2"
            ),
            params![component, part_number],
            order_from_row,
        )
        .optional()?)
}

fn parameters_on(conn: &Connection, order_id: i64) -> Result<Vec<ParameterSpec>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, orderId, parameterName, low, high FROM parametersDetails
         WHERE orderId = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![order_id], parameter_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

impl Store {
    /// Create an order with its parameter list in one transaction.
    pub fn create_order(
        &self,
        component: &str,
        part_number: &str,
        parameters: &[String],
    ) -> Result<OrderSummary, StoreError> {
        self.create_order_with(component, part_number, parameters, &OrderDetails::default())
    }

    /// Create an order with its details and parameter list in one transaction.
    ///
    /// Dates must be `YYYY-MM-DD` with the due date not before the order
    /// date, and a quantity must be at least 1.
    pub fn create_order_with(
        &self,
        component: &str,
        part_number: &str,
        parameters: &[String],
        details: &OrderDetails,
    ) -> Result<OrderSummary, StoreError> {
        let component = required("component name", component)?;
        let part_number = required("part number", part_number)?;
        let details = checked_details(details)?;

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO orders
                (componentName, partNumber, orderBy, orderDate, dueDate, quantity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                component,
                part_number,
                details.ordered_by,
                details.order_date,
                details.due_date,
                details.quantity
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                StoreError::DuplicateOrder {
                    component: component.clone(),
                    part_number: part_number.clone(),
                }
            } else {
                e.into()
            }
        })?;
        let order_id = tx.last_insert_rowid();

        for name in parameters {
            insert_parameter(&tx, order_id, name)?;
        }
        let summary = OrderSummary {
            order: Order {
                id: order_id,
                component_name: component,
                part_number,
                details,
            },
            parameters: parameters_on(&tx, order_id)?,
        };
        tx.commit()?;

        info!(
            order_id,
            component = %summary.order.component_name,
            part_number = %summary.order.part_number,
            parameters = summary.parameters.len(),
            "order created"
        );
        Ok(summary)
    }

    /// All orders with their parameters.
    pub fn list_orders(&self) -> Result<Vec<OrderSummary>, StoreError> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY orderId"))?;
        let orders = stmt
            .query_map([], order_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        orders
            .into_iter()
            .map(|order| {
                let parameters = parameters_on(&conn, order.id)?;
                Ok(OrderSummary { order, parameters })
            })
            .collect()
    }

    /// The order for a component / part number pair, if any.
    pub fn find_order(
        &self,
        component: &str,
        part_number: &str,
    ) -> Result<Option<Order>, StoreError> {
        let conn = self.connect()?;
        find_order_on(&conn, component, part_number)
    }

    /// The order with the given identifier.
    pub fn order(&self, order_id: i64) -> Result<Order, StoreError> {
        let conn = self.connect()?;
        conn.query_row(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE orderId = ?1"),
            params![order_id],
            order_from_row,
        )
        .optional()?
        .ok_or(StoreError::UnknownOrderId(order_id))
    }

    /// Distinct component names that have orders.
    pub fn component_names(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT componentName FROM orders ORDER BY componentName")?;
        let names = stmt.query_map([], |row| row.get(0))?;
        Ok(names.collect::<Result<Vec<_>, _>>()?)
    }

    /// Part numbers ordered for a component.
    pub fn part_numbers(&self, component: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT partNumber FROM orders WHERE componentName = ?1 ORDER BY partNumber",
        )?;
        let parts = stmt.query_map(params![component], |row| row.get(0))?;
        Ok(parts.collect::<Result<Vec<_>, _>>()?)
    }

    /// Parameters of an order, in definition order.
    pub fn parameters(&self, order_id: i64) -> Result<Vec<ParameterSpec>, StoreError> {
        let conn = self.connect()?;
        parameters_on(&conn, order_id)
    }

    /// One parameter spec of an order, if defined.
    pub fn parameter(
        &self,
        order_id: i64,
        name: &str,
    ) -> Result<Option<ParameterSpec>, StoreError> {
        let conn = self.connect()?;
        Ok(conn
            .query_row(
                "SELECT id, orderId, parameterName, low, high FROM parametersDetails
                 WHERE orderId = ?1 AND parameterName = ?2",
                params![order_id, name],
                parameter_from_row,
            )
            .optional()?)
    }

    /// Add a parameter to an existing order.
    pub fn add_parameter(&self, order_id: i64, name: &str) -> Result<ParameterSpec, StoreError> {
        // Fails with UnknownOrderId before touching the parameter table
        self.order(order_id)?;
        let conn = self.connect()?;
        insert_parameter(&conn, order_id, name)?;
        let id = conn.last_insert_rowid();
        info!(order_id, parameter = name.trim(), "parameter added");
        Ok(ParameterSpec {
            id,
            order_id,
            name: name.trim().to_string(),
            low: None,
            high: None,
        })
    }

    /// Remove a parameter from an order that has no measurements yet.
    pub fn remove_parameter(&self, order_id: i64, name: &str) -> Result<(), StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let measured: i64 = tx.query_row(
            "SELECT COUNT(*) FROM measuredValues WHERE orderId = ?1",
            params![order_id],
            |row| row.get(0),
        )?;
        if measured > 0 {
            return Err(StoreError::OrderLocked(order_id));
        }
        let removed = tx.execute(
            "DELETE FROM parametersDetails WHERE orderId = ?1 AND parameterName = ?2",
            params![order_id, name],
        )?;
        if removed == 0 {
            return Err(StoreError::UnknownParameter {
                order_id,
                parameter: name.to_string(),
            });
        }
        tx.commit()?;
        info!(order_id, parameter = name, "parameter removed");
        Ok(())
    }

    /// Set the acceptable range of a parameter, located by component / part number.
    ///
    /// `None` clears that side of the range.
    pub fn set_bounds(
        &self,
        component: &str,
        part_number: &str,
        parameter: &str,
        low: Option<f64>,
        high: Option<f64>,
    ) -> Result<ParameterSpec, StoreError> {
        if let (Some(low), Some(high)) = (low, high) {
            if low > high {
                return Err(StoreError::InvertedBounds { low, high });
            }
        }
        validation::is_ordered_bound(low, high).map_err(|e| StoreError::Invalid(e.to_string()))?;

        let conn = self.connect()?;
        let order = find_order_on(&conn, component, part_number)?.ok_or_else(|| {
            StoreError::UnknownOrder {
                component: component.to_string(),
                part_number: part_number.to_string(),
            }
        })?;
        let updated = conn.execute(
            "UPDATE parametersDetails SET low = ?1, high = ?2
             WHERE orderId = ?3 AND parameterName = ?4",
            params![low, high, order.id, parameter],
        )?;
        if updated == 0 {
            return Err(StoreError::UnknownParameter {
                order_id: order.id,
                parameter: parameter.to_string(),
            });
        }
        info!(
            order_id = order.id,
            parameter,
            low = ?low,
            high = ?high,
            "parameter range updated"
        );

        Ok(conn.query_row(
            "SELECT id, orderId, parameterName, low, high FROM parametersDetails
             WHERE orderId = ?1 AND parameterName = ?2",
            params![order.id, parameter],
            parameter_from_row,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::StoreError;
    use crate::model::OrderDetails;
    use crate::store::test_support::temp_store;

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_and_list_orders() {
        let (_dir, store) = temp_store();
        let created = store
            .create_order("Battery", "PN-100", &params(&["Voltage", "Resistance"]))
            .unwrap();
        assert_eq!(created.parameters.len(), 2);
        assert!(created.parameters.iter().all(|p| p.bound().is_unbounded()));

        let listed = store.list_orders().unwrap();
        assert_eq!(listed, vec![created.clone()]);
        assert_eq!(
            store.find_order("Battery", "PN-100").unwrap(),
            Some(created.order.clone())
        );
        assert_eq!(store.component_names().unwrap(), vec!["Battery"]);
        assert_eq!(store.part_numbers("Battery").unwrap(), vec!["PN-100"]);
    }

    #[test]
    fn test_duplicate_order_is_rejected() {
        let (_dir, store) = temp_store();
        store.create_order("Battery", "PN-100", &[]).unwrap();
        let err = store.create_order("Battery", "PN-100", &[]).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateOrder { .. }));
    }

    #[test]
    fn test_duplicate_parameter_rolls_back_order() {
        let (_dir, store) = temp_store();
        let err = store
            .create_order("Battery", "PN-100", &params(&["Voltage", "Voltage"]))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateParameter { .. }));
        assert_eq!(store.find_order("Battery", "PN-100").unwrap(), None);
    }

    #[test]
    fn test_set_bounds_updates_and_validates() {
        let (_dir, store) = temp_store();
        store
            .create_order("Battery", "PN-100", &params(&["Voltage"]))
            .unwrap();

        let spec = store
            .set_bounds("Battery", "PN-100", "Voltage", Some(3.0), Some(4.5))
            .unwrap();
        assert_eq!((spec.low, spec.high), (Some(3.0), Some(4.5)));

        let spec = store
            .set_bounds("Battery", "PN-100", "Voltage", None, Some(5.0))
            .unwrap();
        assert_eq!((spec.low, spec.high), (None, Some(5.0)));

        assert!(matches!(
            store.set_bounds("Battery", "PN-100", "Voltage", Some(5.0), Some(1.0)),
            Err(StoreError::InvertedBounds { .. })
        ));
        assert!(matches!(
            store.set_bounds("Battery", "PN-999", "Voltage", Some(1.0), None),
            Err(StoreError::UnknownOrder { .. })
        ));
        assert!(matches!(
            store.set_bounds("Battery", "PN-100", "Current", Some(1.0), None),
            Err(StoreError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn test_add_and_remove_parameter() {
        let (_dir, store) = temp_store();
        let order = store.create_order("Battery", "PN-100", &[]).unwrap().order;

        store.add_parameter(order.id, "Voltage").unwrap();
        assert!(store.parameter(order.id, "Voltage").unwrap().is_some());
        assert!(matches!(
            store.add_parameter(order.id, "Voltage"),
            Err(StoreError::DuplicateParameter { .. })
        ));
        assert!(matches!(
            store.add_parameter(order.id + 1, "Voltage"),
            Err(StoreError::UnknownOrderId(_))
        ));

        store.remove_parameter(order.id, "Voltage").unwrap();
        assert!(store.parameters(order.id).unwrap().is_empty());
        assert!(matches!(
            store.remove_parameter(order.id, "Voltage"),
            Err(StoreError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn test_blank_names_are_rejected() {
        let (_dir, store) = temp_store();
        assert!(matches!(
            store.create_order("  ", "PN-100", &[]),
            Err(StoreError::Invalid(_))
        ));
    }

    fn details() -> OrderDetails {
        OrderDetails {
            ordered_by: Some(" Acme Cells ".into()),
            order_date: Some("2025-04-01".into()),
            due_date: Some("2025-05-15".into()),
            quantity: Some(250),
        }
    }

    #[test]
    fn test_order_details_are_stored() {
        let (_dir, store) = temp_store();
        let created = store
            .create_order_with("Battery", "PN-100", &params(&["Voltage"]), &details())
            .unwrap();
        assert_eq!(created.order.details.ordered_by.as_deref(), Some("Acme Cells"));

        let order = store.order(created.order.id).unwrap();
        assert_eq!(order, created.order);
        assert_eq!(order.details.quantity, Some(250));
        assert_eq!(order.details.due_date.as_deref(), Some("2025-05-15"));

        let plain = store.create_order("Cell", "PN-1", &[]).unwrap();
        assert!(store.order(plain.order.id).unwrap().details.is_empty());
    }

    #[test]
    fn test_invalid_order_details_are_rejected() {
        let (_dir, store) = temp_store();
        let cases = [
            OrderDetails {
                order_date: Some("01/04/2025".into()),
                ..details()
            },
            OrderDetails {
                due_date: Some("2025-03-31".into()),
                ..details()
            },
            OrderDetails {
                quantity: Some(0),
                ..details()
            },
            OrderDetails {
                ordered_by: Some("  ".into()),
                ..details()
            },
        ];
        for case in cases {
            let err = store
                .create_order_with("Battery", "PN-100", &[], &case)
                .unwrap_err();
            assert!(matches!(err, StoreError::Invalid(_)), "{case:?}: {err}");
        }
        assert!(store.list_orders().unwrap().is_empty());
    }
}
