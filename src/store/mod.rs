//! SQLite persistence shared by every role.
//!
//! The store keeps only the database path. Each operation opens its own
//! short-lived connection and closes it on return, so several station
//! processes can share one file without holding locks between actions.
//! The only multi-statement transaction is the measurement commit
//! (see [`Store::commit_measurements`]).
//!
//! Operations are grouped by table:
//!
//! - `orders`: orders and their parameter specs (manufacturer and supervisor)
//! - `measurements`: serial reservation, commit, previous entries, reports
//! - `users`: accounts and credentials (admin)

use crate::error::StoreError;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

mod measurements;
mod orders;
mod schema;
mod users;

pub use measurements::MeasurementFilter;
pub use users::UserUpdate;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the shared station database.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Open the database at `path`, creating the file and schema if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        let conn = store.connect()?;
        schema::create(&conn)?;
        debug!(path = %store.path.display(), "database ready");
        Ok(store)
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a short-lived connection.
    pub fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }
}

/// True when `err` is a UNIQUE/PRIMARY KEY/foreign key violation.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Reads a column as text whatever its storage class.
///
/// Older databases stored single values as REAL; newer rows hold comma-joined text.
pub(crate) fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::temp_store;
    use super::*;

    #[test]
    fn test_open_is_idempotent() {
        let (_dir, store) = temp_store();
        let again = Store::open(store.path()).unwrap();
        assert_eq!(again.path(), store.path());
    }

    #[test]
    fn test_text_column_reads_legacy_real_values() {
        let (_dir, store) = temp_store();
        let conn = store.connect().unwrap();
        let (real, text): (String, String) = conn
            .query_row("SELECT 4.5, 'a,b'", [], |row| {
                Ok((text_column(row, 0)?, text_column(row, 1)?))
            })
            .unwrap();
        assert_eq!(real, "4.5");
        assert_eq!(text, "a,b");
    }
}
