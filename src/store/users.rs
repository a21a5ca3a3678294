//! User accounts.

use super::{is_constraint_violation, Store};
use crate::error::StoreError;
use crate::model::{Role, User};
use crate::validation;
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    let role = role.parse::<Role>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        role,
    })
}

fn duplicate_or(err: rusqlite::Error, username: &str) -> StoreError {
    if is_constraint_violation(&err) {
        StoreError::DuplicateUser(username.to_string())
    } else {
        err.into()
    }
}

/// Changes to apply to an account. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New display name
    pub name: Option<String>,
    /// New login name
    pub username: Option<String>,
    /// New argon2id password hash
    pub password_hash: Option<String>,
    /// New role
    pub role: Option<Role>,
}

impl Store {
    /// Insert an account. The password must already be hashed.
    pub fn create_user(
        &self,
        name: &str,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, StoreError> {
        for (field, value) in [("name", name), ("username", username)] {
            validation::is_not_empty(value)
                .map_err(|e| StoreError::Invalid(format!("{field}: {e}")))?;
        }
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO users (name, username, password, employee_type) VALUES (?1, ?2, ?3, ?4)",
            params![name, username, password_hash, role.as_str()],
        )
        .map_err(|e| duplicate_or(e, username))?;
        let user = User {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            username: username.to_string(),
            role,
        };
        info!(username, role = %role, "user created");
        Ok(user)
    }

    /// Insert an account unless the username exists. Returns whether a row was added.
    pub fn ensure_user(
        &self,
        name: &str,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<bool, StoreError> {
        let conn = self.connect()?;
        let added = conn.execute(
            "INSERT OR IGNORE INTO users (name, username, password, employee_type)
             VALUES (?1, ?2, ?3, ?4)",
            params![name, username, password_hash, role.as_str()],
        )?;
        Ok(added > 0)
    }

    /// All accounts, by id.
    pub fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT id, name, username, employee_type FROM users ORDER BY id")?;
        let users = stmt.query_map([], user_from_row)?;
        Ok(users.collect::<Result<Vec<_>, _>>()?)
    }

    /// Look up an account by login name.
    pub fn user(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.credentials(username)?.map(|(user, _)| user))
    }

    /// The account and its stored password hash.
    pub fn credentials(&self, username: &str) -> Result<Option<(User, String)>, StoreError> {
        let conn = self.connect()?;
        Ok(conn
            .query_row(
                "SELECT id, name, username, employee_type, password FROM users WHERE username = ?1",
                params![username],
                |row| Ok((user_from_row(row)?, row.get(4)?)),
            )
            .optional()?)
    }

    /// Apply an update to the account with login name `username`.
    pub fn update_user(&self, username: &str, update: &UserUpdate) -> Result<User, StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let current = tx
            .query_row(
                "SELECT id, name, username, employee_type FROM users WHERE username = ?1",
                params![username],
                user_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::UnknownUser(username.to_string()))?;

        let name = update.name.as_deref().unwrap_or(&current.name);
        let new_username = update.username.as_deref().unwrap_or(&current.username);
        let role = update.role.unwrap_or(current.role);
        validation::is_not_empty(name).map_err(|e| StoreError::Invalid(format!("name: {e}")))?;
        validation::is_not_empty(new_username)
            .map_err(|e| StoreError::Invalid(format!("username: {e}")))?;

        tx.execute(
            "UPDATE users SET name = ?1, username = ?2, employee_type = ?3 WHERE id = ?4",
            params![name, new_username, role.as_str(), current.id],
        )
        .map_err(|e| duplicate_or(e, new_username))?;
        if let Some(hash) = &update.password_hash {
            tx.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                params![hash, current.id],
            )?;
        }
        let updated = User {
            id: current.id,
            name: name.to_string(),
            username: new_username.to_string(),
            role,
        };
        tx.commit()?;

        info!(username = %updated.username, role = %updated.role, "user updated");
        Ok(updated)
    }

    /// Delete an account.
    pub fn delete_user(&self, username: &str) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let removed = conn.execute("DELETE FROM users WHERE username = ?1", params![username])?;
        if removed == 0 {
            return Err(StoreError::UnknownUser(username.to_string()));
        }
        info!(username, "user removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::temp_store;

    #[test]
    fn test_user_lifecycle() {
        let (_dir, store) = temp_store();
        let user = store
            .create_user("Jane Doe", "jane", "digest", Role::Operator)
            .unwrap();
        assert_eq!(store.list_users().unwrap(), vec![user.clone()]);
        assert_eq!(
            store.credentials("jane").unwrap(),
            Some((user.clone(), "digest".to_string()))
        );

        let updated = store
            .update_user(
                "jane",
                &UserUpdate {
                    role: Some(Role::Supervisor),
                    password_hash: Some("other".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.role, Role::Supervisor);
        assert_eq!(updated.name, "Jane Doe");
        assert_eq!(store.credentials("jane").unwrap().unwrap().1, "other");

        store.delete_user("jane").unwrap();
        assert_eq!(store.user("jane").unwrap(), None);
        assert!(matches!(
            store.delete_user("jane"),
            Err(StoreError::UnknownUser(_))
        ));
    }

    #[test]
    fn test_usernames_are_unique() {
        let (_dir, store) = temp_store();
        store.create_user("A", "a", "x", Role::Admin).unwrap();
        store.create_user("B", "b", "x", Role::Operator).unwrap();
        assert!(matches!(
            store.create_user("A2", "a", "x", Role::Admin),
            Err(StoreError::DuplicateUser(_))
        ));
        assert!(matches!(
            store.update_user(
                "b",
                &UserUpdate {
                    username: Some("a".into()),
                    ..Default::default()
                }
            ),
            Err(StoreError::DuplicateUser(_))
        ));
    }

    #[test]
    fn test_ensure_user_is_idempotent() {
        let (_dir, store) = temp_store();
        assert!(store.ensure_user("A", "a", "x", Role::Admin).unwrap());
        assert!(!store.ensure_user("A", "a", "y", Role::Admin).unwrap());
        assert_eq!(store.credentials("a").unwrap().unwrap().1, "x");
    }
}
