//! Login and role checks.
//!
//! Passwords are stored as argon2id PHC strings, each with its own random
//! salt, so the stored hash does not depend on the login name.

use crate::error::{AppResult, AuthError};
use crate::model::{Role, User};
use crate::store::Store;
use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use tracing::{info, warn};

/// Accounts created by `init-db` on an empty database: (name, username, password, role).
pub const DEFAULT_USERS: [(&str, &str, &str, Role); 4] = [
    ("Admin User", "admin", "admin123", Role::Admin),
    ("Supervisor User", "supervisor", "supervisor123", Role::Supervisor),
    ("Manufacturer User", "manufacturer", "manufacturer123", Role::Manufacturer),
    ("Operator User", "operator", "operator123", Role::Operator),
];

/// Hash a plain password with argon2id.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Verify a password against a stored argon2id hash.
///
/// A stored value that is not a PHC string never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Check credentials against the store.
///
/// Unknown usernames and wrong passwords give the same error.
pub fn authenticate(store: &Store, username: &str, password: &str) -> AppResult<User> {
    match store.credentials(username)? {
        Some((user, hash)) if verify_password(password, &hash) => {
            info!(username, role = %user.role, "login");
            Ok(user)
        }
        _ => {
            warn!(username, "login rejected");
            Err(AuthError::InvalidCredentials.into())
        }
    }
}

/// Create the default accounts that are missing. Returns how many were added.
pub fn seed_default_users(store: &Store) -> AppResult<usize> {
    let mut added = 0;
    for (name, username, password, role) in DEFAULT_USERS {
        if store.ensure_user(name, username, &hash_password(password)?, role)? {
            added += 1;
        }
    }
    if added > 0 {
        info!(added, "default accounts seeded");
    }
    Ok(added)
}

/// Allow `user` through only if their role is one of `allowed`.
pub fn require(user: &User, allowed: &[Role], action: &str) -> Result<(), AuthError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden {
            role: user.role.to_string(),
            action: action.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QcError;
    use crate::store::test_support::temp_store;
    use crate::store::UserUpdate;

    #[test]
    fn test_hash_uses_random_salt() {
        let a = hash_password("secret").unwrap();
        let b = hash_password("secret").unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
        assert!(verify_password("secret", &a));
        assert!(verify_password("secret", &b));
        assert!(!verify_password("Secret", &a));
    }

    #[test]
    fn test_legacy_digest_never_verifies() {
        let digest = "ab".repeat(32);
        assert!(!verify_password("operator123", &digest));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn test_seeded_accounts_can_log_in() {
        let (_dir, store) = temp_store();
        assert_eq!(seed_default_users(&store).unwrap(), 4);
        assert_eq!(seed_default_users(&store).unwrap(), 0);

        let operator = authenticate(&store, "operator", "operator123").unwrap();
        assert_eq!(operator.role, Role::Operator);
        assert_eq!(operator.name, "Operator User");
    }

    #[test]
    fn test_bad_credentials_are_rejected() {
        let (_dir, store) = temp_store();
        seed_default_users(&store).unwrap();
        for (user, password) in [("operator", "nope"), ("ghost", "operator123")] {
            assert!(matches!(
                authenticate(&store, user, password),
                Err(QcError::Auth(AuthError::InvalidCredentials))
            ));
        }
    }

    #[test]
    fn test_role_gate() {
        let user = User {
            id: 1,
            name: "Op".into(),
            username: "op".into(),
            role: Role::Operator,
        };
        assert!(require(&user, &[Role::Operator], "capture").is_ok());
        let err = require(&user, &[Role::Admin], "manage users").unwrap_err();
        assert_eq!(err.to_string(), "Role 'operator' may not manage users");
    }

    #[test]
    fn test_renamed_account_keeps_its_password() {
        let (_dir, store) = temp_store();
        seed_default_users(&store).unwrap();
        store
            .update_user(
                "operator",
                &UserUpdate {
                    username: Some("op2".into()),
                    ..UserUpdate::default()
                },
            )
            .unwrap();

        let user = authenticate(&store, "op2", "operator123").unwrap();
        assert_eq!(user.role, Role::Operator);
        assert!(matches!(
            authenticate(&store, "operator", "operator123"),
            Err(QcError::Auth(AuthError::InvalidCredentials))
        ));
    }

    #[test]
    fn test_password_change_replaces_hash() {
        let (_dir, store) = temp_store();
        seed_default_users(&store).unwrap();
        store
            .update_user(
                "supervisor",
                &UserUpdate {
                    password_hash: Some(hash_password("changed").unwrap()),
                    ..UserUpdate::default()
                },
            )
            .unwrap();

        assert!(authenticate(&store, "supervisor", "changed").is_ok());
        assert!(authenticate(&store, "supervisor", "supervisor123").is_err());
    }
}
