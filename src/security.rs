//! User catalog and password handling. Credentials are stored as Argon2 PHC
//! strings in the users table; verification never exposes which of username
//! or password was wrong.

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use tracing::warn;

use crate::model::User;
use crate::storage::Store;

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

/// Add a user, replacing any existing row with the same username.
pub fn add_user(store: &Store, username: &str, password: &str, display_name: &str) -> Result<User> {
    let existing = store.find_all::<User>()?;
    for row in existing.iter().filter(|u| u.username == username) {
        store.delete::<User>(row.id)?;
    }
    let hash = hash_password(password)?;
    let user = store.create(User {
        id: 0,
        username: username.to_string(),
        password_hash: hash,
        display_name: display_name.to_string(),
    })?;
    Ok(user)
}

/// Seed an `admin` user on first start so the service is reachable.
pub fn ensure_default_admin(store: &Store) -> Result<()> {
    if !store.find_all::<User>()?.is_empty() {
        return Ok(());
    }
    add_user(store, "admin", "admin", "Administrator")?;
    warn!(target: "salesdesk::security", "seeded default admin user; change its password");
    Ok(())
}

/// Verify a credential pair against the user catalog. Returns the matched
/// user only when exactly one row carries the username and the password
/// verifies against its hash.
pub fn authenticate(store: &Store, username: &str, password: &str) -> Result<Option<User>> {
    let users = store.find_all::<User>()?;
    let matches: Vec<&User> = users.iter().filter(|u| u.username == username).collect();
    let &[user] = matches.as_slice() else {
        return Ok(None);
    };
    if verify_password(&user.password_hash, password) {
        Ok(Some(user.clone()))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn hash_and_verify_roundtrip() {
        let phc = hash_password("s3cr3t!").unwrap();
        assert!(phc.starts_with("$argon2"));
        assert!(verify_password(&phc, "s3cr3t!"));
        assert!(!verify_password(&phc, "wrong"));
        assert!(!verify_password("not-a-phc-string", "s3cr3t!"));
    }

    #[test]
    fn authenticate_matches_exactly_one_user() {
        let tmp = tempdir().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        add_user(&store, "alice", "secret", "Alice").unwrap();

        let ok = authenticate(&store, "alice", "secret").unwrap();
        assert_eq!(ok.map(|u| u.username), Some("alice".to_string()));
        assert!(authenticate(&store, "alice", "nope").unwrap().is_none());
        assert!(authenticate(&store, "bob", "secret").unwrap().is_none());
    }

    #[test]
    fn add_user_replaces_existing_username() {
        let tmp = tempdir().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        add_user(&store, "alice", "old", "Alice").unwrap();
        add_user(&store, "alice", "new", "Alice").unwrap();

        assert!(authenticate(&store, "alice", "old").unwrap().is_none());
        assert!(authenticate(&store, "alice", "new").unwrap().is_some());
        let rows = store.find_all::<User>().unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn default_admin_seeded_once() {
        let tmp = tempdir().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        ensure_default_admin(&store).unwrap();
        ensure_default_admin(&store).unwrap();
        assert_eq!(store.find_all::<User>().unwrap().len(), 1);
        assert!(authenticate(&store, "admin", "admin").unwrap().is_some());
    }
}
