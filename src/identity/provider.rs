use anyhow::{anyhow, Result};

use crate::storage::SharedStore;
use crate::tprintln;

use super::principal::Principal;
use super::session::{Session, SessionManager};

// Keep provider request/response plain Rust structs; the HTTP payload shape
// is the server's concern.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub session: Session,
}

pub trait AuthProvider: Send + Sync {
    fn login(&self, req: &LoginRequest) -> Result<LoginResponse>;
}

/// Login against the local user catalog: one matching username whose Argon2
/// hash verifies, then a freshly issued session.
pub struct LocalAuthProvider {
    pub store: SharedStore,
    pub sessions: SessionManager,
}

impl LocalAuthProvider {
    pub fn new(store: SharedStore, sessions: SessionManager) -> Self {
        Self { store, sessions }
    }
}

impl AuthProvider for LocalAuthProvider {
    fn login(&self, req: &LoginRequest) -> Result<LoginResponse> {
        let user = {
            let guard = self.store.0.lock();
            crate::security::authenticate(&guard, &req.username, &req.password)?
        };
        let Some(user) = user else {
            return Err(anyhow!("invalid_credentials"));
        };
        let principal = Principal { user_id: user.id, username: user.username };
        let session = self.sessions.issue(principal);
        tprintln!("auth.login user={}", req.username);
        Ok(LoginResponse { session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn provider_with_user(username: &str, password: &str) -> (LocalAuthProvider, tempfile::TempDir) {
        let tmp = tempdir().unwrap();
        let store = SharedStore::new(tmp.path()).unwrap();
        {
            let guard = store.0.lock();
            crate::security::add_user(&guard, username, password, "Test User").unwrap();
        }
        (LocalAuthProvider::new(store, SessionManager::new()), tmp)
    }

    #[test]
    fn login_issues_validatable_session() {
        let (provider, _tmp) = provider_with_user("alice", "secret");
        let req = LoginRequest { username: "alice".into(), password: "secret".into() };
        let resp = provider.login(&req).unwrap();
        let principal = provider.sessions.validate(&resp.session.token).unwrap();
        assert_eq!(principal.username, "alice");
    }

    #[test]
    fn login_rejects_bad_password_without_issuing() {
        let (provider, _tmp) = provider_with_user("alice", "secret");
        let req = LoginRequest { username: "alice".into(), password: "wrong".into() };
        assert!(provider.login(&req).is_err());
        assert_eq!(provider.sessions.live_count(), 0);
    }
}
