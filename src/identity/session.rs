use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use parking_lot::RwLock;

use crate::tprintln;

use super::principal::Principal;

pub type SessionToken = String;

/// A live login: the bearer token, who it authenticates, and when it was
/// issued. Sessions live until revoked or process exit; there is no TTL.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub principal: Principal,
    pub issued_at: Instant,
}

fn gen_token() -> String {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Process-wide registry of live sessions, keyed by token. The registry is
/// owned state behind an `RwLock`; insert and remove are atomic with respect
/// to `validate`.
#[derive(Clone, Default)]
pub struct SessionManager {
    inner: Arc<RwLock<HashMap<SessionToken, Session>>>,
}

impl SessionManager {
    pub fn new() -> Self { Self::default() }

    /// Record a new session for the principal and return it. The token is
    /// guaranteed distinct from every currently live token.
    pub fn issue(&self, principal: Principal) -> Session {
        let mut map = self.inner.write();
        let mut token = gen_token();
        // Re-roll on the (vanishing) chance of colliding with a live token;
        // the write lock is held, so two concurrent issues cannot race.
        while map.contains_key(&token) {
            token = gen_token();
        }
        let sess = Session {
            token: token.clone(),
            principal,
            issued_at: Instant::now(),
        };
        map.insert(token, sess.clone());
        tprintln!("session.issue user={}", sess.principal.username);
        sess
    }

    /// Look up a token. A missing or revoked token is an expected condition,
    /// not an error.
    pub fn validate(&self, token: &str) -> Option<Principal> {
        self.inner.read().get(token).map(|s| s.principal.clone())
    }

    /// Remove the session if present. Revoking an absent token is a no-op.
    pub fn revoke(&self, token: &str) -> bool {
        let removed = self.inner.write().remove(token).is_some();
        if removed {
            tprintln!("session.revoke token_prefix={}", &token[..token.len().min(8)]);
        }
        removed
    }

    pub fn live_count(&self) -> usize {
        self.inner.read().len()
    }
}
