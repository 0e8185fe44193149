use axum::http::HeaderMap;

use crate::error::AppError;

use super::principal::Principal;
use super::session::SessionManager;

/// Extract the bearer credential from the Authorization header. Accepts both
/// a bare token and the `Bearer <token>` form.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("authorization")?;
    let s = raw.to_str().ok()?.trim();
    let token = s.strip_prefix("Bearer ").unwrap_or(s).trim();
    if token.is_empty() { None } else { Some(token.to_string()) }
}

/// Gate for protected handlers. On `Err` the caller must return the mapped
/// response immediately and perform no further work.
pub fn authorize(sessions: &SessionManager, headers: &HeaderMap) -> Result<Principal, AppError> {
    let Some(token) = bearer_token(headers) else {
        return Err(AppError::auth("missing_token", "authorization token required"));
    };
    sessions
        .validate(&token)
        .ok_or_else(|| AppError::auth("invalid_token", "unknown or revoked session token"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(token).unwrap());
        headers
    }

    fn manager_with_session() -> (SessionManager, String) {
        let sm = SessionManager::new();
        let sess = sm.issue(Principal { user_id: 7, username: "alice".into() });
        (sm, sess.token)
    }

    #[test]
    fn bearer_prefix_is_optional() {
        assert_eq!(bearer_token(&headers_with("abc123")), Some("abc123".to_string()));
        assert_eq!(bearer_token(&headers_with("Bearer abc123")), Some("abc123".to_string()));
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers_with("   ")), None);
    }

    #[test]
    fn authorize_accepts_live_token() {
        let (sm, token) = manager_with_session();
        let principal = authorize(&sm, &headers_with(&token)).unwrap();
        assert_eq!(principal.username, "alice");
    }

    #[test]
    fn authorize_rejects_missing_and_revoked_tokens() {
        let (sm, token) = manager_with_session();
        assert!(authorize(&sm, &HeaderMap::new()).is_err());

        sm.revoke(&token);
        let err = authorize(&sm, &headers_with(&token)).unwrap_err();
        assert_eq!(err.http_status(), 401);
    }
}
