//! Bearer-token session handling.
//!
//! The backend issues JWTs; the client decodes the payload segment for UI
//! personalization only. No signature verification happens here — the backend
//! stays the authority on token validity, and nothing in this module may be
//! treated as a trust boundary.

use std::sync::{Arc, PoisonError, RwLock};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

/// Identity decoded from a bearer token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub email: Option<String>,
}

impl AuthSession {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Why a token failed to decode. Callers map every variant to "not
/// authenticated"; the reason only ever reaches the logs.
#[derive(Debug, Error)]
pub enum TokenDecodeError {
    #[error("token must have three segments, got {0}")]
    MalformedToken(usize),
    #[error("payload segment is not valid base64url: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    #[error("payload is not a valid claims object: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("payload has no user id claim")]
    MissingUserId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    #[serde(default, alias = "id")]
    user_id: Option<i64>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Decode the payload segment of a bearer token into an [`AuthSession`].
///
/// Claim mapping: `userId`/`id` is required; the username falls back through
/// `username`, `sub` and `name` before defaulting to `"User"`; `role`
/// defaults to `"user"`; an empty `email` claim counts as absent.
pub fn decode_token(token: &str) -> Result<AuthSession, TokenDecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenDecodeError::MalformedToken(segments.len()));
    }

    let payload = URL_SAFE_NO_PAD.decode(segments[1])?;
    let claims: Claims = serde_json::from_slice(&payload)?;
    let user_id = claims.user_id.ok_or(TokenDecodeError::MissingUserId)?;

    Ok(AuthSession {
        user_id,
        username: claims
            .username
            .or(claims.sub)
            .or(claims.name)
            .unwrap_or_else(|| "User".to_string()),
        role: claims.role.unwrap_or_else(|| "user".to_string()),
        email: claims.email.filter(|email| !email.is_empty()),
    })
}

/// Durable slot for the bearer token. Implementations must degrade silently:
/// a missing or unreadable slot is simply "no token".
pub trait TokenStore: Send + Sync {
    fn load_token(&self) -> Option<String>;
    fn save_token(&self, token: &str);
    fn clear_token(&self);
}

/// Owns the current session.
///
/// Created unauthenticated; [`restore`](Self::restore) picks up a previously
/// stored token, [`login`](Self::login) and [`logout`](Self::logout) drive the
/// state machine. Sessions are never mutated in place — a token change always
/// re-decodes.
pub struct AuthManager {
    store: Arc<dyn TokenStore>,
    state: RwLock<Option<(String, AuthSession)>>,
}

impl AuthManager {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            state: RwLock::new(None),
        }
    }

    /// Restore the session from the stored token, if any. A stored token that
    /// no longer decodes is cleared rather than reported as an error.
    pub fn restore(&self) -> Option<AuthSession> {
        let token = self.store.load_token()?;
        match decode_token(&token) {
            Ok(session) => {
                debug!("restored session for user {}", session.username);
                *self.write_state() = Some((token, session.clone()));
                Some(session)
            }
            Err(err) => {
                warn!("stored token no longer decodes, clearing it: {err}");
                self.store.clear_token();
                None
            }
        }
    }

    /// Accept a freshly issued token. On success the token is persisted and
    /// the decoded session becomes current.
    pub fn login(&self, token: &str) -> Result<AuthSession, TokenDecodeError> {
        let session = decode_token(token)?;
        self.store.save_token(token);
        *self.write_state() = Some((token.to_string(), session.clone()));
        Ok(session)
    }

    pub fn logout(&self) {
        self.store.clear_token();
        *self.write_state() = None;
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.read_state().as_ref().map(|(_, session)| session.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.read_state().as_ref().map(|(token, _)| token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_state().is_some()
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, Option<(String, AuthSession)>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, Option<(String, AuthSession)>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn make_token(payload: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload);
        format!("{header}.{body}.signature")
    }

    #[derive(Default)]
    struct MemoryTokenStore {
        token: Mutex<Option<String>>,
    }

    impl TokenStore for MemoryTokenStore {
        fn load_token(&self) -> Option<String> {
            self.token.lock().unwrap().clone()
        }

        fn save_token(&self, token: &str) {
            *self.token.lock().unwrap() = Some(token.to_string());
        }

        fn clear_token(&self) {
            *self.token.lock().unwrap() = None;
        }
    }

    #[test]
    fn decodes_well_formed_token() {
        let token = make_token(r#"{"userId":7,"username":"ann","role":"admin"}"#);
        let session = decode_token(&token).unwrap();
        assert_eq!(session.user_id, 7);
        assert_eq!(session.username, "ann");
        assert_eq!(session.role, "admin");
        assert_eq!(session.email, None);
        assert!(session.is_admin());
    }

    #[test]
    fn falls_back_through_username_claims() {
        let token = make_token(r#"{"id":3,"sub":"bea"}"#);
        let session = decode_token(&token).unwrap();
        assert_eq!(session.user_id, 3);
        assert_eq!(session.username, "bea");
        assert_eq!(session.role, "user");
    }

    #[test]
    fn defaults_username_when_no_claim_matches() {
        let token = make_token(r#"{"userId":5,"email":""}"#);
        let session = decode_token(&token).unwrap();
        assert_eq!(session.username, "User");
        // An empty email claim counts as absent.
        assert_eq!(session.email, None);
    }

    #[test]
    fn rejects_token_with_missing_segment() {
        let token = make_token(r#"{"userId":1}"#);
        let truncated = token.rsplit_once('.').unwrap().0.to_string();
        assert!(matches!(
            decode_token(&truncated),
            Err(TokenDecodeError::MalformedToken(2))
        ));
    }

    #[test]
    fn rejects_garbage_payload() {
        assert!(matches!(
            decode_token("a.!!!.c"),
            Err(TokenDecodeError::InvalidEncoding(_))
        ));
        let not_json = format!("a.{}.c", URL_SAFE_NO_PAD.encode("not json"));
        assert!(matches!(
            decode_token(&not_json),
            Err(TokenDecodeError::InvalidPayload(_))
        ));
    }

    #[test]
    fn rejects_payload_without_user_id() {
        let token = make_token(r#"{"username":"ann"}"#);
        assert!(matches!(
            decode_token(&token),
            Err(TokenDecodeError::MissingUserId)
        ));
    }

    #[test]
    fn login_logout_cycle() {
        let store = Arc::new(MemoryTokenStore::default());
        let manager = AuthManager::new(store.clone());
        assert!(!manager.is_authenticated());

        let token = make_token(r#"{"userId":2,"username":"cid"}"#);
        let session = manager.login(&token).unwrap();
        assert_eq!(session.username, "cid");
        assert!(manager.is_authenticated());
        assert_eq!(manager.token().as_deref(), Some(token.as_str()));
        assert!(store.load_token().is_some());

        manager.logout();
        assert!(!manager.is_authenticated());
        assert!(store.load_token().is_none());
    }

    #[test]
    fn login_with_bad_token_stays_unauthenticated() {
        let manager = AuthManager::new(Arc::new(MemoryTokenStore::default()));
        assert!(manager.login("nope").is_err());
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn restore_clears_undecodable_stored_token() {
        let store = Arc::new(MemoryTokenStore::default());
        store.save_token("corrupt-token");
        let manager = AuthManager::new(store.clone());
        assert!(manager.restore().is_none());
        assert!(store.load_token().is_none());
    }

    #[test]
    fn restore_picks_up_stored_token() {
        let store = Arc::new(MemoryTokenStore::default());
        store.save_token(&make_token(r#"{"userId":4,"username":"dee"}"#));
        let manager = AuthManager::new(store);
        let session = manager.restore().unwrap();
        assert_eq!(session.user_id, 4);
        assert!(manager.is_authenticated());
    }
}
