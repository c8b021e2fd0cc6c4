use std::fmt;
use std::sync::{Arc, RwLock};

use serde::Deserialize;

/// Opaque bearer credential issued by the backend.
///
/// The client never inspects the token; it only forwards it in the
/// `Authorization` header. `Debug` redacts the value so tokens do not leak
/// into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AccessToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AccessToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Process-wide in-memory holder of the current access token.
///
/// Cloning hands out another handle to the same slot; the dispatcher, the
/// refresh coordinator, and the login/logout flow all share one store.
/// `None` means unauthenticated. The token lives only in memory and is
/// never written to durable storage.
#[derive(Clone, Default)]
pub struct TokenStore {
    slot: Arc<RwLock<Option<AccessToken>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token, if any. Never blocks on I/O and has no side effects.
    pub fn get(&self) -> Option<AccessToken> {
        self.slot.read().ok().and_then(|slot| slot.clone())
    }

    /// Replace the stored token. `None` represents the logged-out state.
    pub fn set(&self, token: Option<AccessToken>) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = token;
        }
    }

    /// Drop the stored token. Idempotent: clearing an empty store is a no-op.
    pub fn clear(&self) {
        self.set(None);
    }
}

/// Body returned by `POST /auth/login` and `POST /auth/refresh`.
///
/// Only `access_token` is consumed. The refresh credential itself travels as
/// an httpOnly cookie the backend re-sets on each response; the client never
/// reads it.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_none_on_fresh_store() {
        let store = TokenStore::new();
        assert!(store.get().is_none());
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = TokenStore::new();
        store.set(Some(AccessToken::new("t1")));
        assert_eq!(store.get().unwrap().as_str(), "t1");
    }

    #[test]
    fn clear_is_idempotent() {
        let store = TokenStore::new();
        store.clear();
        assert!(store.get().is_none());
        store.set(Some(AccessToken::new("t1")));
        store.clear();
        store.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn clones_share_the_same_slot() {
        let store = TokenStore::new();
        let handle = store.clone();
        store.set(Some(AccessToken::new("t1")));
        assert_eq!(handle.get().unwrap().as_str(), "t1");
        handle.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn debug_redacts_the_secret() {
        let token = AccessToken::new("super-secret");
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn token_response_tolerates_missing_optional_fields() {
        let body: TokenResponse =
            serde_json::from_str(r#"{"access_token": "t2", "token_type": "bearer"}"#).unwrap();
        assert_eq!(body.access_token, "t2");
        assert_eq!(body.token_type.as_deref(), Some("bearer"));
        assert!(body.refresh_token.is_none());
    }
}
