//! Error types for the back-office client.

use thiserror::Error;

pub use crate::auth::error::AuthError;

/// Primary error type for all client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend answered with a non-success status. The body is kept
    /// verbatim as the message.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Token refresh failed; the session is gone until the caller logs in
    /// again. The token store has already been cleared.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// HTTP status of the failure, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Auth(AuthError::Refresh { status, .. }) => Some(*status),
            Self::Network(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Whether this failure means the session is invalid and the caller
    /// should route the user to a login surface.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_)) || self.status() == Some(401)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
