use thiserror::Error;

/// Failures in the token-refresh and session flows.
///
/// Variants carry owned strings rather than source errors so the type is
/// `Clone`: one refresh failure is handed to every request queued behind
/// the refresh call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The refresh endpoint answered with a non-success status.
    #[error("refresh rejected with status {status}: {message}")]
    Refresh { status: u16, message: String },

    /// The refresh call never produced a response.
    #[error("network error during refresh: {0}")]
    Network(String),

    /// The refresh endpoint answered 2xx with an unusable body.
    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),

    /// The task driving the refresh was dropped before it settled.
    #[error("refresh was interrupted before completing")]
    Interrupted,
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}
