//! Remote store error types.

/// Errors produced by a [`RemoteStore`](crate::RemoteStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transport failure: connection refused, reset, TLS, timeout.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The remote rejected our credentials.
    #[error("remote rejected credentials (HTTP {status})")]
    Auth { status: u16 },

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote refused to open a resumable session.
    #[error("session initiation rejected: {0}")]
    SessionInit(String),

    #[error("invalid access token")]
    InvalidToken,
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl StoreError {
    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => StoreError::Auth { status },
            _ => StoreError::Api { status, body },
        }
    }
}
