//! Group network error types.

use thiserror::Error;

/// Errors that can occur while publishing to the group network.
#[derive(Debug, Error)]
pub enum NetError {
    /// HTTP request failed.
    #[error("Group request failed: {0}")]
    RequestFailed(String),

    /// The API answered with a non-success status.
    #[error("Group API rejected the message: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Request timed out.
    #[error("Group request timed out")]
    Timeout,

    /// Group network is unreachable or not configured.
    #[error("Group network unavailable: {0}")]
    Unavailable(String),

    /// Payload could not be encoded.
    #[error("Failed to encode payload: {0}")]
    Encode(String),
}

impl From<reqwest::Error> for NetError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetError::Timeout
        } else if err.is_connect() {
            NetError::Unavailable(err.to_string())
        } else {
            NetError::RequestFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for NetError {
    fn from(err: serde_json::Error) -> Self {
        NetError::Encode(err.to_string())
    }
}
