//! ARM error types.

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the management API client.
#[derive(Debug, Error)]
pub enum ArmError {
    /// The service answered with a non-success status code.
    #[error("unexpected status {status}{}: {message}", code_suffix(.code))]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A long-running operation reached a terminal, unsuccessful state.
    #[error("long-running operation ended in state {status}{}: {message}", code_suffix(.code))]
    OperationFailed {
        status: String,
        code: Option<String>,
        message: String,
    },

    /// Connection, TLS or protocol failure.
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not match the expected model.
    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),

    /// No usable access token.
    #[error("no access token available")]
    MissingCredential,

    /// Endpoint or polling URL could not be used.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ArmError {
    /// Whether the service reported that the addressed resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArmError::Status { status: 404, .. })
    }

    /// Build a status error from a raw response body.
    ///
    /// ARM wraps failures in `{"error": {"code": ..., "message": ...}}`; anything
    /// else is kept verbatim as the message.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope { error: Some(detail) }) => ArmError::Status {
                status,
                code: detail.code,
                message: detail.message.unwrap_or_default(),
            },
            _ => ArmError::Status {
                status,
                code: None,
                message: String::from_utf8_lossy(body).trim().to_string(),
            },
        }
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub(crate) error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub(crate) code: Option<String>,
    pub(crate) message: Option<String>,
}

/// Result type for ARM operations.
pub type Result<T> = std::result::Result<T, ArmError>;
