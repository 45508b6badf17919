use reqwest::StatusCode;
use thiserror::Error;

use coach_client_core::ScheduleInputError;

/// Failure of a gateway call. `Display` is always a single, non-empty,
/// human-readable message suitable for showing to the user as-is.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("Request cancelled")]
    Cancelled,
    #[error("{0}")]
    Transport(String),
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid request: {0}")]
    Encode(String),
    #[error("{0}")]
    Input(String),
}

impl GatewayError {
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<ScheduleInputError> for GatewayError {
    fn from(error: ScheduleInputError) -> Self {
        Self::Input(error.to_string())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(error: reqwest::Error) -> Self {
        let message = error.to_string();
        if message.trim().is_empty() {
            Self::Transport("Network request failed".to_string())
        } else {
            Self::Transport(message)
        }
    }
}
