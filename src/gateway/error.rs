use crate::domain_model::ApiResponse;
use crate::domain_port::{StorageError, TransportError};

/// Everything a caller of the gateway can get back instead of a response.
///
/// `Clone` because one refresh failure is handed to every request that was
/// queued behind it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// No response at all: connection failure, timeout.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("{message}")]
    App { status: u16, message: String },
    #[error("request failed with status {status}")]
    Status { status: u16 },
    #[error("session expired")]
    SessionExpired,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("session refresh was abandoned")]
    Cancelled,
}

impl ApiError {
    pub fn from_response(response: &ApiResponse) -> Self {
        match response.error_message() {
            Some(message) => ApiError::App {
                status: response.status,
                message,
            },
            None => ApiError::Status {
                status: response.status,
            },
        }
    }

    pub fn decode(error: serde_json::Error) -> Self {
        ApiError::Decode(error.to_string())
    }

    /// Server-provided message, if this error carries one.
    pub fn app_message(&self) -> Option<&str> {
        match self {
            ApiError::App { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Text to show the user: the server's message when there is one,
    /// otherwise the given fallback.
    pub fn display_message<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.app_message().unwrap_or(fallback)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::App { status, .. } | ApiError::Status { status } => Some(*status),
            _ => None,
        }
    }
}
