//! Error taxonomy for backend calls.

use thiserror::Error;

/// Errors surfaced by calls against the school backend.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Network-level failure (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(String),

    /// Failure status with a parseable body; the message is the server's.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Failure status with an unparseable body, typically a proxy or
    /// framework HTML error page where JSON was expected.
    #[error("HTTP {status}: server returned a non-JSON response: {snippet}")]
    Malformed { status: u16, snippet: String },

    /// The server processed the request and refused it.
    #[error("{0}")]
    Rejected(String),
}

impl ApiError {
    /// Whether another attempt could plausibly succeed. Malformed bodies
    /// and business rejections are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. })
    }

    /// Whether this failure means the addressed record does not exist.
    /// The backend signals it as HTTP 404 or with a "not found" message.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Http { status: 404, .. } => true,
            Self::Http { message, .. } | Self::Rejected(message) => {
                message.to_lowercase().contains("not found")
            }
            _ => false,
        }
    }
}
