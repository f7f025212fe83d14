//! Remote operation errors.
//!
//! Every failure coming back from the service is folded into a [`RemoteError`].
//! The controller never lets one escape: it is stored in
//! [`SyncState::error`](crate::state::SyncState) for display, or routed into
//! the validation modal when the failing call was a validation request.

use thiserror::Error;

/// A failed call against the remote service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The server answered with a non-success status.
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response (connection refused, DNS, TLS...).
    #[error("Request failed: {message}")]
    Transport { message: String },

    /// The response arrived but could not be decoded.
    #[error("Unexpected response: {message}")]
    Decode { message: String },
}

impl RemoteError {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        RemoteError::Status {
            status,
            body: body.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        RemoteError::Transport {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        RemoteError::Decode {
            message: message.into(),
        }
    }

    /// The payload the server attached to the failure.
    ///
    /// For status errors this is the raw response body, which is what the
    /// validation endpoint uses to describe a broken configuration. Other
    /// variants fall back to their message.
    pub fn data(&self) -> &str {
        match self {
            RemoteError::Status { body, .. } => body,
            RemoteError::Transport { message } | RemoteError::Decode { message } => message,
        }
    }

    /// HTTP status code, when the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::decode(err.to_string())
        } else if let Some(status) = err.status() {
            RemoteError::status(status.as_u16(), err.to_string())
        } else {
            RemoteError::transport(err.to_string())
        }
    }
}
