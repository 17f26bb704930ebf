//! Error types for jast-remote.

use thiserror::Error;

/// All errors a remote store call can produce.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection, TLS, or timeout failure before a response arrived.
    #[error("transport error calling {url}: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// Credentials were rejected while requesting a token.
    #[error("authentication failed for user '{user}' (HTTP {status})")]
    Auth { user: String, status: u16 },

    /// The response body did not have the expected shape.
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("category '{0}' not found on the server")]
    UnknownCategory(String),

    #[error("category name '{0}' matches more than one category")]
    AmbiguousCategory(String),
}

impl RemoteError {
    /// The record addressed by the call does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::Status { status: 404, .. })
    }

    pub(crate) fn decode(url: &str, message: impl ToString) -> Self {
        RemoteError::Decode {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_404_is_not_found() {
        let status = |status| RemoteError::Status {
            status,
            url: "u".to_string(),
            body: String::new(),
        };
        assert!(status(404).is_not_found());
        assert!(!status(500).is_not_found());
        assert!(!RemoteError::UnknownCategory("x".to_string()).is_not_found());
    }
}
