//! Error types for remote resolution
//!
//! Every remote failure is reported through [`ResolverError`]; callers
//! convert it into a local notification at the call site.

use crate::types::RecordId;

/// Remote call failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolverError {
    /// Request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// Server answered with a non-success status
    #[error("remote returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// First part of the response body
        body: String,
    },

    /// Response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Target record does not exist
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Request was refused by the remote side
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl ResolverError {
    /// Check if the failure may succeed on retry
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for ResolverError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ResolverError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ResolverError::Transport("reset".into()).is_transient());
        assert!(ResolverError::Status {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!ResolverError::Status {
            status: 422,
            body: String::new()
        }
        .is_transient());
        assert!(!ResolverError::NotFound(RecordId::from("1")).is_transient());
    }
}
