//! Commit error types

use thiserror::Error;

use super::message::{CommitFailure, FailureKind};
use crate::models::ModelError;

/// Errors from the commit client
#[derive(Error, Debug)]
pub enum CommitError {
    /// The backend refused the commit
    #[error("Commit rejected ({0})")]
    Rejected(CommitFailure),

    /// The backend went away before answering
    #[error("Commit channel closed before the backend answered")]
    ChannelClosed,

    /// The backend answered with the wrong message type
    #[error("Unexpected reply from backend: expected {expected}, got {got}")]
    UnexpectedReply {
        expected: &'static str,
        got: &'static str,
    },

    /// Author check; there is no author model yet
    #[error("Can't do that: author check is not implemented")]
    Unauthorized,

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl CommitError {
    /// Whether the backend reported a stale parent head
    pub fn is_conflict(&self) -> bool {
        matches!(self, CommitError::Rejected(f) if f.kind == FailureKind::Conflict)
    }

    /// Head the backend reported with a conflict
    pub fn remote_head(&self) -> Option<&str> {
        match self {
            CommitError::Rejected(f) => f.remote_head.as_deref(),
            _ => None,
        }
    }

    /// Whether retrying the same commit later could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            CommitError::Rejected(f) => f.kind != FailureKind::Internal,
            CommitError::ChannelClosed => true,
            CommitError::UnexpectedReply { .. }
            | CommitError::Unauthorized
            | CommitError::Model(_) => false,
        }
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            CommitError::Rejected(f) => match f.kind {
                FailureKind::Conflict => {
                    Some("Reload the content to pick up remote changes, or confirm to overwrite them.")
                }
                FailureKind::Transport => {
                    Some("Check the network connection and the backend, then try again.")
                }
                FailureKind::Internal => None,
            },
            CommitError::ChannelClosed => {
                Some("Check that the commit backend is running and reachable.")
            }
            CommitError::UnexpectedReply { .. } => {
                Some("The backend speaks a different protocol version. Check the relay URL.")
            }
            CommitError::Unauthorized | CommitError::Model(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_accessors() {
        let err = CommitError::Rejected(CommitFailure::conflict("aaa", "bbb".to_string()));
        assert!(err.is_conflict());
        assert_eq!(err.remote_head(), Some("bbb"));
        assert!(err.is_recoverable());
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_internal_rejection() {
        let err = CommitError::Rejected(CommitFailure::internal("disk on fire"));
        assert!(!err.is_conflict());
        assert!(err.remote_head().is_none());
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "Commit rejected (internal: disk on fire)");
    }

    #[test]
    fn test_unauthorized_message() {
        let err = CommitError::Unauthorized;
        assert!(err.to_string().starts_with("Can't do that"));
        assert!(!err.is_recoverable());
    }
}
