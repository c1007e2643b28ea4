//! Commit protocol message types
//!
//! JSON messages exchanged with a commit backend. Every request carries a
//! request ID and every reply echoes it, so replies can arrive in any order.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlates a reply with its request
pub type RequestId = Uuid;

/// Create or overwrite one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addition {
    pub path: String,
    pub content: String,
}

impl Addition {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Remove one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deletion {
    pub path: String,
}

impl Deletion {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// A batch of file upserts and removals, applied together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
    /// Head the client believes is current; `None` skips the check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub additions: Vec<Addition>,
    #[serde(default)]
    pub deletions: Vec<Deletion>,
}

impl CommitRequest {
    pub fn new(additions: Vec<Addition>, deletions: Vec<Deletion>) -> Self {
        Self {
            parent: None,
            additions,
            deletions,
        }
    }

    pub fn with_parent(mut self, parent: Option<String>) -> Self {
        self.parent = parent;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }

    /// Every path the request touches
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.additions
            .iter()
            .map(|a| a.path.as_str())
            .chain(self.deletions.iter().map(|d| d.path.as_str()))
    }
}

/// Why a backend refused a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The parent head is stale
    Conflict,
    /// The backend could not reach its store
    Transport,
    /// Anything else that went wrong on the backend
    Internal,
}

/// Error payload of a rejected commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFailure {
    pub kind: FailureKind,
    pub message: String,
    /// The backend's actual head, reported with conflicts
    #[serde(rename = "remoteHead", default, skip_serializing_if = "Option::is_none")]
    pub remote_head: Option<String>,
}

impl CommitFailure {
    pub fn conflict(expected: &str, actual: String) -> Self {
        Self {
            kind: FailureKind::Conflict,
            message: format!("expected head {} but remote is at {}", expected, actual),
            remote_head: Some(actual),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Internal,
            message: message.into(),
            remote_head: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            message: message.into(),
            remote_head: None,
        }
    }
}

impl fmt::Display for CommitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FailureKind::Conflict => "conflict",
            FailureKind::Transport => "transport",
            FailureKind::Internal => "internal",
        };
        write!(f, "{}: {}", kind, self.message)
    }
}

/// Messages sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Apply a commit
    #[serde(rename = "commit")]
    Commit {
        #[serde(rename = "requestId")]
        request_id: RequestId,
        request: CommitRequest,
    },

    /// Report the current head
    #[serde(rename = "head")]
    Head {
        #[serde(rename = "requestId")]
        request_id: RequestId,
    },
}

/// Messages received from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Commit finished; `ok = false` is a soft failure
    #[serde(rename = "committed")]
    Committed {
        #[serde(rename = "requestId")]
        request_id: RequestId,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        head: Option<String>,
    },

    /// Commit refused
    #[serde(rename = "rejected")]
    Rejected {
        #[serde(rename = "requestId")]
        request_id: RequestId,
        error: CommitFailure,
    },

    /// Current head
    #[serde(rename = "head")]
    Head {
        #[serde(rename = "requestId")]
        request_id: RequestId,
        head: String,
    },
}

impl ClientMessage {
    pub fn request_id(&self) -> RequestId {
        match self {
            ClientMessage::Commit { request_id, .. } | ClientMessage::Head { request_id } => {
                *request_id
            }
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl ServerMessage {
    pub fn request_id(&self) -> RequestId {
        match self {
            ServerMessage::Committed { request_id, .. }
            | ServerMessage::Rejected { request_id, .. }
            | ServerMessage::Head { request_id, .. } => *request_id,
        }
    }

    /// Wire name of the message type
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Committed { .. } => "committed",
            ServerMessage::Rejected { .. } => "rejected",
            ServerMessage::Head { .. } => "head",
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
