//! Commit protocol
//!
//! Edits reach the site as commits: a batch of file additions and deletions
//! checked against the head the editor last saw.
//!
//! ## Protocol
//!
//! 1. The client sends `commit` with a fresh request ID and its known head
//!    as `parent`
//! 2. The backend answers `committed` (with `ok` and the new head) or
//!    `rejected` (conflict, transport or internal error)
//! 3. On a conflict the caller may confirm and re-send on top of the
//!    remote head
//!
//! ## Usage
//!
//! ```ignore
//! let channel = spawn_local_backend(&config.content_root);
//! let client = CommitClient::new(channel, notifier, reloader, CommitSettings::from(&config));
//! client.refresh_head().await?;
//! client.commit(additions, deletions).await?;
//! ```

mod client;
mod error;
pub mod local;
mod message;
pub mod relay;

pub use client::{
    is_author, BackendEnd, CommitChannel, CommitClient, CommitSettings, DEFAULT_RELOAD_DELAY,
};
pub use error::CommitError;
pub use local::{spawn_local_backend, LocalBackend};
pub use message::{
    Addition, ClientMessage, CommitFailure, CommitRequest, Deletion, FailureKind, RequestId,
    ServerMessage,
};
