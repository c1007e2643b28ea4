//! Local development backend
//!
//! Applies commit requests directly to a site checkout on disk. The head is
//! a SHA-256 digest over every file under the content directory, so any
//! change to the content, local or not, moves it.
//!
//! A commit either lands whole or leaves the content directory as it was:
//! additions are staged outside the content directory first, and a failure
//! while moving them into place (or deleting) restores what was there.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use super::client::{BackendEnd, CommitChannel};
use super::message::{ClientMessage, CommitFailure, CommitRequest, ServerMessage};
use crate::models::CONTENT_DIR;
use crate::storage::atomic_write;

const CHANNEL_BUFFER: usize = 32;

/// Per-commit staging area, under the root but outside the hashed tree
const STAGING_DIR: &str = ".folio-staging";

/// Result of applying a commit that did not fail outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Files were written; the new head
    Applied { head: String },
    /// Nothing was written
    Declined { reason: String },
}

/// Commit backend over a local directory
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Digest of the content directory: relative paths and contents, in path order
    pub fn head(&self) -> Result<String, CommitFailure> {
        let content_dir = self.root.join(CONTENT_DIR);
        let mut hasher = Sha256::new();

        if content_dir.exists() {
            for entry in WalkDir::new(&content_dir).sort_by_file_name() {
                let entry = entry.map_err(|e| CommitFailure::internal(e.to_string()))?;
                if !entry.file_type().is_file() {
                    continue;
                }

                let relative = entry
                    .path()
                    .strip_prefix(&self.root)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .replace('\\', "/");
                let data = fs::read(entry.path()).map_err(|e| {
                    CommitFailure::internal(format!("Failed to read {}: {}", relative, e))
                })?;

                hasher.update(relative.as_bytes());
                hasher.update([0u8]);
                hasher.update(&data);
                hasher.update([0u8]);
            }
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Apply a commit request
    ///
    /// A stale parent is a conflict carrying the current head. Requests that
    /// touch nothing or reach outside the content directory are declined
    /// without writing anything.
    pub fn apply(&self, request: &CommitRequest) -> Result<ApplyOutcome, CommitFailure> {
        if request.is_empty() {
            return Ok(ApplyOutcome::Declined {
                reason: "empty commit".to_string(),
            });
        }
        if let Some(bad) = request.paths().find(|p| !is_content_path(p)) {
            return Ok(ApplyOutcome::Declined {
                reason: format!("path outside {}: {}", CONTENT_DIR, bad),
            });
        }

        if let Some(parent) = &request.parent {
            let current = self.head()?;
            if *parent != current {
                return Err(CommitFailure::conflict(parent, current));
            }
        }

        let staging = self.root.join(STAGING_DIR).join(Uuid::new_v4().to_string());
        let written = self.write_commit(request, &staging);
        if let Err(e) = fs::remove_dir_all(&staging) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = ?staging, error = %e, "Failed to clean up staging directory");
            }
        }
        written?;

        Ok(ApplyOutcome::Applied { head: self.head()? })
    }

    /// Stage every addition, then move them into place and delete
    ///
    /// Nothing under the content directory changes until all additions are
    /// staged. A failure while publishing undoes the steps already taken.
    fn write_commit(&self, request: &CommitRequest, staging: &Path) -> Result<(), CommitFailure> {
        fs::create_dir_all(staging).map_err(|e| {
            CommitFailure::internal(format!("Failed to create staging directory: {}", e))
        })?;

        let mut staged = Vec::with_capacity(request.additions.len());
        for (index, addition) in request.additions.iter().enumerate() {
            let temp = staging.join(index.to_string());
            write_synced(&temp, addition.content.as_bytes()).map_err(|e| {
                CommitFailure::internal(format!("Failed to stage {}: {}", addition.path, e))
            })?;
            staged.push(temp);
        }

        let mut undo = Vec::new();
        let published = self.publish(request, staged, &mut undo);
        if published.is_err() {
            roll_back(undo);
        }
        published
    }

    fn publish(
        &self,
        request: &CommitRequest,
        staged: Vec<PathBuf>,
        undo: &mut Vec<(PathBuf, Option<Vec<u8>>)>,
    ) -> Result<(), CommitFailure> {
        for (temp, addition) in staged.into_iter().zip(&request.additions) {
            let target = self.root.join(&addition.path);
            let previous = read_previous(&target, &addition.path)?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    CommitFailure::internal(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
            fs::rename(&temp, &target).map_err(|e| {
                CommitFailure::internal(format!("Failed to write {}: {}", addition.path, e))
            })?;
            undo.push((target, previous));
            debug!(path = %addition.path, bytes = addition.content.len(), "Wrote file");
        }

        for deletion in &request.deletions {
            let target = self.root.join(&deletion.path);
            let Some(previous) = read_previous(&target, &deletion.path)? else {
                debug!(path = %deletion.path, "Already absent");
                continue;
            };
            fs::remove_file(&target).map_err(|e| {
                CommitFailure::internal(format!("Failed to remove {}: {}", deletion.path, e))
            })?;
            undo.push((target, Some(previous)));
            debug!(path = %deletion.path, "Removed file");
        }

        Ok(())
    }

    /// Answer one client message
    pub fn handle(&self, message: ClientMessage) -> ServerMessage {
        match message {
            ClientMessage::Head { request_id } => match self.head() {
                Ok(head) => ServerMessage::Head { request_id, head },
                Err(error) => ServerMessage::Rejected { request_id, error },
            },
            ClientMessage::Commit {
                request_id,
                request,
            } => match self.apply(&request) {
                Ok(ApplyOutcome::Applied { head }) => {
                    info!(%request_id, %head, "Local commit applied");
                    ServerMessage::Committed {
                        request_id,
                        ok: true,
                        head: Some(head),
                    }
                }
                Ok(ApplyOutcome::Declined { reason }) => {
                    warn!(%request_id, %reason, "Local commit declined");
                    ServerMessage::Committed {
                        request_id,
                        ok: false,
                        head: None,
                    }
                }
                Err(error) => ServerMessage::Rejected { request_id, error },
            },
        }
    }

    /// Answer requests until the client side goes away
    pub async fn serve(self, mut end: BackendEnd) {
        while let Some(message) = end.requests.recv().await {
            let request_id = message.request_id();
            let backend = self.clone();
            let reply = match tokio::task::spawn_blocking(move || backend.handle(message)).await
            {
                Ok(reply) => reply,
                Err(e) => ServerMessage::Rejected {
                    request_id,
                    error: CommitFailure::internal(format!("Local backend task failed: {}", e)),
                },
            };
            if end.replies.send(reply).await.is_err() {
                break;
            }
        }
        debug!(root = ?self.root, "Local backend stopped");
    }
}

/// Start a local backend task over `root` and return the client channel
pub fn spawn_local_backend(root: impl Into<PathBuf>) -> CommitChannel {
    let (channel, end) = CommitChannel::pair(CHANNEL_BUFFER);
    tokio::spawn(LocalBackend::new(root).serve(end));
    channel
}

/// Relative, inside the content directory, no parent components
fn is_content_path(path: &str) -> bool {
    let path = Path::new(path);
    path.starts_with(CONTENT_DIR)
        && path.components().all(|c| matches!(c, Component::Normal(_)))
}

/// Current bytes at `path`, `None` when absent
fn read_previous(path: &Path, display: &str) -> Result<Option<Vec<u8>>, CommitFailure> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CommitFailure::internal(format!(
            "Failed to read {}: {}",
            display, e
        ))),
    }
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// Restore files in reverse order of publishing
fn roll_back(undo: Vec<(PathBuf, Option<Vec<u8>>)>) {
    for (path, previous) in undo.into_iter().rev() {
        let restored = match &previous {
            Some(data) => atomic_write(&path, data).map_err(|e| e.to_string()),
            None => fs::remove_file(&path).map_err(|e| e.to_string()),
        };
        match restored {
            Ok(()) => debug!(?path, "Rolled back"),
            Err(error) => warn!(?path, %error, "Failed to roll back"),
        }
    }
}
