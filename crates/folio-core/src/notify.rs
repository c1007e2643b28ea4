//! User-facing surfaces
//!
//! The core never prints or draws anything itself. It hands notices to a
//! [`Notifier`], asks yes/no questions through a [`ModalHost`] and requests
//! a content reload through [`Reload`]. Front ends implement these.

use async_trait::async_trait;
use tracing::{debug, info};

/// Fixed user-facing messages
pub mod messages {
    pub const DRAFT_SAVED: &str = "Draft saved";
    pub const DRAFT_LOADED: &str = "Draft loaded";
    pub const UPDATE_SUCCESS: &str = "Update succeeded";
    pub const WARNING: &str = "Warning";
    pub const STALE_COMMIT: &str = "The remote content changed after this page was loaded. \
         Committing now may overwrite those changes. Commit anyway?";

    pub fn refresh_after(secs: f64) -> String {
        format!("Refreshing in {} second(s)", secs)
    }
}

/// A titled message shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: Option<String>,
}

impl Notice {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Displays notices
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Notifier that writes notices to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.description {
            Some(description) => info!(title = %notice.title, %description, "notice"),
            None => info!(title = %notice.title, "notice"),
        }
    }
}

/// Reloads content after a successful commit
pub trait Reload: Send + Sync {
    fn reload(&self);
}

/// Reload that does nothing (for callers that refresh on their own)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReload;

impl Reload for NoReload {
    fn reload(&self) {
        debug!("Reload requested, nothing to do");
    }
}

/// A confirmation dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modal {
    pub title: String,
    pub content: String,
}

/// Handle of a mounted modal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModalId(pub u64);

/// Mounts confirmation dialogs and waits for the user's answer
#[async_trait]
pub trait ModalHost: Send + Sync {
    /// Show the modal
    fn mount(&self, modal: &Modal) -> ModalId;

    /// Wait for the answer: `true` to proceed, `false` to cancel
    async fn wait(&self, id: ModalId) -> bool;

    /// Remove the modal and release whatever it holds
    fn unmount(&self, id: ModalId);
}

/// A mounted modal, unmounted when dropped
struct MountedModal<'a, H: ModalHost + ?Sized> {
    host: &'a H,
    id: ModalId,
}

impl<'a, H: ModalHost + ?Sized> MountedModal<'a, H> {
    fn mount(host: &'a H, modal: &Modal) -> Self {
        let id = host.mount(modal);
        Self { host, id }
    }

    async fn answer(&self) -> bool {
        self.host.wait(self.id).await
    }
}

impl<H: ModalHost + ?Sized> Drop for MountedModal<'_, H> {
    fn drop(&mut self) {
        self.host.unmount(self.id);
    }
}

/// Ask whether to commit even though the remote head moved
///
/// The modal is unmounted on every path: confirm, cancel, and when the
/// returned future is dropped before the user answers.
pub async fn confirm_stale_commit<H: ModalHost + ?Sized>(host: &H) -> bool {
    let modal = Modal {
        title: messages::WARNING.to_string(),
        content: messages::STALE_COMMIT.to_string(),
    };
    let mounted = MountedModal::mount(host, &modal);
    let proceed = mounted.answer().await;
    debug!(proceed, "Stale commit confirmation answered");
    proceed
}
