//! Commit client
//!
//! Sends commit and head requests over a [`CommitChannel`] and matches each
//! reply to its request by ID. A router task owns the inbound side of the
//! channel and completes pending requests as replies arrive, so any number
//! of commits can be in flight at once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::CommitError;
use super::message::{
    Addition, ClientMessage, CommitRequest, Deletion, RequestId, ServerMessage,
};
use crate::config::Config;
use crate::models::{Category, CommonItem};
use crate::notify::{confirm_stale_commit, messages, ModalHost, Notice, Notifier, Reload};

/// Default delay between a successful commit and the content reload
pub const DEFAULT_RELOAD_DELAY: Duration = Duration::from_millis(1000);

/// Client side of a connection to a commit backend
#[derive(Debug)]
pub struct CommitChannel {
    pub outbound: mpsc::Sender<ClientMessage>,
    pub inbound: mpsc::Receiver<ServerMessage>,
}

/// Backend side of a [`CommitChannel`]
#[derive(Debug)]
pub struct BackendEnd {
    pub requests: mpsc::Receiver<ClientMessage>,
    pub replies: mpsc::Sender<ServerMessage>,
}

impl CommitChannel {
    /// Create a connected client/backend pair
    pub fn pair(buffer: usize) -> (CommitChannel, BackendEnd) {
        let (request_tx, request_rx) = mpsc::channel(buffer);
        let (reply_tx, reply_rx) = mpsc::channel(buffer);
        (
            CommitChannel {
                outbound: request_tx,
                inbound: reply_rx,
            },
            BackendEnd {
                requests: request_rx,
                replies: reply_tx,
            },
        )
    }
}

/// Client behavior knobs
#[derive(Debug, Clone)]
pub struct CommitSettings {
    /// Wait between a successful commit and the reload
    pub reload_delay: Duration,
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            reload_delay: DEFAULT_RELOAD_DELAY,
        }
    }
}

impl From<&Config> for CommitSettings {
    fn from(config: &Config) -> Self {
        Self {
            reload_delay: config.reload_delay(),
        }
    }
}

#[derive(Default)]
struct Pending {
    waiters: HashMap<RequestId, oneshot::Sender<ServerMessage>>,
    closed: bool,
}

struct Inner {
    outbound: mpsc::Sender<ClientMessage>,
    pending: Arc<Mutex<Pending>>,
    known_head: Mutex<Option<String>>,
    notifier: Arc<dyn Notifier>,
    reloader: Arc<dyn Reload>,
    settings: CommitSettings,
}

/// Commit protocol client
///
/// Cheap to clone; clones share the connection, the pending requests and
/// the known head.
#[derive(Clone)]
pub struct CommitClient {
    inner: Arc<Inner>,
}

impl CommitClient {
    /// Create a client and start its router task
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        channel: CommitChannel,
        notifier: Arc<dyn Notifier>,
        reloader: Arc<dyn Reload>,
        settings: CommitSettings,
    ) -> Self {
        let pending = Arc::new(Mutex::new(Pending::default()));
        tokio::spawn(route_replies(channel.inbound, pending.clone()));

        Self {
            inner: Arc::new(Inner {
                outbound: channel.outbound,
                pending,
                known_head: Mutex::new(None),
                notifier,
                reloader,
                settings,
            }),
        }
    }

    /// Head the client last saw from the backend
    pub async fn known_head(&self) -> Option<String> {
        self.inner.known_head.lock().await.clone()
    }

    /// Override the known head, e.g. with one captured when content was loaded
    pub async fn set_known_head(&self, head: Option<String>) {
        *self.inner.known_head.lock().await = head;
    }

    /// Ask the backend for its current head and remember it
    pub async fn refresh_head(&self) -> Result<String, CommitError> {
        let request_id = Uuid::new_v4();
        match self.round_trip(ClientMessage::Head { request_id }).await? {
            ServerMessage::Head { head, .. } => {
                debug!(%request_id, %head, "Backend head refreshed");
                *self.inner.known_head.lock().await = Some(head.clone());
                Ok(head)
            }
            other => Err(CommitError::UnexpectedReply {
                expected: "head",
                got: other.kind(),
            }),
        }
    }

    /// Commit file changes against the known head
    ///
    /// Returns `Ok(true)` when applied, `Ok(false)` when the backend declined
    /// without an error, and [`CommitError::Rejected`] with the backend's
    /// payload otherwise.
    pub async fn commit(
        &self,
        additions: Vec<Addition>,
        deletions: Vec<Deletion>,
    ) -> Result<bool, CommitError> {
        let parent = self.known_head().await;
        self.commit_request(CommitRequest::new(additions, deletions).with_parent(parent))
            .await
    }

    /// Send a commit request exactly as given
    pub async fn commit_request(&self, request: CommitRequest) -> Result<bool, CommitError> {
        let request_id = Uuid::new_v4();
        info!(
            %request_id,
            additions = request.additions.len(),
            deletions = request.deletions.len(),
            parent = ?request.parent,
            "Dispatching commit"
        );

        let reply = self
            .round_trip(ClientMessage::Commit {
                request_id,
                request,
            })
            .await?;

        match reply {
            ServerMessage::Committed { ok: true, head, .. } => {
                info!(%request_id, head = ?head, "Commit applied");
                if let Some(head) = head {
                    *self.inner.known_head.lock().await = Some(head);
                }
                self.announce_success();
                Ok(true)
            }
            ServerMessage::Committed { ok: false, .. } => {
                warn!(%request_id, "Commit was not applied");
                Ok(false)
            }
            ServerMessage::Rejected { error, .. } => {
                warn!(%request_id, %error, "Commit rejected");
                Err(CommitError::Rejected(error))
            }
            other => Err(CommitError::UnexpectedReply {
                expected: "committed",
                got: other.kind(),
            }),
        }
    }

    /// Replace a category listing and remove the bodies of deleted items
    pub async fn delete_list(
        &self,
        category: Category,
        new_list: &[CommonItem],
        to_delete: &[CommonItem],
    ) -> Result<bool, CommitError> {
        let listing = CommonItem::listing_json(new_list)?;
        let additions = vec![Addition::new(category.listing_path(), listing)];
        let deletions = to_delete
            .iter()
            .map(|item| Deletion::new(category.body_path(item.id())))
            .collect();

        self.commit(additions, deletions).await
    }

    /// Commit, asking through `host` before overwriting newer remote content
    ///
    /// A request without a parent is checked against the known head. When
    /// the backend reports a stale parent the user is asked once: confirming
    /// re-sends the request on top of the remote head, cancelling returns
    /// `Ok(false)`.
    pub async fn commit_confirming<H: ModalHost + ?Sized>(
        &self,
        mut request: CommitRequest,
        host: &H,
    ) -> Result<bool, CommitError> {
        if request.parent.is_none() {
            request.parent = self.known_head().await;
        }

        match self.commit_request(request.clone()).await {
            Err(err) if err.is_conflict() => {
                if !confirm_stale_commit(host).await {
                    info!("Stale commit cancelled");
                    return Ok(false);
                }
                let remote_head = err.remote_head().map(str::to_string);
                info!(remote_head = ?remote_head, "Re-sending commit over remote head");
                self.commit_request(request.with_parent(remote_head)).await
            }
            other => other,
        }
    }

    async fn round_trip(&self, message: ClientMessage) -> Result<ServerMessage, CommitError> {
        let request_id = message.request_id();
        let (tx, rx) = oneshot::channel();

        // Registered before sending so a fast reply always finds its waiter
        {
            let mut pending = self.inner.pending.lock().await;
            if pending.closed {
                return Err(CommitError::ChannelClosed);
            }
            pending.waiters.insert(request_id, tx);
        }

        if self.inner.outbound.send(message).await.is_err() {
            self.inner.pending.lock().await.waiters.remove(&request_id);
            return Err(CommitError::ChannelClosed);
        }

        rx.await.map_err(|_| CommitError::ChannelClosed)
    }

    fn announce_success(&self) {
        let delay = self.inner.settings.reload_delay;
        self.inner.notifier.notify(
            Notice::new(messages::UPDATE_SUCCESS)
                .with_description(messages::refresh_after(delay.as_secs_f64())),
        );

        let reloader = self.inner.reloader.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            reloader.reload();
        });
    }
}

async fn route_replies(mut inbound: mpsc::Receiver<ServerMessage>, pending: Arc<Mutex<Pending>>) {
    while let Some(reply) = inbound.recv().await {
        let request_id = reply.request_id();
        let waiter = pending.lock().await.waiters.remove(&request_id);
        match waiter {
            Some(tx) => {
                if tx.send(reply).is_err() {
                    debug!(%request_id, "Requester went away, reply dropped");
                }
            }
            None => warn!(%request_id, kind = reply.kind(), "Reply for unknown request dropped"),
        }
    }

    // Dropping the senders fails every waiter with ChannelClosed
    let mut pending = pending.lock().await;
    pending.closed = true;
    let abandoned = pending.waiters.len();
    pending.waiters.clear();
    debug!(abandoned, "Commit channel closed");
}

/// Check that the current user may edit content
///
/// There is no author model, so this always refuses.
pub fn is_author() -> Result<(), CommitError> {
    Err(CommitError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::message::CommitFailure;
    use crate::models::create_new_item;
    use crate::notify::testing::{CountingReload, RecordingNotifier, ScriptedHost};
    use std::sync::Mutex as StdMutex;

    type Seen = Arc<StdMutex<Vec<CommitRequest>>>;

    struct Harness {
        client: CommitClient,
        notifier: Arc<RecordingNotifier>,
        reload: Arc<CountingReload>,
    }

    fn harness(channel: CommitChannel) -> Harness {
        let notifier = Arc::new(RecordingNotifier::default());
        let reload = Arc::new(CountingReload::default());
        let client = CommitClient::new(
            channel,
            notifier.clone(),
            reload.clone(),
            CommitSettings {
                reload_delay: Duration::from_millis(5),
            },
        );
        Harness {
            client,
            notifier,
            reload,
        }
    }

    /// Backend task answering each message with `respond`; records commits
    fn spawn_backend<F>(mut backend: BackendEnd, mut respond: F) -> Seen
    where
        F: FnMut(&ClientMessage) -> Option<ServerMessage> + Send + 'static,
    {
        let seen: Seen = Arc::new(StdMutex::new(Vec::new()));
        let log = seen.clone();
        tokio::spawn(async move {
            while let Some(msg) = backend.requests.recv().await {
                let reply = respond(&msg);
                if let ClientMessage::Commit { request, .. } = msg {
                    log.lock().unwrap().push(request);
                }
                if let Some(reply) = reply {
                    if backend.replies.send(reply).await.is_err() {
                        break;
                    }
                }
            }
        });
        seen
    }

    fn committed(msg: &ClientMessage, ok: bool, head: Option<&str>) -> ServerMessage {
        ServerMessage::Committed {
            request_id: msg.request_id(),
            ok,
            head: head.map(str::to_string),
        }
    }

    fn additions() -> Vec<Addition> {
        vec![Addition::new("public/rebuild/articles/1234.md", "# Hi\n")]
    }

    #[tokio::test]
    async fn test_commit_success_notifies_and_reloads() {
        let (channel, backend) = CommitChannel::pair(8);
        let seen = spawn_backend(backend, |msg| Some(committed(msg, true, Some("h1"))));
        let h = harness(channel);

        assert!(h.client.commit(additions(), vec![]).await.unwrap());
        assert_eq!(h.client.known_head().await.as_deref(), Some("h1"));

        let requests = seen.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].additions, additions());
        assert!(requests[0].parent.is_none());

        assert_eq!(h.notifier.titles(), vec![messages::UPDATE_SUCCESS]);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.reload.count(), 1);
    }

    #[tokio::test]
    async fn test_soft_failure_is_quiet() {
        let (channel, backend) = CommitChannel::pair(8);
        spawn_backend(backend, |msg| Some(committed(msg, false, None)));
        let h = harness(channel);

        assert!(!h.client.commit(additions(), vec![]).await.unwrap());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.notifier.titles().is_empty());
        assert_eq!(h.reload.count(), 0);
    }

    #[tokio::test]
    async fn test_conflict_is_surfaced() {
        let (channel, backend) = CommitChannel::pair(8);
        spawn_backend(backend, |msg| {
            Some(ServerMessage::Rejected {
                request_id: msg.request_id(),
                error: CommitFailure::conflict("old", "new".to_string()),
            })
        });
        let h = harness(channel);
        h.client.set_known_head(Some("old".to_string())).await;

        let err = h.client.commit(additions(), vec![]).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(err.remote_head(), Some("new"));
        assert!(h.notifier.titles().is_empty());
    }

    #[tokio::test]
    async fn test_refreshed_head_becomes_parent() {
        let (channel, backend) = CommitChannel::pair(8);
        let seen = spawn_backend(backend, |msg| match msg {
            ClientMessage::Head { request_id } => Some(ServerMessage::Head {
                request_id: *request_id,
                head: "h0".to_string(),
            }),
            ClientMessage::Commit { .. } => Some(committed(msg, true, Some("h1"))),
        });
        let h = harness(channel);

        assert_eq!(h.client.refresh_head().await.unwrap(), "h0");
        h.client.commit(additions(), vec![]).await.unwrap();

        assert_eq!(seen.lock().unwrap()[0].parent.as_deref(), Some("h0"));
        assert_eq!(h.client.known_head().await.as_deref(), Some("h1"));
    }

    #[tokio::test]
    async fn test_delete_list_request_shape() {
        let (channel, backend) = CommitChannel::pair(8);
        let seen = spawn_backend(backend, |msg| Some(committed(msg, true, None)));
        let h = harness(channel);

        let mut keep = create_new_item(Category::Articles);
        keep.base_mut().id = 1111;
        let mut gone = create_new_item(Category::Articles);
        gone.base_mut().id = 2222;

        assert!(h
            .client
            .delete_list(Category::Articles, &[keep.clone()], &[gone])
            .await
            .unwrap());

        let request = seen.lock().unwrap()[0].clone();
        assert_eq!(request.additions.len(), 1);
        assert_eq!(request.additions[0].path, "public/rebuild/json/articles.json");
        assert_eq!(
            request.additions[0].content,
            CommonItem::listing_json(&[keep]).unwrap()
        );
        assert_eq!(
            request.deletions,
            vec![Deletion::new("public/rebuild/articles/2222.md")]
        );
    }

    #[tokio::test]
    async fn test_concurrent_commits_answered_out_of_order() {
        let (channel, mut backend) = CommitChannel::pair(8);
        tokio::spawn(async move {
            let first = backend.requests.recv().await.unwrap();
            let second = backend.requests.recv().await.unwrap();
            // Answer in reverse order; the reply for path "a" is the success
            for msg in [second, first] {
                let ok = matches!(
                    &msg,
                    ClientMessage::Commit { request, .. } if request.additions[0].path == "a"
                );
                backend.replies.send(committed(&msg, ok, None)).await.unwrap();
            }
        });
        let h = harness(channel);
        let other = h.client.clone();

        let (a, b) = tokio::join!(
            h.client.commit(vec![Addition::new("a", "1")], vec![]),
            other.commit(vec![Addition::new("b", "2")], vec![]),
        );
        assert!(a.unwrap());
        assert!(!b.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_reply_is_ignored() {
        let (channel, mut backend) = CommitChannel::pair(8);
        tokio::spawn(async move {
            let msg = backend.requests.recv().await.unwrap();
            let stray = ServerMessage::Committed {
                request_id: Uuid::new_v4(),
                ok: false,
                head: None,
            };
            backend.replies.send(stray).await.unwrap();
            backend.replies.send(committed(&msg, true, None)).await.unwrap();
        });
        let h = harness(channel);

        assert!(h.client.commit(additions(), vec![]).await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_channel_fails_pending_and_later_requests() {
        let (channel, mut backend) = CommitChannel::pair(8);
        tokio::spawn(async move {
            let _ = backend.requests.recv().await;
            drop(backend);
        });
        let h = harness(channel);

        let err = h.client.commit(additions(), vec![]).await.unwrap_err();
        assert!(matches!(err, CommitError::ChannelClosed));

        let err = h.client.refresh_head().await.unwrap_err();
        assert!(matches!(err, CommitError::ChannelClosed));
    }

    #[tokio::test]
    async fn test_wrong_reply_type() {
        let (channel, backend) = CommitChannel::pair(8);
        spawn_backend(backend, |msg| {
            Some(ServerMessage::Head {
                request_id: msg.request_id(),
                head: "h".to_string(),
            })
        });
        let h = harness(channel);

        let err = h.client.commit(additions(), vec![]).await.unwrap_err();
        assert!(matches!(
            err,
            CommitError::UnexpectedReply {
                expected: "committed",
                got: "head"
            }
        ));
    }

    fn conflict_then_accept(msg: &ClientMessage) -> Option<ServerMessage> {
        match msg {
            ClientMessage::Commit { request, .. } if request.parent.as_deref() == Some("old") => {
                Some(ServerMessage::Rejected {
                    request_id: msg.request_id(),
                    error: CommitFailure::conflict("old", "new".to_string()),
                })
            }
            _ => Some(committed(msg, true, Some("newer"))),
        }
    }

    #[tokio::test]
    async fn test_confirmed_stale_commit_is_resent() {
        let (channel, backend) = CommitChannel::pair(8);
        let seen = spawn_backend(backend, conflict_then_accept);
        let h = harness(channel);
        h.client.set_known_head(Some("old".to_string())).await;
        let host = ScriptedHost::answering(Some(true));

        let request = CommitRequest::new(additions(), vec![]);
        assert!(h.client.commit_confirming(request, &host).await.unwrap());

        let requests = seen.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].parent.as_deref(), Some("old"));
        assert_eq!(requests[1].parent.as_deref(), Some("new"));
        assert_eq!(host.shown_count(), 1);
        assert_eq!(host.mounted_count(), 0);
        assert_eq!(h.client.known_head().await.as_deref(), Some("newer"));
    }

    #[tokio::test]
    async fn test_cancelled_stale_commit() {
        let (channel, backend) = CommitChannel::pair(8);
        let seen = spawn_backend(backend, conflict_then_accept);
        let h = harness(channel);
        h.client.set_known_head(Some("old".to_string())).await;
        let host = ScriptedHost::answering(Some(false));

        let request = CommitRequest::new(additions(), vec![]);
        assert!(!h.client.commit_confirming(request, &host).await.unwrap());

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(host.mounted_count(), 0);
        assert!(h.notifier.titles().is_empty());
    }

    #[test]
    fn test_is_author_refuses() {
        assert!(matches!(is_author(), Err(CommitError::Unauthorized)));
    }
}
