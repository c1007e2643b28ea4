//! WebSocket relay transport
//!
//! Carries the commit protocol to a remote backend. Each message is one
//! JSON text frame in either direction.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, WebSocketStream};
use tracing::{debug, info, warn};

use super::client::{BackendEnd, CommitChannel};
use super::message::{CommitFailure, ServerMessage};

const CHANNEL_BUFFER: usize = 32;

/// Connect to a relay and return the client channel
pub async fn connect(url: &str) -> Result<CommitChannel> {
    debug!("Connecting to relay {}", url);
    let (ws_stream, _response) = connect_async(url)
        .await
        .with_context(|| format!("Failed to connect to commit relay ({})", url))?;
    info!(url, "Connected to commit relay");

    Ok(over_stream(ws_stream, url))
}

/// Bridge an established WebSocket to a new commit channel
pub fn over_stream<S>(ws_stream: WebSocketStream<S>, url: &str) -> CommitChannel
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (channel, end) = CommitChannel::pair(CHANNEL_BUFFER);
    tokio::spawn(bridge(ws_stream, end, url.to_string()));
    channel
}

async fn bridge<S>(ws_stream: WebSocketStream<S>, mut end: BackendEnd, url: String)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            outgoing = end.requests.recv() => {
                let Some(message) = outgoing else {
                    // Client dropped
                    write.close().await.ok();
                    break;
                };

                let text = match message.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        let reply = ServerMessage::Rejected {
                            request_id: message.request_id(),
                            error: CommitFailure::internal(format!("Failed to encode request: {}", e)),
                        };
                        if end.replies.send(reply).await.is_err() {
                            break;
                        }
                        continue;
                    }
                };

                if let Err(e) = write.send(Message::Text(text)).await {
                    warn!("Relay send failed ({}): {}", url, e);
                    break;
                }
            }
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => match ServerMessage::decode(&text) {
                        Ok(reply) => {
                            if end.replies.send(reply).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to decode relay message ({}): {}", url, e),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        info!(url, "Relay closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("Relay connection error ({}): {}", url, e);
                        break;
                    }
                    // Ping, pong and binary frames
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    debug!(url, "Relay bridge stopped");
}
