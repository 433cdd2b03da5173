//! Duplex JSON-RPC peer
//!
//! One end of a newline-delimited JSON-RPC channel. A peer sends requests and
//! awaits their responses, and at the same time serves requests arriving from
//! the other side through an [`McpHandler`]. Server and client use the same
//! type, so server-initiated sampling rides the same framing as tool calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use super::protocol::{IncomingMessage, McpRequest, McpResponse};
use crate::error::{Result, UserbaseError};

/// Trait for serving requests that arrive from the other peer
#[async_trait]
pub trait McpHandler: Send + Sync + 'static {
    async fn handle_request(&self, peer: &Peer, request: McpRequest) -> McpResponse;

    async fn handle_notification(&self, _peer: &Peer, notification: McpRequest) {
        tracing::debug!(method = %notification.method, "Ignoring notification");
    }
}

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

struct PendingRequests {
    waiters: HashMap<u64, oneshot::Sender<McpResponse>>,
    closed: bool,
}

struct PeerInner {
    writer: Mutex<Writer>,
    pending: Mutex<PendingRequests>,
    next_id: AtomicU64,
}

/// Handle to one end of the channel; cheap to clone
#[derive(Clone)]
pub struct Peer {
    inner: Arc<PeerInner>,
}

impl Peer {
    /// Start serving `reader` with `handler`, writing everything to `writer`.
    ///
    /// The returned task ends when the reader reaches EOF; any request still
    /// waiting for a response then fails with [`UserbaseError::ChannelClosed`].
    pub fn spawn<R, W, H>(reader: R, writer: W, handler: Arc<H>) -> (Peer, JoinHandle<()>)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
        H: McpHandler,
    {
        let peer = Peer {
            inner: Arc::new(PeerInner {
                writer: Mutex::new(Box::new(writer)),
                pending: Mutex::new(PendingRequests {
                    waiters: HashMap::new(),
                    closed: false,
                }),
                next_id: AtomicU64::new(1),
            }),
        };
        let reader_peer = peer.clone();
        let task = tokio::spawn(async move { reader_peer.read_loop(reader, handler).await });
        (peer, task)
    }

    async fn read_loop<R, H>(self, reader: R, handler: Arc<H>)
    where
        R: AsyncRead + Send + Unpin + 'static,
        H: McpHandler,
    {
        let mut lines = BufReader::new(reader).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match IncomingMessage::parse(trimmed) {
                        Ok(IncomingMessage::Response(response)) => self.resolve(response).await,
                        Ok(IncomingMessage::Request(request)) => {
                            let peer = self.clone();
                            let handler = Arc::clone(&handler);
                            tokio::spawn(async move {
                                tracing::debug!(method = %request.method, "Inbound request");
                                let response = handler.handle_request(&peer, request).await;
                                if let Err(e) = peer.send(&response).await {
                                    tracing::error!("Failed to write response: {}", e);
                                }
                            });
                        }
                        Ok(IncomingMessage::Notification(notification)) => {
                            handler.handle_notification(&self, notification).await;
                        }
                        Err(e) => {
                            tracing::warn!("Unreadable message: {}", e);
                            let response = McpResponse::from_error(None, e);
                            if let Err(e) = self.send(&response).await {
                                tracing::error!("Failed to write parse error: {}", e);
                            }
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Error reading channel: {}", e);
                    break;
                }
            }
        }

        let mut pending = self.inner.pending.lock().await;
        pending.closed = true;
        pending.waiters.clear();
        tracing::debug!("Channel closed");
    }

    async fn resolve(&self, response: McpResponse) {
        let Some(id) = response.id.as_ref().and_then(|v| v.as_u64()) else {
            tracing::warn!("Response without a usable id: {:?}", response.error);
            return;
        };
        let waiter = self.inner.pending.lock().await.waiters.remove(&id);
        match waiter {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => tracing::warn!(id, "Response for unknown request"),
        }
    }

    /// Send a request and wait for its result payload
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.inner.pending.lock().await;
            if pending.closed {
                return Err(UserbaseError::ChannelClosed);
            }
            pending.waiters.insert(id, tx);
        }

        let request = McpRequest::new(Some(json!(id)), method, params);
        if let Err(e) = self.send(&request).await {
            self.inner.pending.lock().await.waiters.remove(&id);
            return Err(e);
        }

        let response = rx.await.map_err(|_| UserbaseError::ChannelClosed)?;
        response.into_result()
    }

    /// Send a request with typed params and decode a typed result
    pub async fn request_typed<P, T>(&self, method: &str, params: &P) -> Result<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let result = self.request(method, serde_json::to_value(params)?).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Send a notification (no response expected)
    pub async fn notify(&self, method: &str, params: Value) -> Result<()> {
        self.send(&McpRequest::new(None, method, params)).await
    }

    async fn send<T: Serialize>(&self, message: &T) -> Result<()> {
        let line = serde_json::to_string(message)?;
        let mut writer = self.inner.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}
