//! Low-level Chrome DevTools Protocol transport over WebSocket.
//!
//! One connection to the browser's debugging endpoint, multiplexed across
//! tool calls. Commands are matched to responses by an auto-incrementing id;
//! page-scoped commands carry the flattened CDP session id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use browser_use_core::{Error, Result};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, warn};

/// Upper bound on one command round trip. A violation degrades to
/// `Error::Timeout`, not a dropped connection.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// A CDP WebSocket client that sends commands and awaits responses.
pub struct CdpClient {
    /// Sender to write messages to the WebSocket.
    ws_tx: mpsc::Sender<String>,
    /// Pending command responses, keyed by request ID.
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>,
    /// Auto-incrementing command ID, unique per connection (and therefore
    /// unique within every attached session).
    next_id: AtomicU64,
    /// Per-command round-trip bound, [`COMMAND_TIMEOUT`] unless overridden.
    command_timeout: Duration,
    /// Handle to the reader task so we can abort on drop.
    _reader_handle: tokio::task::JoinHandle<()>,
    /// Handle to the writer task.
    _writer_handle: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a CDP WebSocket endpoint.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::connect_async;
        use tokio_tungstenite::tungstenite::Message;

        let (ws_stream, _) = connect_async(ws_url).await.map_err(|e| {
            Error::Connection(format!("Failed to connect to CDP endpoint {ws_url}: {e}"))
        })?;
        debug!(url = %ws_url, "CDP WebSocket connected");

        let (mut ws_sink, mut ws_stream_read) = ws_stream.split();

        // Channel for outgoing messages
        let (ws_tx, mut ws_rx) = mpsc::channel::<String>(256);

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let pending_clone = pending.clone();

        // Writer task: owns the sink, forwards messages from the channel
        let writer_handle = tokio::spawn(async move {
            while let Some(msg) = ws_rx.recv().await {
                if let Err(e) = ws_sink.send(Message::Text(msg)).await {
                    error!("CDP WebSocket write error: {}", e);
                    break;
                }
            }
        });

        // Reader task: dispatches responses to their waiters, ignores events
        let reader_handle = tokio::spawn(async move {
            while let Some(msg_result) = ws_stream_read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        if let Ok(val) = serde_json::from_str::<Value>(&text) {
                            if let Some(id) = val.get("id").and_then(|v| v.as_u64()) {
                                let mut pending = pending_clone.lock().await;
                                if let Some(tx) = pending.remove(&id) {
                                    let _ = tx.send(val);
                                }
                            } else if let Some(method) =
                                val.get("method").and_then(|v| v.as_str())
                            {
                                debug!(event = method, "Ignoring CDP event");
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!("CDP WebSocket closed by server");
                        break;
                    }
                    Err(e) => {
                        warn!("CDP WebSocket read error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        });

        Ok(Self {
            ws_tx,
            pending,
            next_id: AtomicU64::new(1),
            command_timeout: COMMAND_TIMEOUT,
            _reader_handle: reader_handle,
            _writer_handle: writer_handle,
        })
    }

    /// Override the per-command timeout.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Send a CDP command and wait for its result. `session_id` routes the
    /// command to an attached page target; `None` targets the browser itself.
    pub async fn send(
        &self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let mut msg = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        if let Some(session) = session_id {
            msg["sessionId"] = json!(session);
        }

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        debug!(method, id, "Sending CDP command");
        if let Err(e) = self.ws_tx.send(msg.to_string()).await {
            // The waiter will never be resolved; drop it with the command.
            self.pending.lock().await.remove(&id);
            return Err(Error::Connection(format!("Failed to send CDP command: {e}")));
        }

        match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(response)) => {
                if let Some(err) = response.get("error") {
                    let message = err
                        .get("message")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| err.to_string());
                    Err(Error::Protocol(format!("{method}: {message}")))
                } else {
                    Ok(response.get("result").cloned().unwrap_or(Value::Null))
                }
            }
            Ok(Err(_)) => Err(Error::Connection("CDP response channel closed".into())),
            Err(_) => {
                let mut pending = self.pending.lock().await;
                pending.remove(&id);
                Err(Error::Timeout(format!(
                    "CDP command '{method}' timed out after {:?}",
                    self.command_timeout
                )))
            }
        }
    }

    /// List all browser targets (pages, workers, ...).
    pub async fn targets(&self) -> Result<Vec<Value>> {
        let result = self.send("Target.getTargets", json!({}), None).await?;
        Ok(result
            .get("targetInfos")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }

    /// Create a new page target and return its target id.
    pub async fn create_page(&self, url: &str) -> Result<String> {
        let result = self
            .send("Target.createTarget", json!({"url": url}), None)
            .await?;
        result
            .get("targetId")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::Protocol("No targetId returned from createTarget".into()))
    }

    /// Attach to a page target in flattened mode and return the CDP session
    /// id used to route page-scoped commands.
    pub async fn attach(&self, target_id: &str) -> Result<String> {
        let result = self
            .send(
                "Target.attachToTarget",
                json!({"targetId": target_id, "flatten": true}),
                None,
            )
            .await?;
        result
            .get("sessionId")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::Protocol("No sessionId returned from attachToTarget".into()))
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self._reader_handle.abort();
        self._writer_handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::spawn_fake_cdp;

    #[tokio::test]
    async fn command_round_trip() {
        let url = spawn_fake_cdp(|method, _params| match method {
            "Page.navigate" => Ok(json!({"frameId": "f1"})),
            _ => Ok(json!({})),
        })
        .await;

        let client = CdpClient::connect(&url).await.unwrap();
        let result = client
            .send("Page.navigate", json!({"url": "https://example.com"}), None)
            .await
            .unwrap();
        assert_eq!(result["frameId"], "f1");
    }

    #[tokio::test]
    async fn protocol_error_is_typed() {
        let url = spawn_fake_cdp(|method, _params| match method {
            "DOM.getBoxModel" => Err("Could not compute box model.".to_string()),
            _ => Ok(json!({})),
        })
        .await;

        let client = CdpClient::connect(&url).await.unwrap();
        let err = client
            .send("DOM.getBoxModel", json!({"nodeId": 7}), None)
            .await
            .unwrap_err();
        match err {
            Error::Protocol(msg) => assert!(msg.contains("box model")),
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stalled_command_times_out() {
        let url = crate::testutil::spawn_stallable_cdp(|method, _params| match method {
            "Page.navigate" => None,
            _ => Some(Ok(json!({}))),
        })
        .await;

        let client = CdpClient::connect(&url)
            .await
            .unwrap()
            .with_command_timeout(Duration::from_millis(50));
        let err = client
            .send("Page.navigate", json!({"url": "https://slow.test"}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        // The abandoned waiter is cleaned up.
        assert!(client.pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn failed_sends_do_not_leak_pending_entries() {
        let (ws_tx, ws_rx) = mpsc::channel(1);
        drop(ws_rx);
        let client = CdpClient {
            ws_tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            command_timeout: COMMAND_TIMEOUT,
            _reader_handle: tokio::spawn(async {}),
            _writer_handle: tokio::spawn(async {}),
        };

        let err = client.send("Page.enable", json!({}), None).await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
        assert!(client.pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn connect_refused_is_connection_error() {
        let err = CdpClient::connect("ws://127.0.0.1:1/devtools")
            .await
            .err()
            .expect("connect must fail");
        assert!(matches!(err, Error::Connection(_)));
    }
}
