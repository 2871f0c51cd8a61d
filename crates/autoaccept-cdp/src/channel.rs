//! WebSocket control channel to a single page.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::CdpError;
use crate::protocol::{CdpRequest, CdpResponse, EvaluateParams, EvaluateResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, CdpError>>>>>;

/// Request/response channel over a page's debugger WebSocket.
///
/// Request ids come from a counter shared by every channel of a client, so
/// ids are unique and increasing across pages.
pub struct ControlChannel {
    ws_url: String,
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: Arc<AtomicU64>,
    pending: PendingMap,
    call_timeout: Duration,
    closed: watch::Receiver<bool>,
    recv_task: tokio::task::JoinHandle<()>,
}

impl ControlChannel {
    pub async fn connect(
        ws_url: &str,
        request_id: Arc<AtomicU64>,
        call_timeout: Duration,
    ) -> Result<Self, CdpError> {
        let url = Url::parse(ws_url)?;
        let (ws_stream, _) = tokio::time::timeout(call_timeout, tokio_tungstenite::connect_async(url.as_str()))
            .await
            .map_err(|_| CdpError::Timeout(format!("connecting to {}", ws_url)))?
            .map_err(|e| CdpError::ConnectionFailed(format!("{}: {}", ws_url, e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (closed_tx, closed_rx) = watch::channel(false);

        let recv_task = {
            let pending = pending.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, pending.clone()).await;
                // Fail whatever is still waiting.
                pending.lock().clear();
                let _ = closed_tx.send(true);
            })
        };

        debug!("Control channel connected to {}", ws_url);

        Ok(Self {
            ws_url: ws_url.to_string(),
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            request_id,
            pending,
            call_timeout,
            closed: closed_rx,
            recv_task,
        })
    }

    async fn receive_loop(mut ws_source: WsSource, pending: PendingMap) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    let resp = match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => resp,
                        Err(e) => {
                            warn!("Failed to parse CDP message: {}", e);
                            continue;
                        }
                    };
                    // Events carry no id and are not used.
                    let Some(id) = resp.id else {
                        continue;
                    };
                    let waiter = pending.lock().remove(&id);
                    if let Some(tx) = waiter {
                        let result = match resp.error {
                            Some(error) => Err(CdpError::Protocol {
                                code: error.code,
                                message: error.message,
                            }),
                            None => Ok(resp.result.unwrap_or(Value::Null)),
                        };
                        let _ = tx.send(result);
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed by peer");
                    break;
                }
                Err(e) => {
                    debug!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Send a command and wait for its response.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        if self.is_closed() {
            return Err(CdpError::ChannelClosed);
        }
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
        };
        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        {
            let mut ws = self.ws_tx.lock().await;
            if let Err(e) = ws.send(Message::Text(json.into())).await {
                self.pending.lock().remove(&id);
                return Err(e.into());
            }
        }

        match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::ChannelClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("{} (request {})", method, id)))
            }
        }
    }

    /// Evaluate an expression in the page and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let params = serde_json::to_value(EvaluateParams::new(expression))?;
        let raw = self.call("Runtime.evaluate", Some(params)).await?;
        let result: EvaluateResult = serde_json::from_value(raw)?;
        if let Some(details) = result.exception_details {
            return Err(CdpError::JavaScript(details.message()));
        }
        Ok(result.result.value.unwrap_or(Value::Null))
    }

    pub fn is_closed(&self) -> bool {
        // A dropped sender means the receive task is gone.
        *self.closed.borrow() || self.closed.has_changed().is_err()
    }

    /// Resolves once the channel has closed.
    pub async fn closed(&self) {
        let mut rx = self.closed.clone();
        // An error means the sender is gone, which also means closed.
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Close the socket. Pending calls fail with [`CdpError::ChannelClosed`].
    pub async fn close(&self) {
        {
            let mut ws = self.ws_tx.lock().await;
            let _ = ws.send(Message::Close(None)).await;
            let _ = ws.close().await;
        }
        self.recv_task.abort();
        self.pending.lock().clear();
    }
}

impl Drop for ControlChannel {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
