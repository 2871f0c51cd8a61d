//! In-process DevTools page used by the crate's tests.
//!
//! [`FakePage`] speaks just enough of the protocol for the driver: it serves
//! `Runtime.evaluate` over a WebSocket, treats the bridge bootstrap as an
//! install, and answers bridge calls from a [`MemoryPage`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use autoaccept_agent::{ElementHandle, InspectError, MemoryPage, OverlaySurface, PageInspector};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;

use crate::bridge::{BRIDGE_SCRIPT, BridgeRequest};
use crate::protocol::PageInfo;

struct FakeState {
    page: MemoryPage,
    installed: AtomicBool,
    injections: AtomicUsize,
    muted: AtomicBool,
    connections: AtomicUsize,
    request_ids: Mutex<Vec<u64>>,
    kick: watch::Sender<u64>,
}

pub(crate) struct FakePage {
    id: String,
    addr: SocketAddr,
    state: Arc<FakeState>,
    task: tokio::task::JoinHandle<()>,
}

impl FakePage {
    pub async fn start(id: &str, page: MemoryPage) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (kick, _) = watch::channel(0);
        let state = Arc::new(FakeState {
            page,
            installed: AtomicBool::new(false),
            injections: AtomicUsize::new(0),
            muted: AtomicBool::new(false),
            connections: AtomicUsize::new(0),
            request_ids: Mutex::new(Vec::new()),
            kick,
        });

        let task = {
            let state = state.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(serve(stream, state.clone()));
                }
            })
        };

        Self {
            id: id.to_string(),
            addr,
            state,
            task,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/devtools/page/{}", self.addr, self.id)
    }

    /// Listing entry for `/json/list`.
    pub fn info(&self) -> PageInfo {
        PageInfo {
            id: self.id.clone(),
            page_type: "page".to_string(),
            title: "workbench".to_string(),
            url: "vscode-file://vscode-app/workbench.html".to_string(),
            web_socket_debugger_url: Some(self.ws_url()),
        }
    }

    pub fn page(&self) -> &MemoryPage {
        &self.state.page
    }

    pub fn injections(&self) -> usize {
        self.state.injections.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn request_ids(&self) -> Vec<u64> {
        self.state.request_ids.lock().clone()
    }

    /// Stop answering requests.
    pub fn mute(&self, muted: bool) {
        self.state.muted.store(muted, Ordering::SeqCst);
    }

    /// Forget the bridge, as a page reload would.
    pub fn reload(&self) {
        self.state.installed.store(false, Ordering::SeqCst);
    }

    /// Drop every open WebSocket.
    pub fn disconnect_all(&self) {
        self.state.kick.send_modify(|n| *n += 1);
    }
}

impl Drop for FakePage {
    fn drop(&mut self) {
        self.task.abort();
        self.disconnect_all();
    }
}

async fn serve(stream: TcpStream, state: Arc<FakeState>) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    state.connections.fetch_add(1, Ordering::SeqCst);
    let mut kick = state.kick.subscribe();

    loop {
        tokio::select! {
            _ = kick.changed() => break,
            msg = ws.next() => {
                let Some(Ok(Message::Text(text))) = msg else {
                    break;
                };
                let Ok(request) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                if state.muted.load(Ordering::SeqCst) {
                    continue;
                }
                let reply = handle(&state, &request).await;
                if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                    break;
                }
            }
        }
    }
    let _ = ws.close(None).await;
}

async fn handle(state: &FakeState, request: &Value) -> Value {
    let id = request["id"].as_u64().unwrap_or_default();
    state.request_ids.lock().push(id);

    let method = request["method"].as_str().unwrap_or_default();
    if method != "Runtime.evaluate" {
        return json!({
            "id": id,
            "error": {"code": -32601, "message": format!("'{}' wasn't found", method)}
        });
    }

    let expression = request["params"]["expression"].as_str().unwrap_or_default();
    if expression == BRIDGE_SCRIPT {
        state.installed.store(true, Ordering::SeqCst);
        state.injections.fetch_add(1, Ordering::SeqCst);
        return value_reply(id, json!(true));
    }

    let Some(call) = BridgeRequest::from_expression(expression) else {
        return json!({
            "id": id,
            "result": {
                "result": {"type": "object", "subtype": "error"},
                "exceptionDetails": {
                    "text": "Uncaught",
                    "exception": {
                        "type": "object",
                        "description": format!("ReferenceError: {} is not defined", expression)
                    }
                }
            }
        });
    };

    if !state.installed.load(Ordering::SeqCst) {
        return value_reply(id, json!({"missing": true}));
    }

    let envelope = match dispatch(&state.page, call).await {
        Ok(value) => json!({"ok": true, "value": value}),
        Err(InspectError::StaleHandle(handle)) => {
            json!({"ok": false, "stale": handle, "error": "stale handle"})
        }
        Err(e) => json!({"ok": false, "error": e.to_string()}),
    };
    value_reply(id, envelope)
}

fn value_reply(id: u64, value: Value) -> Value {
    json!({"id": id, "result": {"result": {"type": "object", "value": value}}})
}

async fn dispatch(page: &MemoryPage, call: BridgeRequest) -> Result<Value, InspectError> {
    let value = match call {
        BridgeRequest::Find { selectors } => serde_json::to_value(page.find_candidates(&selectors).await?)?,
        BridgeRequest::Query { selectors } => serde_json::to_value(page.query(&selectors).await?)?,
        BridgeRequest::Describe { handle } => {
            serde_json::to_value(page.describe(ElementHandle(handle)).await?)?
        }
        BridgeRequest::Ancestors { handle, depth } => {
            serde_json::to_value(page.ancestors_of(ElementHandle(handle), depth).await?)?
        }
        BridgeRequest::PreviousSiblings { handle, limit } => {
            serde_json::to_value(page.previous_siblings(ElementHandle(handle), limit).await?)?
        }
        BridgeRequest::FindWithin { handle, selectors } => {
            serde_json::to_value(page.find_within(ElementHandle(handle), &selectors).await?)?
        }
        BridgeRequest::Click { handle } => {
            PageInspector::click(page, ElementHandle(handle)).await?;
            Value::Null
        }
        BridgeRequest::OverlayMount { panels } => {
            OverlaySurface::mount(page, &panels).await?;
            Value::Null
        }
        BridgeRequest::OverlayRender { cards } => {
            OverlaySurface::render(page, &cards).await?;
            Value::Null
        }
        BridgeRequest::OverlayDismount => {
            OverlaySurface::dismount(page).await?;
            Value::Null
        }
    };
    Ok(value)
}
