// In-process fakes for integration tests: a WebSocket relay node and a JSON-RPC
// directory, each served by axum on an ephemeral port.
#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use arena_sync::domain::identity::Identity;
use arena_sync::domain::ports::Presenter;
use arena_sync::interface_adapters::envelope::{decode_outbound, encode_inbound};
use axum::{
    Json, Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, post},
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// Error code the fake relay answers with for rejected names.
pub const REJECT_CODE: i64 = 45021;

// Binds an ephemeral port and serves `app` on the current runtime.
async fn serve(app: Router) -> SocketAddr {
    // Bind to an ephemeral port to avoid collisions with local services.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake server failed");
    });
    addr
}

/// Polls `check` until it holds or five seconds pass.
pub async fn eventually(what: &str, check: impl Fn() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

enum RelayCommand {
    Frame(Vec<u8>),
    Drop,
}

struct Registration {
    conn_id: u64,
    tx: mpsc::UnboundedSender<RelayCommand>,
}

#[derive(Default)]
struct RelayState {
    clients: Mutex<HashMap<String, Registration>>,
    rejected: Mutex<HashSet<String>>,
    handshakes: AtomicUsize,
    next_conn: AtomicU64,
    refuse_remaining: AtomicUsize,
    attempts: Mutex<Vec<Instant>>,
}

/// Relay node fake: acks `setClient`, routes envelopes by registered name and
/// stamps the sender's name as `src`.
#[derive(Clone)]
pub struct FakeRelay {
    pub addr: SocketAddr,
    state: Arc<RelayState>,
}

impl FakeRelay {
    pub async fn start() -> Self {
        let state = Arc::new(RelayState::default());
        let app = Router::new()
            .route("/", any(relay_ws))
            .with_state(state.clone());
        let addr = serve(app).await;
        Self { addr, state }
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Successful handshakes so far, across all names.
    pub fn handshakes(&self) -> usize {
        self.state.handshakes.load(Ordering::SeqCst)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        let guard = self.state.clients.lock().expect("clients mutex poisoned");
        guard.contains_key(name)
    }

    /// Future `setClient` calls for `name` fail with [`REJECT_CODE`].
    pub fn reject(&self, name: &str) {
        let mut guard = self.state.rejected.lock().expect("rejected mutex poisoned");
        guard.insert(name.to_string());
    }

    /// Answers the next `count` upgrade requests with 503 instead of a WebSocket.
    pub fn refuse_upgrades(&self, count: usize) {
        self.state.refuse_remaining.store(count, Ordering::SeqCst);
    }

    /// Arrival time of every upgrade request, refused or not.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.state.attempts.lock().expect("attempts mutex poisoned").clone()
    }

    /// Cuts the connection registered as `name` without a close handshake.
    pub fn drop_client(&self, name: &str) -> bool {
        self.command(name, RelayCommand::Drop)
    }

    /// Sends raw bytes as one binary frame to `name`, bypassing envelope encoding.
    pub fn inject_raw(&self, name: &str, bytes: Vec<u8>) -> bool {
        self.command(name, RelayCommand::Frame(bytes))
    }

    /// Delivers `payload` to `name` as if `src` had sent it.
    pub fn deliver(&self, src: &str, name: &str, payload: &[u8]) -> bool {
        self.command(name, RelayCommand::Frame(encode_inbound(src, payload)))
    }

    fn command(&self, name: &str, command: RelayCommand) -> bool {
        let guard = self.state.clients.lock().expect("clients mutex poisoned");
        match guard.get(name) {
            Some(registration) => registration.tx.send(command).is_ok(),
            None => false,
        }
    }
}

async fn relay_ws(ws: WebSocketUpgrade, State(state): State<Arc<RelayState>>) -> Response {
    state
        .attempts
        .lock()
        .expect("attempts mutex poisoned")
        .push(Instant::now());
    let refused = state
        .refuse_remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if refused {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    ws.on_upgrade(move |socket| relay_connection(socket, state))
}

async fn relay_connection(socket: WebSocket, state: Arc<RelayState>) {
    let (mut sink, mut stream) = socket.split();

    // The first text frame must be the setClient request.
    let name = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                let request: Value = match serde_json::from_str(text.as_str()) {
                    Ok(value) => value,
                    Err(_) => continue,
                };
                if request["Action"] != "setClient" {
                    continue;
                }
                match request["Addr"].as_str() {
                    Some(addr) => break addr.to_string(),
                    None => return,
                }
            }
            Some(Ok(_)) => continue,
            _ => return,
        }
    };

    let rejected = {
        let guard = state.rejected.lock().expect("rejected mutex poisoned");
        guard.contains(&name)
    };
    if rejected {
        let ack = json!({ "Action": "setClient", "Error": REJECT_CODE }).to_string();
        let _ = sink.send(Message::Text(ack.into())).await;
        let _ = sink.close().await;
        return;
    }

    let conn_id = state.next_conn.fetch_add(1, Ordering::SeqCst);
    let (tx, mut rx) = mpsc::unbounded_channel();
    {
        let mut guard = state.clients.lock().expect("clients mutex poisoned");
        guard.insert(name.clone(), Registration { conn_id, tx });
    }

    let ack = json!({ "Action": "setClient", "Error": 0 }).to_string();
    if sink.send(Message::Text(ack.into())).await.is_err() {
        unregister(&state, &name, conn_id);
        return;
    }
    state.handshakes.fetch_add(1, Ordering::SeqCst);
    // Relays also push chain updates; clients must ignore them.
    let update = json!({ "Action": "updateSigChainBlockHash", "Error": 0, "Result": "00" });
    let _ = sink.send(Message::Text(update.to_string().into())).await;

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Binary(data))) => {
                    let Ok((dest, payload)) = decode_outbound(&data) else {
                        continue;
                    };
                    let frame = encode_inbound(&name, &payload);
                    let guard = state.clients.lock().expect("clients mutex poisoned");
                    if let Some(target) = guard.get(&dest) {
                        let _ = target.tx.send(RelayCommand::Frame(frame));
                    }
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            command = rx.recv() => match command {
                Some(RelayCommand::Frame(bytes)) => {
                    if sink.send(Message::Binary(bytes.into())).await.is_err() {
                        break;
                    }
                }
                Some(RelayCommand::Drop) | None => break,
            },
        }
    }

    unregister(&state, &name, conn_id);
}

// Only removes the entry if a newer connection has not taken the name over.
fn unregister(state: &RelayState, name: &str, conn_id: u64) {
    let mut guard = state.clients.lock().expect("clients mutex poisoned");
    if guard.get(name).is_some_and(|r| r.conn_id == conn_id) {
        guard.remove(name);
    }
}

#[derive(Default)]
struct DirectoryState {
    table: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    requests: AtomicUsize,
}

/// JSON-RPC directory fake answering `getwsaddr` from a table.
#[derive(Clone)]
pub struct FakeDirectory {
    pub url: String,
    state: Arc<DirectoryState>,
}

impl FakeDirectory {
    pub async fn start() -> Self {
        let state = Arc::new(DirectoryState::default());
        let app = Router::new()
            .route("/", post(directory_rpc))
            .with_state(state.clone());
        let addr = serve(app).await;
        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    pub fn insert(&self, name: &str, address: &str) {
        let mut guard = self.state.table.lock().expect("table mutex poisoned");
        guard.insert(name.to_string(), address.to_string());
    }

    /// Lookups of `name` answer with an rpc error.
    pub fn fail(&self, name: &str) {
        let mut guard = self.state.failing.lock().expect("failing mutex poisoned");
        guard.insert(name.to_string());
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }
}

async fn directory_rpc(
    State(state): State<Arc<DirectoryState>>,
    Json(request): Json<Value>,
) -> Json<Value> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let id = request["id"].clone();
    let name = request["params"]["address"].as_str().unwrap_or_default();

    if request["method"] != "getwsaddr" {
        return Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": "method not found" }
        }));
    }

    let failing = {
        let guard = state.failing.lock().expect("failing mutex poisoned");
        guard.contains(name)
    };
    if failing {
        return Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -45022, "message": "internal error" }
        }));
    }

    let address = {
        let guard = state.table.lock().expect("table mutex poisoned");
        guard.get(name).cloned()
    };
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": address }))
}

// Presenter double shared between the test and a spawned session.
#[derive(Clone, Default)]
pub struct SharedPresenter {
    pub follows: Arc<Mutex<Vec<(usize, Identity)>>>,
    pub chats: Arc<Mutex<Vec<(Identity, String)>>>,
}

impl SharedPresenter {
    pub fn chat_lines(&self) -> Vec<(Identity, String)> {
        self.chats.lock().expect("chats mutex poisoned").clone()
    }

    pub fn followed(&self) -> Vec<(usize, Identity)> {
        self.follows.lock().expect("follows mutex poisoned").clone()
    }
}

impl Presenter for SharedPresenter {
    fn follow(&mut self, slot: usize, identity: &Identity) {
        let mut guard = self.follows.lock().expect("follows mutex poisoned");
        guard.push((slot, identity.clone()));
    }

    fn show_chat(&mut self, from: &Identity, text: &str) {
        let mut guard = self.chats.lock().expect("chats mutex poisoned");
        guard.push((from.clone(), text.to_string()));
    }
}
