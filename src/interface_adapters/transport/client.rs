use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::domain::errors::TransportError;
use crate::domain::identity::Identity;
use crate::domain::ports::FrameSink;
use crate::interface_adapters::envelope::{decode_inbound, encode_outbound};
use crate::interface_adapters::protocol::{
    ACTION_SET_CLIENT, ACTION_UPDATE_SIG_CHAIN, ControlRequest, ControlResponse, ERR_SUCCESS,
};
use crate::interface_adapters::transport::backoff::Backoff;
use crate::use_cases::throttle::should_log;
use crate::use_cases::types::{ConnectionState, TransportEvent};

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub reconnect_min: Duration,
    pub reconnect_max: Duration,
    /// Capacity of the event channel read by the session.
    pub event_capacity: usize,
    /// Capacity of the outbound command queue.
    pub command_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            reconnect_min: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(64),
            event_capacity: 1024,
            command_capacity: 1024,
        }
    }
}

#[derive(Debug)]
enum Command {
    Send { dest: String, payload: Vec<u8> },
    Close,
}

// How one connection attempt ended.
enum Outcome {
    ClosedByOwner,
    Rejected(i64),
    Lost(TransportError),
}

/// Builds the WebSocket URL for a relay `host:port`.
pub fn relay_url(address: &str) -> String {
    if address.starts_with("ws://") || address.starts_with("wss://") {
        address.to_string()
    } else {
        format!("ws://{address}")
    }
}

/// Cheap, cloneable sender side of a running transport.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    cmd_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl TransportHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Fire-and-forget send. Dropped (returns false) unless the handshake has completed;
    /// nothing is queued across disconnects.
    pub fn send(&self, dest: &str, payload: Vec<u8>) -> bool {
        if self.state() != ConnectionState::Connected {
            debug!(%dest, "send while not connected; dropping");
            return false;
        }
        match self.cmd_tx.try_send(Command::Send {
            dest: dest.to_string(),
            payload,
        }) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(%dest, "outbound queue full; dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Stops reconnecting and closes the socket.
    pub async fn close(&self) {
        let _ = self.cmd_tx.send(Command::Close).await;
    }
}

impl FrameSink for TransportHandle {
    fn send_frame(&self, destination: &Identity, payload: Vec<u8>) -> bool {
        self.send(destination.as_str(), payload)
    }
}

pub struct TransportClient {
    pub handle: TransportHandle,
    pub events: mpsc::Receiver<TransportEvent>,
    pub task: JoinHandle<()>,
}

impl TransportClient {
    /// Spawns the connection task. Never fails synchronously; connection problems
    /// surface as `Disconnected` events and are retried with backoff.
    pub fn connect(address: &str, name: Identity, config: TransportConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_capacity);
        let (event_tx, events) = mpsc::channel(config.event_capacity);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let url = relay_url(address);
        let task = tokio::spawn(connection_task(url, name, config, cmd_rx, event_tx, state_tx));

        Self {
            handle: TransportHandle { cmd_tx, state_rx },
            events,
            task,
        }
    }
}

async fn connection_task(
    url: String,
    name: Identity,
    config: TransportConfig,
    mut cmd_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::Sender<TransportEvent>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let mut backoff = Backoff::new(config.reconnect_min, config.reconnect_max);
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        let span = info_span!("relay", attempt, url = %url, name = %name);
        let outcome = run_connection(&url, &name, &mut cmd_rx, &event_tx, &state_tx, &mut backoff)
            .instrument(span)
            .await;

        match outcome {
            Outcome::ClosedByOwner => {
                info!(%url, reason = %TransportError::Closed, "transport stopped by owner");
                break;
            }
            Outcome::Rejected(code) => {
                let err = TransportError::HandshakeRejected { code };
                error!(%url, error = %err, "relay rejected identity; not reconnecting");
                let _ = state_tx.send(ConnectionState::Closed);
                let _ = event_tx.send(TransportEvent::Rejected { code }).await;
                break;
            }
            Outcome::Lost(err) => {
                let _ = state_tx.send(ConnectionState::Disconnected);
                let reason = err.to_string();
                if event_tx
                    .send(TransportEvent::Disconnected { reason })
                    .await
                    .is_err()
                {
                    // Nobody is listening any more.
                    break;
                }

                let delay = backoff.next_delay();
                warn!(%url, error = %err, attempt, delay_ms = delay.as_millis() as u64, "connection lost; reconnecting");
                if !wait_backoff(delay, &mut cmd_rx).await {
                    info!(%url, "transport closed during backoff");
                    break;
                }
            }
        }
    }

    let _ = state_tx.send(ConnectionState::Closed);
}

fn drop_send(dest: &str, state: &str) {
    debug!(%dest, state, "send while not connected; dropping");
}

// Sleeps for `delay` while draining commands. Returns false if the owner closed.
async fn wait_backoff(delay: Duration, cmd_rx: &mut mpsc::Receiver<Command>) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Send { dest, .. }) => drop_send(&dest, "backoff"),
                Some(Command::Close) | None => return false,
            },
        }
    }
}

async fn run_connection(
    url: &str,
    name: &Identity,
    cmd_rx: &mut mpsc::Receiver<Command>,
    event_tx: &mpsc::Sender<TransportEvent>,
    state_tx: &watch::Sender<ConnectionState>,
    backoff: &mut Backoff,
) -> Outcome {
    let _ = state_tx.send(ConnectionState::Connecting);

    let connect = connect_async(url);
    tokio::pin!(connect);
    let socket = loop {
        tokio::select! {
            res = &mut connect => match res {
                Ok((socket, _response)) => break socket,
                Err(e) => {
                    return Outcome::Lost(TransportError::ConnectionLost(format!("connect failed: {e}")));
                }
            },
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Send { dest, .. }) => drop_send(&dest, "connecting"),
                Some(Command::Close) | None => return Outcome::ClosedByOwner,
            },
        }
    };

    let (mut sink, mut stream) = socket.split();

    // Handshake: register our name with the relay.
    let _ = state_tx.send(ConnectionState::Handshaking);
    let request = match serde_json::to_string(&ControlRequest::set_client(name.as_str())) {
        Ok(text) => text,
        Err(e) => {
            return Outcome::Lost(TransportError::ConnectionLost(format!("encode handshake: {e}")));
        }
    };
    if let Err(e) = sink.send(Message::text(request)).await {
        return Outcome::Lost(TransportError::ConnectionLost(format!("send handshake: {e}")));
    }
    debug!("handshake sent");

    let mut connected = false;
    let mut last_bad_frame_log = None;

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Binary(data))) => match decode_inbound(&data) {
                    Ok(inbound) => {
                        let event = TransportEvent::Message {
                            src: Identity::new(inbound.src),
                            payload: inbound.payload,
                        };
                        if event_tx.send(event).await.is_err() {
                            return Outcome::ClosedByOwner;
                        }
                    }
                    Err(e) => {
                        if should_log(&mut last_bad_frame_log) {
                            warn!(error = %e, bytes = data.len(), "malformed inbound frame; dropping");
                        }
                    }
                },
                Some(Ok(Message::Text(text))) => {
                    let ack = match serde_json::from_str::<ControlResponse>(text.as_str()) {
                        Ok(ack) => ack,
                        Err(e) => {
                            if should_log(&mut last_bad_frame_log) {
                                warn!(error = %e, "unparseable control frame; dropping");
                            }
                            continue;
                        }
                    };

                    if ack.error != ERR_SUCCESS {
                        if ack.action == ACTION_SET_CLIENT {
                            let _ = state_tx.send(ConnectionState::Closing);
                            let _ = sink.send(Message::Close(None)).await;
                            let _ = sink.close().await;
                            return Outcome::Rejected(ack.error);
                        }
                        warn!(action = %ack.action, code = ack.error, "relay reported an error");
                        continue;
                    }

                    match ack.action.as_str() {
                        ACTION_SET_CLIENT => {
                            if !connected {
                                connected = true;
                                backoff.reset();
                                let _ = state_tx.send(ConnectionState::Connected);
                                info!("connected to relay");
                                if event_tx.send(TransportEvent::Connected).await.is_err() {
                                    return Outcome::ClosedByOwner;
                                }
                            }
                        }
                        ACTION_UPDATE_SIG_CHAIN => {}
                        other => warn!(action = %other, "unknown control action"),
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| format!("relay closed ({}) {}", u16::from(f.code), f.reason))
                        .unwrap_or_else(|| "relay closed".to_string());
                    return Outcome::Lost(TransportError::ConnectionLost(reason));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Outcome::Lost(TransportError::ConnectionLost(e.to_string()));
                }
                None => {
                    return Outcome::Lost(TransportError::ConnectionLost("stream ended".to_string()));
                }
            },

            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Send { dest, payload }) => {
                    if !connected {
                        drop_send(&dest, "handshaking");
                        continue;
                    }
                    let frame = encode_outbound(&dest, &payload);
                    if let Err(e) = sink.send(Message::binary(frame)).await {
                        return Outcome::Lost(TransportError::ConnectionLost(format!("send failed: {e}")));
                    }
                }
                Some(Command::Close) | None => {
                    let _ = state_tx.send(ConnectionState::Closing);
                    let _ = sink.send(Message::Close(None)).await;
                    let _ = sink.close().await;
                    return Outcome::ClosedByOwner;
                }
            },
        }
    }
}
