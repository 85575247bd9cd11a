// Use-case level inputs/outputs shared between the transport and the session loop.

use crate::domain::identity::Identity;

/// Events raised by the transport, drained by the session once per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake acknowledged; raised once per successful handshake.
    Connected,
    /// A binary frame from `src`. The payload is not inspected by the transport.
    Message { src: Identity, payload: Vec<u8> },
    /// Connection dropped; the transport is backing off and will reconnect.
    Disconnected { reason: String },
    /// Relay refused our identity; the transport has stopped for good.
    Rejected { code: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Handshaking,
    Connected,
    Closing,
    Closed,
}

/// Commands the node (or a test) feeds into a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Chat(String),
    /// Server only: respawn the named participant at a free spawn point.
    Respawn(Identity),
}

/// Read-only view published by the session after every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub tick: u64,
    pub roster: Vec<Identity>,
    pub local_slot: Option<usize>,
    pub server: Option<Identity>,
    pub connected: bool,
}
