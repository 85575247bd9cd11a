// Domain-level errors for the sync layer.
use thiserror::Error;

/// Failures decoding or encoding an application payload.
///
/// Both decode variants share one policy: drop the frame, log, keep the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("payload is empty")]
    Empty,
    #[error("unknown message tag {0}")]
    UnknownMessageTag(u8),
    #[error("malformed message: needed {needed} bytes at offset {offset}, {remaining} left")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("malformed message: string length prefix overflows")]
    InvalidLength,
    #[error("malformed message: string is not valid utf-8")]
    InvalidString,
    #[error("tank state batch holds {0} entries; the wire limit is 255")]
    TooManyStates(usize),
    #[error("initial tank state at index {0} has no identity")]
    MissingIdentity(usize),
}

/// Failures parsing the outer envelope of a binary frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("envelope decode failed: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("envelope has no source")]
    MissingSource,
}

/// No directory candidate resolved to a reachable relay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no reachable relay among {attempted} candidates for {identity}")]
pub struct ResolutionError {
    pub identity: String,
    pub attempted: usize,
}

/// Failures on the overlay connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The relay refused our identity. Fatal; never retried.
    #[error("handshake rejected with code {code}")]
    HandshakeRejected { code: i64 },
    /// Connection dropped or could not be opened. Retried with backoff.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// The owner closed the client.
    #[error("transport closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("roster is full ({capacity} participants)")]
    Full { capacity: usize },
}
