// Overlay transport: one WebSocket to a relay node, with handshake and reconnect.

pub mod backoff;
pub mod client;

pub use backoff::Backoff;
pub use client::{TransportClient, TransportConfig, TransportHandle, relay_url};
