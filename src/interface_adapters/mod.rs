// Interface adapters: wire formats, relay transport and outbound clients.

pub mod clients;
pub mod codec;
pub mod envelope;
pub mod protocol;
pub mod transport;
pub mod utils;
