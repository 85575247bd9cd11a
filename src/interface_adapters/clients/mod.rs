// Clients for external services the sync layer depends on.

pub mod directory;
pub mod ping;

pub use directory::{DirectoryClient, DirectoryError};
pub use ping::TcpPing;
