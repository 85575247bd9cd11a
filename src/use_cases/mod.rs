// Use cases layer: relay selection, role logic and the simulation session.

pub mod resolver;
pub mod session;
pub mod sync;
pub mod throttle;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use resolver::{AddressResolver, Resolved};
pub use session::{SessionChannels, SessionEnd, session_task};
pub use sync::{Outgoing, Role, SyncConfig, SyncEngine};
pub use types::{ConnectionState, SessionCommand, SessionSnapshot, TransportEvent};
