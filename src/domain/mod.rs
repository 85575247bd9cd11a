// Domain layer: participants, message records and the ports the sync engine drives.

pub mod arena;
pub mod errors;
pub mod identity;
pub mod messages;
pub mod ports;
pub mod roster;
pub mod systems;
pub mod tuning;
pub mod vec2;

pub use errors::{CodecError, EnvelopeError, ResolutionError, RosterError, TransportError};
pub use identity::{CANDIDATE_COUNT, Identity, candidate_names};
pub use messages::{ChatMessage, Message, MessageKind, MovementState, TankState, TankStates};
pub use ports::{
    Arena, Directory, FrameSink, InputSource, LatencyMeter, Presenter, SpawnPoint, Tank,
};
pub use roster::{Admission, Participant, Roster};
pub use vec2::Vec2;
