// Synchronization engine: the server/client role logic between decoded frames and
// the simulation. Single owner; the session task is the only caller.
//
// Every entry point returns the frames to send instead of sending them, so the
// engine itself never touches the transport.

mod client;
mod server;

use std::time::Instant;
use tracing::{debug, error, warn};

use crate::domain::identity::{Identity, candidate_names};
use crate::domain::messages::{Message, MovementState, TankState};
use crate::domain::ports::{Arena, InputSource, Presenter, Tank};
use crate::domain::roster::{MAX_ROSTER_LEN, Roster};
use crate::domain::tuning::TankTuning;
use crate::domain::vec2::Vec2;
use crate::interface_adapters::codec;
use crate::use_cases::throttle::should_log;

/// Which side of the match this node plays. Decided locally, never negotiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Server,
    /// `server` is the server's base key; joins go to every candidate name of it.
    Client { server: Identity },
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub role: Role,
    /// Name this node is registered under on the relay network.
    pub local: Identity,
    /// Server roster capacity, clamped to the one-byte batch limit.
    pub max_players: usize,
    /// Server chat target. `None` means roster slot 1.
    pub chat_recipient: Option<Identity>,
    pub tuning: TankTuning,
}

impl SyncConfig {
    pub fn server(local: Identity) -> Self {
        Self {
            role: Role::Server,
            local,
            max_players: 16,
            chat_recipient: None,
            tuning: TankTuning::default(),
        }
    }

    pub fn client(local: Identity, server: Identity) -> Self {
        Self {
            role: Role::Client { server },
            local,
            max_players: MAX_ROSTER_LEN,
            chat_recipient: None,
            tuning: TankTuning::default(),
        }
    }
}

/// One encoded payload addressed to a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub destination: Identity,
    pub payload: Vec<u8>,
}

#[derive(Default)]
struct DropLogs {
    malformed: Option<Instant>,
    unexpected: Option<Instant>,
    unknown_sender: Option<Instant>,
}

pub struct SyncEngine<A: Arena, P, I> {
    config: SyncConfig,
    arena: A,
    presenter: P,
    input: I,
    roster: Roster<A::Tank>,
    local_slot: Option<usize>,
    // Client only: source of the first initial broadcast.
    bound_server: Option<Identity>,
    logs: DropLogs,
}

impl<A, P, I> SyncEngine<A, P, I>
where
    A: Arena,
    P: Presenter,
    I: InputSource,
{
    /// Builds the engine. A server starts with a roster holding only itself.
    pub fn new(config: SyncConfig, arena: A, presenter: P, input: I) -> Self {
        let capacity = match config.role {
            Role::Server => config.max_players.max(1),
            Role::Client { .. } => MAX_ROSTER_LEN,
        };

        let mut engine = Self {
            config,
            arena,
            presenter,
            input,
            roster: Roster::new(capacity),
            local_slot: None,
            bound_server: None,
            logs: DropLogs::default(),
        };

        if engine.is_server() {
            engine.start_server();
        }
        engine
    }

    pub fn is_server(&self) -> bool {
        matches!(self.config.role, Role::Server)
    }

    pub fn role(&self) -> &Role {
        &self.config.role
    }

    pub fn local_identity(&self) -> &Identity {
        &self.config.local
    }

    pub fn local_slot(&self) -> Option<usize> {
        self.local_slot
    }

    /// Authoritative peer: the local node for a server, the bound address for a client.
    pub fn server_identity(&self) -> Option<&Identity> {
        match self.config.role {
            Role::Server => Some(&self.config.local),
            Role::Client { .. } => self.bound_server.as_ref(),
        }
    }

    pub fn roster(&self) -> &Roster<A::Tank> {
        &self.roster
    }

    pub fn roster_identities(&self) -> Vec<Identity> {
        self.roster.identities()
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// Handshake completed (first time or after a reconnect).
    pub fn on_connected(&mut self) -> Vec<Outgoing> {
        match &self.config.role {
            Role::Server => Vec::new(),
            Role::Client { server } => {
                // The live candidate is unknown, so every candidate gets the join.
                let payload = match codec::encode(&Message::Join) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        error!(error = %e, "failed to encode join");
                        return Vec::new();
                    }
                };
                debug!(server = %server, "sending join to every candidate name");
                candidate_names(server)
                    .into_iter()
                    .map(|destination| Outgoing {
                        destination,
                        payload: payload.clone(),
                    })
                    .collect()
            }
        }
    }

    /// Handles one inbound payload. Malformed frames are dropped and logged.
    pub fn on_frame(&mut self, src: &Identity, payload: &[u8]) -> Vec<Outgoing> {
        let message = match codec::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                if should_log(&mut self.logs.malformed) {
                    warn!(src = %src, error = %e, bytes = payload.len(), "dropping malformed payload");
                }
                return Vec::new();
            }
        };

        match self.config.role {
            Role::Server => self.server_on_message(src, message, payload),
            Role::Client { .. } => self.client_on_message(src, message),
        }
    }

    /// One simulation step: sample input, advance tanks, emit the per-tick frames.
    pub fn tick(&mut self, dt: f32) -> Vec<Outgoing> {
        let input = self.input.sample();
        if let Some(slot) = self.local_slot {
            let dead_zone_sq = self.config.tuning.input_dead_zone_sq;
            if let Some(local) = self.roster.get_mut(slot) {
                apply_input(&mut local.tank, input, dead_zone_sq);
            }
        }

        for participant in self.roster.iter_mut() {
            participant.tank.advance(dt);
        }

        match self.config.role {
            Role::Server => self.server_broadcast(false),
            Role::Client { .. } => self.client_send_input(input),
        }
    }

    /// Sends a chat line from the local player.
    pub fn send_chat(&mut self, text: &str) -> Vec<Outgoing> {
        let destination = match self.config.role {
            Role::Server => self.chat_recipient(),
            Role::Client { .. } => self.bound_server.clone(),
        };
        let Some(destination) = destination else {
            warn!("no chat recipient yet; dropping chat");
            return Vec::new();
        };

        match codec::encode(&Message::chat(text)) {
            Ok(payload) => {
                let local = self.config.local.clone();
                self.presenter.show_chat(&local, text);
                vec![Outgoing {
                    destination,
                    payload,
                }]
            }
            Err(e) => {
                error!(error = %e, "failed to encode chat");
                Vec::new()
            }
        }
    }

    // Server chat target: configured recipient, else roster slot 1.
    fn chat_recipient(&self) -> Option<Identity> {
        if let Some(recipient) = &self.config.chat_recipient {
            return Some(recipient.clone());
        }
        self.roster.get(1).map(|p| p.identity.clone())
    }

    fn occupied_positions(&self, except: Option<usize>) -> Vec<Vec2> {
        self.roster
            .iter()
            .enumerate()
            .filter(|(slot, _)| Some(*slot) != except)
            .map(|(_, p)| p.tank.position())
            .collect()
    }
}

/// Validates client input: non-finite values are dropped, tiny directions zeroed,
/// long directions normalized.
pub fn sanitize_input(mut input: MovementState, dead_zone_sq: f32) -> Option<MovementState> {
    let values = [input.move_x, input.move_y, input.fire_x, input.fire_y];
    if values.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let direction = Vec2::new(input.move_x, input.move_y);
    let length_sq = direction.length_squared();
    let direction = if length_sq <= dead_zone_sq {
        Vec2::ZERO
    } else if length_sq > 1.0 {
        direction.normalized()
    } else {
        direction
    };
    input.move_x = direction.x;
    input.move_y = direction.y;

    Some(input)
}

fn apply_input<T: Tank>(tank: &mut T, input: MovementState, dead_zone_sq: f32) -> bool {
    let Some(input) = sanitize_input(input, dead_zone_sq) else {
        return false;
    };
    tank.set_desired_direction(Vec2::new(input.move_x, input.move_y));
    tank.set_fire_target(Vec2::new(input.fire_x, input.fire_y));
    tank.set_fire_held(input.fire);
    true
}

fn snapshot_state<T: Tank>(tank: &T, respawned: bool, identity: Option<&Identity>) -> TankState {
    let position = tank.position();
    let target = tank.fire_target();
    TankState {
        move_x: position.x,
        move_y: position.y,
        fire: tank.fire_held(),
        fire_x: target.x,
        fire_y: target.y,
        rotation: respawned.then(|| tank.rotation()),
        identity: identity.cloned(),
    }
}

// Applies one authoritative entry to a replica: teleport on respawn, otherwise
// hand the position to the smoothing model.
fn apply_remote<T: Tank>(tank: &mut T, state: &TankState) {
    let position = Vec2::new(state.move_x, state.move_y);
    match state.rotation {
        Some(rotation) => tank.respawn_at(position, rotation),
        None => tank.set_desired_position(position),
    }
    tank.set_fire_target(Vec2::new(state.fire_x, state.fire_y));
    tank.set_fire_held(state.fire);
}
