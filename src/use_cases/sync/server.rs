// Authoritative role: admits joins, applies client input, broadcasts state.

use tracing::{debug, error, info, warn};

use super::{Outgoing, SyncEngine, apply_input, snapshot_state};
use crate::domain::identity::Identity;
use crate::domain::messages::{Message, TankStates};
use crate::domain::ports::{Arena, InputSource, Presenter, Tank};
use crate::domain::roster::Admission;
use crate::interface_adapters::codec;
use crate::use_cases::throttle::should_log;

impl<A, P, I> SyncEngine<A, P, I>
where
    A: Arena,
    P: Presenter,
    I: InputSource,
{
    // Roster starts as just the local tank, placed at a spawn point.
    pub(super) fn start_server(&mut self) {
        let local = self.config.local.clone();
        let point = self.arena.spawn_point(&[]);
        let arena = &mut self.arena;
        let admitted = self.roster.admit(local.clone(), || {
            let mut tank = arena.spawn_tank(true);
            tank.respawn_at(point.position, point.rotation);
            tank
        });

        match admitted {
            Ok(admission) => {
                let slot = admission.slot();
                self.local_slot = Some(slot);
                self.presenter.follow(slot, &local);
                info!(identity = %local, capacity = self.roster.capacity(), "server roster started");
            }
            Err(e) => error!(error = %e, "failed to seat the local tank"),
        }
    }

    pub(super) fn server_on_message(
        &mut self,
        src: &Identity,
        message: Message,
        raw: &[u8],
    ) -> Vec<Outgoing> {
        match message {
            Message::Join => self.admit_join(src),
            Message::Movement(input) => {
                if *src == self.config.local {
                    return Vec::new();
                }
                let dead_zone_sq = self.config.tuning.input_dead_zone_sq;
                let Some(participant) = self.roster.find_mut(src.as_str()) else {
                    if should_log(&mut self.logs.unknown_sender) {
                        warn!(src = %src, "movement from a peer that never joined; dropping");
                    }
                    return Vec::new();
                };
                if !apply_input(&mut participant.tank, input, dead_zone_sq)
                    && should_log(&mut self.logs.malformed)
                {
                    warn!(src = %src, "invalid input values (NaN/inf); dropping");
                }
                Vec::new()
            }
            Message::Chat(chat) => {
                self.presenter.show_chat(src, &chat.text);
                match self.chat_recipient() {
                    Some(recipient) if recipient != *src && recipient != self.config.local => {
                        debug!(src = %src, to = %recipient, "relaying chat");
                        vec![Outgoing {
                            destination: recipient,
                            payload: raw.to_vec(),
                        }]
                    }
                    _ => Vec::new(),
                }
            }
            Message::TankStates(_) => {
                if should_log(&mut self.logs.unexpected) {
                    warn!(src = %src, "server received tank states; dropping");
                }
                Vec::new()
            }
        }
    }

    // Appends `src` unless present, then sends the full roster to every peer.
    fn admit_join(&mut self, src: &Identity) -> Vec<Outgoing> {
        if *src == self.config.local {
            return Vec::new();
        }

        let point = if self.roster.contains(src.as_str()) {
            None
        } else {
            let occupied = self.occupied_positions(None);
            Some(self.arena.spawn_point(&occupied))
        };

        let arena = &mut self.arena;
        let admitted = self.roster.admit(src.clone(), || {
            let mut tank = arena.spawn_tank(true);
            if let Some(point) = point {
                tank.respawn_at(point.position, point.rotation);
            }
            tank
        });

        match admitted {
            Ok(Admission::Joined(slot)) => {
                info!(src = %src, slot, players = self.roster.len(), "player joined");
            }
            Ok(Admission::Existing(slot)) => {
                info!(src = %src, slot, "player rejoined; keeping slot");
            }
            Err(e) => {
                warn!(src = %src, error = %e, "join refused");
                return Vec::new();
            }
        }

        self.server_broadcast(true)
    }

    /// Encodes the whole roster in slot order and addresses it to every remote member.
    ///
    /// Initial batches carry identities and mark every entry respawned so joining
    /// peers place tanks exactly. Respawn flags are consumed by either kind.
    pub(super) fn server_broadcast(&mut self, initial: bool) -> Vec<Outgoing> {
        let states = self
            .roster
            .iter()
            .map(|p| {
                let identity = initial.then_some(&p.identity);
                snapshot_state(&p.tank, initial || p.respawned, identity)
            })
            .collect();
        for participant in self.roster.iter_mut() {
            participant.respawned = false;
        }

        let payload = match codec::encode(&Message::TankStates(TankStates { initial, states })) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, initial, "failed to encode tank states");
                return Vec::new();
            }
        };

        self.roster
            .iter()
            .filter(|p| p.identity != self.config.local)
            .map(|p| Outgoing {
                destination: p.identity.clone(),
                payload: payload.clone(),
            })
            .collect()
    }

    /// Server only: teleports `identity` to a free spawn point. The next broadcast
    /// carries the new position and rotation.
    pub fn respawn(&mut self, identity: &Identity) -> bool {
        if !self.is_server() {
            warn!(identity = %identity, "respawn requested on a client; ignoring");
            return false;
        }
        let Some(slot) = self.roster.slot_of(identity.as_str()) else {
            warn!(identity = %identity, "respawn of unknown participant; ignoring");
            return false;
        };

        let occupied = self.occupied_positions(Some(slot));
        let point = self.arena.spawn_point(&occupied);
        let Some(participant) = self.roster.get_mut(slot) else {
            return false;
        };
        participant.tank.respawn_at(point.position, point.rotation);
        participant.respawned = true;
        info!(identity = %identity, slot, "respawned");
        true
    }
}
