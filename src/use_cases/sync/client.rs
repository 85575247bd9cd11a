// Client role: joins, mirrors the server's roster by slot, streams local input.

use tracing::{debug, error, info, warn};

use super::{Outgoing, SyncEngine, apply_remote};
use crate::domain::identity::Identity;
use crate::domain::messages::{Message, MovementState, TankState, TankStates};
use crate::domain::ports::{Arena, InputSource, Presenter};
use crate::domain::roster::Admission;
use crate::interface_adapters::codec;
use crate::use_cases::throttle::should_log;

impl<A, P, I> SyncEngine<A, P, I>
where
    A: Arena,
    P: Presenter,
    I: InputSource,
{
    pub(super) fn client_on_message(&mut self, src: &Identity, message: Message) -> Vec<Outgoing> {
        match message {
            Message::Chat(chat) => self.presenter.show_chat(src, &chat.text),
            Message::TankStates(batch) if batch.initial => self.apply_initial(src, batch),
            Message::TankStates(batch) => self.apply_delta(src, batch),
            Message::Join | Message::Movement(_) => {
                if should_log(&mut self.logs.unexpected) {
                    warn!(src = %src, kind = ?message.kind(), "client received a server-bound message; dropping");
                }
            }
        }
        Vec::new()
    }

    fn accepts_states_from(&mut self, src: &Identity) -> bool {
        match &self.bound_server {
            Some(server) if server != src => {
                if should_log(&mut self.logs.unknown_sender) {
                    warn!(src = %src, server = %server, "tank states from a non-server peer; dropping");
                }
                false
            }
            _ => true,
        }
    }

    // First initial batch binds the server and builds the roster in the given order.
    // Later ones are reconciled by identity.
    fn apply_initial(&mut self, src: &Identity, batch: TankStates) {
        if !self.accepts_states_from(src) {
            return;
        }
        if self.bound_server.is_none() {
            info!(server = %src, players = batch.states.len(), "bound to server");
            self.bound_server = Some(src.clone());
        }

        for (index, state) in batch.states.iter().enumerate() {
            let Some(identity) = state.identity.clone() else {
                continue;
            };
            let arena = &mut self.arena;
            let slot = match self.roster.admit(identity.clone(), || arena.spawn_tank(false)) {
                Ok(Admission::Joined(slot)) => {
                    debug!(identity = %identity, slot, "replica added");
                    slot
                }
                Ok(Admission::Existing(slot)) => slot,
                Err(e) => {
                    error!(identity = %identity, error = %e, "roster full; ignoring entry");
                    continue;
                }
            };
            if slot != index {
                warn!(identity = %identity, slot, index, "roster slot differs from server order");
            }

            if let Some(participant) = self.roster.get_mut(slot) {
                apply_remote(&mut participant.tank, state);
            }

            if identity == self.config.local && self.local_slot != Some(slot) {
                self.local_slot = Some(slot);
                self.presenter.follow(slot, &identity);
                info!(slot, "local tank bound");
            }
        }
    }

    // Entry i updates slot i; nothing else identifies it.
    fn apply_delta(&mut self, src: &Identity, batch: TankStates) {
        if self.bound_server.is_none() {
            debug!(src = %src, "tank states before the initial roster; ignoring");
            return;
        }
        if !self.accepts_states_from(src) {
            return;
        }

        if batch.states.len() > self.roster.len() && should_log(&mut self.logs.unexpected) {
            warn!(
                entries = batch.states.len(),
                roster = self.roster.len(),
                "delta longer than roster; applying known slots only"
            );
        }

        let states: &[TankState] = &batch.states;
        for (participant, state) in self.roster.iter_mut().zip(states) {
            apply_remote(&mut participant.tank, state);
        }
    }

    pub(super) fn client_send_input(&mut self, input: MovementState) -> Vec<Outgoing> {
        let Some(server) = self.bound_server.clone() else {
            return Vec::new();
        };
        match codec::encode(&Message::Movement(input)) {
            Ok(payload) => vec![Outgoing {
                destination: server,
                payload,
            }],
            Err(e) => {
                error!(error = %e, "failed to encode movement");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{SyncConfig, SyncEngine};
    use crate::domain::arena::HeadlessArena;
    use crate::domain::identity::{CANDIDATE_COUNT, Identity, candidate_names};
    use crate::domain::messages::{Message, MovementState, TankState, TankStates};
    use crate::domain::ports::Tank;
    use crate::domain::vec2::Vec2;
    use crate::interface_adapters::codec;
    use crate::use_cases::test_support::{RecordingPresenter, ScriptedInput, test_arena};

    type Engine = SyncEngine<HeadlessArena, RecordingPresenter, ScriptedInput>;

    const SERVER: &str = "2.serverkey";

    fn client() -> Engine {
        SyncEngine::new(
            SyncConfig::client(Identity::from("0.me"), Identity::from("serverkey")),
            test_arena(),
            RecordingPresenter::default(),
            ScriptedInput::default(),
        )
    }

    fn entry(x: f32, y: f32, rotation: Option<f32>, identity: Option<&str>) -> TankState {
        TankState {
            move_x: x,
            move_y: y,
            fire: false,
            fire_x: 0.0,
            fire_y: 0.0,
            rotation,
            identity: identity.map(Identity::from),
        }
    }

    fn initial(ids: &[&str]) -> Vec<u8> {
        let states = ids
            .iter()
            .enumerate()
            .map(|(i, id)| entry(i as f32 * 10.0, 0.0, Some(90.0), Some(id)))
            .collect();
        codec::encode(&Message::TankStates(TankStates {
            initial: true,
            states,
        }))
        .expect("encode initial")
    }

    fn delta(states: Vec<TankState>) -> Vec<u8> {
        codec::encode(&Message::TankStates(TankStates {
            initial: false,
            states,
        }))
        .expect("encode delta")
    }

    #[test]
    fn when_connected_then_join_goes_to_every_candidate() {
        let mut engine = client();
        let out = engine.on_connected();

        assert_eq!(out.len(), CANDIDATE_COUNT);
        let destinations: Vec<_> = out.iter().map(|o| o.destination.clone()).collect();
        assert_eq!(destinations, candidate_names(&Identity::from("serverkey")));
        assert!(
            out.iter()
                .all(|o| codec::decode(&o.payload) == Ok(Message::Join))
        );
    }

    #[test]
    fn when_first_initial_arrives_then_roster_and_server_are_bound() {
        let mut engine = client();
        engine.on_frame(&Identity::from(SERVER), &initial(&[SERVER, "0.me"]));

        assert_eq!(
            engine.roster_identities(),
            vec![Identity::from(SERVER), Identity::from("0.me")]
        );
        assert_eq!(engine.server_identity(), Some(&Identity::from(SERVER)));
        assert_eq!(engine.local_slot(), Some(1));
        assert_eq!(engine.presenter().followed(), vec![(1, Identity::from("0.me"))]);

        let remote = &engine.roster().get(0).expect("server").tank;
        assert_eq!(remote.position(), Vec2::new(0.0, 0.0));
        assert_eq!(remote.rotation(), 90.0);
    }

    #[test]
    fn when_delta_arrives_then_positions_apply_by_index() {
        let mut engine = client();
        let server = Identity::from(SERVER);
        engine.on_frame(&server, &initial(&[SERVER, "0.me"]));

        engine.on_frame(
            &server,
            &delta(vec![entry(1.0, 2.0, None, None), entry(3.0, 4.0, None, None)]),
        );

        let first = &engine.roster().get(0).expect("slot 0").tank;
        let second = &engine.roster().get(1).expect("slot 1").tank;
        assert_eq!(first.desired_position(), Vec2::new(1.0, 2.0));
        assert_eq!(second.desired_position(), Vec2::new(3.0, 4.0));
        // Smoothed, not teleported.
        assert_eq!(first.position(), Vec2::new(0.0, 0.0));
    }

    #[test]
    fn when_delta_marks_respawn_then_tank_teleports_with_rotation() {
        let mut engine = client();
        let server = Identity::from(SERVER);
        engine.on_frame(&server, &initial(&[SERVER, "0.me"]));

        engine.on_frame(
            &server,
            &delta(vec![entry(50.0, -5.0, Some(270.0), None), entry(10.0, 0.0, None, None)]),
        );

        let tank = &engine.roster().get(0).expect("slot 0").tank;
        assert_eq!(tank.position(), Vec2::new(50.0, -5.0));
        assert_eq!(tank.rotation(), 270.0);
    }

    #[test]
    fn when_delta_precedes_initial_then_it_is_ignored() {
        let mut engine = client();
        engine.on_frame(
            &Identity::from(SERVER),
            &delta(vec![entry(1.0, 1.0, None, None)]),
        );
        assert!(engine.roster().is_empty());
        assert_eq!(engine.server_identity(), None);
    }

    #[test]
    fn when_delta_is_longer_than_roster_then_known_slots_still_update() {
        let mut engine = client();
        let server = Identity::from(SERVER);
        engine.on_frame(&server, &initial(&[SERVER, "0.me"]));

        engine.on_frame(
            &server,
            &delta(vec![
                entry(1.0, 0.0, None, None),
                entry(2.0, 0.0, None, None),
                entry(3.0, 0.0, None, None),
            ]),
        );

        assert_eq!(engine.roster().len(), 2);
        let second = &engine.roster().get(1).expect("slot 1").tank;
        assert_eq!(second.desired_position(), Vec2::new(2.0, 0.0));
    }

    #[test]
    fn when_another_peer_sends_states_then_they_are_dropped() {
        let mut engine = client();
        engine.on_frame(&Identity::from(SERVER), &initial(&[SERVER, "0.me"]));

        engine.on_frame(
            &Identity::from("intruder"),
            &delta(vec![entry(99.0, 99.0, Some(0.0), None)]),
        );

        let tank = &engine.roster().get(0).expect("slot 0").tank;
        assert_eq!(tank.position(), Vec2::new(0.0, 0.0));
    }

    #[test]
    fn when_a_later_initial_adds_a_peer_then_existing_slots_are_kept() {
        let mut engine = client();
        let server = Identity::from(SERVER);
        engine.on_frame(&server, &initial(&[SERVER, "0.me"]));
        engine.on_frame(&server, &initial(&[SERVER, "0.me", "5.other"]));

        assert_eq!(
            engine.roster_identities(),
            vec![
                Identity::from(SERVER),
                Identity::from("0.me"),
                Identity::from("5.other")
            ]
        );
        // Local bind happens once.
        assert_eq!(engine.presenter().followed().len(), 1);
    }

    #[test]
    fn when_bound_then_each_tick_sends_input_to_the_server() {
        let mut engine = client();
        assert!(engine.tick(1.0 / 30.0).is_empty());

        engine.on_frame(&Identity::from(SERVER), &initial(&[SERVER, "0.me"]));
        let input = MovementState {
            move_x: 0.5,
            move_y: 0.0,
            fire: true,
            fire_x: 1.0,
            fire_y: 1.0,
        };
        engine.input_mut().push(input);

        let out = engine.tick(1.0 / 30.0);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].destination.as_str(), SERVER);
        assert_eq!(codec::decode(&out[0].payload), Ok(Message::Movement(input)));
    }

    #[test]
    fn when_client_chats_then_it_goes_to_the_bound_server() {
        let mut engine = client();
        assert!(engine.send_chat("too early").is_empty());

        engine.on_frame(&Identity::from(SERVER), &initial(&[SERVER, "0.me"]));
        let out = engine.send_chat("gg");

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].destination.as_str(), SERVER);
    }

    #[test]
    fn when_chat_arrives_then_it_is_displayed() {
        let mut engine = client();
        let bytes = codec::encode(&Message::chat("hello")).expect("encode");
        engine.on_frame(&Identity::from(SERVER), &bytes);

        assert_eq!(
            engine.presenter().chat_lines(),
            vec![(Identity::from(SERVER), "hello".to_string())]
        );
    }

    #[test]
    fn when_client_receives_a_join_then_nothing_changes() {
        let mut engine = client();
        let bytes = codec::encode(&Message::Join).expect("encode");
        assert!(engine.on_frame(&Identity::from("x"), &bytes).is_empty());
        assert!(engine.roster().is_empty());
    }

    #[test]
    fn when_a_truncated_frame_arrives_then_it_is_dropped() {
        let mut engine = client();
        let mut bytes = initial(&[SERVER, "0.me"]);
        bytes.truncate(bytes.len() - 3);

        engine.on_frame(&Identity::from(SERVER), &bytes);

        assert!(engine.roster().is_empty());
    }
}
