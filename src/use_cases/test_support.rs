use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::domain::arena::HeadlessArena;
use crate::domain::identity::Identity;
use crate::domain::messages::MovementState;
use crate::domain::ports::{InputSource, Presenter, SpawnPoint};
use crate::domain::tuning::TankTuning;
use crate::domain::vec2::Vec2;

pub(crate) type ChatLog = Arc<Mutex<Vec<(Identity, String)>>>;

// Records presenter calls so use-case tests can assert on them.
#[derive(Clone, Default)]
pub(crate) struct RecordingPresenter {
    pub follows: Arc<Mutex<Vec<(usize, Identity)>>>,
    pub chats: ChatLog,
}

impl RecordingPresenter {
    pub(crate) fn followed(&self) -> Vec<(usize, Identity)> {
        self.follows.lock().expect("follows mutex poisoned").clone()
    }

    pub(crate) fn chat_lines(&self) -> Vec<(Identity, String)> {
        self.chats.lock().expect("chats mutex poisoned").clone()
    }
}

impl Presenter for RecordingPresenter {
    fn follow(&mut self, slot: usize, identity: &Identity) {
        let mut guard = self.follows.lock().expect("follows mutex poisoned");
        guard.push((slot, identity.clone()));
    }

    fn show_chat(&mut self, from: &Identity, text: &str) {
        let mut guard = self.chats.lock().expect("chats mutex poisoned");
        guard.push((from.clone(), text.to_string()));
    }
}

// Plays back queued inputs, then repeats the last one.
#[derive(Default)]
pub(crate) struct ScriptedInput {
    queue: VecDeque<MovementState>,
    last: MovementState,
}

impl ScriptedInput {
    pub(crate) fn push(&mut self, input: MovementState) {
        self.queue.push_back(input);
    }
}

impl InputSource for ScriptedInput {
    fn sample(&mut self) -> MovementState {
        if let Some(next) = self.queue.pop_front() {
            self.last = next;
        }
        self.last
    }
}

/// Arena with fixed, well separated spawn points and a fixed seed.
pub(crate) fn test_arena() -> HeadlessArena {
    let points = (0..8)
        .map(|i| SpawnPoint {
            position: Vec2::new(i as f32 * 10.0, 0.0),
            rotation: i as f32 * 45.0,
        })
        .collect();
    HeadlessArena::with_seed(points, TankTuning::default(), 7)
}
