// Application message records carried inside envelope payloads.

use crate::domain::identity::Identity;

/// Leading tag byte of every payload. Values are part of the deployment contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    JoinEvent = 0,
    MovementState = 1,
    ChatMessage = 2,
    InitialTankStates = 3,
    TankStates = 4,
}

impl MessageKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::JoinEvent),
            1 => Some(Self::MovementState),
            2 => Some(Self::ChatMessage),
            3 => Some(Self::InitialTankStates),
            4 => Some(Self::TankStates),
            _ => None,
        }
    }
}

/// Client input: desired direction, fire intent and fire target.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementState {
    pub move_x: f32,
    pub move_y: f32,
    pub fire: bool,
    pub fire_x: f32,
    pub fire_y: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: String,
}

/// One roster entry's state inside a [`TankStates`] batch.
///
/// `rotation` is present exactly when the tank respawned since the previous
/// broadcast; `identity` is present exactly in initial batches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TankState {
    pub move_x: f32,
    pub move_y: f32,
    pub fire: bool,
    pub fire_x: f32,
    pub fire_y: f32,
    pub rotation: Option<f32>,
    pub identity: Option<Identity>,
}

impl TankState {
    pub fn respawned(&self) -> bool {
        self.rotation.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TankStates {
    pub initial: bool,
    pub states: Vec<TankState>,
}

impl TankStates {
    pub fn kind(&self) -> MessageKind {
        if self.initial {
            MessageKind::InitialTankStates
        } else {
            MessageKind::TankStates
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Join,
    Movement(MovementState),
    Chat(ChatMessage),
    TankStates(TankStates),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Join => MessageKind::JoinEvent,
            Message::Movement(_) => MessageKind::MovementState,
            Message::Chat(_) => MessageKind::ChatMessage,
            Message::TankStates(states) => states.kind(),
        }
    }

    pub fn chat(text: impl Into<String>) -> Self {
        Message::Chat(ChatMessage { text: text.into() })
    }
}
