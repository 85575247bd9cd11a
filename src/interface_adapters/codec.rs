// Binary payload codec for application messages.
//
// Layout: [tag:u8] then fields in declaration order. f32 little-endian, bool one
// byte, strings as a 7-bit-group varint byte length followed by UTF-8.
// TankStates: [count:u8] then per entry
//   move_x move_y fire fire_x fire_y respawned [rotation if respawned] [identity if initial]
// Optional fields carry no presence marker; decode branches on the same
// predicates encode used.

use crate::domain::errors::CodecError;
use crate::domain::identity::Identity;
use crate::domain::messages::{
    ChatMessage, Message, MessageKind, MovementState, TankState, TankStates,
};

/// Largest batch a one-byte count can describe.
pub const MAX_BATCH_LEN: usize = u8::MAX as usize;

/// Peeks the tag byte without decoding the body.
pub fn peek_kind(bytes: &[u8]) -> Result<MessageKind, CodecError> {
    let tag = *bytes.first().ok_or(CodecError::Empty)?;
    MessageKind::from_tag(tag).ok_or(CodecError::UnknownMessageTag(tag))
}

pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(16);
    out.push(message.kind().tag());

    match message {
        Message::Join => {}
        Message::Movement(state) => write_movement(&mut out, state),
        Message::Chat(chat) => write_string(&mut out, &chat.text),
        Message::TankStates(batch) => write_tank_states(&mut out, batch)?,
    }

    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<Message, CodecError> {
    let kind = peek_kind(bytes)?;
    let mut reader = Reader::new(bytes, 1);

    let message = match kind {
        MessageKind::JoinEvent => Message::Join,
        MessageKind::MovementState => Message::Movement(read_movement(&mut reader)?),
        MessageKind::ChatMessage => Message::Chat(ChatMessage {
            text: reader.string()?,
        }),
        MessageKind::InitialTankStates => Message::TankStates(read_tank_states(&mut reader, true)?),
        MessageKind::TankStates => Message::TankStates(read_tank_states(&mut reader, false)?),
    };

    Ok(message)
}

fn write_f32(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_bool(out: &mut Vec<u8>, value: bool) {
    out.push(u8::from(value));
}

fn write_string(out: &mut Vec<u8>, value: &str) {
    let mut len = value.len();
    loop {
        let byte = (len & 0x7f) as u8;
        len >>= 7;
        if len == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
    out.extend_from_slice(value.as_bytes());
}

fn write_movement(out: &mut Vec<u8>, state: &MovementState) {
    write_f32(out, state.move_x);
    write_f32(out, state.move_y);
    write_bool(out, state.fire);
    write_f32(out, state.fire_x);
    write_f32(out, state.fire_y);
}

fn write_tank_states(out: &mut Vec<u8>, batch: &TankStates) -> Result<(), CodecError> {
    if batch.states.len() > MAX_BATCH_LEN {
        return Err(CodecError::TooManyStates(batch.states.len()));
    }
    out.push(batch.states.len() as u8);

    for (index, state) in batch.states.iter().enumerate() {
        write_f32(out, state.move_x);
        write_f32(out, state.move_y);
        write_bool(out, state.fire);
        write_f32(out, state.fire_x);
        write_f32(out, state.fire_y);
        write_bool(out, state.rotation.is_some());
        if let Some(rotation) = state.rotation {
            write_f32(out, rotation);
        }
        if batch.initial {
            let identity = state
                .identity
                .as_ref()
                .ok_or(CodecError::MissingIdentity(index))?;
            write_string(out, identity.as_str());
        }
    }

    Ok(())
}

fn read_movement(reader: &mut Reader<'_>) -> Result<MovementState, CodecError> {
    Ok(MovementState {
        move_x: reader.f32()?,
        move_y: reader.f32()?,
        fire: reader.bool()?,
        fire_x: reader.f32()?,
        fire_y: reader.f32()?,
    })
}

fn read_tank_states(reader: &mut Reader<'_>, initial: bool) -> Result<TankStates, CodecError> {
    let count = reader.u8()? as usize;
    let mut states = Vec::with_capacity(count);

    for _ in 0..count {
        let mut state = TankState {
            move_x: reader.f32()?,
            move_y: reader.f32()?,
            fire: reader.bool()?,
            fire_x: reader.f32()?,
            fire_y: reader.f32()?,
            rotation: None,
            identity: None,
        };
        let respawned = reader.bool()?;
        if respawned {
            state.rotation = Some(reader.f32()?);
        }
        if initial {
            state.identity = Some(Identity::new(reader.string()?));
        }
        states.push(state);
    }

    Ok(TankStates { initial, states })
}

// Bounds-checked cursor; every read fails with `Truncated` instead of reading past the slice.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.bytes.len().saturating_sub(self.pos);
        if remaining < needed {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed,
                remaining,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.u8()? != 0)
    }

    fn f32(&mut self) -> Result<f32, CodecError> {
        let raw = self.take(4)?;
        Ok(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn string_len(&mut self) -> Result<usize, CodecError> {
        let mut len: usize = 0;
        // 5 groups cover a 32-bit length.
        for shift in (0..35).step_by(7) {
            let byte = self.u8()?;
            len |= ((byte & 0x7f) as usize) << shift;
            if byte & 0x80 == 0 {
                return Ok(len);
            }
        }
        Err(CodecError::InvalidLength)
    }

    fn string(&mut self) -> Result<String, CodecError> {
        let len = self.string_len()?;
        let raw = self.take(len)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidString)
    }
}
