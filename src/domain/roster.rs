// Ordered participant list with a derived identity -> slot index.
//
// The slot of a participant is what per-tick batches use instead of identities,
// so entries are only ever appended and the index is updated in the same call.

use std::collections::HashMap;

use crate::domain::errors::RosterError;
use crate::domain::identity::Identity;

/// Largest roster a one-byte batch length can describe.
pub const MAX_ROSTER_LEN: usize = u8::MAX as usize;

#[derive(Debug)]
pub struct Participant<T> {
    pub identity: Identity,
    pub tank: T,
    /// Set on respawn, cleared once the next broadcast has been encoded.
    pub respawned: bool,
}

/// Outcome of [`Roster::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Joined(usize),
    Existing(usize),
}

impl Admission {
    pub fn slot(self) -> usize {
        match self {
            Admission::Joined(slot) | Admission::Existing(slot) => slot,
        }
    }
}

#[derive(Debug)]
pub struct Roster<T> {
    entries: Vec<Participant<T>>,
    slots: HashMap<Identity, usize>,
    capacity: usize,
}

impl<T> Roster<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            slots: HashMap::new(),
            capacity: capacity.min(MAX_ROSTER_LEN),
        }
    }

    /// Appends `identity` unless it is already present. `make` runs only on append.
    pub fn admit(
        &mut self,
        identity: Identity,
        make: impl FnOnce() -> T,
    ) -> Result<Admission, RosterError> {
        if let Some(&slot) = self.slots.get(&identity) {
            return Ok(Admission::Existing(slot));
        }
        if self.entries.len() >= self.capacity {
            return Err(RosterError::Full {
                capacity: self.capacity,
            });
        }

        let slot = self.entries.len();
        self.slots.insert(identity.clone(), slot);
        self.entries.push(Participant {
            identity,
            tank: make(),
            respawned: false,
        });
        Ok(Admission::Joined(slot))
    }

    pub fn slot_of(&self, identity: &str) -> Option<usize> {
        self.slots.get(identity).copied()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.slots.contains_key(identity)
    }

    pub fn get(&self, slot: usize) -> Option<&Participant<T>> {
        self.entries.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Participant<T>> {
        self.entries.get_mut(slot)
    }

    pub fn find_mut(&mut self, identity: &str) -> Option<&mut Participant<T>> {
        let slot = self.slot_of(identity)?;
        self.entries.get_mut(slot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant<T>> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant<T>> {
        self.entries.iter_mut()
    }

    pub fn identities(&self) -> Vec<Identity> {
        self.entries.iter().map(|p| p.identity.clone()).collect()
    }
}
