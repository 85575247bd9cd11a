// Participant identities as seen on the overlay network.

use std::borrow::Borrow;
use std::fmt;

/// Number of directory names derived from one public key.
pub const CANDIDATE_COUNT: usize = 15;

/// Opaque participant token. Doubles as the overlay destination address and as
/// the roster key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for Identity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Directory names a key may be registered under, in candidate order: `"<i>.<key>"`.
pub fn candidate_names(base: &Identity) -> Vec<Identity> {
    (0..CANDIDATE_COUNT)
        .map(|i| Identity::new(format!("{i}.{base}")))
        .collect()
}
