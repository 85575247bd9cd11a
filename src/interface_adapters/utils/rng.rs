use rand::RngCore;

use crate::domain::identity::Identity;

/// Length in bytes of a generated identity key before hex encoding.
pub const IDENTITY_KEY_BYTES: usize = 32;

/// Returns a fresh random identity key, hex encoded. Used when none is configured.
pub fn random_identity() -> Identity {
    let mut bytes = [0u8; IDENTITY_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    Identity::new(to_hex(&bytes))
}

fn to_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}
