//! Ephemeral key blinding.
//!
//! Transfer-note encryption must not publish either party's viewing public
//! key. Instead the sender derives a one-time blinding scalar and publishes
//! both viewing keys multiplied by it:
//!
//! ```text
//! b   = seed_to_scalar(shared_random XOR sender_random)
//! B_s = b · sender_viewing_pk        (published)
//! B_r = b · receiver_viewing_pk      (published)
//!
//! receiver secret r:  r · B_s = r·b·s·G
//! sender   secret s:  s · B_r = s·b·r·G   (same point)
//! ```
//!
//! The receiver recomputes the shared secret from the blinded sender key and
//! their own viewing secret alone; the unblinded keys never appear in
//! published data.

use x25519_dalek::x25519;

use crate::keys::ViewingKey;

/// The pair of blinded viewing keys published with a transfer note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlindedKeys {
    pub sender: [u8; 32],
    pub receiver: [u8; 32],
}

/// Map a 32-byte seed to a scalar usable for Montgomery multiplication.
pub fn seed_to_scalar(seed: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key("veil.blinding.v1");
    hasher.update(seed);
    *hasher.finalize().as_bytes()
}

/// Blind both viewing public keys with one scalar derived from the shared
/// and sender-only randomness.
pub fn blind_keys(
    sender_viewing_pk: &[u8; 32],
    receiver_viewing_pk: &[u8; 32],
    shared_random: &[u8; 32],
    sender_random: &[u8; 32],
) -> BlindedKeys {
    let mut seed = [0u8; 32];
    for (out, (a, b)) in seed
        .iter_mut()
        .zip(shared_random.iter().zip(sender_random.iter()))
    {
        *out = a ^ b;
    }
    let scalar = seed_to_scalar(&seed);

    BlindedKeys {
        sender: x25519(scalar, *sender_viewing_pk),
        receiver: x25519(scalar, *receiver_viewing_pk),
    }
}

/// Shared secret between the holder of `viewing_key` and the counterparty
/// whose *blinded* key is given.
pub fn shared_secret(viewing_key: &ViewingKey, counterparty_blinded: &[u8; 32]) -> [u8; 32] {
    x25519(*viewing_key.as_bytes(), *counterparty_blinded)
}
