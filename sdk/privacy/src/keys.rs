//! Shielded key scheme.
//!
//! Each participant holds two independent secrets:
//!
//! ```text
//! spending_key (ed25519)  ──► spending_public_key ──┐
//!                                                   ├──► master_public_key
//! viewing_key (x25519)    ──► nullifying_key      ──┘         │
//!        │                                                    ▼
//!        └──► viewing_public_key (scan/decrypt)    npk = H(mpk, random)
//! ```
//!
//! Separating spending authority from viewing authority lets a viewing-only
//! party scan for incoming value and detect spends (via the nullifying key)
//! without being able to authorize spends.

use ark_bn254::Fr;
use ed25519_dalek::{Signer, Verifier};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::poseidon::{bytes_to_field, domain_tag, field_to_bytes, hash_fields};

const DOMAIN_NULLIFYING_KEY: &[u8] = b"Veil.NK";
const DOMAIN_MASTER_PUBLIC_KEY: &[u8] = b"Veil.MPK";
const DOMAIN_NOTE_PUBLIC_KEY: &[u8] = b"Veil.NPK";

/// Spending key - authorizes spends.
///
/// This is the most sensitive key. Loss = loss of funds.
/// Compromise = theft of funds.
#[derive(Debug, Clone)]
pub struct SpendingKey {
    key: [u8; 32],
}

impl SpendingKey {
    /// Generate a random spending key
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        Self { key }
    }

    /// Create from raw bytes
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Derive the spending public key (ed25519 verifying key)
    pub fn public_key(&self) -> [u8; 32] {
        let signing = ed25519_dalek::SigningKey::from_bytes(&self.key);
        signing.verifying_key().to_bytes()
    }

    /// Sign a message, authorizing a spend
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let signing = ed25519_dalek::SigningKey::from_bytes(&self.key);
        signing.sign(message).to_bytes()
    }
}

/// Verify a spend-authorization signature against a spending public key.
pub fn verify_signature(public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(verifying) = ed25519_dalek::VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(signature);
    verifying.verify(message, &sig).is_ok()
}

/// Viewing key - allows detecting and decrypting notes, but not spending.
///
/// Share this with auditors, watch-only wallets, etc.
#[derive(Debug, Clone)]
pub struct ViewingKey {
    key: [u8; 32],
}

impl ViewingKey {
    /// Generate a random viewing key
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        Self { key }
    }

    /// Create from raw bytes
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Derive the viewing public key (x25519)
    pub fn public_key(&self) -> [u8; 32] {
        let secret = x25519_dalek::StaticSecret::from(self.key);
        *x25519_dalek::PublicKey::from(&secret).as_bytes()
    }

    /// Derive the nullifying key: nk = H("Veil.NK", viewing_key)
    pub fn nullifying_key(&self) -> NullifyingKey {
        let nk = hash_fields(&[domain_tag(DOMAIN_NULLIFYING_KEY), bytes_to_field(&self.key)]);
        NullifyingKey(field_to_bytes(nk))
    }
}

/// Nullifying key, derived from the viewing key.
///
/// Viewing-level secret: it reveals which notes were spent but cannot
/// authorize spends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifyingKey(pub [u8; 32]);

impl NullifyingKey {
    pub fn as_field(&self) -> Fr {
        bytes_to_field(&self.0)
    }
}

/// masterPublicKey = H(spendingPublicKey, nullifyingKey)
///
/// Computable from public data plus the nullifying key; recipients hand this
/// out as their shielded address.
pub fn master_public_key(spending_public_key: &[u8; 32], nullifying_key: &NullifyingKey) -> [u8; 32] {
    field_to_bytes(hash_fields(&[
        domain_tag(DOMAIN_MASTER_PUBLIC_KEY),
        bytes_to_field(spending_public_key),
        nullifying_key.as_field(),
    ]))
}

/// npk = H(masterPublicKey, random)
///
/// Senders derive this from the recipient's master public key and the note's
/// fresh randomness; no secret material is needed.
pub fn note_public_key(master_public_key: &[u8; 32], random: &[u8; 32]) -> [u8; 32] {
    field_to_bytes(hash_fields(&[
        domain_tag(DOMAIN_NOTE_PUBLIC_KEY),
        bytes_to_field(master_public_key),
        bytes_to_field(random),
    ]))
}

/// Full key bundle for a shielded address
#[derive(Debug, Clone)]
pub struct KeyBundle {
    /// Spending key (secret - allows spending)
    pub spending_key: SpendingKey,
    /// Viewing key (allows viewing but not spending)
    pub viewing_key: ViewingKey,
}

impl KeyBundle {
    /// Generate a new random key bundle
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            spending_key: SpendingKey::random(rng),
            viewing_key: ViewingKey::random(rng),
        }
    }

    /// Restore from the two secrets
    pub fn from_keys(spending_key: SpendingKey, viewing_key: ViewingKey) -> Self {
        Self {
            spending_key,
            viewing_key,
        }
    }

    pub fn nullifying_key(&self) -> NullifyingKey {
        self.viewing_key.nullifying_key()
    }

    /// The shielded address this bundle controls
    pub fn master_public_key(&self) -> [u8; 32] {
        master_public_key(&self.spending_key.public_key(), &self.nullifying_key())
    }
}
