//! Nullifiers
//!
//! ```text
//! Nullifier = Poseidon(nullifying_key, leaf_index)
//! ```
//!
//! Publication of a nullifier marks the underlying note as spent. The
//! derivation binds a viewing-level secret to a unique leaf position, so a
//! nullifier carries no information about the note's value or token but
//! deterministically prevents reuse of the same note.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::keys::NullifyingKey;
use crate::poseidon::{bytes_to_field, field_to_bytes, hash_fields};

/// A nullifier (32 bytes) - unique tag for a spent note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nullifier(pub [u8; 32]);

impl Nullifier {
    /// Create from field element
    pub fn from_field(f: Fr) -> Self {
        Self(field_to_bytes(f))
    }

    /// Convert to field element
    pub fn to_field(&self) -> Fr {
        bytes_to_field(&self.0)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive the nullifier for a note at a global leaf index.
    pub fn derive(nullifying_key: &NullifyingKey, leaf_index: u64) -> Self {
        Self::from_field(hash_fields(&[
            nullifying_key.as_field(),
            Fr::from(leaf_index),
        ]))
    }
}

impl AsRef<[u8]> for Nullifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
