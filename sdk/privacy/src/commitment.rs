//! Note Commitments
//!
//! ```text
//! Commitment = Poseidon(npk, token_id, value)
//! ```
//!
//! The commitment is the only on-ledger trace of a note. It hides the
//! owner (behind npk) and binds the token and value for the ZK circuit.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::poseidon::{bytes_to_field, field_to_bytes, hash_fields};

/// A note commitment (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    /// Create commitment from field element
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
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Commit to a note: C = Poseidon(npk, token_id, value)
pub fn commit(npk: &[u8; 32], token_id: Fr, value: u64) -> Commitment {
    Commitment::from_field(hash_fields(&[
        bytes_to_field(npk),
        token_id,
        Fr::from(value),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_deterministic() {
        let c1 = commit(&[1u8; 32], Fr::from(9u64), 1000);
        let c2 = commit(&[1u8; 32], Fr::from(9u64), 1000);
        assert_eq!(c1, c2, "same inputs should produce same commitment");
    }

    #[test]
    fn commitment_binds_every_input() {
        let base = commit(&[1u8; 32], Fr::from(9u64), 1000);
        assert_ne!(base, commit(&[2u8; 32], Fr::from(9u64), 1000));
        assert_ne!(base, commit(&[1u8; 32], Fr::from(8u64), 1000));
        assert_ne!(base, commit(&[1u8; 32], Fr::from(9u64), 1001));
    }

    #[test]
    fn field_round_trip() {
        let c = commit(&[3u8; 32], Fr::from(1u64), 5);
        assert_eq!(Commitment::from_field(c.to_field()), c);
    }
}
