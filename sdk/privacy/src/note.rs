//! Shielded Notes
//!
//! A Note represents value held privately in the Veil pool.
//!
//! ```text
//! Note = {
//!     npk: [u8; 32],        // H(master_public_key, random)
//!     token: TokenData,     // what asset the value is denominated in
//!     value: u64,           // amount in the smallest unit
//!     random: [u8; 32],     // blinding factor
//!     position,             // (tree, index) once inserted
//! }
//! ```

use ark_bn254::Fr;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::commitment::{Commitment, commit};
use crate::keys::{NullifyingKey, note_public_key};
use crate::nullifier::Nullifier;
use crate::poseidon::{bytes_to_field, hash_fields};

/// Asset class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Fungible,
    SemiFungible,
    NonFungible,
}

impl TokenKind {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Fungible => 0,
            Self::SemiFungible => 1,
            Self::NonFungible => 2,
        }
    }

    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Fungible),
            1 => Some(Self::SemiFungible),
            2 => Some(Self::NonFungible),
            _ => None,
        }
    }
}

/// Token identity: contract address plus sub-identifier for
/// semi-fungible/non-fungible assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenData {
    pub kind: TokenKind,
    pub address: [u8; 32],
    pub sub_id: [u8; 32],
}

impl TokenData {
    /// A plain fungible token (sub_id unused).
    pub fn fungible(address: [u8; 32]) -> Self {
        Self {
            kind: TokenKind::Fungible,
            address,
            sub_id: [0u8; 32],
        }
    }

    /// The token identifier the circuit sees.
    ///
    /// Fungible tokens use the address directly; sub-identified assets hash
    /// the pair so distinct sub-ids get distinct note domains.
    pub fn token_id(&self) -> Fr {
        match self.kind {
            TokenKind::Fungible => bytes_to_field(&self.address),
            TokenKind::SemiFungible | TokenKind::NonFungible => {
                hash_fields(&[bytes_to_field(&self.address), bytes_to_field(&self.sub_id)])
            }
        }
    }
}

/// Note value with overflow protection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteValue(pub u64);

impl NoteValue {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u64::MAX);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Checked addition
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

/// Where a note landed in the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotePosition {
    /// Tree instance number
    pub tree: u32,
    /// Leaf index within the instance
    pub index: u64,
}

impl NotePosition {
    /// Flattened leaf index, unique across all tree instances.
    ///
    /// Nullifiers bind to this value so equal in-tree positions in
    /// different instances cannot produce the same nullifier.
    pub fn global_index(&self, depth: usize) -> u64 {
        (u64::from(self.tree) << depth) | self.index
    }
}

/// A shielded note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Note public key, H(master_public_key, random)
    pub npk: [u8; 32],
    /// Token this note holds
    pub token: TokenData,
    /// The value (amount) held in this note
    pub value: NoteValue,
    /// Random blinding factor
    pub random: [u8; 32],
    /// Position in the accumulator (None if not yet inserted)
    pub position: Option<NotePosition>,
}

impl Note {
    /// Create a new note for a recipient's master public key with fresh
    /// randomness.
    pub fn new<R: Rng>(
        recipient_mpk: &[u8; 32],
        token: TokenData,
        value: u64,
        rng: &mut R,
    ) -> Self {
        let mut random = [0u8; 32];
        rng.fill_bytes(&mut random);
        Self::with_random(recipient_mpk, token, value, random)
    }

    /// Create a note with explicit randomness (recovery, tests)
    pub fn with_random(
        recipient_mpk: &[u8; 32],
        token: TokenData,
        value: u64,
        random: [u8; 32],
    ) -> Self {
        Self {
            npk: note_public_key(recipient_mpk, &random),
            token,
            value: NoteValue(value),
            random,
            position: None,
        }
    }

    /// Compute the commitment for this note
    pub fn commitment(&self) -> Commitment {
        commit(&self.npk, self.token.token_id(), self.value.0)
    }

    /// Derive the nullifier for spending this note.
    ///
    /// Requires the nullifying key and that position is set.
    pub fn nullifier(&self, nullifying_key: &NullifyingKey, depth: usize) -> Option<Nullifier> {
        let position = self.position?;
        Some(Nullifier::derive(
            nullifying_key,
            position.global_index(depth),
        ))
    }

    /// Set the accumulator position (called after insertion)
    pub fn with_position(mut self, position: NotePosition) -> Self {
        self.position = Some(position);
        self
    }
}

/// Public preimage of a commitment, used for shields and unshields where
/// value and token are deliberately plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentPreimage {
    pub npk: [u8; 32],
    pub token: TokenData,
    pub value: u64,
}

impl CommitmentPreimage {
    pub fn commitment(&self) -> Commitment {
        commit(&self.npk, self.token.token_id(), self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyBundle;
    use rand::rngs::OsRng;

    fn token() -> TokenData {
        TokenData::fungible([0xaa; 32])
    }

    #[test]
    fn commitment_deterministic() {
        let mut rng = OsRng;
        let bundle = KeyBundle::random(&mut rng);
        let note = Note::new(&bundle.master_public_key(), token(), 1000, &mut rng);
        assert_eq!(note.commitment(), note.commitment());
    }

    #[test]
    fn nullifier_requires_position() {
        let mut rng = OsRng;
        let bundle = KeyBundle::random(&mut rng);
        let nk = bundle.nullifying_key();
        let note = Note::new(&bundle.master_public_key(), token(), 1000, &mut rng);

        assert!(note.nullifier(&nk, 16).is_none());

        let placed = note.with_position(NotePosition { tree: 0, index: 42 });
        assert!(placed.nullifier(&nk, 16).is_some());
    }

    #[test]
    fn same_slot_different_tree_distinct_nullifiers() {
        let mut rng = OsRng;
        let bundle = KeyBundle::random(&mut rng);
        let nk = bundle.nullifying_key();
        let note = Note::new(&bundle.master_public_key(), token(), 5, &mut rng);

        let in_tree0 = note
            .clone()
            .with_position(NotePosition { tree: 0, index: 3 })
            .nullifier(&nk, 16);
        let in_tree1 = note
            .with_position(NotePosition { tree: 1, index: 3 })
            .nullifier(&nk, 16);
        assert_ne!(in_tree0, in_tree1);
    }

    #[test]
    fn token_id_separates_sub_ids() {
        let nft_a = TokenData {
            kind: TokenKind::NonFungible,
            address: [0xaa; 32],
            sub_id: [1u8; 32],
        };
        let nft_b = TokenData {
            kind: TokenKind::NonFungible,
            address: [0xaa; 32],
            sub_id: [2u8; 32],
        };
        assert_ne!(nft_a.token_id(), nft_b.token_id());
        // Fungible id is the raw address, not a hash of it.
        assert_eq!(
            token().token_id(),
            crate::poseidon::bytes_to_field(&[0xaa; 32])
        );
    }

    #[test]
    fn preimage_matches_note_commitment() {
        let mut rng = OsRng;
        let bundle = KeyBundle::random(&mut rng);
        let note = Note::new(&bundle.master_public_key(), token(), 77, &mut rng);
        let preimage = CommitmentPreimage {
            npk: note.npk,
            token: note.token,
            value: note.value.as_u64(),
        };
        assert_eq!(preimage.commitment(), note.commitment());
    }

    #[test]
    fn note_value_checked_ops() {
        let v1 = NoteValue::new(100);
        let v2 = NoteValue::new(50);

        assert_eq!(v1.checked_add(v2), Some(NoteValue::new(150)));
        assert_eq!(v1.checked_sub(v2), Some(NoteValue::new(50)));
        assert_eq!(v2.checked_sub(v1), None); // Underflow
        assert_eq!(NoteValue::MAX.checked_add(NoteValue::new(1)), None); // Overflow
    }
}
