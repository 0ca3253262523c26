//! Veil Privacy SDK
//!
//! Note-based shielded value primitives for the Veil pool.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Shielded Transaction                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │  Nullifiers  │  │ Commitments  │  │  Encrypted Outputs    │ │
//! │  │  (spent)     │  │  (new notes) │  │  (blinded-key ECDH)   │ │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘ │
//! │         │                 │                     │               │
//! │         ▼                 ▼                     ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              ZK Proof (Groth16)                          │   │
//! │  │  • Inputs present under a historical accumulator root    │   │
//! │  │  • Valid nullifier / commitment derivation               │   │
//! │  │  • Balance preservation per token: Σ in = Σ out          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod blinding;
pub mod commitment;
pub mod encryption;
pub mod error;
pub mod keys;
pub mod merkle;
pub mod note;
pub mod nullifier;
pub mod poseidon;

pub use blinding::{BlindedKeys, blind_keys, seed_to_scalar, shared_secret};
pub use commitment::Commitment;
pub use encryption::{
    NoteCiphertext, NotePlaintext, ShieldCiphertext, encrypt_shield_note, encrypt_transfer_note,
    try_decrypt_shield_note, try_decrypt_transfer_note,
};
pub use error::PrivacyError;
pub use keys::{KeyBundle, NullifyingKey, SpendingKey, ViewingKey};
pub use merkle::{Accumulator, CommitmentTree, MerkleHasher, MerkleProof, RootHistory, TREE_DEPTH};
pub use note::{CommitmentPreimage, Note, NotePosition, NoteValue, TokenData, TokenKind};
pub use nullifier::Nullifier;
