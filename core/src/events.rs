//! Published batch events.
//!
//! The engine appends one event per applied batch; off-ledger wallets scan
//! this log to mirror state and recover owned notes.

use veil_privacy::{Commitment, CommitmentPreimage, NoteCiphertext, Nullifier, ShieldCiphertext};

/// A shield batch landed: preimages are public (deposits), ciphertexts
/// conceal only note randomness.
#[derive(Debug, Clone)]
pub struct ShieldBatchEvent {
    pub tree_number: u32,
    pub start_index: u64,
    pub preimages: Vec<CommitmentPreimage>,
    pub ciphertexts: Vec<ShieldCiphertext>,
}

/// A transact batch landed: only commitments and ciphertexts are public.
#[derive(Debug, Clone)]
pub struct TransactBatchEvent {
    pub tree_number: u32,
    pub start_index: u64,
    pub commitments: Vec<Commitment>,
    pub ciphertexts: Vec<NoteCiphertext>,
}

/// Nullifiers consumed against a tree instance.
#[derive(Debug, Clone)]
pub struct NullifierBatchEvent {
    pub tree_number: u32,
    pub nullifiers: Vec<Nullifier>,
}

#[derive(Debug, Clone)]
pub enum PoolEvent {
    ShieldBatch(ShieldBatchEvent),
    TransactBatch(TransactBatchEvent),
    NullifierBatch(NullifierBatchEvent),
}
