//! Pool state: commitment accumulator plus global nullifier set.

use std::collections::HashSet;

use veil_privacy::{Accumulator, Commitment, Nullifier};

use crate::error::{PoolError, StateError};

/// Mutable ledger state of the shielded pool.
pub struct PoolState {
    accumulator: Accumulator,
    /// Spent-note tags, global across all tree instances
    nullifiers: HashSet<Nullifier>,
}

impl PoolState {
    pub fn new(depth: usize) -> Self {
        Self {
            accumulator: Accumulator::with_depth(depth),
            nullifiers: HashSet::new(),
        }
    }

    /// Reassemble state loaded from storage.
    pub fn from_parts(accumulator: Accumulator, nullifiers: HashSet<Nullifier>) -> Self {
        Self {
            accumulator,
            nullifiers,
        }
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    pub fn depth(&self) -> usize {
        self.accumulator.depth()
    }

    /// Root of the active instance
    pub fn root(&self) -> [u8; 32] {
        self.accumulator.root()
    }

    pub fn active_tree(&self) -> u32 {
        self.accumulator.active_tree()
    }

    pub fn is_known_root(&self, tree: u32, root: &[u8; 32]) -> bool {
        self.accumulator.is_known_root(tree, root)
    }

    pub fn nullifier_seen(&self, nullifier: &Nullifier) -> bool {
        self.nullifiers.contains(nullifier)
    }

    pub fn nullifier_count(&self) -> usize {
        self.nullifiers.len()
    }

    pub fn total_leaves(&self) -> u64 {
        self.accumulator.total_leaves()
    }

    /// Mark a nullifier as spent; rejects duplicates.
    pub fn spend_nullifier(&mut self, nullifier: Nullifier) -> Result<(), PoolError> {
        if !self.nullifiers.insert(nullifier) {
            return Err(StateError::NullifierSeen.into());
        }
        Ok(())
    }

    /// Append a commitment batch; returns (tree_number, start_index).
    pub fn insert_commitments(
        &mut self,
        commitments: &[Commitment],
    ) -> Result<(u32, u64), PoolError> {
        Ok(self.accumulator.insert_batch(commitments)?)
    }

    /// Explicitly retire the oldest roots of an instance.
    pub fn retire_roots(&mut self, tree: u32, count: usize) -> Result<(), PoolError> {
        Ok(self.accumulator.retire_roots(tree, count)?)
    }
}

/// Storage delta produced by one applied batch.
///
/// The engine mutates in-memory state and hands this back; the host decides
/// when to flush it (`PoolStore::persist_diff`).
#[derive(Debug, Clone, Default)]
pub struct BatchDiff {
    /// (tree, index, commitment, serialized ciphertext)
    pub commitments: Vec<(u32, u64, Commitment, Vec<u8>)>,
    /// Nullifiers newly spent
    pub nullifiers: Vec<Nullifier>,
    /// Roots newly produced, per tree
    pub roots: Vec<(u32, [u8; 32])>,
}

impl BatchDiff {
    pub fn is_empty(&self) -> bool {
        self.commitments.is_empty() && self.nullifiers.is_empty() && self.roots.is_empty()
    }
}
