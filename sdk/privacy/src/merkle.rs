//! Incremental Merkle Accumulator
//!
//! Append-only authenticated storage for note commitments. Commitments live
//! in a *forest* of fixed-depth tree instances: when an instance fills up, a
//! new instance starts and the old one stays queryable forever.
//!
//! ```text
//!                    Root
//!                   /    \
//!                 H01    H23
//!                /  \   /   \
//!               H0  H1 H2   H3
//!               |   |   |    |
//!              C0  C1  C2   Z0   (commitments; Z = per-level zero value)
//! ```
//!
//! Only non-empty nodes are stored; missing siblings fall back to the
//! precomputed zero-subtree hash for their level, so an insertion touches
//! `depth` nodes regardless of tree size.

use std::collections::{HashMap, HashSet};

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::commitment::Commitment;
use crate::error::PrivacyError;
use crate::poseidon::{bytes_to_field, field_to_bytes, hash_fields};

/// Default tree depth: 2^16 commitments per instance.
pub const TREE_DEPTH: usize = 16;

/// Hash two sibling nodes to get their parent.
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    field_to_bytes(hash_fields(&[bytes_to_field(left), bytes_to_field(right)]))
}

/// Precomputed per-level zero-subtree hashes.
pub struct MerkleHasher {
    zeros: Vec<[u8; 32]>,
}

impl MerkleHasher {
    pub fn new(depth: usize) -> Self {
        // zero leaf = Poseidon(0); zeros[l+1] = H(zeros[l], zeros[l])
        let mut zeros = vec![field_to_bytes(hash_fields(&[Fr::from(0u64)]))];
        for level in 0..depth {
            let below = zeros[level];
            zeros.push(hash_pair(&below, &below));
        }
        Self { zeros }
    }

    /// Zero-subtree hash at a level (0 = leaf level).
    pub fn zero(&self, level: usize) -> &[u8; 32] {
        &self.zeros[level]
    }

    /// Root of a completely empty tree.
    pub fn empty_root(&self) -> &[u8; 32] {
        self.zeros.last().expect("zeros never empty")
    }
}

/// A Merkle inclusion proof: one sibling per level plus the leaf index,
/// whose bits double as the left/right path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Sibling hashes from leaf level to just below the root
    pub siblings: Vec<[u8; 32]>,
    /// Leaf index; bit `l` says whether the path node at level `l` is a
    /// right child
    pub position: u64,
}

impl MerkleProof {
    /// Fold the leaf up to a root and compare against the claimed one.
    pub fn verify(&self, leaf: &Commitment, root: &[u8; 32]) -> bool {
        let mut current = leaf.0;
        for (level, sibling) in self.siblings.iter().enumerate() {
            let is_right = (self.position >> level) & 1 == 1;
            current = if is_right {
                hash_pair(sibling, &current)
            } else {
                hash_pair(&current, sibling)
            };
        }
        &current == root
    }

    /// Path direction bits, leaf level first (for circuit witnesses).
    pub fn path_bits(&self) -> Vec<bool> {
        (0..self.siblings.len())
            .map(|level| (self.position >> level) & 1 == 1)
            .collect()
    }

    /// Siblings as field elements (for circuit witnesses).
    pub fn to_field_elements(&self) -> Vec<Fr> {
        self.siblings.iter().map(bytes_to_field).collect()
    }
}

/// One append-only tree instance.
///
/// Stores only non-empty nodes, keyed by (level, index).
pub struct CommitmentTree {
    depth: usize,
    nodes: HashMap<(usize, u64), [u8; 32]>,
    next_index: u64,
    root: [u8; 32],
    hasher: MerkleHasher,
}

impl CommitmentTree {
    pub fn new(depth: usize) -> Self {
        let hasher = MerkleHasher::new(depth);
        let root = *hasher.empty_root();
        Self {
            depth,
            nodes: HashMap::new(),
            next_index: 0,
            root,
            hasher,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Current root
    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    /// Next free leaf index
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Total leaf slots in this instance
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Free leaf slots remaining
    pub fn remaining(&self) -> u64 {
        self.capacity() - self.next_index
    }

    /// Append a batch of commitments contiguously, returning the index of
    /// the first inserted leaf. Fails if the batch does not fit; the caller
    /// decides whether that means rollover.
    pub fn append_batch(&mut self, leaves: &[Commitment]) -> Result<u64, PrivacyError> {
        if leaves.len() as u64 > self.remaining() {
            return Err(PrivacyError::BatchTooLarge {
                batch: leaves.len(),
                capacity: self.remaining(),
            });
        }
        let start = self.next_index;
        for leaf in leaves {
            self.insert_unchecked(leaf);
        }
        Ok(start)
    }

    fn insert_unchecked(&mut self, leaf: &Commitment) {
        let position = self.next_index;
        self.next_index += 1;

        self.nodes.insert((0, position), leaf.0);

        let mut current_index = position;
        let mut current_hash = leaf.0;

        for level in 0..self.depth {
            let is_right = current_index & 1 == 1;
            let sibling_index = if is_right {
                current_index - 1
            } else {
                current_index + 1
            };

            let sibling = self
                .nodes
                .get(&(level, sibling_index))
                .copied()
                .unwrap_or_else(|| *self.hasher.zero(level));

            let parent = if is_right {
                hash_pair(&sibling, &current_hash)
            } else {
                hash_pair(&current_hash, &sibling)
            };

            current_index /= 2;
            current_hash = parent;
            self.nodes.insert((level + 1, current_index), parent);
        }

        self.root = current_hash;
    }

    /// Commitment at a leaf index
    pub fn get(&self, index: u64) -> Option<Commitment> {
        self.nodes.get(&(0, index)).map(|h| Commitment(*h))
    }

    /// Inclusion proof for an occupied leaf index
    pub fn proof(&self, index: u64) -> Option<MerkleProof> {
        if index >= self.next_index {
            return None;
        }

        let mut siblings = Vec::with_capacity(self.depth);
        let mut current_index = index;

        for level in 0..self.depth {
            let sibling_index = if current_index & 1 == 1 {
                current_index - 1
            } else {
                current_index + 1
            };
            let sibling = self
                .nodes
                .get(&(level, sibling_index))
                .copied()
                .unwrap_or_else(|| *self.hasher.zero(level));
            siblings.push(sibling);
            current_index /= 2;
        }

        Some(MerkleProof {
            siblings,
            position: index,
        })
    }
}

/// Every root an instance has ever produced, in insertion order.
///
/// Proofs generated against an older root stay acceptable until the root is
/// explicitly retired, which tolerates provers working from slightly stale
/// snapshots.
#[derive(Default)]
pub struct RootHistory {
    order: Vec<[u8; 32]>,
    seen: HashSet<[u8; 32]>,
}

impl RootHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly produced root
    pub fn push(&mut self, root: [u8; 32]) {
        if self.seen.insert(root) {
            self.order.push(root);
        }
    }

    /// Is this root still accepted?
    pub fn contains(&self, root: &[u8; 32]) -> bool {
        self.seen.contains(root)
    }

    /// The most recent root
    pub fn current(&self) -> Option<&[u8; 32]> {
        self.order.last()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drop the `count` oldest roots; proofs against them stop validating.
    pub fn retire_oldest(&mut self, count: usize) {
        let count = count.min(self.order.len());
        for root in self.order.drain(..count) {
            self.seen.remove(&root);
        }
    }
}

struct TreeSlot {
    tree: CommitmentTree,
    history: RootHistory,
}

impl TreeSlot {
    fn new(depth: usize) -> Self {
        let tree = CommitmentTree::new(depth);
        let mut history = RootHistory::new();
        history.push(tree.root());
        Self { tree, history }
    }
}

/// The commitment accumulator: a forest of sequential tree instances.
///
/// Appends go to the active (latest) instance; a batch that would not fit
/// starts a fresh instance first, so no batch ever spans two instances.
pub struct Accumulator {
    depth: usize,
    trees: Vec<TreeSlot>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::with_depth(TREE_DEPTH)
    }

    /// Instances of 2^depth leaves each. Small depths keep rollover
    /// reachable in tests.
    pub fn with_depth(depth: usize) -> Self {
        Self {
            depth,
            trees: vec![TreeSlot::new(depth)],
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of the active (latest) instance
    pub fn active_tree(&self) -> u32 {
        (self.trees.len() - 1) as u32
    }

    /// Root of the active instance
    pub fn root(&self) -> [u8; 32] {
        self.active_slot().tree.root()
    }

    /// Next free index in the active instance
    pub fn next_index(&self) -> u64 {
        self.active_slot().tree.next_index()
    }

    /// Append a batch, rolling over to a new instance if it would not fit.
    /// Returns (tree_number, start_index). An empty batch changes nothing.
    pub fn insert_batch(&mut self, leaves: &[Commitment]) -> Result<(u32, u64), PrivacyError> {
        let capacity = 1u64 << self.depth;
        if leaves.len() as u64 > capacity {
            return Err(PrivacyError::BatchTooLarge {
                batch: leaves.len(),
                capacity,
            });
        }
        if leaves.is_empty() {
            return Ok((self.active_tree(), self.next_index()));
        }
        if leaves.len() as u64 > self.active_slot().tree.remaining() {
            self.trees.push(TreeSlot::new(self.depth));
        }

        let tree_number = self.active_tree();
        let slot = self
            .trees
            .last_mut()
            .expect("accumulator always has an active instance");
        let start = slot.tree.append_batch(leaves)?;
        let root = slot.tree.root();
        slot.history.push(root);
        Ok((tree_number, start))
    }

    /// Is this root current-or-historical for the given instance?
    pub fn is_known_root(&self, tree: u32, root: &[u8; 32]) -> bool {
        self.slot(tree)
            .map(|s| s.history.contains(root))
            .unwrap_or(false)
    }

    /// Inclusion proof for a leaf in any instance
    pub fn proof(&self, tree: u32, index: u64) -> Result<MerkleProof, PrivacyError> {
        let slot = self
            .slot(tree)
            .ok_or(PrivacyError::UnknownTree { tree })?;
        slot.tree
            .proof(index)
            .ok_or(PrivacyError::PositionVacant { position: index })
    }

    /// Commitment at a position, if occupied
    pub fn leaf(&self, tree: u32, index: u64) -> Option<Commitment> {
        self.slot(tree).and_then(|s| s.tree.get(index))
    }

    /// Leaves inserted into a given instance
    pub fn tree_leaf_count(&self, tree: u32) -> Option<u64> {
        self.slot(tree).map(|s| s.tree.next_index())
    }

    /// Leaves inserted across all instances
    pub fn total_leaves(&self) -> u64 {
        self.trees.iter().map(|s| s.tree.next_index()).sum()
    }

    /// Root history of an instance
    pub fn history(&self, tree: u32) -> Option<&RootHistory> {
        self.slot(tree).map(|s| &s.history)
    }

    /// Explicitly retire the oldest roots of an instance.
    pub fn retire_roots(&mut self, tree: u32, count: usize) -> Result<(), PrivacyError> {
        let slot = self
            .trees
            .get_mut(tree as usize)
            .ok_or(PrivacyError::UnknownTree { tree })?;
        slot.history.retire_oldest(count);
        Ok(())
    }

    /// Recreate an accumulator from persisted per-instance leaves and root
    /// histories, in tree-number order. Replayed roots are the recorded
    /// batch-end roots, not one per leaf.
    pub fn restore(
        depth: usize,
        instances: Vec<(Vec<Commitment>, Vec<[u8; 32]>)>,
    ) -> Result<Self, PrivacyError> {
        let mut trees = Vec::with_capacity(instances.len().max(1));
        for (leaves, roots) in instances {
            let mut slot = TreeSlot::new(depth);
            slot.tree.append_batch(&leaves)?;
            for root in roots {
                slot.history.push(root);
            }
            trees.push(slot);
        }
        if trees.is_empty() {
            trees.push(TreeSlot::new(depth));
        }
        Ok(Self { depth, trees })
    }

    fn slot(&self, tree: u32) -> Option<&TreeSlot> {
        self.trees.get(tree as usize)
    }

    fn active_slot(&self) -> &TreeSlot {
        self.trees
            .last()
            .expect("accumulator always has an active instance")
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}
