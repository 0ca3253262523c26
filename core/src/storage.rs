//! Pool persistence.
//!
//! A RocksDB column-family store holding everything the engine needs to
//! come back after a restart: commitments (with their ciphertexts), root
//! histories, nullifiers, fee config, and registered verifying keys.
//!
//! The store is versioned: `schema_version` is written on creation and
//! checked on open. A mismatch fails closed; migrating is an explicit,
//! separate step, never an implicit reinterpretation of old bytes.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use log::info;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};

use veil_privacy::{Accumulator, Commitment, Nullifier};
use veil_verifier::VerifyingKey;

use crate::error::{PoolError, StateError};
use crate::fees::FeeConfig;
use crate::state::{BatchDiff, PoolState};

const SCHEMA_VERSION: u32 = 1;

const CF_COMMITMENTS: &str = "commitments";
const CF_CIPHERTEXTS: &str = "ciphertexts";
const CF_NULLIFIERS: &str = "nullifiers";
const CF_ROOTS: &str = "roots";
const CF_VKEYS: &str = "verifying_keys";
const CF_META: &str = "meta";

const META_SCHEMA_VERSION: &[u8] = b"schema_version";
const META_TREE_DEPTH: &[u8] = b"tree_depth";
const META_FEE_CONFIG: &[u8] = b"fee_config";

/// A thread-safe wrapper around RocksDB.
#[derive(Clone)]
pub struct PoolStore {
    db: Arc<DB>,
}

impl PoolStore {
    /// Open (or create) the store, enforcing schema version and tree depth.
    pub fn open<P: AsRef<Path>>(path: P, depth: usize) -> Result<Self, PoolError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_COMMITMENTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_CIPHERTEXTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_NULLIFIERS, Options::default()),
            ColumnFamilyDescriptor::new(CF_ROOTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_VKEYS, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, families)?;
        let store = Self { db: Arc::new(db) };

        match store.get_meta_u32(META_SCHEMA_VERSION)? {
            None => {
                store.put_meta_u32(META_SCHEMA_VERSION, SCHEMA_VERSION)?;
                store.put_meta_u32(META_TREE_DEPTH, depth as u32)?;
            }
            Some(found) if found != SCHEMA_VERSION => {
                return Err(StateError::SchemaVersion {
                    found,
                    expected: SCHEMA_VERSION,
                }
                .into());
            }
            Some(_) => {
                let stored_depth = store.get_meta_u32(META_TREE_DEPTH)?.unwrap_or(0);
                if stored_depth != depth as u32 {
                    return Err(StateError::Storage(format!(
                        "store built for tree depth {stored_depth}, opened with {depth}"
                    ))
                    .into());
                }
            }
        }

        Ok(store)
    }

    /// Flush a batch's delta in one write.
    pub fn persist_diff(&self, diff: &BatchDiff) -> Result<(), PoolError> {
        let mut batch = WriteBatch::default();

        let commitments_cf = self.cf(CF_COMMITMENTS)?;
        let ciphertexts_cf = self.cf(CF_CIPHERTEXTS)?;
        for (tree, index, commitment, ciphertext) in &diff.commitments {
            let key = leaf_key(*tree, *index);
            batch.put_cf(commitments_cf, key, commitment.as_bytes());
            batch.put_cf(ciphertexts_cf, key, ciphertext);
        }

        let nullifiers_cf = self.cf(CF_NULLIFIERS)?;
        for nullifier in &diff.nullifiers {
            batch.put_cf(nullifiers_cf, nullifier.as_bytes(), []);
        }

        // Root histories are small append-only blobs, one per tree.
        let roots_cf = self.cf(CF_ROOTS)?;
        for (tree, root) in &diff.roots {
            let key = tree.to_be_bytes();
            let mut blob = self.db.get_cf(roots_cf, key)?.unwrap_or_default();
            blob.extend_from_slice(root);
            batch.put_cf(roots_cf, key, blob);
        }

        self.db.write(batch)?;
        Ok(())
    }

    /// Rebuild engine state from persisted leaves, roots, and nullifiers.
    pub fn load_state(&self) -> Result<PoolState, PoolError> {
        let depth = self
            .get_meta_u32(META_TREE_DEPTH)?
            .ok_or_else(|| StateError::Storage("tree depth missing from meta".into()))?
            as usize;

        // Commitment keys are (tree BE, index BE), so a full scan comes out
        // in insertion order.
        let mut instances: Vec<(Vec<Commitment>, Vec<[u8; 32]>)> = Vec::new();
        let commitments_cf = self.cf(CF_COMMITMENTS)?;
        for entry in self.db.iterator_cf(commitments_cf, IteratorMode::Start) {
            let (key, value) = entry?;
            let (tree, _) = parse_leaf_key(&key)?;
            let commitment = Commitment(to_array32(&value)?);
            while instances.len() <= tree as usize {
                instances.push((Vec::new(), Vec::new()));
            }
            instances[tree as usize].0.push(commitment);
        }

        let roots_cf = self.cf(CF_ROOTS)?;
        for entry in self.db.iterator_cf(roots_cf, IteratorMode::Start) {
            let (key, blob) = entry?;
            let tree = u32::from_be_bytes(
                key.as_ref()
                    .try_into()
                    .map_err(|_| StateError::Storage("bad root key".into()))?,
            );
            while instances.len() <= tree as usize {
                instances.push((Vec::new(), Vec::new()));
            }
            if blob.len() % 32 != 0 {
                return Err(StateError::Storage("bad root blob length".into()).into());
            }
            for chunk in blob.chunks_exact(32) {
                instances[tree as usize].1.push(to_array32(chunk)?);
            }
        }

        let accumulator = Accumulator::restore(depth, instances)?;

        let mut nullifiers = HashSet::new();
        let nullifiers_cf = self.cf(CF_NULLIFIERS)?;
        for entry in self.db.iterator_cf(nullifiers_cf, IteratorMode::Start) {
            let (key, _) = entry?;
            nullifiers.insert(Nullifier::from_bytes(to_array32(&key)?));
        }

        info!(
            "loaded pool state: {} commitments, {} nullifiers",
            accumulator.total_leaves(),
            nullifiers.len()
        );

        Ok(PoolState::from_parts(accumulator, nullifiers))
    }

    /// Ciphertext stored for a leaf, if any.
    pub fn ciphertext(&self, tree: u32, index: u64) -> Result<Option<Vec<u8>>, PoolError> {
        let cf = self.cf(CF_CIPHERTEXTS)?;
        Ok(self.db.get_cf(cf, leaf_key(tree, index))?)
    }

    pub fn save_fee_config(&self, fees: &FeeConfig) -> Result<(), PoolError> {
        let cf = self.cf(CF_META)?;
        let value = serde_json::to_vec(fees)
            .map_err(|e| StateError::Storage(format!("fee config encode: {e}")))?;
        self.db.put_cf(cf, META_FEE_CONFIG, value)?;
        Ok(())
    }

    pub fn load_fee_config(&self) -> Result<Option<FeeConfig>, PoolError> {
        let cf = self.cf(CF_META)?;
        match self.db.get_cf(cf, META_FEE_CONFIG)? {
            None => Ok(None),
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(|e| {
                StateError::Storage(format!("fee config decode: {e}"))
            })?)),
        }
    }

    pub fn save_verifying_key(
        &self,
        inputs: usize,
        outputs: usize,
        key: &VerifyingKey,
    ) -> Result<(), PoolError> {
        let cf = self.cf(CF_VKEYS)?;
        self.db
            .put_cf(cf, shape_key(inputs, outputs), key.to_bytes())?;
        Ok(())
    }

    /// All persisted verifying keys as (inputs, outputs, key).
    pub fn load_verifying_keys(&self) -> Result<Vec<(usize, usize, VerifyingKey)>, PoolError> {
        let cf = self.cf(CF_VKEYS)?;
        let mut keys = Vec::new();
        for entry in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = entry?;
            if key.len() != 2 {
                return Err(StateError::Storage("bad verifying-key shape key".into()).into());
            }
            let vk = VerifyingKey::from_bytes(&value)
                .map_err(|_| StateError::Storage("verifying key decode".into()))?;
            keys.push((key[0] as usize, key[1] as usize, vk));
        }
        Ok(keys)
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, PoolError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StateError::Storage(format!("{name} column family not found")).into())
    }

    fn get_meta_u32(&self, key: &[u8]) -> Result<Option<u32>, PoolError> {
        let cf = self.cf(CF_META)?;
        match self.db.get_cf(cf, key)? {
            None => Ok(None),
            Some(bytes) => {
                let arr: [u8; 4] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StateError::Storage("bad meta value".into()))?;
                Ok(Some(u32::from_le_bytes(arr)))
            }
        }
    }

    fn put_meta_u32(&self, key: &[u8], value: u32) -> Result<(), PoolError> {
        let cf = self.cf(CF_META)?;
        self.db.put_cf(cf, key, value.to_le_bytes())?;
        Ok(())
    }
}

fn leaf_key(tree: u32, index: u64) -> [u8; 12] {
    let mut key = [0u8; 12];
    key[..4].copy_from_slice(&tree.to_be_bytes());
    key[4..].copy_from_slice(&index.to_be_bytes());
    key
}

fn parse_leaf_key(key: &[u8]) -> Result<(u32, u64), PoolError> {
    if key.len() != 12 {
        return Err(StateError::Storage("bad leaf key".into()).into());
    }
    let tree = u32::from_be_bytes(
        key[..4]
            .try_into()
            .map_err(|_| StateError::Storage("bad leaf key".into()))?,
    );
    let index = u64::from_be_bytes(
        key[4..]
            .try_into()
            .map_err(|_| StateError::Storage("bad leaf key".into()))?,
    );
    Ok((tree, index))
}

fn to_array32(bytes: &[u8]) -> Result<[u8; 32], PoolError> {
    bytes
        .try_into()
        .map_err(|_| StateError::Storage("expected 32 bytes".into()).into())
}

fn shape_key(inputs: usize, outputs: usize) -> [u8; 2] {
    [inputs as u8, outputs as u8]
}
