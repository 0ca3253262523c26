//! Shape-keyed verifying-key registry.
//!
//! Each circuit shape (input note count, output note count) has its own
//! trusted-setup key. The registry is a two-level map initialized empty;
//! looking up an unregistered shape is a distinguishable error, never a
//! silently-accepting default.

use std::collections::BTreeMap;

use crate::error::VerifierError;
use crate::key::VerifyingKey;

#[derive(Default)]
pub struct VerifyingKeyRegistry {
    keys: BTreeMap<usize, BTreeMap<usize, VerifyingKey>>,
}

impl VerifyingKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the key for a shape.
    pub fn set(&mut self, inputs: usize, outputs: usize, key: VerifyingKey) {
        self.keys.entry(inputs).or_default().insert(outputs, key);
    }

    /// Key for a shape; fails closed when unregistered.
    pub fn get(&self, inputs: usize, outputs: usize) -> Result<&VerifyingKey, VerifierError> {
        self.keys
            .get(&inputs)
            .and_then(|by_outputs| by_outputs.get(&outputs))
            .ok_or(VerifierError::ShapeNotConfigured { inputs, outputs })
    }

    /// Is a key registered for this shape?
    pub fn contains(&self, inputs: usize, outputs: usize) -> bool {
        self.get(inputs, outputs).is_ok()
    }

    /// Registered shapes, for introspection.
    pub fn shapes(&self) -> Vec<(usize, usize)> {
        self.keys
            .iter()
            .flat_map(|(i, by_outputs)| by_outputs.keys().map(|o| (*i, *o)))
            .collect()
    }
}
