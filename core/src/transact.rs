//! Transaction types and the folded public-input hash.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use veil_privacy::poseidon::{bytes_to_field, hash_fields};
use veil_privacy::{Commitment, CommitmentPreimage, NoteCiphertext, Nullifier, ShieldCiphertext};
use veil_verifier::Proof;

/// What the final commitment of a transaction means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnshieldMode {
    /// Pure intra-pool transfer
    None,
    /// Last commitment is an unshield to its preimage npk
    Normal,
    /// Like Normal, but the original recipient may redirect the destination
    Redirect,
}

impl UnshieldMode {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Normal => 1,
            Self::Redirect => 2,
        }
    }
}

/// Transaction metadata folded into one scalar and bound by the proof.
///
/// Folding the per-output ciphertexts in here constrains ciphertext
/// integrity without inflating the public-input vector with
/// memo-length-dependent data.
#[derive(Debug, Clone)]
pub struct BoundParams {
    /// Tree instance the input notes live in
    pub tree_number: u32,
    /// Gas floor the submitter insists on (implicit staleness bound)
    pub min_gas_price: u64,
    /// Unshield behavior of the final commitment
    pub unshield: UnshieldMode,
    /// If nonzero, only this caller may submit the transaction
    pub adapt_contract: [u8; 32],
    /// Free-form parameters for the adapt contract
    pub adapt_params: [u8; 32],
    /// One ciphertext per inserted output commitment
    pub ciphertexts: Vec<NoteCiphertext>,
}

impl BoundParams {
    /// Canonical serialization hashed into a single field element.
    pub fn hash(&self) -> Fr {
        let mut hasher = blake3::Hasher::new_derive_key("veil.bound-params.v1");
        hasher.update(&self.tree_number.to_le_bytes());
        hasher.update(&self.min_gas_price.to_le_bytes());
        hasher.update(&[self.unshield.as_u8()]);
        hasher.update(&self.adapt_contract);
        hasher.update(&self.adapt_params);
        hasher.update(&(self.ciphertexts.len() as u32).to_le_bytes());
        for ciphertext in &self.ciphertexts {
            hasher.update(&ciphertext.to_bytes());
        }
        bytes_to_field(hasher.finalize().as_bytes())
    }
}

/// A shielded transaction as submitted (public inputs only; the witness
/// stays with the prover).
#[derive(Debug, Clone)]
pub struct Transaction {
    pub proof: Proof,
    /// Historical accumulator root the merkle proofs were built against
    pub merkle_root: [u8; 32],
    /// Input-note nullifiers
    pub nullifiers: Vec<Nullifier>,
    /// Output-note commitments; with an unshield, the last one is consumed
    /// rather than inserted
    pub commitments: Vec<Commitment>,
    pub bound_params: BoundParams,
    /// Public preimage of the unshield commitment (ignored when the mode is
    /// None)
    pub unshield_preimage: CommitmentPreimage,
    /// Redirected unshield destination, only honored in Redirect mode for
    /// the original recipient
    pub override_output: Option<[u8; 32]>,
}

impl Transaction {
    /// Circuit shape: (input count, output count)
    pub fn shape(&self) -> (usize, usize) {
        (self.nullifiers.len(), self.commitments.len())
    }

    pub fn has_unshield(&self) -> bool {
        self.bound_params.unshield != UnshieldMode::None
    }

    /// The single folded public input the verifier checks:
    /// Poseidon(root, bound_params_hash, nullifiers..., commitments...)
    pub fn public_input(&self) -> Fr {
        let mut inputs =
            Vec::with_capacity(2 + self.nullifiers.len() + self.commitments.len());
        inputs.push(bytes_to_field(&self.merkle_root));
        inputs.push(self.bound_params.hash());
        inputs.extend(self.nullifiers.iter().map(Nullifier::to_field));
        inputs.extend(self.commitments.iter().map(|c| c.to_field()));
        hash_fields(&inputs)
    }
}

/// One deposit into the pool.
#[derive(Debug, Clone)]
pub struct ShieldRequest {
    /// Caller-specified npk/token/value; value is pre-fee
    pub preimage: CommitmentPreimage,
    /// Conceals only the note randomness
    pub ciphertext: ShieldCiphertext,
}
