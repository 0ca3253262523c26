//! Proving-request assembly and the external backend boundary.
//!
//! The wallet builds everything the circuit needs as witness material and
//! signs the public components with the spending key; an external backend
//! turns that into a Groth16 proof. The core never sees any of this except
//! the finished proof.

use thiserror::Error;

use veil_privacy::{Commitment, MerkleProof, Note, NoteCiphertext, Nullifier};
use veil_verifier::Proof;

/// Witness material for one spent input note.
#[derive(Debug, Clone)]
pub struct InputWitness {
    /// The note being spent (position set)
    pub note: Note,
    /// Inclusion proof against the request's merkle root
    pub merkle_proof: MerkleProof,
    /// Nullifier the circuit must re-derive
    pub nullifier: Nullifier,
}

/// Witness material for one created output note.
#[derive(Debug, Clone)]
pub struct OutputWitness {
    pub note: Note,
    /// Ciphertext bound into the bound-parameters hash
    pub ciphertext: NoteCiphertext,
}

/// Spend authorization over the public transaction components.
#[derive(Debug, Clone, Copy)]
pub struct SpendAuthorization {
    /// Spending public key (ed25519)
    pub signer: [u8; 32],
    /// Signature over `authorization_message(...)`
    pub signature: [u8; 64],
}

/// The message a spender signs: root, bound hash, nullifiers, commitments.
pub fn authorization_message(
    merkle_root: &[u8; 32],
    bound_params_hash: &[u8; 32],
    nullifiers: &[Nullifier],
    commitments: &[Commitment],
) -> Vec<u8> {
    let mut message = Vec::with_capacity(64 + 32 * (nullifiers.len() + commitments.len()));
    message.extend_from_slice(merkle_root);
    message.extend_from_slice(bound_params_hash);
    for nullifier in nullifiers {
        message.extend_from_slice(nullifier.as_bytes());
    }
    for commitment in commitments {
        message.extend_from_slice(commitment.as_bytes());
    }
    message
}

/// A complete witness bundle handed to the proving backend.
#[derive(Debug, Clone)]
pub struct ProvingRequest {
    /// Circuit shape: (input count, output count)
    pub shape: (usize, usize),
    pub merkle_root: [u8; 32],
    /// Bound-parameters hash (field bytes)
    pub bound_params_hash: [u8; 32],
    /// The folded public-input scalar the proof must bind (field bytes)
    pub public_input: [u8; 32],
    pub inputs: Vec<InputWitness>,
    pub outputs: Vec<OutputWitness>,
    pub authorization: SpendAuthorization,
}

#[derive(Error, Debug)]
pub enum ProvingError {
    #[error("proving backend failed: {0}")]
    Backend(String),
}

/// External Groth16 proving backend: (circuit shape, witness) → proof.
///
/// Proving is CPU-bound and long-running; implementations typically hand
/// the request to a separate process or service.
pub trait ProvingBackend {
    fn prove(&self, request: &ProvingRequest) -> Result<Proof, ProvingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_message_layout() {
        let message = authorization_message(
            &[1u8; 32],
            &[2u8; 32],
            &[Nullifier([3u8; 32])],
            &[Commitment([4u8; 32]), Commitment([5u8; 32])],
        );
        assert_eq!(message.len(), 64 + 3 * 32);
        assert_eq!(&message[..32], &[1u8; 32]);
        assert_eq!(&message[64..96], &[3u8; 32]);
        assert_eq!(&message[128..], &[5u8; 32]);
    }
}
