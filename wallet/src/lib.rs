//! Veil Wallet
//!
//! The off-ledger half of the pool: scans published batch events, recovers
//! owned notes by trial decryption, mirrors the accumulator and nullifier
//! set, and assembles proving requests for an external Groth16 backend.
//!
//! ```text
//! events ──► sync ──► note store (by tree, index)
//!                      │
//!                      ├── balance / spendable notes
//!                      │
//!                      └── build_transfer / build_unshield
//!                            │  merkle proofs, nullifiers, blinded keys,
//!                            │  ciphertexts, spend signature
//!                            ▼
//!                      ProvingBackend ──► Transaction (ready to submit)
//! ```

pub mod error;
pub mod prover;
pub mod wallet;

pub use error::WalletError;
pub use prover::{
    InputWitness, OutputWitness, ProvingBackend, ProvingError, ProvingRequest,
    SpendAuthorization, authorization_message,
};
pub use wallet::{OwnedNote, RecipientInfo, Wallet};
