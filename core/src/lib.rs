//! Veil Pool Engine
//!
//! The on-ledger half of the Veil shielded pool: an append-only commitment
//! accumulator, a global nullifier set, Groth16 proof enforcement, and the
//! transaction validator tying them together.
//!
//! ```text
//!                shield(preimages, ciphertexts)
//!                        │  (no proof; depositor authorizes itself)
//!                        ▼
//! ┌──────────┐   ┌──────────────┐   ┌───────────────┐
//! │  Token   │──►│  PoolEngine   │──►│  Accumulator  │ commitments
//! │ Adapter  │◄──│  (validator)  │   ├───────────────┤
//! └──────────┘   │              │──►│ Nullifier Set │ spent notes
//!                └──────┬───────┘   └───────────────┘
//!                       │ transact(proof, root, nullifiers, commitments)
//!                       ▼
//!                ┌──────────────┐
//!                │   Verifier   │ shape-keyed Groth16 check
//!                └──────────────┘
//! ```
//!
//! Every entry point is atomic over its full batch: any failure aborts the
//! whole batch with no partial state.

pub mod adapters;
pub mod engine;
pub mod error;
pub mod events;
pub mod fees;
pub mod state;
pub mod storage;
pub mod transact;

pub use adapters::{Authorizer, MovementKind, TokenAdapter, TokenMovement};
pub use engine::{CallContext, EstimateReport, PoolEngine, ShieldOutcome, TransactOutcome};
pub use error::{
    AuthorizationError, FormatError, PoolError, ProofError, StateError, TransferError,
};
pub use events::{NullifierBatchEvent, PoolEvent, ShieldBatchEvent, TransactBatchEvent};
pub use fees::FeeConfig;
pub use state::{BatchDiff, PoolState};
pub use storage::PoolStore;
pub use transact::{BoundParams, ShieldRequest, Transaction, UnshieldMode};
