//! Pool error taxonomy.
//!
//! Five families, every one of which aborts the enclosing batch: nothing is
//! retried or partially committed inside the core. Retry is the off-ledger
//! caller's decision after resubmitting a corrected transaction.

use thiserror::Error;
use veil_privacy::PrivacyError;
use veil_verifier::VerifierError;

/// Malformed input data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A 32-byte scalar was not a canonical field-element encoding.
    #[error("value is not a canonical field element")]
    OutOfField,

    /// Token data failed structural validation.
    #[error("malformed token data")]
    MalformedTokenData,

    /// Shield request carrying no value.
    #[error("shield of zero value")]
    ZeroValue,

    /// Ciphertexts must track the commitments they decrypt.
    #[error("{ciphertexts} ciphertexts for {commitments} inserted commitments")]
    CiphertextCountMismatch {
        ciphertexts: usize,
        commitments: usize,
    },

    /// Declared unshield preimage does not hash to the final commitment.
    #[error("unshield preimage does not match the declared commitment")]
    UnshieldPreimageMismatch,

    /// Leaf batch larger than a whole tree instance.
    #[error("batch of {batch} leaves exceeds instance capacity {capacity}")]
    BatchTooLarge { batch: usize, capacity: u64 },

    /// Ciphertext bytes failed to parse.
    #[error("malformed ciphertext")]
    MalformedCiphertext,

    /// A proof or key point failed range/curve validation.
    #[error("malformed curve point: {0}")]
    MalformedPoint(VerifierError),
}

/// Ledger-state conflicts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Nullifier already recorded (double spend or in-batch duplicate).
    #[error("nullifier already seen")]
    NullifierSeen,

    /// Referenced root is not in the instance's (still-tracked) history.
    #[error("merkle root not in history for tree {tree}")]
    UnknownRoot { tree: u32 },

    /// Tree instance number that has never been created.
    #[error("unknown tree instance {tree}")]
    UnknownTree { tree: u32 },

    /// Leaf position with no commitment.
    #[error("no leaf at position {position}")]
    PositionVacant { position: u64 },

    /// Transaction shape with no registered verifying key.
    #[error("no verifying key registered for shape ({inputs} in, {outputs} out)")]
    ShapeNotConfigured { inputs: usize, outputs: usize },

    /// Submitter's declared gas floor exceeds what the batch is paying.
    #[error("declared minimum gas price {declared} exceeds actual {actual}")]
    GasPriceBelowMinimum { declared: u64, actual: u64 },

    /// Persisted schema does not match what this engine speaks.
    #[error("persisted schema version {found}, expected {expected}")]
    SchemaVersion { found: u32, expected: u32 },

    /// Underlying storage failure.
    #[error("storage: {0}")]
    Storage(String),
}

/// Caller not entitled to the requested action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// Bound adapt contract does not match the submitting caller.
    #[error("caller is not the declared adapt contract")]
    AdaptContractMismatch,

    /// Unshield destination override without the right mode or caller.
    #[error("unshield destination override not permitted")]
    UnauthorizedOverride,

    /// Token is blocklisted for deposits.
    #[error("token is blocklisted")]
    TokenBlocked,

    /// Relay entered while a relay batch is already executing.
    #[error("reentrant relay call")]
    ReentrantCall,

    /// Governance action from a caller the authorizer rejects.
    #[error("caller not authorized for governance action")]
    Unauthorized,
}

/// Proof did not verify.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("pairing check failed")]
    PairingCheckFailed,
}

/// Underlying token movement failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("token transfer failed: {0}")]
    Failed(String),

    #[error("insufficient public balance")]
    InsufficientBalance,
}

/// Any failure of a pool entry point.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Proof(#[from] ProofError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl From<VerifierError> for PoolError {
    fn from(err: VerifierError) -> Self {
        match err {
            VerifierError::PairingCheckFailed => ProofError::PairingCheckFailed.into(),
            VerifierError::ShapeNotConfigured { inputs, outputs } => {
                StateError::ShapeNotConfigured { inputs, outputs }.into()
            }
            other => FormatError::MalformedPoint(other).into(),
        }
    }
}

impl From<PrivacyError> for PoolError {
    fn from(err: PrivacyError) -> Self {
        match err {
            PrivacyError::OutOfField => FormatError::OutOfField.into(),
            PrivacyError::BatchTooLarge { batch, capacity } => {
                FormatError::BatchTooLarge { batch, capacity }.into()
            }
            PrivacyError::MalformedPlaintext => FormatError::MalformedCiphertext.into(),
            PrivacyError::UnknownTree { tree } => StateError::UnknownTree { tree }.into(),
            PrivacyError::PositionVacant { position } => {
                StateError::PositionVacant { position }.into()
            }
        }
    }
}

impl From<rocksdb::Error> for PoolError {
    fn from(err: rocksdb::Error) -> Self {
        StateError::Storage(err.to_string()).into()
    }
}
