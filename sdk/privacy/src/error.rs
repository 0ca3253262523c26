//! Privacy-layer error type.

use thiserror::Error;

/// Errors surfaced by the privacy primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrivacyError {
    /// A 32-byte value was not a canonical field-element encoding.
    #[error("value is not a canonical field element")]
    OutOfField,

    /// A leaf batch was larger than a whole tree instance.
    #[error("batch of {batch} leaves exceeds instance capacity {capacity}")]
    BatchTooLarge { batch: usize, capacity: u64 },

    /// A proof was requested for a position that has no leaf.
    #[error("no leaf at position {position}")]
    PositionVacant { position: u64 },

    /// A tree instance number that has never been created.
    #[error("unknown tree instance {tree}")]
    UnknownTree { tree: u32 },

    /// Ciphertext body too short or structurally invalid after decryption.
    #[error("malformed note plaintext")]
    MalformedPlaintext,
}
