//! Verifier error type.

use thiserror::Error;

/// Errors surfaced by proof verification and key lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifierError {
    /// A point coordinate was at or above the base-field modulus.
    #[error("point coordinate out of field range")]
    CoordinateOutOfRange,

    /// Coordinates satisfied the range check but not the curve equation.
    #[error("point is not on the curve")]
    PointNotOnCurve,

    /// On the curve, but outside the prime-order subgroup.
    #[error("point is not in the prime-order subgroup")]
    PointNotInSubgroup,

    /// A verifying key did not have exactly one public input.
    #[error("verifying key has {ic_len} IC points, expected 2")]
    MalformedKey { ic_len: usize },

    /// Persisted verifying-key bytes failed to deserialize.
    #[error("verifying key deserialization failed")]
    KeyDeserialization,

    /// No verifying key registered for this transaction shape.
    #[error("no verifying key registered for shape ({inputs} in, {outputs} out)")]
    ShapeNotConfigured { inputs: usize, outputs: usize },

    /// The pairing product did not equal the identity.
    #[error("pairing check failed")]
    PairingCheckFailed,
}
