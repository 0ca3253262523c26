//! Veil Proof Verifier
//!
//! Groth16 verification on BN254, specialized to a single folded public
//! input: the transaction hash scalar. A transaction's shape (input note
//! count, output note count) selects which trusted-setup verifying key
//! applies; unregistered shapes fail closed.
//!
//! ```text
//! acc = ic[0] + ic[1] · public_input
//! accept  ⇔  e(-A, B) · e(alpha, beta) · e(acc, gamma) · e(C, delta) = 1
//! ```
//!
//! Proof points arrive as raw coordinate bytes and are range-checked
//! against the base-field modulus plus curve/subgroup membership before any
//! arithmetic touches them.

pub mod error;
pub mod key;
pub mod proof;
pub mod registry;
pub mod verify;

#[cfg(feature = "fixtures")]
pub mod fixtures;

pub use error::VerifierError;
pub use key::VerifyingKey;
pub use proof::{G1Point, G2Point, Proof};
pub use registry::VerifyingKeyRegistry;
pub use verify::verify;
