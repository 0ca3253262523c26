//! External collaborator interfaces.
//!
//! The pool core never touches token balances or governance policy itself;
//! both live behind traits supplied by the host at each entry point.

use veil_privacy::TokenData;

use crate::error::TransferError;

/// Direction of a public token movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementKind {
    /// Pull value from the counterparty into the pool
    PullIn,
    /// Push value from the pool out to the counterparty
    PushOut,
}

/// One public token movement requested by the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMovement {
    pub kind: MovementKind,
    /// Depositor (PullIn) or recipient (PushOut)
    pub counterparty: [u8; 32],
    pub token: TokenData,
    pub value: u64,
}

/// Moves public token balances for shields and unshields.
///
/// One call covers a whole batch and must be all-or-nothing: either every
/// movement happened or none did. The core only needs that success/failure
/// answer.
pub trait TokenAdapter {
    fn execute(&mut self, movements: &[TokenMovement]) -> Result<(), TransferError>;
}

/// Opaque is-caller-authorized check for governance actions (fee changes,
/// verifying-key registration, token blocklist updates).
pub trait Authorizer {
    fn is_authorized(&self, caller: &[u8; 32]) -> bool;
}
