//! Wallet error type.

use thiserror::Error;
use veil_privacy::PrivacyError;

use crate::prover::ProvingError;

#[derive(Error, Debug)]
pub enum WalletError {
    /// Not enough unspent value in any single tree instance.
    ///
    /// A transaction proves against one instance's root, so inputs cannot
    /// mix instances even when the combined balance would suffice.
    #[error("insufficient spendable balance: need {needed}, best instance holds {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    /// This wallet holds only a viewing key.
    #[error("watch-only wallet cannot authorize spends")]
    WatchOnly,

    /// Transfer or unshield of zero value.
    #[error("zero-value request")]
    ZeroValue,

    /// The local mirror has no root for the spend instance yet.
    #[error("no synced root for tree {tree}")]
    NoSyncedRoot { tree: u32 },

    #[error(transparent)]
    Privacy(#[from] PrivacyError),

    #[error(transparent)]
    Proving(#[from] ProvingError),
}
