//! Basis-point fee math.
//!
//! ```text
//! inclusive: base = amount · 10000 / (10000 + bp);  fee = amount − base
//! exclusive: base = amount;                         fee = amount · bp / 10000
//! ```
//!
//! Shields and unshields use inclusive mode (the fee comes out of the moved
//! amount); intra-pool transfers carry no fee at all.

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, PoolError};

const BASIS_POINTS: u128 = 10_000;

/// Pool fee parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Basis points charged on shields
    pub shield_bp: u64,
    /// Basis points charged on unshields
    pub unshield_bp: u64,
    /// Public address credited with fees
    pub recipient: [u8; 32],
}

impl FeeConfig {
    /// No fees, no recipient.
    pub fn disabled() -> Self {
        Self {
            shield_bp: 0,
            unshield_bp: 0,
            recipient: [0u8; 32],
        }
    }

    /// Build from the TOML config section (hex-encoded recipient).
    pub fn from_config(section: &veil_config::FeesConfig) -> Result<Self, PoolError> {
        let raw = hex::decode(&section.recipient).map_err(|_| FormatError::MalformedTokenData)?;
        let recipient: [u8; 32] = raw
            .try_into()
            .map_err(|_| FormatError::MalformedTokenData)?;
        Ok(Self {
            shield_bp: section.shield_bp,
            unshield_bp: section.unshield_bp,
            recipient,
        })
    }
}

/// Split an amount into (base, fee) with the fee taken from inside it.
/// base + fee always reproduces the original amount.
pub fn split_inclusive(amount: u64, bp: u64) -> (u64, u64) {
    let base = u128::from(amount) * BASIS_POINTS / (BASIS_POINTS + u128::from(bp));
    let base = base as u64;
    (base, amount - base)
}

/// Fee charged on top of an amount.
pub fn fee_exclusive(amount: u64, bp: u64) -> u64 {
    (u128::from(amount) * u128::from(bp) / BASIS_POINTS) as u64
}
