//! The pool engine: Veil's transaction validator.
//!
//! Three entry points move value:
//!
//! - `shield` — deposits. No proof; the depositor knows and authorizes
//!   their own deposit. Value is pulled in through the token adapter, the
//!   basis-point fee is carved out, and the adjusted commitment is inserted.
//! - `transact` — transfers and unshields under a Groth16 proof. The engine
//!   re-derives the folded public input itself and verifies against the
//!   shape-selected key, alongside the structural checks the proof cannot
//!   express (root recency, gas floor, adapt lock, nullifier freshness,
//!   unshield destination rules).
//! - `relay` — a transact batch followed by caller-supplied follow-up work
//!   restricted to self-invocation, guarded by an in-progress flag.
//!
//! `estimate` is the simulation-only twin of `transact`: it takes `&self`,
//! skips the pairing check, and therefore cannot move value or be reached
//! from anything that does.
//!
//! All entry points are atomic over their batch: validation happens first
//! against immutable state, token movements execute all-or-nothing, and
//! only then is state mutated (which can no longer fail).

use std::collections::{BTreeMap, HashSet};

use log::info;

use veil_privacy::poseidon::is_canonical_field_bytes;
use veil_privacy::{Commitment, CommitmentPreimage, NoteCiphertext, Nullifier};
use veil_verifier::{VerifyingKey, VerifyingKeyRegistry};

use crate::adapters::{Authorizer, MovementKind, TokenAdapter, TokenMovement};
use crate::error::{AuthorizationError, FormatError, PoolError, StateError};
use crate::events::{NullifierBatchEvent, PoolEvent, ShieldBatchEvent, TransactBatchEvent};
use crate::fees::{self, FeeConfig};
use crate::state::{BatchDiff, PoolState};
use crate::transact::{ShieldRequest, Transaction, UnshieldMode};

/// Who is invoking the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: [u8; 32],
}

/// Result of an applied shield batch.
#[derive(Debug, Clone)]
pub struct ShieldOutcome {
    pub tree_number: u32,
    pub start_index: u64,
    /// Total fee credited to the fee recipient
    pub total_fee: u128,
    /// Storage delta for the host to persist
    pub diff: BatchDiff,
}

/// Result of an applied transact batch.
#[derive(Debug, Clone)]
pub struct TransactOutcome {
    pub tree_number: u32,
    pub start_index: u64,
    /// Commitments inserted (unshield commitments are consumed, not
    /// inserted)
    pub inserted: usize,
    pub diff: BatchDiff,
}

/// What a transact batch would do, per `estimate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateReport {
    pub transactions: usize,
    pub spent_nullifiers: usize,
    pub inserted_commitments: usize,
    pub unshields: usize,
}

/// Whether the pairing check runs. `SkipForEstimate` exists only on the
/// `estimate` path, which takes `&self` and cannot commit anything.
enum ProofCheck {
    Enforce,
    SkipForEstimate,
}

#[derive(Default)]
struct TransactPlan {
    movements: Vec<TokenMovement>,
    nullifiers: Vec<Nullifier>,
    nullifiers_by_tree: BTreeMap<u32, Vec<Nullifier>>,
    inserted: Vec<Commitment>,
    ciphertexts: Vec<NoteCiphertext>,
    unshields: usize,
}

/// The shielded pool.
pub struct PoolEngine {
    state: PoolState,
    registry: VerifyingKeyRegistry,
    fees: FeeConfig,
    blocked_tokens: HashSet<[u8; 32]>,
    events: Vec<PoolEvent>,
    relay_in_progress: bool,
}

impl PoolEngine {
    pub fn new(depth: usize, fees: FeeConfig) -> Self {
        Self::from_state(PoolState::new(depth), fees)
    }

    /// Wrap state loaded from storage.
    pub fn from_state(state: PoolState, fees: FeeConfig) -> Self {
        Self {
            state,
            registry: VerifyingKeyRegistry::new(),
            fees,
            blocked_tokens: HashSet::new(),
            events: Vec::new(),
            relay_in_progress: false,
        }
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn fees(&self) -> &FeeConfig {
        &self.fees
    }

    pub fn registry(&self) -> &VerifyingKeyRegistry {
        &self.registry
    }

    /// Event log, oldest first. Wallets scan this.
    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    // ------------------------------------------------------------------
    // Governance (authorizer-gated)
    // ------------------------------------------------------------------

    pub fn register_verifying_key(
        &mut self,
        ctx: &CallContext,
        auth: &dyn Authorizer,
        inputs: usize,
        outputs: usize,
        key: VerifyingKey,
    ) -> Result<(), PoolError> {
        if !auth.is_authorized(&ctx.caller) {
            return Err(AuthorizationError::Unauthorized.into());
        }
        info!("registered verifying key for shape ({inputs} in, {outputs} out)");
        self.registry.set(inputs, outputs, key);
        Ok(())
    }

    pub fn set_fees(
        &mut self,
        ctx: &CallContext,
        auth: &dyn Authorizer,
        fees: FeeConfig,
    ) -> Result<(), PoolError> {
        if !auth.is_authorized(&ctx.caller) {
            return Err(AuthorizationError::Unauthorized.into());
        }
        info!(
            "fees updated: shield {}bp, unshield {}bp",
            fees.shield_bp, fees.unshield_bp
        );
        self.fees = fees;
        Ok(())
    }

    pub fn set_token_blocked(
        &mut self,
        ctx: &CallContext,
        auth: &dyn Authorizer,
        token_address: [u8; 32],
        blocked: bool,
    ) -> Result<(), PoolError> {
        if !auth.is_authorized(&ctx.caller) {
            return Err(AuthorizationError::Unauthorized.into());
        }
        if blocked {
            self.blocked_tokens.insert(token_address);
        } else {
            self.blocked_tokens.remove(&token_address);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Shield
    // ------------------------------------------------------------------

    /// Deposit public value as shielded notes, atomically over the batch.
    pub fn shield(
        &mut self,
        ctx: &CallContext,
        requests: &[ShieldRequest],
        tokens: &mut dyn TokenAdapter,
    ) -> Result<ShieldOutcome, PoolError> {
        let mut movements = Vec::with_capacity(requests.len() * 2);
        let mut preimages = Vec::with_capacity(requests.len());
        let mut commitments = Vec::with_capacity(requests.len());
        let mut ciphertexts = Vec::with_capacity(requests.len());
        let mut total_fee = 0u128;

        for request in requests {
            let preimage = &request.preimage;
            if self.blocked_tokens.contains(&preimage.token.address) {
                return Err(AuthorizationError::TokenBlocked.into());
            }
            if preimage.value == 0 {
                return Err(FormatError::ZeroValue.into());
            }
            if !is_canonical_field_bytes(&preimage.npk) {
                return Err(FormatError::OutOfField.into());
            }

            let (base, fee) = fees::split_inclusive(preimage.value, self.fees.shield_bp);
            if base == 0 {
                return Err(FormatError::ZeroValue.into());
            }

            movements.push(TokenMovement {
                kind: MovementKind::PullIn,
                counterparty: ctx.caller,
                token: preimage.token,
                value: preimage.value,
            });
            if fee > 0 {
                movements.push(TokenMovement {
                    kind: MovementKind::PushOut,
                    counterparty: self.fees.recipient,
                    token: preimage.token,
                    value: fee,
                });
            }
            total_fee += u128::from(fee);

            let adjusted = CommitmentPreimage {
                value: base,
                ..*preimage
            };
            commitments.push(adjusted.commitment());
            preimages.push(adjusted);
            ciphertexts.push(request.ciphertext.clone());
        }

        // Full external transfer semantics: everything moves or nothing does.
        tokens.execute(&movements)?;

        let (tree_number, start_index) = self.state.insert_commitments(&commitments)?;

        let mut diff = BatchDiff::default();
        for (offset, commitment) in commitments.iter().enumerate() {
            diff.commitments.push((
                tree_number,
                start_index + offset as u64,
                *commitment,
                ciphertexts[offset].to_bytes(),
            ));
        }
        if !commitments.is_empty() {
            diff.roots.push((tree_number, self.state.root()));
            info!(
                "shield: {} notes into tree {tree_number} at index {start_index}, fee {total_fee}",
                commitments.len()
            );
            self.events.push(PoolEvent::ShieldBatch(ShieldBatchEvent {
                tree_number,
                start_index,
                preimages,
                ciphertexts,
            }));
        }

        Ok(ShieldOutcome {
            tree_number,
            start_index,
            total_fee,
            diff,
        })
    }

    // ------------------------------------------------------------------
    // Transact
    // ------------------------------------------------------------------

    /// Apply a batch of proven transfers/unshields, atomically.
    pub fn transact(
        &mut self,
        ctx: &CallContext,
        transactions: &[Transaction],
        gas_price: u64,
        tokens: &mut dyn TokenAdapter,
    ) -> Result<TransactOutcome, PoolError> {
        let plan = self.plan_transact(ctx, transactions, gas_price, ProofCheck::Enforce)?;
        self.apply_transact(plan, tokens)
    }

    /// Run a transact batch, then follow-up work that may only re-enter the
    /// engine itself. A relay inside a relay is rejected.
    pub fn relay<F>(
        &mut self,
        ctx: &CallContext,
        transactions: &[Transaction],
        gas_price: u64,
        tokens: &mut dyn TokenAdapter,
        follow_up: F,
    ) -> Result<TransactOutcome, PoolError>
    where
        F: FnOnce(&mut Self) -> Result<(), PoolError>,
    {
        if self.relay_in_progress {
            return Err(AuthorizationError::ReentrantCall.into());
        }
        self.relay_in_progress = true;
        let result = self
            .transact(ctx, transactions, gas_price, tokens)
            .and_then(|outcome| {
                follow_up(self)?;
                Ok(outcome)
            });
        self.relay_in_progress = false;
        result
    }

    /// Simulation-only validation for cost estimation.
    ///
    /// Runs every structural check but skips the pairing check and, taking
    /// `&self`, cannot commit anything. Never called from the value-moving
    /// paths.
    pub fn estimate(
        &self,
        ctx: &CallContext,
        transactions: &[Transaction],
        gas_price: u64,
    ) -> Result<EstimateReport, PoolError> {
        let plan = self.plan_transact(ctx, transactions, gas_price, ProofCheck::SkipForEstimate)?;
        Ok(EstimateReport {
            transactions: transactions.len(),
            spent_nullifiers: plan.nullifiers.len(),
            inserted_commitments: plan.inserted.len(),
            unshields: plan.unshields,
        })
    }

    /// Validate a batch against current state without mutating anything.
    fn plan_transact(
        &self,
        ctx: &CallContext,
        transactions: &[Transaction],
        gas_price: u64,
        check: ProofCheck,
    ) -> Result<TransactPlan, PoolError> {
        let mut plan = TransactPlan::default();
        let mut seen_in_batch: HashSet<Nullifier> = HashSet::new();

        for tx in transactions {
            let (inputs, outputs) = tx.shape();
            let vk = self.registry.get(inputs, outputs)?;

            if !is_canonical_field_bytes(&tx.merkle_root) {
                return Err(FormatError::OutOfField.into());
            }
            for nullifier in &tx.nullifiers {
                if !is_canonical_field_bytes(&nullifier.0) {
                    return Err(FormatError::OutOfField.into());
                }
            }
            for commitment in &tx.commitments {
                if !is_canonical_field_bytes(&commitment.0) {
                    return Err(FormatError::OutOfField.into());
                }
            }

            let tree = tx.bound_params.tree_number;
            if !self.state.is_known_root(tree, &tx.merkle_root) {
                return Err(StateError::UnknownRoot { tree }.into());
            }
            if tx.bound_params.min_gas_price > gas_price {
                return Err(StateError::GasPriceBelowMinimum {
                    declared: tx.bound_params.min_gas_price,
                    actual: gas_price,
                }
                .into());
            }
            if tx.bound_params.adapt_contract != [0u8; 32]
                && ctx.caller != tx.bound_params.adapt_contract
            {
                return Err(AuthorizationError::AdaptContractMismatch.into());
            }

            // Freshness across prior batches and within this one.
            for nullifier in &tx.nullifiers {
                if self.state.nullifier_seen(nullifier) || !seen_in_batch.insert(*nullifier) {
                    return Err(StateError::NullifierSeen.into());
                }
            }

            let mut inserted = tx.commitments.clone();
            if tx.has_unshield() {
                let unshield_commitment = inserted
                    .pop()
                    .ok_or(FormatError::UnshieldPreimageMismatch)?;
                if tx.unshield_preimage.commitment() != unshield_commitment {
                    return Err(FormatError::UnshieldPreimageMismatch.into());
                }

                let mut destination = tx.unshield_preimage.npk;
                if let Some(redirect) = tx.override_output {
                    // Only the declared recipient may redirect, and only
                    // when the transaction opted into Redirect mode.
                    if tx.bound_params.unshield != UnshieldMode::Redirect
                        || ctx.caller != tx.unshield_preimage.npk
                    {
                        return Err(AuthorizationError::UnauthorizedOverride.into());
                    }
                    destination = redirect;
                }

                let (base, fee) =
                    fees::split_inclusive(tx.unshield_preimage.value, self.fees.unshield_bp);
                plan.movements.push(TokenMovement {
                    kind: MovementKind::PushOut,
                    counterparty: destination,
                    token: tx.unshield_preimage.token,
                    value: base,
                });
                if fee > 0 {
                    plan.movements.push(TokenMovement {
                        kind: MovementKind::PushOut,
                        counterparty: self.fees.recipient,
                        token: tx.unshield_preimage.token,
                        value: fee,
                    });
                }
                plan.unshields += 1;
            } else if tx.override_output.is_some() {
                return Err(AuthorizationError::UnauthorizedOverride.into());
            }

            if tx.bound_params.ciphertexts.len() != inserted.len() {
                return Err(FormatError::CiphertextCountMismatch {
                    ciphertexts: tx.bound_params.ciphertexts.len(),
                    commitments: inserted.len(),
                }
                .into());
            }

            match check {
                ProofCheck::Enforce => veil_verifier::verify(vk, &tx.proof, tx.public_input())?,
                ProofCheck::SkipForEstimate => {}
            }

            plan.nullifiers.extend(tx.nullifiers.iter().copied());
            plan.nullifiers_by_tree
                .entry(tree)
                .or_default()
                .extend(tx.nullifiers.iter().copied());
            plan.inserted.extend(inserted);
            plan.ciphertexts
                .extend(tx.bound_params.ciphertexts.iter().cloned());
        }

        // The combined insertion must fit one instance, so apply cannot fail
        // after nullifiers are spent.
        let capacity = 1u64 << self.state.depth();
        if plan.inserted.len() as u64 > capacity {
            return Err(FormatError::BatchTooLarge {
                batch: plan.inserted.len(),
                capacity,
            }
            .into());
        }

        Ok(plan)
    }

    fn apply_transact(
        &mut self,
        plan: TransactPlan,
        tokens: &mut dyn TokenAdapter,
    ) -> Result<TransactOutcome, PoolError> {
        // External movements first; their failure leaves state untouched.
        tokens.execute(&plan.movements)?;

        let mut diff = BatchDiff::default();
        for nullifier in &plan.nullifiers {
            self.state.spend_nullifier(*nullifier)?;
            diff.nullifiers.push(*nullifier);
        }

        let (tree_number, start_index) = self.state.insert_commitments(&plan.inserted)?;
        for (offset, commitment) in plan.inserted.iter().enumerate() {
            diff.commitments.push((
                tree_number,
                start_index + offset as u64,
                *commitment,
                plan.ciphertexts[offset].to_bytes(),
            ));
        }
        if !plan.inserted.is_empty() {
            diff.roots.push((tree_number, self.state.root()));
            self.events.push(PoolEvent::TransactBatch(TransactBatchEvent {
                tree_number,
                start_index,
                commitments: plan.inserted.clone(),
                ciphertexts: plan.ciphertexts.clone(),
            }));
        }
        for (tree, nullifiers) in plan.nullifiers_by_tree {
            self.events.push(PoolEvent::NullifierBatch(NullifierBatchEvent {
                tree_number: tree,
                nullifiers,
            }));
        }

        info!(
            "transact: {} nullifiers spent, {} commitments inserted into tree {tree_number}, {} unshields",
            plan.nullifiers.len(),
            plan.inserted.len(),
            plan.unshields
        );

        Ok(TransactOutcome {
            tree_number,
            start_index,
            inserted: plan.inserted.len(),
            diff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransferError;
    use veil_privacy::TokenData;

    struct AllowAll;
    impl Authorizer for AllowAll {
        fn is_authorized(&self, _caller: &[u8; 32]) -> bool {
            true
        }
    }

    struct DenyAll;
    impl Authorizer for DenyAll {
        fn is_authorized(&self, _caller: &[u8; 32]) -> bool {
            false
        }
    }

    struct NullAdapter;
    impl TokenAdapter for NullAdapter {
        fn execute(&mut self, _movements: &[TokenMovement]) -> Result<(), TransferError> {
            Ok(())
        }
    }

    fn ctx() -> CallContext {
        CallContext { caller: [7u8; 32] }
    }

    fn shield_request(value: u64) -> ShieldRequest {
        ShieldRequest {
            preimage: CommitmentPreimage {
                npk: [0u8; 32],
                token: TokenData::fungible([0xaa; 32]),
                value,
            },
            ciphertext: veil_privacy::encrypt_shield_note(&[1u8; 32], &[9u8; 32]),
        }
    }

    #[test]
    fn governance_requires_authorization() {
        let mut engine = PoolEngine::new(4, FeeConfig::disabled());
        let fees = FeeConfig::disabled();

        let err = engine.set_fees(&ctx(), &DenyAll, fees).unwrap_err();
        assert!(matches!(
            err,
            PoolError::Authorization(AuthorizationError::Unauthorized)
        ));
        engine.set_fees(&ctx(), &AllowAll, fees).unwrap();
    }

    #[test]
    fn blocked_token_rejects_shield() {
        let mut engine = PoolEngine::new(4, FeeConfig::disabled());
        engine
            .set_token_blocked(&ctx(), &AllowAll, [0xaa; 32], true)
            .unwrap();

        let err = engine
            .shield(&ctx(), &[shield_request(100)], &mut NullAdapter)
            .unwrap_err();
        assert!(matches!(
            err,
            PoolError::Authorization(AuthorizationError::TokenBlocked)
        ));

        // unblock and retry
        engine
            .set_token_blocked(&ctx(), &AllowAll, [0xaa; 32], false)
            .unwrap();
        engine
            .shield(&ctx(), &[shield_request(100)], &mut NullAdapter)
            .unwrap();
    }

    #[test]
    fn zero_value_shield_rejected() {
        let mut engine = PoolEngine::new(4, FeeConfig::disabled());
        let err = engine
            .shield(&ctx(), &[shield_request(0)], &mut NullAdapter)
            .unwrap_err();
        assert!(matches!(err, PoolError::Format(FormatError::ZeroValue)));
    }

    #[test]
    fn failed_token_pull_leaves_state_untouched() {
        struct FailingAdapter;
        impl TokenAdapter for FailingAdapter {
            fn execute(&mut self, _movements: &[TokenMovement]) -> Result<(), TransferError> {
                Err(TransferError::InsufficientBalance)
            }
        }

        let mut engine = PoolEngine::new(4, FeeConfig::disabled());
        let err = engine
            .shield(&ctx(), &[shield_request(100)], &mut FailingAdapter)
            .unwrap_err();
        assert!(matches!(err, PoolError::Transfer(_)));
        assert_eq!(engine.state().total_leaves(), 0);
        assert!(engine.events().is_empty());
    }

    #[test]
    fn relay_rejects_reentry() {
        let mut engine = PoolEngine::new(4, FeeConfig::disabled());

        // follow-up may self-invoke (a shield here)...
        engine
            .relay(&ctx(), &[], 1, &mut NullAdapter, |inner| {
                inner
                    .shield(&ctx(), &[shield_request(50)], &mut NullAdapter)
                    .map(|_| ())
            })
            .unwrap();
        assert_eq!(engine.state().total_leaves(), 1);

        // ...but a relay inside a relay is refused
        let err = engine
            .relay(&ctx(), &[], 1, &mut NullAdapter, |inner| {
                inner
                    .relay(&ctx(), &[], 1, &mut NullAdapter, |_| Ok(()))
                    .map(|_| ())
            })
            .unwrap_err();
        assert!(matches!(
            err,
            PoolError::Authorization(AuthorizationError::ReentrantCall)
        ));

        // flag cleared afterwards
        engine
            .relay(&ctx(), &[], 1, &mut NullAdapter, |_| Ok(()))
            .unwrap();
    }

    #[test]
    fn unconfigured_shape_fails_closed() {
        let engine = PoolEngine::new(4, FeeConfig::disabled());
        // estimate shares the structural path, so it hits the registry too
        let tx = crate::transact::Transaction {
            proof: veil_verifier::Proof {
                a: veil_verifier::G1Point {
                    x: [0u8; 32],
                    y: [0u8; 32],
                },
                b: veil_verifier::G2Point {
                    x: [[0u8; 32]; 2],
                    y: [[0u8; 32]; 2],
                },
                c: veil_verifier::G1Point {
                    x: [0u8; 32],
                    y: [0u8; 32],
                },
            },
            merkle_root: engine.state().root(),
            nullifiers: vec![Nullifier([1u8; 32])],
            commitments: vec![Commitment([2u8; 32])],
            bound_params: crate::transact::BoundParams {
                tree_number: 0,
                min_gas_price: 0,
                unshield: UnshieldMode::None,
                adapt_contract: [0u8; 32],
                adapt_params: [0u8; 32],
                ciphertexts: vec![],
            },
            unshield_preimage: CommitmentPreimage {
                npk: [0u8; 32],
                token: TokenData::fungible([0u8; 32]),
                value: 0,
            },
            override_output: None,
        };

        let err = engine.estimate(&ctx(), &[tx], 1).unwrap_err();
        assert!(matches!(
            err,
            PoolError::State(StateError::ShapeNotConfigured {
                inputs: 1,
                outputs: 1
            })
        ));
    }
}
