#![allow(dead_code)] // helpers shared unevenly across integration test files

use std::collections::HashMap;

use ark_bn254::Bn254;
use ark_groth16::ProvingKey;
use rand::rngs::OsRng;

use veil_core::{
    Authorizer, BoundParams, CallContext, FeeConfig, MovementKind, PoolEngine, ShieldRequest,
    TokenAdapter, TokenMovement, Transaction, TransferError, UnshieldMode,
};
use veil_privacy::{
    Commitment, CommitmentPreimage, NoteCiphertext, Nullifier, ShieldCiphertext, TokenData,
};
use veil_verifier::fixtures;

/// The pool's own account in the mock ledger.
pub const POOL_ACCOUNT: [u8; 32] = [0xee; 32];

/// Governance stub that authorizes everyone.
pub struct Gov;

impl Authorizer for Gov {
    fn is_authorized(&self, _caller: &[u8; 32]) -> bool {
        true
    }
}

/// In-memory public token ledger with all-or-nothing batch semantics.
pub struct MockLedger {
    balances: HashMap<([u8; 32], [u8; 32]), u64>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    pub fn credit(&mut self, account: [u8; 32], token: [u8; 32], value: u64) {
        *self.balances.entry((account, token)).or_insert(0) += value;
    }

    pub fn balance(&self, account: [u8; 32], token: [u8; 32]) -> u64 {
        self.balances.get(&(account, token)).copied().unwrap_or(0)
    }
}

impl TokenAdapter for MockLedger {
    fn execute(&mut self, movements: &[TokenMovement]) -> Result<(), TransferError> {
        let mut staged = self.balances.clone();
        for movement in movements {
            match movement.kind {
                MovementKind::PullIn => {
                    let from = staged
                        .entry((movement.counterparty, movement.token.address))
                        .or_insert(0);
                    if *from < movement.value {
                        return Err(TransferError::InsufficientBalance);
                    }
                    *from -= movement.value;
                    *staged
                        .entry((POOL_ACCOUNT, movement.token.address))
                        .or_insert(0) += movement.value;
                }
                MovementKind::PushOut => {
                    let pool = staged
                        .entry((POOL_ACCOUNT, movement.token.address))
                        .or_insert(0);
                    if *pool < movement.value {
                        return Err(TransferError::Failed("pool underfunded".into()));
                    }
                    *pool -= movement.value;
                    *staged
                        .entry((movement.counterparty, movement.token.address))
                        .or_insert(0) += movement.value;
                }
            }
        }
        self.balances = staged;
        Ok(())
    }
}

/// Engine + fixture proving key + mock ledger, wired together.
pub struct TestPool {
    pub engine: PoolEngine,
    pub prover_pk: ProvingKey<Bn254>,
    pub ledger: MockLedger,
}

/// Build a pool with the fixture verifying key registered for each shape.
pub fn setup_pool(depth: usize, fees: FeeConfig, shapes: &[(usize, usize)]) -> TestPool {
    let mut rng = OsRng;
    let (prover_pk, vk) = fixtures::generate_keys(&mut rng);

    let mut engine = PoolEngine::new(depth, fees);
    let gov_ctx = CallContext { caller: [1u8; 32] };
    for (inputs, outputs) in shapes {
        engine
            .register_verifying_key(&gov_ctx, &Gov, *inputs, *outputs, vk.clone())
            .expect("register fixture key");
    }

    TestPool {
        engine,
        prover_pk,
        ledger: MockLedger::new(),
    }
}

pub fn ctx(caller: [u8; 32]) -> CallContext {
    CallContext { caller }
}

pub fn fungible(address_byte: u8) -> TokenData {
    TokenData::fungible([address_byte; 32])
}

pub fn empty_preimage() -> CommitmentPreimage {
    CommitmentPreimage {
        npk: [0u8; 32],
        token: TokenData::fungible([0u8; 32]),
        value: 0,
    }
}

pub fn shield_request(npk: [u8; 32], token: TokenData, value: u64) -> ShieldRequest {
    ShieldRequest {
        preimage: CommitmentPreimage { npk, token, value },
        ciphertext: veil_privacy::encrypt_shield_note(&[7u8; 32], &[9u8; 32]),
    }
}

pub fn dummy_note_ciphertext(seed: u8) -> NoteCiphertext {
    NoteCiphertext {
        blinded_sender_pk: [seed; 32],
        blinded_receiver_pk: [seed.wrapping_add(1); 32],
        nonce: [seed; 12],
        body: vec![seed; 40],
    }
}

pub fn dummy_shield_ciphertext() -> ShieldCiphertext {
    veil_privacy::encrypt_shield_note(&[3u8; 32], &[5u8; 32])
}

/// Everything a test wants to vary about a transaction; the rest is filled
/// with working defaults.
pub struct TxSpec {
    pub tree: u32,
    /// Root to reference; defaults to the instance's current root
    pub root: Option<[u8; 32]>,
    pub nullifiers: Vec<Nullifier>,
    /// Output commitments that get inserted
    pub outputs: Vec<Commitment>,
    pub unshield: Option<(CommitmentPreimage, UnshieldMode)>,
    pub override_output: Option<[u8; 32]>,
    pub min_gas_price: u64,
    pub adapt_contract: [u8; 32],
}

impl Default for TxSpec {
    fn default() -> Self {
        Self {
            tree: 0,
            root: None,
            nullifiers: Vec::new(),
            outputs: Vec::new(),
            unshield: None,
            override_output: None,
            min_gas_price: 0,
            adapt_contract: [0u8; 32],
        }
    }
}

/// Assemble and prove a transaction against the current engine state.
pub fn build_tx(engine: &PoolEngine, prover_pk: &ProvingKey<Bn254>, spec: TxSpec) -> Transaction {
    let root = spec.root.unwrap_or_else(|| {
        engine
            .state()
            .accumulator()
            .history(spec.tree)
            .and_then(|h| h.current().copied())
            .expect("tree instance exists")
    });

    let mut commitments = spec.outputs.clone();
    let (unshield_preimage, unshield_mode) = match spec.unshield {
        Some((preimage, mode)) => {
            commitments.push(preimage.commitment());
            (preimage, mode)
        }
        None => (empty_preimage(), UnshieldMode::None),
    };

    let ciphertexts = (0..spec.outputs.len())
        .map(|i| dummy_note_ciphertext(i as u8 + 10))
        .collect();

    let mut tx = Transaction {
        // placeholder until the public input exists
        proof: fixtures::prove(prover_pk, ark_bn254::Fr::from(0u64), &mut OsRng),
        merkle_root: root,
        nullifiers: spec.nullifiers,
        commitments,
        bound_params: BoundParams {
            tree_number: spec.tree,
            min_gas_price: spec.min_gas_price,
            unshield: unshield_mode,
            adapt_contract: spec.adapt_contract,
            adapt_params: [0u8; 32],
            ciphertexts,
        },
        unshield_preimage,
        override_output: spec.override_output,
    };

    tx.proof = fixtures::prove(prover_pk, tx.public_input(), &mut OsRng);
    tx
}
