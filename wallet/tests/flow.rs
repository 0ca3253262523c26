//! Full shield → transfer → unshield lifecycle against a real engine.

use std::collections::HashMap;

use ark_bn254::Bn254;
use ark_groth16::ProvingKey;
use rand::rngs::OsRng;

use veil_core::{
    Authorizer, CallContext, FeeConfig, MovementKind, PoolEngine, PoolError, StateError,
    TokenAdapter, TokenMovement, TransferError,
};
use veil_privacy::poseidon::bytes_to_field;
use veil_privacy::{KeyBundle, TokenData};
use veil_verifier::fixtures;
use veil_wallet::{ProvingBackend, ProvingError, ProvingRequest, Wallet};

const DEPTH: usize = 8;
const POOL_ACCOUNT: [u8; 32] = [0xee; 32];
const FEE_RECIPIENT: [u8; 32] = [0xfe; 32];
const DEPOSITOR: [u8; 32] = [0xd0; 32];

struct Gov;
impl Authorizer for Gov {
    fn is_authorized(&self, _caller: &[u8; 32]) -> bool {
        true
    }
}

/// Minimal public token ledger with all-or-nothing batches.
struct MockLedger {
    balances: HashMap<([u8; 32], [u8; 32]), u64>,
}

impl MockLedger {
    fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    fn credit(&mut self, account: [u8; 32], token: [u8; 32], value: u64) {
        *self.balances.entry((account, token)).or_insert(0) += value;
    }

    fn balance(&self, account: [u8; 32], token: [u8; 32]) -> u64 {
        self.balances.get(&(account, token)).copied().unwrap_or(0)
    }
}

impl TokenAdapter for MockLedger {
    fn execute(&mut self, movements: &[TokenMovement]) -> Result<(), TransferError> {
        let mut staged = self.balances.clone();
        for movement in movements {
            let (debit, credit) = match movement.kind {
                MovementKind::PullIn => (movement.counterparty, POOL_ACCOUNT),
                MovementKind::PushOut => (POOL_ACCOUNT, movement.counterparty),
            };
            {
                let from = staged.entry((debit, movement.token.address)).or_insert(0);
                if *from < movement.value {
                    return Err(TransferError::InsufficientBalance);
                }
                *from -= movement.value;
            }
            *staged.entry((credit, movement.token.address)).or_insert(0) += movement.value;
        }
        self.balances = staged;
        Ok(())
    }
}

/// Proving backend built on the fixture binding circuit: the proof commits
/// to the exact public-input scalar the wallet computed.
struct FixtureBackend {
    pk: ProvingKey<Bn254>,
}

impl ProvingBackend for FixtureBackend {
    fn prove(&self, request: &ProvingRequest) -> Result<veil_verifier::Proof, ProvingError> {
        let input = bytes_to_field(&request.public_input);
        Ok(fixtures::prove(&self.pk, input, &mut OsRng))
    }
}

struct Harness {
    engine: PoolEngine,
    ledger: MockLedger,
    backend: FixtureBackend,
}

fn setup(fees: FeeConfig) -> Harness {
    let mut rng = OsRng;
    let (pk, vk) = fixtures::generate_keys(&mut rng);

    let mut engine = PoolEngine::new(DEPTH, fees);
    let gov = CallContext { caller: [1u8; 32] };
    for (inputs, outputs) in [(1, 1), (1, 2), (2, 2)] {
        engine
            .register_verifying_key(&gov, &Gov, inputs, outputs, vk.clone())
            .unwrap();
    }

    Harness {
        engine,
        ledger: MockLedger::new(),
        backend: FixtureBackend { pk },
    }
}

fn token() -> TokenData {
    TokenData::fungible([0xaa; 32])
}

fn ctx(caller: [u8; 32]) -> CallContext {
    CallContext { caller }
}

#[test]
fn shield_batch_scan_recovers_fee_adjusted_notes() {
    let mut rng = OsRng;
    let mut harness = setup(FeeConfig {
        shield_bp: 25,
        unshield_bp: 25,
        recipient: FEE_RECIPIENT,
    });
    harness.ledger.credit(DEPOSITOR, token().address, 100_000);

    let alice = KeyBundle::random(&mut rng);
    let mut wallet = Wallet::new(&alice, DEPTH);

    let value = 10_025u64;
    let requests: Vec<_> = (0..3)
        .map(|_| wallet.create_shield_request(token(), value, &mut rng))
        .collect();
    harness
        .engine
        .shield(&ctx(DEPOSITOR), &requests, &mut harness.ledger)
        .unwrap();

    wallet.sync(harness.engine.events());

    // exactly 3 notes, each worth V minus the per-note fee
    assert_eq!(wallet.notes().count(), 3);
    assert!(wallet.notes().all(|owned| owned.note.value.as_u64() == 10_000));
    assert_eq!(wallet.balance(&token()), 30_000);
    assert_eq!(harness.ledger.balance(FEE_RECIPIENT, token().address), 75);
}

#[test]
fn full_lifecycle_shield_transfer_unshield() {
    let mut rng = OsRng;
    let mut harness = setup(FeeConfig {
        shield_bp: 25,
        unshield_bp: 25,
        recipient: FEE_RECIPIENT,
    });
    harness.ledger.credit(DEPOSITOR, token().address, 100_000);

    let alice = KeyBundle::random(&mut rng);
    let bob = KeyBundle::random(&mut rng);
    let mut alice_wallet = Wallet::new(&alice, DEPTH);
    let mut bob_wallet = Wallet::new(&bob, DEPTH);

    // --- shield ---------------------------------------------------------
    let request = alice_wallet.create_shield_request(token(), 10_025, &mut rng);
    harness
        .engine
        .shield(&ctx(DEPOSITOR), &[request], &mut harness.ledger)
        .unwrap();
    alice_wallet.sync(harness.engine.events());
    assert_eq!(alice_wallet.balance(&token()), 10_000);

    // --- transfer alice → bob -------------------------------------------
    let transfer = alice_wallet
        .build_transfer(
            &bob_wallet.recipient_info(),
            token(),
            3_000,
            0,
            &harness.backend,
            &mut rng,
        )
        .unwrap();
    harness
        .engine
        .transact(&ctx([0x01; 32]), &[transfer.clone()], 1, &mut harness.ledger)
        .unwrap();

    alice_wallet.sync(harness.engine.events());
    bob_wallet.sync(harness.engine.events());

    // intra-pool transfers carry no fee
    assert_eq!(alice_wallet.balance(&token()), 7_000);
    assert_eq!(bob_wallet.balance(&token()), 3_000);

    // the spent input is marked, the change note is live
    assert!(alice_wallet.notes().any(|owned| owned.spent));
    assert!(
        alice_wallet
            .notes()
            .any(|owned| !owned.spent && owned.note.value.as_u64() == 7_000)
    );

    // --- replay is a double spend ---------------------------------------
    let err = harness
        .engine
        .transact(&ctx([0x01; 32]), &[transfer], 1, &mut harness.ledger)
        .unwrap_err();
    assert!(matches!(err, PoolError::State(StateError::NullifierSeen)));

    // --- unshield bob → public address ----------------------------------
    let destination = [0xcc; 32];
    let unshield = bob_wallet
        .build_unshield(
            destination,
            token(),
            1_000,
            false,
            0,
            &harness.backend,
            &mut rng,
        )
        .unwrap();
    harness
        .engine
        .transact(&ctx([0x01; 32]), &[unshield], 1, &mut harness.ledger)
        .unwrap();
    bob_wallet.sync(harness.engine.events());

    // inclusive fee on the unshielded amount: 1000 → 997 + 3
    assert_eq!(harness.ledger.balance(destination, token().address), 997);
    assert_eq!(
        harness.ledger.balance(FEE_RECIPIENT, token().address),
        25 + 3
    );
    assert_eq!(bob_wallet.balance(&token()), 2_000);

    // pool account holds what is still shielded
    assert_eq!(
        harness.ledger.balance(POOL_ACCOUNT, token().address),
        10_000 - 1_000
    );
}

#[test]
fn stale_wallet_root_is_still_spendable() {
    let mut rng = OsRng;
    let mut harness = setup(FeeConfig::disabled());
    harness.ledger.credit(DEPOSITOR, token().address, 100_000);

    let alice = KeyBundle::random(&mut rng);
    let bob = KeyBundle::random(&mut rng);
    let mut alice_wallet = Wallet::new(&alice, DEPTH);
    let bob_info = Wallet::new(&bob, DEPTH).recipient_info();

    let request = alice_wallet.create_shield_request(token(), 5_000, &mut rng);
    harness
        .engine
        .shield(&ctx(DEPOSITOR), &[request], &mut harness.ledger)
        .unwrap();
    alice_wallet.sync(harness.engine.events());

    // build against the current root...
    let transfer = alice_wallet
        .build_transfer(&bob_info, token(), 1_000, 0, &harness.backend, &mut rng)
        .unwrap();

    // ...then let the pool move on before submission
    let request = alice_wallet.create_shield_request(token(), 1_000, &mut rng);
    harness
        .engine
        .shield(&ctx(DEPOSITOR), &[request], &mut harness.ledger)
        .unwrap();
    assert_ne!(harness.engine.state().root(), transfer.merkle_root);

    // the historical root is still accepted
    harness
        .engine
        .transact(&ctx([0x01; 32]), &[transfer], 1, &mut harness.ledger)
        .unwrap();
}
