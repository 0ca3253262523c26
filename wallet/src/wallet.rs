//! Event scanning, note storage, and transaction building.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};
use rand::Rng;

use veil_core::{
    BoundParams, NullifierBatchEvent, PoolEvent, ShieldBatchEvent, ShieldRequest,
    TransactBatchEvent, Transaction, UnshieldMode,
};
use veil_privacy::keys::note_public_key;
use veil_privacy::poseidon::field_to_bytes;
use veil_privacy::{
    Accumulator, Commitment, CommitmentPreimage, KeyBundle, Note, NotePlaintext, NotePosition,
    NoteValue, Nullifier, NullifyingKey, SpendingKey, TokenData, ViewingKey, blind_keys,
    encrypt_shield_note, encrypt_transfer_note, try_decrypt_shield_note,
    try_decrypt_transfer_note,
};
use veil_verifier::{G1Point, G2Point, Proof};

use crate::error::WalletError;
use crate::prover::{
    InputWitness, OutputWitness, ProvingBackend, ProvingRequest, SpendAuthorization,
    authorization_message,
};

/// A note this wallet can see (and, with a spending key, spend).
#[derive(Debug, Clone)]
pub struct OwnedNote {
    pub note: Note,
    pub position: NotePosition,
    pub nullifier: Nullifier,
    pub spent: bool,
}

/// What a sender needs to know about a recipient.
#[derive(Debug, Clone, Copy)]
pub struct RecipientInfo {
    pub master_public_key: [u8; 32],
    pub viewing_public_key: [u8; 32],
}

/// Off-ledger wallet: local mirror of pool state plus owned notes.
pub struct Wallet {
    viewing_key: ViewingKey,
    /// None for watch-only wallets
    spending_key: Option<SpendingKey>,
    master_public_key: [u8; 32],
    nullifying_key: NullifyingKey,
    /// Local mirror of the on-ledger accumulator
    accumulator: Accumulator,
    notes: BTreeMap<(u32, u64), OwnedNote>,
    nullifier_positions: HashMap<Nullifier, (u32, u64)>,
    /// Index into the event log up to which we have scanned
    cursor: usize,
}

impl Wallet {
    /// Full wallet holding both secrets.
    pub fn new(keys: &KeyBundle, depth: usize) -> Self {
        let nullifying_key = keys.nullifying_key();
        Self {
            viewing_key: keys.viewing_key.clone(),
            spending_key: Some(keys.spending_key.clone()),
            master_public_key: keys.master_public_key(),
            nullifying_key,
            accumulator: Accumulator::with_depth(depth),
            notes: BTreeMap::new(),
            nullifier_positions: HashMap::new(),
            cursor: 0,
        }
    }

    /// Viewing-only wallet: detects incoming value and observes spends, but
    /// cannot authorize any.
    pub fn watch_only(
        viewing_key: ViewingKey,
        spending_public_key: [u8; 32],
        depth: usize,
    ) -> Self {
        let nullifying_key = viewing_key.nullifying_key();
        let master_public_key =
            veil_privacy::keys::master_public_key(&spending_public_key, &nullifying_key);
        Self {
            viewing_key,
            spending_key: None,
            master_public_key,
            nullifying_key,
            accumulator: Accumulator::with_depth(depth),
            notes: BTreeMap::new(),
            nullifier_positions: HashMap::new(),
            cursor: 0,
        }
    }

    /// The shielded address others send to.
    pub fn address(&self) -> [u8; 32] {
        self.master_public_key
    }

    /// What a counterparty needs to send this wallet a note.
    pub fn recipient_info(&self) -> RecipientInfo {
        RecipientInfo {
            master_public_key: self.master_public_key,
            viewing_public_key: self.viewing_key.public_key(),
        }
    }

    pub fn notes(&self) -> impl Iterator<Item = &OwnedNote> {
        self.notes.values()
    }

    /// Unspent value held in a token, across all instances.
    pub fn balance(&self, token: &TokenData) -> u64 {
        self.notes
            .values()
            .filter(|owned| !owned.spent && owned.note.token == *token)
            .map(|owned| owned.note.value.as_u64())
            .sum()
    }

    // ------------------------------------------------------------------
    // Scanning
    // ------------------------------------------------------------------

    /// Process the event log from where the last sync stopped.
    pub fn sync(&mut self, events: &[PoolEvent]) {
        let start = self.cursor.min(events.len());
        for event in &events[start..] {
            match event {
                PoolEvent::ShieldBatch(batch) => self.scan_shield(batch),
                PoolEvent::TransactBatch(batch) => self.scan_transact(batch),
                PoolEvent::NullifierBatch(batch) => self.scan_nullifiers(batch),
            }
        }
        self.cursor = events.len();
    }

    fn mirror_insert(&mut self, tree: u32, start: u64, commitments: &[Commitment]) {
        match self.accumulator.insert_batch(commitments) {
            Ok((local_tree, local_start)) if (local_tree, local_start) == (tree, start) => {}
            Ok((local_tree, local_start)) => warn!(
                "mirror out of sync: event at ({tree},{start}), local at ({local_tree},{local_start})"
            ),
            Err(err) => warn!("mirror insert failed: {err}"),
        }
    }

    fn scan_shield(&mut self, event: &ShieldBatchEvent) {
        let commitments: Vec<Commitment> =
            event.preimages.iter().map(|p| p.commitment()).collect();
        self.mirror_insert(event.tree_number, event.start_index, &commitments);

        for (offset, (preimage, ciphertext)) in
            event.preimages.iter().zip(&event.ciphertexts).enumerate()
        {
            let Some(random) = try_decrypt_shield_note(ciphertext, &self.viewing_key) else {
                continue;
            };
            // decryptable but not addressed to us (or npk forged)
            if note_public_key(&self.master_public_key, &random) != preimage.npk {
                continue;
            }
            let position = NotePosition {
                tree: event.tree_number,
                index: event.start_index + offset as u64,
            };
            let note = Note {
                npk: preimage.npk,
                token: preimage.token,
                value: NoteValue(preimage.value),
                random,
                position: Some(position),
            };
            self.store_note(note, position);
        }
    }

    fn scan_transact(&mut self, event: &TransactBatchEvent) {
        self.mirror_insert(event.tree_number, event.start_index, &event.commitments);

        for (offset, (commitment, ciphertext)) in
            event.commitments.iter().zip(&event.ciphertexts).enumerate()
        {
            let Some(plain) = try_decrypt_transfer_note(ciphertext, &self.viewing_key) else {
                continue;
            };
            let note = Note::with_random(
                &self.master_public_key,
                plain.token,
                plain.value,
                plain.random,
            );
            // a decrypt that does not reproduce the published commitment is
            // not a note we own (e.g. our own outgoing note to someone else)
            if note.commitment() != *commitment {
                continue;
            }
            let position = NotePosition {
                tree: event.tree_number,
                index: event.start_index + offset as u64,
            };
            self.store_note(note.with_position(position), position);
        }
    }

    fn scan_nullifiers(&mut self, event: &NullifierBatchEvent) {
        for nullifier in &event.nullifiers {
            if let Some(key) = self.nullifier_positions.get(nullifier)
                && let Some(owned) = self.notes.get_mut(key)
            {
                owned.spent = true;
                debug!("note at tree {} index {} spent", key.0, key.1);
            }
        }
    }

    fn store_note(&mut self, note: Note, position: NotePosition) {
        let nullifier = Nullifier::derive(
            &self.nullifying_key,
            position.global_index(self.accumulator.depth()),
        );
        debug!(
            "recovered note worth {} at tree {} index {}",
            note.value.as_u64(),
            position.tree,
            position.index
        );
        self.nullifier_positions
            .insert(nullifier, (position.tree, position.index));
        self.notes.insert(
            (position.tree, position.index),
            OwnedNote {
                note,
                position,
                nullifier,
                spent: false,
            },
        );
    }

    // ------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------

    /// Deposit request for this wallet's own address.
    pub fn create_shield_request<R: Rng>(
        &self,
        token: TokenData,
        value: u64,
        rng: &mut R,
    ) -> ShieldRequest {
        let mut random = [0u8; 32];
        rng.fill_bytes(&mut random);
        ShieldRequest {
            preimage: CommitmentPreimage {
                npk: note_public_key(&self.master_public_key, &random),
                token,
                value,
            },
            ciphertext: encrypt_shield_note(&random, &self.viewing_key.public_key()),
        }
    }

    /// Build a proven intra-pool transfer.
    pub fn build_transfer<R: Rng>(
        &self,
        recipient: &RecipientInfo,
        token: TokenData,
        amount: u64,
        min_gas_price: u64,
        backend: &dyn ProvingBackend,
        rng: &mut R,
    ) -> Result<Transaction, WalletError> {
        let selection = self.select_inputs(&token, amount)?;

        let mut outputs = vec![Note::new(&recipient.master_public_key, token, amount, rng)];
        let change = selection.total - amount;
        if change > 0 {
            outputs.push(Note::new(&self.master_public_key, token, change, rng));
        }
        let receiver_keys: Vec<[u8; 32]> = {
            let mut keys = vec![recipient.viewing_public_key];
            if change > 0 {
                keys.push(self.viewing_key.public_key());
            }
            keys
        };

        self.assemble(
            selection,
            outputs,
            receiver_keys,
            UnshieldMode::None,
            None,
            min_gas_price,
            backend,
            rng,
        )
    }

    /// Build a proven unshield back to a public address.
    pub fn build_unshield<R: Rng>(
        &self,
        destination: [u8; 32],
        token: TokenData,
        amount: u64,
        redirectable: bool,
        min_gas_price: u64,
        backend: &dyn ProvingBackend,
        rng: &mut R,
    ) -> Result<Transaction, WalletError> {
        let selection = self.select_inputs(&token, amount)?;

        let mut outputs = Vec::new();
        let mut receiver_keys = Vec::new();
        let change = selection.total - amount;
        if change > 0 {
            outputs.push(Note::new(&self.master_public_key, token, change, rng));
            receiver_keys.push(self.viewing_key.public_key());
        }

        let mode = if redirectable {
            UnshieldMode::Redirect
        } else {
            UnshieldMode::Normal
        };
        let preimage = CommitmentPreimage {
            npk: destination,
            token,
            value: amount,
        };

        self.assemble(
            selection,
            outputs,
            receiver_keys,
            mode,
            Some(preimage),
            min_gas_price,
            backend,
            rng,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble<R: Rng>(
        &self,
        selection: InputSelection<'_>,
        output_notes: Vec<Note>,
        receiver_viewing_keys: Vec<[u8; 32]>,
        unshield: UnshieldMode,
        unshield_preimage: Option<CommitmentPreimage>,
        min_gas_price: u64,
        backend: &dyn ProvingBackend,
        rng: &mut R,
    ) -> Result<Transaction, WalletError> {
        let spending_key = self.spending_key.as_ref().ok_or(WalletError::WatchOnly)?;
        let tree = selection.tree;

        let sender_viewing_pk = self.viewing_key.public_key();
        let mut ciphertexts = Vec::with_capacity(output_notes.len());
        for (note, receiver_pk) in output_notes.iter().zip(&receiver_viewing_keys) {
            let mut sender_random = [0u8; 32];
            rng.fill_bytes(&mut sender_random);
            let blinded = blind_keys(&sender_viewing_pk, receiver_pk, &note.random, &sender_random);
            let plaintext = NotePlaintext {
                random: note.random,
                value: note.value.as_u64(),
                token: note.token,
                memo: Vec::new(),
            };
            ciphertexts.push(encrypt_transfer_note(&plaintext, &self.viewing_key, &blinded));
        }

        let mut commitments: Vec<Commitment> =
            output_notes.iter().map(Note::commitment).collect();
        if let Some(preimage) = &unshield_preimage {
            commitments.push(preimage.commitment());
        }
        let nullifiers: Vec<Nullifier> =
            selection.inputs.iter().map(|owned| owned.nullifier).collect();

        let merkle_root = self
            .accumulator
            .history(tree)
            .and_then(|history| history.current().copied())
            .ok_or(WalletError::NoSyncedRoot { tree })?;

        let mut tx = Transaction {
            proof: zero_proof(),
            merkle_root,
            nullifiers,
            commitments,
            bound_params: BoundParams {
                tree_number: tree,
                min_gas_price,
                unshield,
                adapt_contract: [0u8; 32],
                adapt_params: [0u8; 32],
                ciphertexts: ciphertexts.clone(),
            },
            unshield_preimage: unshield_preimage.unwrap_or(CommitmentPreimage {
                npk: [0u8; 32],
                token: TokenData::fungible([0u8; 32]),
                value: 0,
            }),
            override_output: None,
        };

        let bound_params_hash = field_to_bytes(tx.bound_params.hash());
        let message = authorization_message(
            &tx.merkle_root,
            &bound_params_hash,
            &tx.nullifiers,
            &tx.commitments,
        );

        let inputs = selection
            .inputs
            .iter()
            .map(|owned| {
                Ok(InputWitness {
                    note: owned.note.clone(),
                    merkle_proof: self.accumulator.proof(tree, owned.position.index)?,
                    nullifier: owned.nullifier,
                })
            })
            .collect::<Result<Vec<_>, WalletError>>()?;

        let request = ProvingRequest {
            shape: (tx.nullifiers.len(), tx.commitments.len()),
            merkle_root: tx.merkle_root,
            bound_params_hash,
            public_input: field_to_bytes(tx.public_input()),
            inputs,
            outputs: output_notes
                .into_iter()
                .zip(ciphertexts)
                .map(|(note, ciphertext)| OutputWitness { note, ciphertext })
                .collect(),
            authorization: SpendAuthorization {
                signer: spending_key.public_key(),
                signature: spending_key.sign(&message),
            },
        };

        tx.proof = backend.prove(&request)?;
        Ok(tx)
    }

    /// Pick unspent notes covering `amount` within one tree instance
    /// (inputs cannot mix instances: the proof binds a single root).
    fn select_inputs(&self, token: &TokenData, amount: u64) -> Result<InputSelection<'_>, WalletError> {
        if amount == 0 {
            return Err(WalletError::ZeroValue);
        }

        let mut by_tree: BTreeMap<u32, Vec<&OwnedNote>> = BTreeMap::new();
        for owned in self
            .notes
            .values()
            .filter(|owned| !owned.spent && owned.note.token == *token)
        {
            by_tree.entry(owned.position.tree).or_default().push(owned);
        }

        let mut best_available = 0u64;
        for (tree, mut candidates) in by_tree {
            candidates.sort_by_key(|owned| std::cmp::Reverse(owned.note.value));
            let mut picked = Vec::new();
            let mut total = 0u64;
            for owned in candidates {
                if total >= amount {
                    break;
                }
                total += owned.note.value.as_u64();
                picked.push(owned);
            }
            if total >= amount {
                return Ok(InputSelection {
                    tree,
                    inputs: picked,
                    total,
                });
            }
            best_available = best_available.max(total);
        }

        Err(WalletError::InsufficientFunds {
            needed: amount,
            available: best_available,
        })
    }
}

struct InputSelection<'a> {
    tree: u32,
    inputs: Vec<&'a OwnedNote>,
    total: u64,
}

fn zero_proof() -> Proof {
    Proof {
        a: G1Point {
            x: [0u8; 32],
            y: [0u8; 32],
        },
        b: G2Point {
            x: [[0u8; 32]; 2],
            y: [[0u8; 32]; 2],
        },
        c: G1Point {
            x: [0u8; 32],
            y: [0u8; 32],
        },
    }
}
