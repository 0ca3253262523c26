//! Poseidon hashing over the BN254 scalar field.
//!
//! One shared sponge configuration is used for every hash in the protocol:
//! rate 2, capacity 1, 8 full / 56 partial rounds, alpha 5. Domain tags keep
//! the individual derivations (nullifying key, note public key, nullifier,
//! merkle node) from colliding with each other.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use ark_ff::{BigInteger, PrimeField};
use std::sync::OnceLock;

static CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

/// Shared Poseidon configuration, computed once.
///
/// Parameter generation is deterministic but not cheap, so the config is
/// cached for the process lifetime.
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    CONFIG.get_or_init(|| {
        let full_rounds: usize = 8;
        let partial_rounds: usize = 56;
        let alpha: u64 = 5;
        let rate: usize = 2;
        let capacity: usize = 1;

        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            Fr::MODULUS_BIT_SIZE as u64,
            rate,
            full_rounds as u64,
            partial_rounds as u64,
            0,
        );

        PoseidonConfig::new(full_rounds, partial_rounds, alpha, mds, ark, rate, capacity)
    })
}

/// Hash a sequence of field elements into one.
pub fn hash_fields(inputs: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::new(poseidon_config());
    for input in inputs {
        sponge.absorb(input);
    }
    let out: Fr = sponge.squeeze_field_elements(1)[0];
    out
}

/// Canonical little-endian encoding of a field element (32 bytes).
pub fn field_to_bytes(f: Fr) -> [u8; 32] {
    let bytes = f.into_bigint().to_bytes_le();
    let mut arr = [0u8; 32];
    arr[..bytes.len()].copy_from_slice(&bytes);
    arr
}

/// Interpret 32 bytes as a field element, reducing mod the field order.
pub fn bytes_to_field(bytes: &[u8; 32]) -> Fr {
    Fr::from_le_bytes_mod_order(bytes)
}

/// Interpret a domain-separation tag as a field element.
pub fn domain_tag(tag: &[u8]) -> Fr {
    Fr::from_le_bytes_mod_order(tag)
}

/// Check that 32 bytes are the canonical encoding of a field element,
/// i.e. strictly below the field modulus.
pub fn is_canonical_field_bytes(bytes: &[u8; 32]) -> bool {
    let reduced = Fr::from_le_bytes_mod_order(bytes);
    field_to_bytes(reduced) == *bytes
}
