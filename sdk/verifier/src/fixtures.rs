//! Test-support proving fixtures (feature `fixtures`).
//!
//! A minimal circuit whose only statement is "I know the public input",
//! plus key generation and proving around it. Downstream crates use it to
//! exercise the real pairing verification without the production circuit:
//! proofs bind to the exact public scalar, so a mismatched transaction hash
//! still fails.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, RngCore};

use crate::key::VerifyingKey;
use crate::proof::Proof;

/// Relation: the private witness equals the lone public input.
#[derive(Clone)]
pub struct BindingCircuit {
    pub public: Option<Fr>,
    pub witness: Option<Fr>,
}

impl ConstraintSynthesizer<Fr> for BindingCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        use ark_r1cs_std::{alloc::AllocVar, eq::EqGadget, fields::fp::FpVar};

        let public = FpVar::new_input(cs.clone(), || {
            self.public.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let witness = FpVar::new_witness(cs, || {
            self.witness.ok_or(SynthesisError::AssignmentMissing)
        })?;
        public.enforce_equal(&witness)
    }
}

/// Run the trusted setup for the binding circuit.
pub fn generate_keys<R: RngCore + CryptoRng>(rng: &mut R) -> (ProvingKey<Bn254>, VerifyingKey) {
    let blank = BindingCircuit {
        public: None,
        witness: None,
    };
    let (pk, ark_vk) =
        Groth16::<Bn254>::circuit_specific_setup(blank, rng).expect("fixture setup");
    let vk = VerifyingKey::try_from(ark_vk).expect("binding circuit has one public input");
    (pk, vk)
}

/// Prove knowledge of `public_input`.
pub fn prove<R: RngCore + CryptoRng>(
    pk: &ProvingKey<Bn254>,
    public_input: Fr,
    rng: &mut R,
) -> Proof {
    let assigned = BindingCircuit {
        public: Some(public_input),
        witness: Some(public_input),
    };
    let ark_proof = Groth16::<Bn254>::prove(pk, assigned, rng).expect("fixture prove");
    Proof::from_ark(&ark_proof)
}
