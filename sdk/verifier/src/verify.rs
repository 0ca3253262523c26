//! The pairing check.

use ark_bn254::{Bn254, Fr};
use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::PrimeField;
use ark_std::Zero;

use crate::error::VerifierError;
use crate::key::VerifyingKey;
use crate::proof::Proof;

/// Verify a proof against one folded public input.
///
/// Linear-combines the key's basis point with the public scalar, adds the
/// constant term, then evaluates the 4-term pairing product:
///
/// ```text
/// e(-A, B) · e(alpha, beta) · e(acc, gamma) · e(C, delta) == 1
/// ```
pub fn verify(vk: &VerifyingKey, proof: &Proof, public_input: Fr) -> Result<(), VerifierError> {
    let a = proof.a.decode()?;
    let b = proof.b.decode()?;
    let c = proof.c.decode()?;

    let acc = (vk.ic[0].into_group() + vk.ic[1].mul_bigint(public_input.into_bigint()))
        .into_affine();

    let product = Bn254::multi_pairing(
        [-a, vk.alpha_g1, acc, c],
        [b, vk.beta_g2, vk.gamma_g2, vk.delta_g2],
    );

    // PairingOutput is written additively; zero is the group identity.
    if product.is_zero() {
        Ok(())
    } else {
        Err(VerifierError::PairingCheckFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_groth16::Groth16;
    use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
    use ark_snark::SNARK;
    use rand::rngs::OsRng;

    /// Minimal relation binding a witness to the lone public input.
    #[derive(Clone)]
    struct BindingCircuit {
        public: Option<Fr>,
        witness: Option<Fr>,
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

    fn setup_and_prove(input: Fr) -> (VerifyingKey, ark_groth16::VerifyingKey<Bn254>, Proof) {
        let mut rng = OsRng;
        let blank = BindingCircuit {
            public: None,
            witness: None,
        };
        let (pk, ark_vk) =
            Groth16::<Bn254>::circuit_specific_setup(blank, &mut rng).expect("setup");

        let assigned = BindingCircuit {
            public: Some(input),
            witness: Some(input),
        };
        let ark_proof = Groth16::<Bn254>::prove(&pk, assigned, &mut rng).expect("prove");

        let vk = VerifyingKey::try_from(ark_vk.clone()).expect("single public input");
        (vk, ark_vk, Proof::from_ark(&ark_proof))
    }

    #[test]
    fn valid_proof_verifies() {
        let input = Fr::from(123456u64);
        let (vk, ark_vk, proof) = setup_and_prove(input);

        verify(&vk, &proof, input).expect("proof should verify");

        // agrees with arkworks' own verifier
        let a = proof.a.decode().unwrap();
        let b = proof.b.decode().unwrap();
        let c = proof.c.decode().unwrap();
        let ark_proof = ark_groth16::Proof { a, b, c };
        assert!(Groth16::<Bn254>::verify(&ark_vk, &[input], &ark_proof).unwrap());
    }

    #[test]
    fn wrong_public_input_rejected() {
        let input = Fr::from(7u64);
        let (vk, _, proof) = setup_and_prove(input);

        assert_eq!(
            verify(&vk, &proof, Fr::from(8u64)).unwrap_err(),
            VerifierError::PairingCheckFailed
        );
    }

    #[test]
    fn mutated_proof_rejected() {
        let input = Fr::from(99u64);
        let (vk, _, proof) = setup_and_prove(input);

        // swap A and C: still valid points, wrong statement
        let swapped = Proof {
            a: proof.c,
            b: proof.b,
            c: proof.a,
        };
        assert!(verify(&vk, &swapped, input).is_err());

        // corrupt a coordinate: fails point validation or the pairing
        let mut corrupt = proof;
        corrupt.a.x[0] ^= 0x01;
        assert!(verify(&vk, &corrupt, input).is_err());
    }
}
