//! Verifying keys.

use ark_bn254::{Bn254, G1Affine, G2Affine};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use crate::error::VerifierError;

/// A Groth16 verifying key specialized to one folded public input.
///
/// `ic` holds the constant term and the single basis point the public
/// scalar is applied to. Points are validated at construction, so
/// verification never re-checks them.
#[derive(Clone, Debug)]
pub struct VerifyingKey {
    pub alpha_g1: G1Affine,
    pub beta_g2: G2Affine,
    pub gamma_g2: G2Affine,
    pub delta_g2: G2Affine,
    pub ic: [G1Affine; 2],
}

impl VerifyingKey {
    /// Compressed serialization for persistence.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.alpha_g1
            .serialize_compressed(&mut bytes)
            .expect("serialization into a Vec cannot fail");
        self.beta_g2
            .serialize_compressed(&mut bytes)
            .expect("serialization into a Vec cannot fail");
        self.gamma_g2
            .serialize_compressed(&mut bytes)
            .expect("serialization into a Vec cannot fail");
        self.delta_g2
            .serialize_compressed(&mut bytes)
            .expect("serialization into a Vec cannot fail");
        for point in &self.ic {
            point
                .serialize_compressed(&mut bytes)
                .expect("serialization into a Vec cannot fail");
        }
        bytes
    }

    /// Deserialize with full point validation.
    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self, VerifierError> {
        let reader = &mut bytes;
        let alpha_g1 = G1Affine::deserialize_compressed(&mut *reader)
            .map_err(|_| VerifierError::KeyDeserialization)?;
        let beta_g2 = G2Affine::deserialize_compressed(&mut *reader)
            .map_err(|_| VerifierError::KeyDeserialization)?;
        let gamma_g2 = G2Affine::deserialize_compressed(&mut *reader)
            .map_err(|_| VerifierError::KeyDeserialization)?;
        let delta_g2 = G2Affine::deserialize_compressed(&mut *reader)
            .map_err(|_| VerifierError::KeyDeserialization)?;
        let ic0 = G1Affine::deserialize_compressed(&mut *reader)
            .map_err(|_| VerifierError::KeyDeserialization)?;
        let ic1 = G1Affine::deserialize_compressed(&mut *reader)
            .map_err(|_| VerifierError::KeyDeserialization)?;

        Ok(Self {
            alpha_g1,
            beta_g2,
            gamma_g2,
            delta_g2,
            ic: [ic0, ic1],
        })
    }
}

impl TryFrom<ark_groth16::VerifyingKey<Bn254>> for VerifyingKey {
    type Error = VerifierError;

    /// Accept a trusted-setup key, requiring exactly one public input.
    fn try_from(vk: ark_groth16::VerifyingKey<Bn254>) -> Result<Self, Self::Error> {
        let ic_len = vk.gamma_abc_g1.len();
        let [constant, basis]: [G1Affine; 2] = vk
            .gamma_abc_g1
            .try_into()
            .map_err(|_| VerifierError::MalformedKey { ic_len })?;

        Ok(Self {
            alpha_g1: vk.alpha_g1,
            beta_g2: vk.beta_g2,
            gamma_g2: vk.gamma_g2,
            delta_g2: vk.delta_g2,
            ic: [constant, basis],
        })
    }
}
