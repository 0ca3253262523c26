//! Proof representation and point validation.
//!
//! Proofs cross the trust boundary as raw big-endian coordinate bytes.
//! Decoding performs the three checks in order: coordinate below the
//! base-field modulus, point on the curve, point in the prime-order
//! subgroup. Only validated arkworks affine points reach the pairing.

use ark_bn254::{Fq, Fq2, G1Affine, G2Affine};
use ark_ff::{BigInteger, BigInteger256, PrimeField};
use serde::{Deserialize, Serialize};

use crate::error::VerifierError;

/// An uncompressed G1 point: big-endian x and y coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct G1Point {
    pub x: [u8; 32],
    pub y: [u8; 32],
}

/// An uncompressed G2 point; each coordinate is `[real, imaginary]` parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct G2Point {
    pub x: [[u8; 32]; 2],
    pub y: [[u8; 32]; 2],
}

/// A Groth16 proof: (A, B, C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub a: G1Point,
    pub b: G2Point,
    pub c: G1Point,
}

/// Parse 32 big-endian bytes as a base-field element, rejecting values at
/// or above the modulus.
fn decode_fq(bytes: &[u8; 32]) -> Result<Fq, VerifierError> {
    let mut limbs = [0u64; 4];
    for (i, limb) in limbs.iter_mut().enumerate() {
        let hi = 32 - 8 * i;
        let mut chunk = [0u8; 8];
        chunk.copy_from_slice(&bytes[hi - 8..hi]);
        *limb = u64::from_be_bytes(chunk);
    }
    Fq::from_bigint(BigInteger256::new(limbs)).ok_or(VerifierError::CoordinateOutOfRange)
}

fn encode_fq(f: &Fq) -> [u8; 32] {
    let bytes = f.into_bigint().to_bytes_be();
    let mut arr = [0u8; 32];
    arr[32 - bytes.len()..].copy_from_slice(&bytes);
    arr
}

impl G1Point {
    pub fn decode(&self) -> Result<G1Affine, VerifierError> {
        let x = decode_fq(&self.x)?;
        let y = decode_fq(&self.y)?;
        let point = G1Affine::new_unchecked(x, y);
        if !point.is_on_curve() {
            return Err(VerifierError::PointNotOnCurve);
        }
        if !point.is_in_correct_subgroup_assuming_on_curve() {
            return Err(VerifierError::PointNotInSubgroup);
        }
        Ok(point)
    }

    pub fn encode(point: &G1Affine) -> Self {
        Self {
            x: encode_fq(&point.x),
            y: encode_fq(&point.y),
        }
    }
}

impl G2Point {
    pub fn decode(&self) -> Result<G2Affine, VerifierError> {
        let x = Fq2::new(decode_fq(&self.x[0])?, decode_fq(&self.x[1])?);
        let y = Fq2::new(decode_fq(&self.y[0])?, decode_fq(&self.y[1])?);
        let point = G2Affine::new_unchecked(x, y);
        if !point.is_on_curve() {
            return Err(VerifierError::PointNotOnCurve);
        }
        if !point.is_in_correct_subgroup_assuming_on_curve() {
            return Err(VerifierError::PointNotInSubgroup);
        }
        Ok(point)
    }

    pub fn encode(point: &G2Affine) -> Self {
        Self {
            x: [encode_fq(&point.x.c0), encode_fq(&point.x.c1)],
            y: [encode_fq(&point.y.c0), encode_fq(&point.y.c1)],
        }
    }
}

impl Proof {
    /// Re-encode an arkworks proof as raw coordinate bytes.
    pub fn from_ark(proof: &ark_groth16::Proof<ark_bn254::Bn254>) -> Self {
        Self {
            a: G1Point::encode(&proof.a),
            b: G2Point::encode(&proof.b),
            c: G1Point::encode(&proof.c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;

    #[test]
    fn generator_round_trips() {
        let g1 = G1Affine::generator();
        let encoded = G1Point::encode(&g1);
        assert_eq!(encoded.decode().unwrap(), g1);

        let g2 = G2Affine::generator();
        let encoded = G2Point::encode(&g2);
        assert_eq!(encoded.decode().unwrap(), g2);
    }

    #[test]
    fn out_of_range_coordinate_rejected() {
        let mut point = G1Point::encode(&G1Affine::generator());
        point.x = [0xff; 32];
        assert_eq!(
            point.decode().unwrap_err(),
            VerifierError::CoordinateOutOfRange
        );
    }

    #[test]
    fn off_curve_point_rejected() {
        let mut point = G1Point::encode(&G1Affine::generator());
        // valid field element, but (x, y+1) misses the curve
        point.y[31] ^= 1;
        assert_eq!(point.decode().unwrap_err(), VerifierError::PointNotOnCurve);
    }
}
