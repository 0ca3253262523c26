//! Note Encryption
//!
//! Two ciphertext flavors, both ChaCha20-Poly1305 with blake3-derived keys:
//!
//! ```text
//! Shield:   value and token are public (it is a deposit); the ciphertext
//!           conceals only the note randomness. Keyed by ephemeral ECDH
//!           against the recipient's viewing public key.
//!
//! Transfer: conceals randomness, value, and token identity. Keyed by the
//!           blinded-key shared secret (see blinding module); the blinded
//!           sender and receiver keys travel with the ciphertext.
//! ```

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret, x25519};

use crate::blinding::BlindedKeys;
use crate::error::PrivacyError;
use crate::keys::ViewingKey;
use crate::note::{TokenData, TokenKind};

/// Ciphertext published with a shield (deposit) commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldCiphertext {
    /// Ephemeral public key for ECDH
    pub ephemeral_pk: [u8; 32],
    /// Nonce for ChaCha20-Poly1305
    pub nonce: [u8; 12],
    /// Encrypted note randomness with authentication tag
    pub body: Vec<u8>,
}

/// Ciphertext published with a transfer output commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCiphertext {
    /// Sender viewing key times the blinding scalar
    pub blinded_sender_pk: [u8; 32],
    /// Receiver viewing key times the blinding scalar
    pub blinded_receiver_pk: [u8; 32],
    /// Nonce for ChaCha20-Poly1305
    pub nonce: [u8; 12],
    /// Encrypted note plaintext with authentication tag
    pub body: Vec<u8>,
}

/// Transfer-note plaintext
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePlaintext {
    /// Note randomness (blinding factor)
    pub random: [u8; 32],
    /// Note value
    pub value: u64,
    /// Token the note holds
    pub token: TokenData,
    /// Optional memo (up to 512 bytes)
    pub memo: Vec<u8>,
}

const MEMO_LIMIT: usize = 512;

/// Encrypt a shield note's randomness for the recipient.
pub fn encrypt_shield_note(random: &[u8; 32], recipient_viewing_pk: &[u8; 32]) -> ShieldCiphertext {
    let mut rng = rand::thread_rng();
    let ephemeral_secret = EphemeralSecret::random_from_rng(&mut rng);
    let ephemeral_pk = PublicKey::from(&ephemeral_secret);

    let recipient_key = PublicKey::from(*recipient_viewing_pk);
    let shared = ephemeral_secret.diffie_hellman(&recipient_key);
    let key = derive_note_key(shared.as_bytes(), ephemeral_pk.as_bytes());

    let mut nonce_bytes = [0u8; 12];
    rng.fill_bytes(&mut nonce_bytes);

    let cipher = ChaCha20Poly1305::new_from_slice(&key).expect("valid key length");
    let body = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), random.as_slice())
        .expect("encryption should not fail");

    ShieldCiphertext {
        ephemeral_pk: *ephemeral_pk.as_bytes(),
        nonce: nonce_bytes,
        body,
    }
}

/// Try to recover a shield note's randomness with a viewing key.
///
/// Returns None when the ciphertext is not addressed to this key.
pub fn try_decrypt_shield_note(
    ciphertext: &ShieldCiphertext,
    viewing_key: &ViewingKey,
) -> Option<[u8; 32]> {
    let secret = StaticSecret::from(*viewing_key.as_bytes());
    let shared = secret.diffie_hellman(&PublicKey::from(ciphertext.ephemeral_pk));
    let key = derive_note_key(shared.as_bytes(), &ciphertext.ephemeral_pk);

    let cipher = ChaCha20Poly1305::new_from_slice(&key).ok()?;
    let plain = cipher
        .decrypt(Nonce::from_slice(&ciphertext.nonce), ciphertext.body.as_slice())
        .ok()?;

    plain.try_into().ok()
}

/// Encrypt a transfer-note plaintext under the blinded-key shared secret.
///
/// The sender derives the secret from their own viewing key and the blinded
/// receiver key; the receiver will recompute it from the blinded sender key.
pub fn encrypt_transfer_note(
    plaintext: &NotePlaintext,
    sender_viewing_key: &ViewingKey,
    blinded: &BlindedKeys,
) -> NoteCiphertext {
    let shared = x25519(*sender_viewing_key.as_bytes(), blinded.receiver);
    let key = derive_note_key(&shared, &blinded.sender);

    let mut nonce_bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let cipher = ChaCha20Poly1305::new_from_slice(&key).expect("valid key length");
    let body = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            serialize_plaintext(plaintext).as_slice(),
        )
        .expect("encryption should not fail");

    NoteCiphertext {
        blinded_sender_pk: blinded.sender,
        blinded_receiver_pk: blinded.receiver,
        nonce: nonce_bytes,
        body,
    }
}

/// Try to decrypt a transfer note with a viewing key (scan mode).
///
/// The receiver's secret pairs with the blinded sender key; the sender's own
/// secret pairs with the blinded receiver key, which lets a sender recover
/// their outgoing notes the same way. Both pairings are tried.
pub fn try_decrypt_transfer_note(
    ciphertext: &NoteCiphertext,
    viewing_key: &ViewingKey,
) -> Option<NotePlaintext> {
    for counterparty in [ciphertext.blinded_sender_pk, ciphertext.blinded_receiver_pk] {
        let shared = x25519(*viewing_key.as_bytes(), counterparty);
        let key = derive_note_key(&shared, &ciphertext.blinded_sender_pk);

        let Ok(cipher) = ChaCha20Poly1305::new_from_slice(&key) else {
            continue;
        };
        if let Ok(plain) = cipher.decrypt(
            Nonce::from_slice(&ciphertext.nonce),
            ciphertext.body.as_slice(),
        ) {
            return deserialize_plaintext(&plain).ok();
        }
    }
    None
}

/// Derive encryption key from shared secret
fn derive_note_key(shared_secret: &[u8], salt: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key("veil.note.v1");
    hasher.update(shared_secret);
    hasher.update(salt);
    *hasher.finalize().as_bytes()
}

/// Fixed-layout serialization:
/// random(32) | value(8 LE) | kind(1) | address(32) | sub_id(32) |
/// memo_len(2 LE) | memo
fn serialize_plaintext(pt: &NotePlaintext) -> Vec<u8> {
    let memo_len = pt.memo.len().min(MEMO_LIMIT);
    let mut bytes = Vec::with_capacity(107 + memo_len);

    bytes.extend_from_slice(&pt.random);
    bytes.extend_from_slice(&pt.value.to_le_bytes());
    bytes.push(pt.token.kind.as_u8());
    bytes.extend_from_slice(&pt.token.address);
    bytes.extend_from_slice(&pt.token.sub_id);
    bytes.extend_from_slice(&(memo_len as u16).to_le_bytes());
    bytes.extend_from_slice(&pt.memo[..memo_len]);

    bytes
}

fn deserialize_plaintext(bytes: &[u8]) -> Result<NotePlaintext, PrivacyError> {
    if bytes.len() < 107 {
        return Err(PrivacyError::MalformedPlaintext);
    }

    let random: [u8; 32] = bytes[0..32]
        .try_into()
        .map_err(|_| PrivacyError::MalformedPlaintext)?;
    let value = u64::from_le_bytes(
        bytes[32..40]
            .try_into()
            .map_err(|_| PrivacyError::MalformedPlaintext)?,
    );
    let kind = TokenKind::from_u8(bytes[40]).ok_or(PrivacyError::MalformedPlaintext)?;
    let address: [u8; 32] = bytes[41..73]
        .try_into()
        .map_err(|_| PrivacyError::MalformedPlaintext)?;
    let sub_id: [u8; 32] = bytes[73..105]
        .try_into()
        .map_err(|_| PrivacyError::MalformedPlaintext)?;
    let memo_len = u16::from_le_bytes(
        bytes[105..107]
            .try_into()
            .map_err(|_| PrivacyError::MalformedPlaintext)?,
    ) as usize;

    if bytes.len() != 107 + memo_len {
        return Err(PrivacyError::MalformedPlaintext);
    }

    Ok(NotePlaintext {
        random,
        value,
        token: TokenData {
            kind,
            address,
            sub_id,
        },
        memo: bytes[107..].to_vec(),
    })
}

impl ShieldCiphertext {
    /// epk(32) | nonce(12) | body_len(4 LE) | body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(48 + self.body.len());
        bytes.extend_from_slice(&self.ephemeral_pk);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&(self.body.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&self.body);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrivacyError> {
        if bytes.len() < 48 {
            return Err(PrivacyError::MalformedPlaintext);
        }
        let ephemeral_pk: [u8; 32] = bytes[0..32]
            .try_into()
            .map_err(|_| PrivacyError::MalformedPlaintext)?;
        let nonce: [u8; 12] = bytes[32..44]
            .try_into()
            .map_err(|_| PrivacyError::MalformedPlaintext)?;
        let len = u32::from_le_bytes(
            bytes[44..48]
                .try_into()
                .map_err(|_| PrivacyError::MalformedPlaintext)?,
        ) as usize;
        if bytes.len() != 48 + len {
            return Err(PrivacyError::MalformedPlaintext);
        }
        Ok(Self {
            ephemeral_pk,
            nonce,
            body: bytes[48..].to_vec(),
        })
    }
}

impl NoteCiphertext {
    /// blinded_sender(32) | blinded_receiver(32) | nonce(12) |
    /// body_len(4 LE) | body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(80 + self.body.len());
        bytes.extend_from_slice(&self.blinded_sender_pk);
        bytes.extend_from_slice(&self.blinded_receiver_pk);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&(self.body.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&self.body);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrivacyError> {
        if bytes.len() < 80 {
            return Err(PrivacyError::MalformedPlaintext);
        }
        let blinded_sender_pk: [u8; 32] = bytes[0..32]
            .try_into()
            .map_err(|_| PrivacyError::MalformedPlaintext)?;
        let blinded_receiver_pk: [u8; 32] = bytes[32..64]
            .try_into()
            .map_err(|_| PrivacyError::MalformedPlaintext)?;
        let nonce: [u8; 12] = bytes[64..76]
            .try_into()
            .map_err(|_| PrivacyError::MalformedPlaintext)?;
        let len = u32::from_le_bytes(
            bytes[76..80]
                .try_into()
                .map_err(|_| PrivacyError::MalformedPlaintext)?,
        ) as usize;
        if bytes.len() != 80 + len {
            return Err(PrivacyError::MalformedPlaintext);
        }
        Ok(Self {
            blinded_sender_pk,
            blinded_receiver_pk,
            nonce,
            body: bytes[80..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blinding::blind_keys;
    use rand::rngs::OsRng;

    fn plaintext() -> NotePlaintext {
        NotePlaintext {
            random: [42u8; 32],
            value: 1000,
            token: TokenData::fungible([0xaa; 32]),
            memo: b"test memo".to_vec(),
        }
    }

    #[test]
    fn shield_round_trip() {
        let mut rng = OsRng;
        let viewing = ViewingKey::random(&mut rng);

        let ct = encrypt_shield_note(&[42u8; 32], &viewing.public_key());
        let random = try_decrypt_shield_note(&ct, &viewing).expect("decryption should succeed");
        assert_eq!(random, [42u8; 32]);
    }

    #[test]
    fn shield_wrong_key_fails() {
        let mut rng = OsRng;
        let viewing = ViewingKey::random(&mut rng);
        let wrong = ViewingKey::random(&mut rng);

        let ct = encrypt_shield_note(&[42u8; 32], &viewing.public_key());
        assert!(try_decrypt_shield_note(&ct, &wrong).is_none());
    }

    #[test]
    fn transfer_round_trip_for_receiver_and_sender() {
        let mut rng = OsRng;
        let sender = ViewingKey::random(&mut rng);
        let receiver = ViewingKey::random(&mut rng);

        let pt = plaintext();
        let blinded = blind_keys(
            &sender.public_key(),
            &receiver.public_key(),
            &pt.random,
            &[9u8; 32],
        );
        let ct = encrypt_transfer_note(&pt, &sender, &blinded);

        // receiver recovers via the blinded sender key
        let got = try_decrypt_transfer_note(&ct, &receiver).expect("receiver decrypts");
        assert_eq!(got, pt);

        // sender recovers their own outgoing note via the blinded receiver key
        let got = try_decrypt_transfer_note(&ct, &sender).expect("sender decrypts");
        assert_eq!(got, pt);
    }

    #[test]
    fn transfer_observer_fails() {
        let mut rng = OsRng;
        let sender = ViewingKey::random(&mut rng);
        let receiver = ViewingKey::random(&mut rng);
        let observer = ViewingKey::random(&mut rng);

        let pt = plaintext();
        let blinded = blind_keys(
            &sender.public_key(),
            &receiver.public_key(),
            &pt.random,
            &[9u8; 32],
        );
        let ct = encrypt_transfer_note(&pt, &sender, &blinded);
        assert!(try_decrypt_transfer_note(&ct, &observer).is_none());
    }

    #[test]
    fn tampered_body_fails_authentication() {
        let mut rng = OsRng;
        let sender = ViewingKey::random(&mut rng);
        let receiver = ViewingKey::random(&mut rng);

        let pt = plaintext();
        let blinded = blind_keys(
            &sender.public_key(),
            &receiver.public_key(),
            &pt.random,
            &[9u8; 32],
        );
        let mut ct = encrypt_transfer_note(&pt, &sender, &blinded);
        ct.body[0] ^= 1;
        assert!(try_decrypt_transfer_note(&ct, &receiver).is_none());
    }

    #[test]
    fn plaintext_serialization_round_trip() {
        let pt = plaintext();
        let bytes = serialize_plaintext(&pt);
        assert_eq!(deserialize_plaintext(&bytes).unwrap(), pt);

        // truncated input is rejected
        assert!(deserialize_plaintext(&bytes[..50]).is_err());
        // trailing garbage is rejected
        let mut long = bytes.clone();
        long.push(0);
        assert!(deserialize_plaintext(&long).is_err());
    }

    #[test]
    fn ciphertext_byte_round_trip() {
        let mut rng = OsRng;
        let viewing = ViewingKey::random(&mut rng);
        let shield = encrypt_shield_note(&[1u8; 32], &viewing.public_key());
        assert_eq!(
            ShieldCiphertext::from_bytes(&shield.to_bytes()).unwrap(),
            shield
        );

        let sender = ViewingKey::random(&mut rng);
        let blinded = blind_keys(
            &sender.public_key(),
            &viewing.public_key(),
            &[1u8; 32],
            &[2u8; 32],
        );
        let note = encrypt_transfer_note(&plaintext(), &sender, &blinded);
        assert_eq!(NoteCiphertext::from_bytes(&note.to_bytes()).unwrap(), note);
    }
}
