//! Sealed (anonymous) encryption to a public key.
//!
//! ## Construction
//!
//! ```text
//! (kem_ct, ss)   = ML-KEM-768.Encaps(recipient_pk)
//! key || nonce   = SHAKE256("XORCOIN_SEAL_KEY_V1", ss, kem_ct, recipient_pk)[0..44]
//! aead_ct        = AES-256-GCM(key, nonce, plaintext)
//! payload        = kem_ct (1088) || aead_ct
//! ```
//!
//! Every seal uses a fresh encapsulation, so the derived key and nonce are
//! never reused. The sender holds no key pair and nothing in the payload
//! identifies it.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use zeroize::Zeroizing;

use xorcoin_core::constants::{
    AEAD_NONCE_SIZE, DOMAIN_SEAL_KEY, KYBER_CIPHERTEXT_SIZE, SEALED_PAYLOAD_MIN_SIZE, SYMMETRIC_KEY_SIZE,
};
use xorcoin_core::error::{CoinError, Result};
use xorcoin_core::types::{EncryptedPayload, KeyPair, KyberPublicKey};

use crate::hash::shake256_multi;
use crate::kyber::{decapsulate, encapsulate, KyberCiphertext};

// ═══════════════════════════════════════════════════════════════════════════════
// PLAINTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Input to [`seal`].
///
/// Lists are sealed as their comma-joined text (`["a", "b"]` seals `a,b`),
/// which is the form existing inbox readers expect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Plaintext {
    /// Raw bytes, sealed as-is
    Bytes(Vec<u8>),
    /// Text items, sealed comma-joined
    List(Vec<String>),
}

impl Plaintext {
    /// Serializes to the bytes that get encrypted.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Plaintext::Bytes(bytes) => bytes,
            Plaintext::List(items) => items.join(",").into_bytes(),
        }
    }
}

impl From<Vec<u8>> for Plaintext {
    fn from(bytes: Vec<u8>) -> Self {
        Plaintext::Bytes(bytes)
    }
}

impl From<&[u8]> for Plaintext {
    fn from(bytes: &[u8]) -> Self {
        Plaintext::Bytes(bytes.to_vec())
    }
}

impl From<&str> for Plaintext {
    fn from(text: &str) -> Self {
        Plaintext::Bytes(text.as_bytes().to_vec())
    }
}

impl From<Vec<String>> for Plaintext {
    fn from(items: Vec<String>) -> Self {
        Plaintext::List(items)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SEAL / UNSEAL
// ═══════════════════════════════════════════════════════════════════════════════

/// Encrypts `plaintext` so only the holder of `recipient`'s secret key can read it.
pub fn seal(plaintext: impl Into<Plaintext>, recipient: &KyberPublicKey) -> Result<EncryptedPayload> {
    let plaintext = Zeroizing::new(plaintext.into().into_bytes());

    let (kem_ct, shared_secret) = encapsulate(recipient)?;
    let (cipher, nonce) = payload_cipher(&shared_secret[..], &kem_ct, recipient)?;

    let aead_ct = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
        .map_err(|_| CoinError::EncapsulationError("payload encryption failed".into()))?;

    let mut payload = Vec::with_capacity(KYBER_CIPHERTEXT_SIZE + aead_ct.len());
    payload.extend_from_slice(kem_ct.as_bytes());
    payload.extend_from_slice(&aead_ct);

    Ok(EncryptedPayload::from_bytes(payload))
}

/// Decrypts a payload sealed to `recipient`'s public key.
///
/// Fails with `DecryptionFailure` if the payload was sealed to another key,
/// was truncated, or was modified.
pub fn unseal(payload: &EncryptedPayload, recipient: &KeyPair) -> Result<Vec<u8>> {
    let bytes = payload.as_bytes();
    if bytes.len() < SEALED_PAYLOAD_MIN_SIZE {
        return Err(CoinError::DecryptionFailure(format!(
            "payload too short: {} bytes (minimum {})",
            bytes.len(),
            SEALED_PAYLOAD_MIN_SIZE
        )));
    }

    let (kem_bytes, aead_ct) = bytes.split_at(KYBER_CIPHERTEXT_SIZE);
    let kem_ct = KyberCiphertext::from_bytes(kem_bytes)?;
    let shared_secret = decapsulate(&kem_ct, &recipient.secret)
        .map_err(|e| CoinError::DecryptionFailure(e.to_string()))?;

    let (cipher, nonce) = payload_cipher(&shared_secret[..], &kem_ct, &recipient.public)?;

    cipher
        .decrypt(Nonce::from_slice(&nonce), aead_ct)
        .map_err(|_| CoinError::DecryptionFailure("payload was not sealed to this key pair or is corrupted".into()))
}

/// Derives the AEAD cipher and nonce bound to this encapsulation.
fn payload_cipher(
    shared_secret: &[u8],
    kem_ct: &KyberCiphertext,
    recipient: &KyberPublicKey,
) -> Result<(Aes256Gcm, [u8; AEAD_NONCE_SIZE])> {
    let okm = Zeroizing::new(shake256_multi(
        DOMAIN_SEAL_KEY,
        &[shared_secret, kem_ct.as_bytes(), recipient.as_bytes()],
        SYMMETRIC_KEY_SIZE + AEAD_NONCE_SIZE,
    ));

    let cipher = Aes256Gcm::new_from_slice(&okm[..SYMMETRIC_KEY_SIZE])
        .map_err(|e| CoinError::InternalError(format!("seal key: {}", e)))?;

    let mut nonce = [0u8; AEAD_NONCE_SIZE];
    nonce.copy_from_slice(&okm[SYMMETRIC_KEY_SIZE..]);

    Ok((cipher, nonce))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kyber::generate_keypair;
    use proptest::prelude::*;
    use xorcoin_core::constants::AEAD_TAG_SIZE;

    #[test]
    fn test_seal_unseal_roundtrip() {
        let keys = generate_keypair().unwrap();
        let payload = seal(b"hello inbox".as_slice(), &keys.public).unwrap();

        assert_eq!(payload.len(), KYBER_CIPHERTEXT_SIZE + 11 + AEAD_TAG_SIZE);
        assert_eq!(unseal(&payload, &keys).unwrap(), b"hello inbox");
    }

    #[test]
    fn test_empty_plaintext() {
        let keys = generate_keypair().unwrap();
        let payload = seal(Vec::<u8>::new(), &keys.public).unwrap();
        assert_eq!(payload.len(), SEALED_PAYLOAD_MIN_SIZE);
        assert!(unseal(&payload, &keys).unwrap().is_empty());
    }

    #[test]
    fn test_list_plaintext_is_comma_joined() {
        let keys = generate_keypair().unwrap();
        let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let payload = seal(items, &keys.public).unwrap();
        assert_eq!(unseal(&payload, &keys).unwrap(), b"a,b,c");
    }

    #[test]
    fn test_same_plaintext_seals_differently() {
        let keys = generate_keypair().unwrap();
        let a = seal("same", &keys.public).unwrap();
        let b = seal("same", &keys.public).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_keypair_fails() {
        let alice = generate_keypair().unwrap();
        let eve = generate_keypair().unwrap();

        let payload = seal("for alice", &alice.public).unwrap();
        let result = unseal(&payload, &eve);
        assert!(matches!(result, Err(CoinError::DecryptionFailure(_))));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let keys = generate_keypair().unwrap();
        let payload = seal("intact", &keys.public).unwrap();

        let mut bytes = payload.into_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x80;
        let result = unseal(&EncryptedPayload::from_bytes(bytes.clone()), &keys);
        assert!(matches!(result, Err(CoinError::DecryptionFailure(_))));

        bytes[last] ^= 0x80;
        bytes[5] ^= 0x01;
        let result = unseal(&EncryptedPayload::from_bytes(bytes), &keys);
        assert!(matches!(result, Err(CoinError::DecryptionFailure(_))));
    }

    #[test]
    fn test_truncated_payload_fails() {
        let keys = generate_keypair().unwrap();
        let payload = seal("short", &keys.public).unwrap();
        let truncated = EncryptedPayload::from_bytes(payload.as_bytes()[..100].to_vec());
        assert!(matches!(unseal(&truncated, &keys), Err(CoinError::DecryptionFailure(_))));
        assert!(matches!(
            unseal(&EncryptedPayload::from_bytes(Vec::new()), &keys),
            Err(CoinError::DecryptionFailure(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_seal_unseal_roundtrip(plaintext in proptest::collection::vec(any::<u8>(), 0..512)) {
            let keys = generate_keypair().unwrap();
            let payload = seal(plaintext.clone(), &keys.public).unwrap();
            prop_assert_eq!(unseal(&payload, &keys).unwrap(), plaintext);
        }
    }
}
