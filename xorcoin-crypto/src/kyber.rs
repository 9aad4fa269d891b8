//! ML-KEM-768 (Kyber) key encapsulation mechanism.
//!
//! Wraps the `pqcrypto-kyber` crate. The KEM is the asymmetric half of the
//! sealed inbox channel: a sender encapsulates a fresh shared secret to the
//! inbox's encryption key, and only the inbox owner can decapsulate it.
//!
//! ## Security Level
//!
//! ML-KEM-768 provides approximately 192 bits of classical security and
//! 128+ bits of quantum security.

use pqcrypto_kyber::kyber768;
use pqcrypto_traits::kem::{Ciphertext, PublicKey, SecretKey, SharedSecret};
use zeroize::Zeroizing;

use xorcoin_core::constants::{KYBER_CIPHERTEXT_SIZE, KYBER_SHARED_SECRET_SIZE};
use xorcoin_core::error::{CoinError, Result};
use xorcoin_core::types::{KeyPair, KyberPublicKey, KyberSecretKey};

// ═══════════════════════════════════════════════════════════════════════════════
// CIPHERTEXT TYPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Kyber ciphertext (encapsulated key). Leads every sealed payload.
#[derive(Clone)]
pub struct KyberCiphertext {
    bytes: Vec<u8>,
}

impl KyberCiphertext {
    /// Creates ciphertext from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KYBER_CIPHERTEXT_SIZE {
            return Err(CoinError::InvalidCiphertextSize {
                expected: KYBER_CIPHERTEXT_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for KyberCiphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "KyberCiphertext({}...{})",
            hex::encode(&self.bytes[..8]),
            hex::encode(&self.bytes[KYBER_CIPHERTEXT_SIZE - 8..])
        )
    }
}

/// 32-byte KEM shared secret, wiped on drop.
pub type SharedSecretBytes = Zeroizing<[u8; KYBER_SHARED_SECRET_SIZE]>;

// ═══════════════════════════════════════════════════════════════════════════════
// KEY GENERATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Generates a new ML-KEM-768 key pair.
///
/// Used for identity key pairs and for the dedicated inbox encryption key
/// pair alike. Uses the system's cryptographically secure RNG.
pub fn generate_keypair() -> Result<KeyPair> {
    let (pk, sk) = kyber768::keypair();

    let public = KyberPublicKey::from_bytes(pk.as_bytes())
        .map_err(|e| CoinError::KeyGenerationError(e.to_string()))?;
    let secret = KyberSecretKey::from_bytes(sk.as_bytes())
        .map_err(|e| CoinError::KeyGenerationError(e.to_string()))?;

    Ok(KeyPair::new(public, secret))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENCAPSULATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Encapsulates a fresh shared secret to a public key.
///
/// Returns the ciphertext to transmit and the shared secret to key the
/// payload encryption with.
pub fn encapsulate(public_key: &KyberPublicKey) -> Result<(KyberCiphertext, SharedSecretBytes)> {
    let pk = kyber768::PublicKey::from_bytes(public_key.as_bytes())
        .map_err(|e| CoinError::EncapsulationError(format!("Invalid public key: {:?}", e)))?;

    let (ss, ct) = kyber768::encapsulate(&pk);

    let mut shared_secret = Zeroizing::new([0u8; KYBER_SHARED_SECRET_SIZE]);
    shared_secret.copy_from_slice(ss.as_bytes());

    let ciphertext = KyberCiphertext::from_bytes(ct.as_bytes())?;

    Ok((ciphertext, shared_secret))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECAPSULATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Decapsulates a ciphertext to recover the shared secret.
///
/// Decapsulation is implicitly rejecting: a ciphertext made for another key
/// yields a pseudo-random secret rather than an error. The AEAD layer on top
/// is what turns that into a decryption failure.
pub fn decapsulate(ciphertext: &KyberCiphertext, secret_key: &KyberSecretKey) -> Result<SharedSecretBytes> {
    let ct = kyber768::Ciphertext::from_bytes(ciphertext.as_bytes())
        .map_err(|e| CoinError::DecapsulationError(format!("Invalid ciphertext: {:?}", e)))?;

    let sk = kyber768::SecretKey::from_bytes(secret_key.as_bytes())
        .map_err(|e| CoinError::DecapsulationError(format!("Invalid secret key: {:?}", e)))?;

    let ss = kyber768::decapsulate(&ct, &sk);

    let mut shared_secret = Zeroizing::new([0u8; KYBER_SHARED_SECRET_SIZE]);
    shared_secret.copy_from_slice(ss.as_bytes());

    Ok(shared_secret)
}

/// Verifies key pair consistency by a full encapsulate/decapsulate round.
pub fn verify_keypair(keypair: &KeyPair) -> Result<bool> {
    let (ciphertext, sender_secret) = encapsulate(&keypair.public)?;
    let receiver_secret = decapsulate(&ciphertext, &keypair.secret)?;

    Ok(subtle::ConstantTimeEq::ct_eq(&sender_secret[..], &receiver_secret[..]).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xorcoin_core::constants::{KYBER_PUBLIC_KEY_SIZE, KYBER_SECRET_KEY_SIZE};

    #[test]
    fn test_keypair_generation() {
        let keypair = generate_keypair().unwrap();

        assert_eq!(keypair.public.as_bytes().len(), KYBER_PUBLIC_KEY_SIZE);
        assert_eq!(keypair.secret.as_bytes().len(), KYBER_SECRET_KEY_SIZE);
    }

    #[test]
    fn test_encapsulation_decapsulation_roundtrip() {
        let keypair = generate_keypair().unwrap();

        let (ciphertext, sender_secret) = encapsulate(&keypair.public).unwrap();
        assert_eq!(ciphertext.as_bytes().len(), KYBER_CIPHERTEXT_SIZE);

        let receiver_secret = decapsulate(&ciphertext, &keypair.secret).unwrap();
        assert_eq!(*sender_secret, *receiver_secret);
    }

    #[test]
    fn test_multiple_encapsulations_produce_different_secrets() {
        let keypair = generate_keypair().unwrap();

        let (_, secret1) = encapsulate(&keypair.public).unwrap();
        let (_, secret2) = encapsulate(&keypair.public).unwrap();

        assert_ne!(*secret1, *secret2);
    }

    #[test]
    fn test_verify_keypair() {
        let keypair = generate_keypair().unwrap();
        assert!(verify_keypair(&keypair).unwrap());
    }

    #[test]
    fn test_invalid_ciphertext_size() {
        assert!(KyberCiphertext::from_bytes(&[0u8; 100]).is_err());
    }

    #[test]
    fn test_wrong_key_decapsulation() {
        let keypair1 = generate_keypair().unwrap();
        let keypair2 = generate_keypair().unwrap();

        let (ciphertext, sender_secret) = encapsulate(&keypair1.public).unwrap();
        let wrong_secret = decapsulate(&ciphertext, &keypair2.secret).unwrap();

        // Implicit rejection: a different secret, not an error
        assert_ne!(*sender_secret, *wrong_secret);
    }
}
