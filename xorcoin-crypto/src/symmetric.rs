//! AES-256-GCM encryption of private container values.
//!
//! Ciphertext layout: `nonce (12) || aead_ciphertext`. The nonce is random
//! per encryption, so encrypting the same coin list twice gives different bytes.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

use xorcoin_core::constants::{AEAD_NONCE_SIZE, AEAD_TAG_SIZE, SYMMETRIC_KEY_SIZE};
use xorcoin_core::error::{CoinError, Result};
use xorcoin_core::types::ContainerKey;

/// Generates a random container key.
pub fn generate_container_key() -> ContainerKey {
    let mut bytes = [0u8; SYMMETRIC_KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    ContainerKey::from_array(bytes)
}

/// Encrypts a value for storage in a private container.
pub fn encrypt(key: &ContainerKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CoinError::InternalError(format!("container key: {}", e)))?;

    let mut nonce = [0u8; AEAD_NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CoinError::InternalError("container encryption failed".into()))?;

    let mut out = Vec::with_capacity(AEAD_NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a value read from a private container.
///
/// Fails with `DecryptionFailure` for a wrong key or corrupted bytes.
pub fn decrypt(key: &ContainerKey, data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < AEAD_NONCE_SIZE + AEAD_TAG_SIZE {
        return Err(CoinError::DecryptionFailure(format!(
            "container value too short: {} bytes",
            data.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CoinError::InternalError(format!("container key: {}", e)))?;

    let (nonce, ciphertext) = data.split_at(AEAD_NONCE_SIZE);
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CoinError::DecryptionFailure("container value authentication failed".into()))
}
