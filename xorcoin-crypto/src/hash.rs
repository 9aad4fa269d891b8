//! Hashing: content addresses and domain-separated key derivation.
//!
//! Addresses are plain SHA3-256 of the input so any client can locate a
//! user's wallet and inbox from their public key alone. Key derivation uses
//! SHAKE256 with a length-prefixed domain separator:
//!
//! ```text
//! output = SHAKE256(len(domain) || domain || len(input_i) || input_i ..., output_length)
//! ```

use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Digest, Sha3_256, Shake256,
};

use xorcoin_core::types::XorAddress;

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the storage address for a public key (or any seed).
///
/// Deterministic; the empty input maps to SHA3-256("").
pub fn derive_address(public_key_or_seed: &[u8]) -> XorAddress {
    let digest: [u8; 32] = Sha3_256::digest(public_key_or_seed).into();
    XorAddress::from_array(digest)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHAKE256 FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Computes SHAKE256 hash with domain separation.
pub fn shake256(domain: &[u8], input: &[u8], output_len: usize) -> Vec<u8> {
    let mut hasher = Shake256::default();

    hasher.update(&(domain.len() as u32).to_le_bytes());
    hasher.update(domain);
    hasher.update(input);

    let mut reader = hasher.finalize_xof();
    let mut output = vec![0u8; output_len];
    reader.read(&mut output);

    output
}

/// Computes SHAKE256 hash over several inputs.
///
/// Each input is length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn shake256_multi(domain: &[u8], inputs: &[&[u8]], output_len: usize) -> Vec<u8> {
    let mut hasher = Shake256::default();

    hasher.update(&(domain.len() as u32).to_le_bytes());
    hasher.update(domain);

    for input in inputs {
        hasher.update(&(input.len() as u64).to_le_bytes());
        hasher.update(input);
    }

    let mut reader = hasher.finalize_xof();
    let mut output = vec![0u8; output_len];
    reader.read(&mut output);

    output
}
