//! Key types for XORCOIN.
//!
//! - [`PublicKey`]: Opaque identity public key (coin owners, wallet owners)
//! - [`KyberPublicKey`]: Encryption public key for sealed inbox payloads (1184 bytes)
//! - [`KyberSecretKey`]: Decryption secret key (2400 bytes, zeroized on drop)
//! - [`KeyPair`]: Combined public + secret key
//! - [`ContainerKey`]: Symmetric key of a private container (zeroized on drop)

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{KYBER_PUBLIC_KEY_SIZE, KYBER_SECRET_KEY_SIZE, SYMMETRIC_KEY_SIZE};
use crate::error::{CoinError, Result};

/// Copies `bytes` into a key array, rejecting any other length.
fn sized<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| CoinError::InvalidKeySize {
        expected: N,
        actual: bytes.len(),
    })
}

/// Keys travel as hex strings in JSON.
macro_rules! hex_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let text = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
                Self::from_hex(&text).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITY PUBLIC KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Opaque identity public key.
///
/// Coin records name their owner with one of these and wallet/inbox
/// addresses are derived from one. The protocol never interprets the bytes,
/// so keys of any scheme (or length) are accepted. Equality is byte equality.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PublicKey {
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the hex-encoded key.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Parses a hex-encoded key.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())?;
        if bytes.is_empty() {
            return Err(CoinError::ValidationError("public key cannot be empty".into()));
        }
        Ok(Self { bytes })
    }

    /// Short form for logs: first 8 bytes in hex.
    pub fn short(&self) -> String {
        let end = self.bytes.len().min(8);
        hex::encode(&self.bytes[..end])
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({}..)", self.short())
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<&KyberPublicKey> for PublicKey {
    fn from(key: &KyberPublicKey) -> Self {
        Self::from_bytes(key.as_bytes().to_vec())
    }
}

hex_serde!(PublicKey);

// ═══════════════════════════════════════════════════════════════════════════════
// KYBER PUBLIC KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// ML-KEM-768 public key (encapsulation key).
///
/// Published in a transaction inbox so anyone can seal notifications to it.
#[derive(Clone, PartialEq, Eq)]
pub struct KyberPublicKey {
    bytes: [u8; KYBER_PUBLIC_KEY_SIZE],
}

impl KyberPublicKey {
    /// Parses raw key bytes; fails with `InvalidKeySize` on any other length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        sized(bytes).map(Self::from_array)
    }

    /// Wraps an encapsulation key array.
    pub fn from_array(bytes: [u8; KYBER_PUBLIC_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex form, as published in inbox metadata.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parses the hex form.
    pub fn from_hex(s: &str) -> Result<Self> {
        Self::from_bytes(&hex::decode(s.trim())?)
    }
}

impl std::fmt::Debug for KyberPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (head, tail) = (&self.bytes[..6], &self.bytes[KYBER_PUBLIC_KEY_SIZE - 6..]);
        write!(f, "KyberPublicKey({}..{})", hex::encode(head), hex::encode(tail))
    }
}

hex_serde!(KyberPublicKey);

// ═══════════════════════════════════════════════════════════════════════════════
// KYBER SECRET KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// ML-KEM-768 secret key (decapsulation key).
///
/// Zeroized when dropped. Never expose this key in logs or error messages.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KyberSecretKey {
    bytes: [u8; KYBER_SECRET_KEY_SIZE],
}

impl KyberSecretKey {
    /// Parses raw key bytes; fails with `InvalidKeySize` on any other length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut array = sized::<KYBER_SECRET_KEY_SIZE>(bytes)?;
        let key = Self::from_array(array);
        array.zeroize();
        Ok(key)
    }

    /// Wraps a decapsulation key array.
    pub fn from_array(bytes: [u8; KYBER_SECRET_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Parses the hex form used in key files.
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = hex::decode(s.trim())?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }

    /// Raw key bytes. Never log them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for KyberSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KyberSecretKey([REDACTED])")
    }
}

impl Default for KyberSecretKey {
    fn default() -> Self {
        Self::from_array([0u8; KYBER_SECRET_KEY_SIZE])
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY PAIR
// ═══════════════════════════════════════════════════════════════════════════════

/// ML-KEM-768 key pair.
///
/// Used both as a user's identity key pair and as the dedicated inbox
/// encryption key pair; the two are generated independently.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    /// Encapsulation half, shareable
    #[zeroize(skip)]
    pub public: KyberPublicKey,
    /// Decapsulation half, wiped on drop
    pub secret: KyberSecretKey,
}

impl KeyPair {
    /// Pairs the two halves. Whether they match is not checked here.
    pub fn new(public: KyberPublicKey, secret: KyberSecretKey) -> Self {
        Self { public, secret }
    }

    /// Returns the public half as an opaque identity key.
    pub fn identity(&self) -> PublicKey {
        PublicKey::from(&self.public)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTAINER KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Symmetric key encrypting a private container's values at rest.
#[derive(Clone, Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
pub struct ContainerKey {
    bytes: [u8; SYMMETRIC_KEY_SIZE],
}

impl ContainerKey {
    /// Creates a key from a fixed-size array.
    pub fn from_array(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        sized(bytes).map(Self::from_array)
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for ContainerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContainerKey([REDACTED])")
    }
}
