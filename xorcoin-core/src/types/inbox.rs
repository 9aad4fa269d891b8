//! Transaction inbox types.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CoinId, KyberPublicKey, PublicKey};
use crate::error::{CoinError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTION ID
// ═══════════════════════════════════════════════════════════════════════════════

/// Id of a notification entry in an inbox (random 128 bits).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    /// Generates a fresh random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing entry key.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as the entry key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NOTIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Plaintext transfer notification.
///
/// Only ever exists just before sealing or just after unsealing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxNotification {
    /// Coins that were transferred
    pub coin_ids: Vec<CoinId>,
    /// Free-form message from the sender
    pub message: String,
    /// RFC 3339 UTC timestamp
    pub timestamp_utc: String,
}

impl TxNotification {
    /// Creates a notification stamped with the current time.
    pub fn new(coin_ids: Vec<CoinId>, message: impl Into<String>) -> Self {
        Self {
            coin_ids,
            message: message.into(),
            timestamp_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Serializes to the plaintext that gets sealed.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses an unsealed plaintext.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SEALED PAYLOAD
// ═══════════════════════════════════════════════════════════════════════════════

/// Sealed notification bytes as stored in an inbox entry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload(#[serde(with = "hex")] Vec<u8>);

impl EncryptedPayload {
    /// Wraps sealed bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the sealed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes self and returns the bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Number of sealed bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for an empty value, which marks a tombstoned entry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for EncryptedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncryptedPayload({} bytes)", self.0.len())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INBOX METADATA
// ═══════════════════════════════════════════════════════════════════════════════

/// The two public metadata entries of an inbox.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxKeys {
    /// Owner's wallet public key; becomes a coin's owner on transfer
    pub wallet_public_key: PublicKey,
    /// Key notifications are sealed to
    pub encryption_public_key: KyberPublicKey,
}

impl InboxKeys {
    /// Parses the stored metadata entries (hex text).
    pub fn from_entries(wallet_pk: &[u8], enc_pk: &[u8]) -> Result<Self> {
        let wallet_hex = std::str::from_utf8(wallet_pk)
            .map_err(|e| CoinError::ValidationError(format!("wallet key entry: {}", e)))?;
        let enc_hex = std::str::from_utf8(enc_pk)
            .map_err(|e| CoinError::ValidationError(format!("encryption key entry: {}", e)))?;

        Ok(Self {
            wallet_public_key: PublicKey::from_hex(wallet_hex)?,
            encryption_public_key: KyberPublicKey::from_hex(enc_hex)?,
        })
    }
}
