//! Coin ownership records.

use serde::{Deserialize, Serialize};

use super::PublicKey;
use crate::error::Result;

/// The single entry stored in a coin container.
///
/// Exactly one `owner` is current at any time. `prev_owner` records who
/// transferred the coin last and is absent for freshly minted coins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinRecord {
    /// Current owner
    pub owner: PublicKey,
    /// Owner before the last transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_owner: Option<PublicKey>,
}

impl CoinRecord {
    /// Creates a record for a coin nobody has transferred yet.
    pub fn new(owner: PublicKey) -> Self {
        Self {
            owner,
            prev_owner: None,
        }
    }

    /// Returns the record after `owner` hands the coin to `new_owner`.
    pub fn transferred_to(&self, new_owner: PublicKey) -> Self {
        Self {
            owner: new_owner,
            prev_owner: Some(self.owner.clone()),
        }
    }

    /// Returns true if `key` is the current owner.
    pub fn is_owned_by(&self, key: &PublicKey) -> bool {
        &self.owner == key
    }

    /// Serializes to the stored JSON form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses the stored JSON form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A value paired with the store version it was read at.
///
/// Writes that depend on the value hand `version` back to the store so it
/// can reject the write if anything changed in between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned<T> {
    /// The value as read
    pub value: T,
    /// Store version of the entry at read time
    pub version: u64,
}

impl<T> Versioned<T> {
    /// Pairs a value with its version.
    pub fn new(value: T, version: u64) -> Self {
        Self { value, version }
    }

    /// Maps the value, keeping the version.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Versioned<U> {
        Versioned {
            value: f(self.value),
            version: self.version,
        }
    }

    /// Maps the value fallibly, keeping the version.
    pub fn try_map<U>(self, f: impl FnOnce(T) -> Result<U>) -> Result<Versioned<U>> {
        Ok(Versioned {
            value: f(self.value)?,
            version: self.version,
        })
    }
}
