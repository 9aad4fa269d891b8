//! Address types for XORCOIN.
//!
//! - [`XorAddress`]: 32-byte content address derived from a key
//! - [`XorName`]: store locator of a container, as written in links
//! - [`ContainerRef`]: locator + type tag, enough to open a container
//! - [`RecipientRef`]: who a coin is being sent to

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use super::PublicKey;
use crate::constants::XOR_ADDRESS_SIZE;
use crate::error::{CoinError, Result};

/// Numeric tag distinguishing container kinds that share an address.
pub type TypeTag = u64;

// ═══════════════════════════════════════════════════════════════════════════════
// XOR ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Content address of a container in the store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct XorAddress([u8; XOR_ADDRESS_SIZE]);

/// Coins are identified by the address of their container.
pub type CoinId = XorAddress;

impl XorAddress {
    /// Creates an address from a fixed-size array.
    pub fn from_array(bytes: [u8; XOR_ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates an address from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; XOR_ADDRESS_SIZE] = bytes.try_into().map_err(|_| {
            CoinError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                XOR_ADDRESS_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; XOR_ADDRESS_SIZE] {
        &self.0
    }

    /// Returns the hex-encoded address.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex-encoded address.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| CoinError::InvalidAddress(format!("{}: {}", s, e)))?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for XorAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "XorAddress({}..)", hex::encode(&self.0[..6]))
    }
}

impl std::fmt::Display for XorAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for XorAddress {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for XorAddress {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for XorAddress {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// XOR NAME
// ═══════════════════════════════════════════════════════════════════════════════

/// Store locator of a container.
///
/// Locators of derived containers are the hex form of an [`XorAddress`].
/// Locators read from identity document links are opaque and kept exactly
/// as written; the store decides whether anything lives there.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct XorName(String);

impl XorName {
    /// Wraps a locator. Blank locators are rejected.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CoinError::InvalidAddress("empty locator".into()));
        }
        Ok(Self(name))
    }

    /// The locator text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The content address this locator names, if it is one.
    pub fn to_address(&self) -> Option<XorAddress> {
        XorAddress::from_hex(&self.0).ok()
    }
}

impl From<XorAddress> for XorName {
    fn from(address: XorAddress) -> Self {
        Self(address.to_hex())
    }
}

impl From<&XorAddress> for XorName {
    fn from(address: &XorAddress) -> Self {
        Self(address.to_hex())
    }
}

impl TryFrom<String> for XorName {
    type Error = CoinError;

    fn try_from(name: String) -> Result<Self> {
        Self::new(name)
    }
}

impl From<XorName> for String {
    fn from(name: XorName) -> Self {
        name.0
    }
}

impl PartialEq<XorAddress> for XorName {
    fn eq(&self, other: &XorAddress) -> bool {
        self.0 == other.to_hex()
    }
}

impl FromStr for XorName {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl std::fmt::Debug for XorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "XorName({})", self.0)
    }
}

impl std::fmt::Display for XorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTAINER REFERENCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Locator and type tag of a container.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRef {
    /// Container locator
    pub address: XorName,
    /// Container type tag
    pub type_tag: TypeTag,
}

/// Where a recipient's transaction inbox lives.
pub type InboxLocation = ContainerRef;

impl ContainerRef {
    /// Creates a container reference.
    pub fn new(address: impl Into<XorName>, type_tag: TypeTag) -> Self {
        Self {
            address: address.into(),
            type_tag,
        }
    }
}

impl std::fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.address, self.type_tag)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECIPIENT REFERENCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Reference to the recipient of a transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecipientRef {
    /// The recipient's wallet public key; the inbox address is derived from it.
    Raw(PublicKey),
    /// An identity document whose wallet inbox link names the inbox.
    Identity(Url),
}

impl RecipientRef {
    /// Parses a recipient reference.
    ///
    /// Anything with a URL scheme is an identity document location;
    /// anything else must be a hex-encoded public key.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CoinError::InvalidRecipient("empty recipient".into()));
        }

        if s.contains("://") {
            return Ok(RecipientRef::Identity(Url::parse(s)?));
        }

        PublicKey::from_hex(s)
            .map(RecipientRef::Raw)
            .map_err(|e| CoinError::InvalidRecipient(format!("'{}': {}", s, e)))
    }
}

impl FromStr for RecipientRef {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for RecipientRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecipientRef::Raw(key) => write!(f, "{}", key),
            RecipientRef::Identity(url) => write!(f, "{}", url),
        }
    }
}
