//! Container policy and entry types shared by store implementations.

use serde::{Deserialize, Serialize};

use super::PublicKey;

/// Whether a container's values are readable by anyone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// Anyone can read values
    Public,
    /// Values are encrypted by the holder of the container key
    Private,
}

/// Who may mutate a container.
///
/// The owner may always insert, update and delete. `open_insert` lets
/// anyone insert new entries (transaction inboxes); `open_update` lets anyone
/// update existing entries (coins, whose guard is the ownership check and
/// the version condition rather than the store's permissions).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPolicy {
    /// Container kind
    pub kind: ContainerKind,
    /// Container owner
    pub owner: PublicKey,
    /// Anyone may insert
    #[serde(default)]
    pub open_insert: bool,
    /// Anyone may update
    #[serde(default)]
    pub open_update: bool,
}

impl ContainerPolicy {
    /// Private container writable only by its owner.
    pub fn private(owner: PublicKey) -> Self {
        Self {
            kind: ContainerKind::Private,
            owner,
            open_insert: false,
            open_update: false,
        }
    }

    /// Public container writable only by its owner.
    pub fn public(owner: PublicKey) -> Self {
        Self {
            kind: ContainerKind::Public,
            owner,
            open_insert: false,
            open_update: false,
        }
    }

    /// Allows anyone to insert.
    pub fn with_open_insert(mut self) -> Self {
        self.open_insert = true;
        self
    }

    /// Allows anyone to update.
    pub fn with_open_update(mut self) -> Self {
        self.open_update = true;
        self
    }

    /// Returns true if `signer` may insert new entries.
    pub fn may_insert(&self, signer: &PublicKey) -> bool {
        self.open_insert || &self.owner == signer
    }

    /// Returns true if `signer` may update existing entries.
    pub fn may_update(&self, signer: &PublicKey) -> bool {
        self.open_update || &self.owner == signer
    }

    /// Returns true if `signer` may delete entries. Only the owner may.
    pub fn may_delete(&self, signer: &PublicKey) -> bool {
        &self.owner == signer
    }
}

/// One entry of a container listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerEntry {
    /// Entry key
    pub key: String,
    /// Entry value; empty for tombstones
    #[serde(with = "hex")]
    pub value: Vec<u8>,
    /// Entry version
    pub version: u64,
}

impl ContainerEntry {
    /// True if the entry was deleted and only its tombstone remains.
    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }
}
