//! Collaborator interfaces for XORCOIN.
//!
//! The protocol runs on top of a versioned key-value store and reads identity
//! documents from elsewhere; both are consumed through these traits so that
//! in-memory, file-backed and networked implementations are interchangeable.

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::types::{ContainerEntry, ContainerPolicy, ContainerRef, IdentityDocument, PublicKey, Versioned};

// ═══════════════════════════════════════════════════════════════════════════════
// CONTAINER STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Versioned key-value containers.
///
/// Every entry carries a version. Inserts start an entry at version 0.
/// `update` and `delete` take the version the caller last *observed* and the
/// store moves the entry to `observed + 1`, failing with `VersionConflict`
/// if anything else wrote in between. Deletes leave a tombstone (empty
/// value) so the version history survives; a tombstoned key cannot be
/// inserted again.
///
/// Mutations name a `signer`; the container's [`ContainerPolicy`] decides
/// whether the signer may perform them (`PermissionDenied` otherwise).
///
/// Implementations might use:
/// - In-memory storage (for testing/development)
/// - A local file (single-user deployments)
/// - A distributed network client
#[async_trait]
pub trait ContainerStore: Send + Sync {
    /// Creates a container seeded with `entries` (each at version 0).
    ///
    /// Fails with `AlreadyExists` if the container exists.
    async fn create(
        &self,
        container: &ContainerRef,
        policy: ContainerPolicy,
        entries: Vec<(String, Vec<u8>)>,
    ) -> Result<()>;

    /// Returns true if the container exists.
    async fn exists(&self, container: &ContainerRef) -> Result<bool>;

    /// Reads one entry with its version. Fails with `NotFound`.
    async fn get(&self, container: &ContainerRef, key: &str) -> Result<Versioned<Vec<u8>>>;

    /// Inserts a new entry. Fails with `DuplicateId` if the key is taken.
    async fn insert(
        &self,
        container: &ContainerRef,
        key: &str,
        value: Vec<u8>,
        signer: &PublicKey,
    ) -> Result<()>;

    /// Replaces an entry's value if its version is still `observed_version`.
    ///
    /// Returns the new version.
    async fn update(
        &self,
        container: &ContainerRef,
        key: &str,
        value: Vec<u8>,
        observed_version: u64,
        signer: &PublicKey,
    ) -> Result<u64>;

    /// Tombstones an entry if its version is still `observed_version`.
    ///
    /// Returns the tombstone's version.
    async fn delete(
        &self,
        container: &ContainerRef,
        key: &str,
        observed_version: u64,
        signer: &PublicKey,
    ) -> Result<u64>;

    /// Lists every entry, tombstones included.
    async fn entries(&self, container: &ContainerRef) -> Result<Vec<ContainerEntry>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITY DOCUMENT TRAITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Source of identity documents.
#[async_trait]
pub trait IdentityDocuments: Send + Sync {
    /// Fetches the document at `url`.
    ///
    /// Fails with `Unreachable` or `NotFound` when it cannot be read.
    async fn fetch(&self, url: &Url) -> Result<IdentityDocument>;

    /// Writes `document` back to `url`.
    ///
    /// Fails with `PermissionDenied` when the caller holds no write grant.
    async fn commit(&self, url: &Url, document: &IdentityDocument) -> Result<()>;
}

/// Obtains write permission for an identity document.
///
/// The exchange itself (prompting a user, talking to an authenticator) is
/// outside the protocol; the resolver only calls this once after a
/// `PermissionDenied` commit.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Requests write permission for the document at `url`.
    async fn authorize_write(&self, url: &Url) -> Result<()>;
}
