//! Wallets: the private list of coins a user holds.
//!
//! A wallet is a private container at `derive(owner)` with a single entry,
//! the JSON coin list encrypted under the wallet's container key. The
//! whole list is replaced on every write, under a version check, so
//! readers only ever see a complete snapshot.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use zeroize::{Zeroize, ZeroizeOnDrop};

use xorcoin_core::constants::{
    SYMMETRIC_KEY_SIZE, TYPE_TAG_WALLET, WALLET_COINS_KEY, WALLET_HANDLE_VERSION,
};
use xorcoin_core::error::{CoinError, Result};
use xorcoin_core::types::{CoinId, ContainerKey, ContainerPolicy, ContainerRef, PublicKey, Versioned, XorName};
use xorcoin_crypto::{decrypt, derive_address, encrypt, generate_container_key};

use crate::context::WalletContext;

/// Location of the wallet owned by `owner`.
pub fn wallet_location(owner: &PublicKey) -> ContainerRef {
    ContainerRef::new(derive_address(owner.as_bytes()), TYPE_TAG_WALLET)
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Portable reference to a wallet: where it lives and the key to read it.
///
/// Serialized with `bincode`; the bytes are opaque to users and round-trip
/// exactly between processes. Whoever holds a handle can read the coin list.
#[derive(Clone, PartialEq, Eq)]
pub struct WalletHandle {
    container: ContainerRef,
    key: ContainerKey,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct HandleWire {
    version: u8,
    address: String,
    type_tag: u64,
    key: [u8; SYMMETRIC_KEY_SIZE],
}

impl WalletHandle {
    /// Creates a handle.
    pub fn new(container: ContainerRef, key: ContainerKey) -> Self {
        Self { container, key }
    }

    /// The wallet container.
    pub fn container(&self) -> &ContainerRef {
        &self.container
    }

    /// The key the coin list is encrypted under.
    pub fn key(&self) -> &ContainerKey {
        &self.key
    }

    /// Serializes the handle.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let wire = HandleWire {
            version: WALLET_HANDLE_VERSION,
            address: self.container.address.to_string(),
            type_tag: self.container.type_tag,
            key: *self.key.as_bytes(),
        };
        bincode::serialize(&wire).map_err(|e| CoinError::BinarySerializationError(e.to_string()))
    }

    /// Parses a serialized handle.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let wire: HandleWire =
            bincode::deserialize(bytes).map_err(|e| CoinError::BinarySerializationError(e.to_string()))?;

        if wire.version != WALLET_HANDLE_VERSION {
            return Err(CoinError::VersionMismatch {
                expected: WALLET_HANDLE_VERSION,
                actual: wire.version,
            });
        }
        if wire.type_tag != TYPE_TAG_WALLET {
            return Err(CoinError::ValidationError(format!(
                "handle names type tag {}, not a wallet",
                wire.type_tag
            )));
        }

        Ok(Self {
            container: ContainerRef::new(XorName::new(wire.address.clone())?, wire.type_tag),
            key: ContainerKey::from_array(wire.key),
        })
    }

    /// Hex text form, for files and the command line.
    pub fn to_hex(&self) -> Result<String> {
        Ok(hex::encode(self.to_bytes()?))
    }

    /// Parses the hex text form.
    pub fn from_hex(s: &str) -> Result<Self> {
        Self::from_bytes(&hex::decode(s.trim())?)
    }
}

impl std::fmt::Debug for WalletHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletHandle")
            .field("container", &self.container)
            .field("key", &self.key)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Creates the wallet of the context's identity with an empty coin list.
///
/// Fails with `AlreadyExists` if a wallet is already at that address.
#[instrument(skip(ctx), fields(owner = %ctx.public_key().short()))]
pub async fn create_wallet(ctx: &WalletContext) -> Result<WalletHandle> {
    let owner = ctx.public_key();
    let handle = WalletHandle::new(wallet_location(&owner), generate_container_key());

    let coins = seal_coin_list(&handle, &[])?;
    ctx.store()
        .create(
            handle.container(),
            ContainerPolicy::private(owner),
            vec![(WALLET_COINS_KEY.to_string(), coins)],
        )
        .await?;

    info!(wallet = %handle.container(), "Created wallet");
    Ok(handle)
}

/// Reads the coin list together with its store version.
pub async fn load_wallet_versioned(ctx: &WalletContext, handle: &WalletHandle) -> Result<Versioned<Vec<CoinId>>> {
    ctx.store()
        .get(handle.container(), WALLET_COINS_KEY)
        .await?
        .try_map(|sealed| open_coin_list(handle, &sealed))
}

/// Reads the coin list.
#[instrument(skip(ctx, handle), fields(wallet = %handle.container()))]
pub async fn load_wallet(ctx: &WalletContext, handle: &WalletHandle) -> Result<Vec<CoinId>> {
    let coins = load_wallet_versioned(ctx, handle).await?;
    debug!(count = coins.value.len(), version = coins.version, "Loaded wallet");
    Ok(coins.value)
}

/// Replaces the coin list.
///
/// Reads the entry's current version and writes on that condition; if
/// another writer got in first this fails with `VersionConflict` and the
/// caller decides whether to re-read and try again. Returns the new version.
#[instrument(skip(ctx, handle, coin_ids), fields(wallet = %handle.container(), count = coin_ids.len()))]
pub async fn store_coins(ctx: &WalletContext, handle: &WalletHandle, coin_ids: &[CoinId]) -> Result<u64> {
    let mut seen = HashSet::with_capacity(coin_ids.len());
    if let Some(dup) = coin_ids.iter().find(|id| !seen.insert(**id)) {
        return Err(CoinError::ValidationError(format!("duplicate coin id {}", dup)));
    }

    let current = ctx.store().get(handle.container(), WALLET_COINS_KEY).await?;
    let sealed = seal_coin_list(handle, coin_ids)?;

    let version = ctx
        .store()
        .update(
            handle.container(),
            WALLET_COINS_KEY,
            sealed,
            current.version,
            &ctx.public_key(),
        )
        .await?;

    info!(version, "Stored coin list");
    Ok(version)
}

fn seal_coin_list(handle: &WalletHandle, coin_ids: &[CoinId]) -> Result<Vec<u8>> {
    encrypt(handle.key(), &serde_json::to_vec(coin_ids)?)
}

fn open_coin_list(handle: &WalletHandle, sealed: &[u8]) -> Result<Vec<CoinId>> {
    let plain = decrypt(handle.key(), sealed)?;
    Ok(serde_json::from_slice(&plain)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_store, new_context};
    use xorcoin_core::constants::XOR_ADDRESS_SIZE;
    use xorcoin_core::traits::ContainerStore;
    use xorcoin_core::types::XorAddress;

    fn coin(n: u8) -> CoinId {
        XorAddress::from_array([n; XOR_ADDRESS_SIZE])
    }

    #[tokio::test]
    async fn test_new_wallet_is_empty() {
        let ctx = new_context(memory_store());
        let handle = create_wallet(&ctx).await.unwrap();

        assert_eq!(handle.container(), &wallet_location(&ctx.public_key()));
        assert!(load_wallet(&ctx, &handle).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_then_load() {
        let ctx = new_context(memory_store());
        let handle = create_wallet(&ctx).await.unwrap();

        let v1 = store_coins(&ctx, &handle, &[coin(1), coin(2)]).await.unwrap();
        assert_eq!(v1, 1);
        assert_eq!(load_wallet(&ctx, &handle).await.unwrap(), vec![coin(1), coin(2)]);

        let v2 = store_coins(&ctx, &handle, &[coin(2)]).await.unwrap();
        assert_eq!(v2, 2);
        assert_eq!(load_wallet(&ctx, &handle).await.unwrap(), vec![coin(2)]);
    }

    #[tokio::test]
    async fn test_create_twice_already_exists() {
        let ctx = new_context(memory_store());
        create_wallet(&ctx).await.unwrap();
        assert!(matches!(create_wallet(&ctx).await, Err(CoinError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_duplicates_rejected() {
        let ctx = new_context(memory_store());
        let handle = create_wallet(&ctx).await.unwrap();
        let result = store_coins(&ctx, &handle, &[coin(1), coin(1)]).await;
        assert!(matches!(result, Err(CoinError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_store_sees_only_ciphertext() {
        let store = memory_store();
        let ctx = new_context(store.clone());
        let handle = create_wallet(&ctx).await.unwrap();
        store_coins(&ctx, &handle, &[coin(7)]).await.unwrap();

        let raw = store.get(handle.container(), WALLET_COINS_KEY).await.unwrap();
        let needle = coin(7).to_hex();
        assert!(!String::from_utf8_lossy(&raw.value).contains(&needle));
    }

    #[tokio::test]
    async fn test_wrong_handle_key_cannot_read() {
        let ctx = new_context(memory_store());
        let handle = create_wallet(&ctx).await.unwrap();
        let forged = WalletHandle::new(handle.container().clone(), generate_container_key());
        assert!(matches!(
            load_wallet(&ctx, &forged).await,
            Err(CoinError::DecryptionFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_writer_conflicts() {
        let store = memory_store();
        let ctx = new_context(store.clone());
        let handle = create_wallet(&ctx).await.unwrap();

        // Another writer read version 0 and commits first
        let observed = load_wallet_versioned(&ctx, &handle).await.unwrap();
        store_coins(&ctx, &handle, &[coin(1)]).await.unwrap();

        let stale = store
            .update(
                handle.container(),
                WALLET_COINS_KEY,
                seal_coin_list(&handle, &[coin(9)]).unwrap(),
                observed.version,
                &ctx.public_key(),
            )
            .await;
        assert!(matches!(stale, Err(CoinError::VersionConflict { .. })));
        assert_eq!(load_wallet(&ctx, &handle).await.unwrap(), vec![coin(1)]);
    }

    #[tokio::test]
    async fn test_handle_bytes_roundtrip_across_contexts() {
        let store = memory_store();
        let ctx = new_context(store.clone());
        let handle = create_wallet(&ctx).await.unwrap();
        store_coins(&ctx, &handle, &[coin(3)]).await.unwrap();

        let restored = WalletHandle::from_bytes(&handle.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, handle);
        let from_text = WalletHandle::from_hex(&handle.to_hex().unwrap()).unwrap();
        assert_eq!(load_wallet(&ctx, &from_text).await.unwrap(), vec![coin(3)]);
    }

    #[test]
    fn test_handle_rejects_garbage_and_future_versions() {
        assert!(WalletHandle::from_bytes(&[1, 2, 3]).is_err());

        let handle = WalletHandle::new(wallet_location(&PublicKey::default()), generate_container_key());
        let mut bytes = handle.to_bytes().unwrap();
        bytes[0] = WALLET_HANDLE_VERSION + 1;
        assert!(matches!(
            WalletHandle::from_bytes(&bytes),
            Err(CoinError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_handle_debug_redacts_key() {
        let handle = WalletHandle::new(wallet_location(&PublicKey::default()), generate_container_key());
        let hex_key = hex::encode(handle.key().as_bytes());
        assert!(!format!("{:?}", handle).contains(&hex_key));
    }
}
