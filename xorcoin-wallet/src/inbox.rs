//! Transaction inboxes.
//!
//! An inbox is a public container at `derive(owner)` that anyone may insert
//! into and only the owner may delete from. Two entries are metadata:
//! `__wallet_pk`, the key a sender writes as the coin's new owner, and
//! `__tx_enc_pk`, the key notifications are sealed to. Every other live
//! entry is a sealed [`TxNotification`] keyed by a random [`TxId`].
//!
//! The inbox encryption key pair is generated here and handed to the
//! caller; nothing else keeps a copy.

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use xorcoin_core::constants::{INBOX_ENC_PK_KEY, INBOX_WALLET_PK_KEY};
use xorcoin_core::error::{CoinError, Result};
use xorcoin_core::types::{
    CoinId, ContainerPolicy, EncryptedPayload, InboxKeys, InboxLocation, KeyPair, KyberPublicKey, TxId,
    TxNotification,
};
use xorcoin_crypto::{generate_keypair, seal, unseal};
use xorcoin_identity::inbox_location;

use crate::context::WalletContext;

// ═══════════════════════════════════════════════════════════════════════════════
// LISTING TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// An inbox entry id with the version it was observed at.
///
/// Removal is conditioned on that version, so an entry that changed after
/// listing is left alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    /// Entry id
    pub id: TxId,
    /// Version at listing time
    pub version: u64,
}

/// A notification that was unsealed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedTx {
    /// Entry id
    pub id: TxId,
    /// Version at listing time
    pub version: u64,
    /// The plaintext notification
    pub notification: TxNotification,
}

impl ReceivedTx {
    /// Receipt for removing this entry.
    pub fn receipt(&self) -> TxReceipt {
        TxReceipt {
            id: self.id.clone(),
            version: self.version,
        }
    }
}

/// An entry that could not be read with the inbox key pair.
#[derive(Debug)]
pub struct UndecryptableTx {
    /// Entry id
    pub id: TxId,
    /// Version at listing time
    pub version: u64,
    /// Why it could not be read
    pub reason: CoinError,
}

impl UndecryptableTx {
    /// Receipt for removing this entry.
    pub fn receipt(&self) -> TxReceipt {
        TxReceipt {
            id: self.id.clone(),
            version: self.version,
        }
    }
}

/// Result of listing an inbox.
///
/// Entries that fail to unseal or parse are reported next to the readable
/// ones instead of failing the whole listing.
#[derive(Debug, Default)]
pub struct InboxListing {
    /// Readable notifications, in entry key order
    pub received: Vec<ReceivedTx>,
    /// Entries that could not be read
    pub undecryptable: Vec<UndecryptableTx>,
}

impl InboxListing {
    /// Total number of live notification entries.
    pub fn len(&self) -> usize {
        self.received.len() + self.undecryptable.len()
    }

    /// True if the inbox holds no live notifications.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receipts for every listed entry, readable or not.
    pub fn receipts(&self) -> Vec<TxReceipt> {
        self.received
            .iter()
            .map(ReceivedTx::receipt)
            .chain(self.undecryptable.iter().map(UndecryptableTx::receipt))
            .collect()
    }
}

/// Per-entry outcome of a batch removal.
#[derive(Debug, Default)]
pub struct RemovalReport {
    /// Entries that were tombstoned
    pub removed: Vec<TxId>,
    /// Entries left in place, with the reason
    pub failed: Vec<(TxId, CoinError)>,
}

impl RemovalReport {
    /// True if every requested entry was removed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Creates the inbox of the context's identity.
///
/// Returns the freshly generated inbox encryption key pair. The caller must
/// persist it: notifications sealed to it cannot be read without it.
/// Fails with `AlreadyExists` if an inbox is already at that address.
#[instrument(skip(ctx), fields(owner = %ctx.public_key().short()))]
pub async fn create_tx_inbox(ctx: &WalletContext) -> Result<KeyPair> {
    let owner = ctx.public_key();
    let inbox_keys = generate_keypair()?;
    let location = inbox_location(&owner);

    ctx.store()
        .create(
            &location,
            ContainerPolicy::public(owner.clone()).with_open_insert(),
            vec![
                (INBOX_WALLET_PK_KEY.to_string(), owner.to_hex().into_bytes()),
                (INBOX_ENC_PK_KEY.to_string(), inbox_keys.public.to_hex().into_bytes()),
            ],
        )
        .await?;

    info!(inbox = %location, "Created transaction inbox");
    Ok(inbox_keys)
}

/// Reads the two public metadata entries of the inbox at `location`.
#[instrument(skip(ctx), fields(inbox = %location))]
pub async fn fetch_inbox_keys(ctx: &WalletContext, location: &InboxLocation) -> Result<InboxKeys> {
    let wallet_pk = ctx.store().get(location, INBOX_WALLET_PK_KEY).await?;
    let enc_pk = ctx.store().get(location, INBOX_ENC_PK_KEY).await?;
    InboxKeys::from_entries(&wallet_pk.value, &enc_pk.value)
}

/// Lists and unseals the notifications in the context's own inbox.
///
/// Metadata entries and tombstones are skipped.
#[instrument(skip(ctx, inbox_keys), fields(owner = %ctx.public_key().short()))]
pub async fn list_tx_inbox(ctx: &WalletContext, inbox_keys: &KeyPair) -> Result<InboxListing> {
    let location = inbox_location(&ctx.public_key());
    let entries = ctx.store().entries(&location).await?;

    let mut listing = InboxListing::default();
    for entry in entries {
        if is_metadata_key(&entry.key) || entry.is_tombstone() {
            continue;
        }

        let id = TxId::new(entry.key);
        let payload = EncryptedPayload::from_bytes(entry.value);
        match open_notification(&payload, inbox_keys) {
            Ok(notification) => listing.received.push(ReceivedTx {
                id,
                version: entry.version,
                notification,
            }),
            Err(reason) => {
                warn!(tx = %id, error = %reason, "Skipping undecryptable inbox entry");
                listing.undecryptable.push(UndecryptableTx {
                    id,
                    version: entry.version,
                    reason,
                });
            }
        }
    }

    debug!(
        received = listing.received.len(),
        undecryptable = listing.undecryptable.len(),
        "Listed transaction inbox"
    );
    Ok(listing)
}

/// Inserts a sealed notification under `id`.
///
/// Fails with `DuplicateId` if the id is already present.
#[instrument(skip(ctx, payload), fields(inbox = %location, tx = %id, bytes = payload.len()))]
pub async fn insert_notification(
    ctx: &WalletContext,
    location: &InboxLocation,
    id: &TxId,
    payload: EncryptedPayload,
) -> Result<()> {
    if is_metadata_key(id.as_str()) {
        return Err(CoinError::ValidationError(format!("'{}' is a reserved inbox key", id)));
    }
    if payload.is_empty() {
        return Err(CoinError::ValidationError(format!("empty payload for '{}'", id)));
    }
    ctx.store()
        .insert(location, id.as_str(), payload.into_bytes(), &ctx.public_key())
        .await
}

/// Removes processed entries from the context's own inbox.
///
/// Deletes are issued together and each is conditioned on the version in
/// its receipt. Failures are reported per entry; entries that fail stay in
/// place for the next listing.
#[instrument(skip(ctx, receipts), fields(count = receipts.len()))]
pub async fn remove_from_tx_inbox(ctx: &WalletContext, receipts: &[TxReceipt]) -> Result<RemovalReport> {
    let owner = ctx.public_key();
    let location = inbox_location(&owner);

    let deletes = receipts.iter().map(|receipt| {
        let owner = &owner;
        let location = &location;
        async move {
            let result = ctx
                .store()
                .delete(location, receipt.id.as_str(), receipt.version, owner)
                .await;
            (receipt.id.clone(), result)
        }
    });

    let mut report = RemovalReport::default();
    for (id, result) in join_all(deletes).await {
        match result {
            Ok(_) => report.removed.push(id),
            Err(e) => {
                warn!(tx = %id, error = %e, "Inbox entry not removed");
                report.failed.push((id, e));
            }
        }
    }

    info!(removed = report.removed.len(), failed = report.failed.len(), "Cleaned transaction inbox");
    Ok(report)
}

/// Seals a notification about `coin_ids` and inserts it into the inbox at `location`.
///
/// Usable on its own to re-deliver a notification after a transfer whose
/// coin update landed but whose notification did not.
#[instrument(skip(ctx, encryption_key, coin_ids, message), fields(inbox = %location, coins = coin_ids.len()))]
pub async fn send_transfer_notification(
    ctx: &WalletContext,
    location: &InboxLocation,
    encryption_key: &KyberPublicKey,
    coin_ids: Vec<CoinId>,
    message: &str,
) -> Result<TxId> {
    let notification = TxNotification::new(coin_ids, message);
    let payload = seal(notification.to_bytes()?, encryption_key)?;

    let id = TxId::random();
    insert_notification(ctx, location, &id, payload).await?;

    info!(tx = %id, "Sent transfer notification");
    Ok(id)
}

fn is_metadata_key(key: &str) -> bool {
    key == INBOX_WALLET_PK_KEY || key == INBOX_ENC_PK_KEY
}

fn open_notification(payload: &EncryptedPayload, inbox_keys: &KeyPair) -> Result<TxNotification> {
    let plain = unseal(payload, inbox_keys)?;
    TxNotification::from_bytes(&plain)
}
