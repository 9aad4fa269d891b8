//! The coin transfer protocol.
//!
//! ```text
//! Init ──▶ OwnershipVerified ──▶ RecipientResolved ──▶ CoinUpdated ──▶ NotificationSent ──▶ Done
//!   └──────────────┴───────────────────┴─────────────────────┴──▶ Aborted
//! ```
//!
//! Every step before `CoinUpdated` aborts without side effects. Once the
//! coin update has landed the transfer has happened: a notification that
//! cannot be delivered is reported in the outcome, never rolled back, and
//! can be re-sent with [`send_transfer_notification`].
//!
//! Nothing here retries. A `VersionConflict` at the coin update means
//! someone else moved the coin first; the caller restarts from `Init`,
//! where the ownership check settles whether there is anything left to do.

use tracing::{debug, info, instrument, warn};

use xorcoin_core::error::{CoinError, Result};
use xorcoin_core::types::{CoinId, InboxKeys, InboxLocation, PublicKey, RecipientRef, TxId};

use crate::coin::{check_ownership, reassign_coin};
use crate::context::WalletContext;
use crate::inbox::{fetch_inbox_keys, send_transfer_notification};

/// Steps of a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferState {
    /// Nothing read yet
    Init,
    /// The caller owns the coin at the observed version
    OwnershipVerified,
    /// The recipient's inbox location is known
    RecipientResolved,
    /// The coin names the recipient as owner
    CoinUpdated,
    /// The recipient's inbox holds the notification
    NotificationSent,
    /// Finished
    Done,
    /// Stopped on an error
    Aborted,
}

/// Whether the recipient was told about a completed transfer.
#[derive(Debug)]
pub enum NotificationStatus {
    /// Notification inserted under this id
    Delivered(TxId),
    /// Coin moved, notification not inserted
    Failed(CoinError),
}

/// Result of a transfer whose coin update succeeded.
#[derive(Debug)]
pub struct TransferOutcome {
    /// The transferred coin
    pub coin_id: CoinId,
    /// Coin version after the update
    pub coin_version: u64,
    /// The coin's owner now
    pub new_owner: PublicKey,
    /// Inbox the notification was addressed to
    pub recipient: InboxLocation,
    /// Keys published by that inbox
    pub recipient_keys: InboxKeys,
    /// Delivery of the notification
    pub notification: NotificationStatus,
}

impl TransferOutcome {
    /// True if the notification reached the recipient's inbox.
    pub fn is_delivered(&self) -> bool {
        matches!(self.notification, NotificationStatus::Delivered(_))
    }

    /// The state the transfer finished in.
    pub fn state(&self) -> TransferState {
        if self.is_delivered() {
            TransferState::Done
        } else {
            TransferState::CoinUpdated
        }
    }
}

/// Logs state transitions of one transfer.
struct Progress {
    coin_id: CoinId,
    state: TransferState,
}

impl Progress {
    fn new(coin_id: CoinId) -> Self {
        Self {
            coin_id,
            state: TransferState::Init,
        }
    }

    fn advance(&mut self, next: TransferState) {
        debug!(coin = %self.coin_id, from = ?self.state, to = ?next, "Transfer step");
        self.state = next;
    }

    fn abort(&mut self, error: CoinError) -> CoinError {
        warn!(coin = %self.coin_id, at = ?self.state, error = %error, "Transfer aborted");
        self.state = TransferState::Aborted;
        error
    }
}

/// Transfers `coin_id` from the context's identity to `recipient`.
///
/// Returns `Err` only if the coin did not move. An `Ok` outcome always
/// means the coin now belongs to the recipient; check
/// [`TransferOutcome::notification`] for whether they were told.
#[instrument(skip(ctx, message), fields(coin = %coin_id, recipient = %recipient))]
pub async fn transfer_coin(
    ctx: &WalletContext,
    coin_id: &CoinId,
    recipient: &RecipientRef,
    message: &str,
) -> Result<TransferOutcome> {
    let mut progress = Progress::new(*coin_id);
    let caller = ctx.public_key();

    let observed = check_ownership(ctx, coin_id, &caller)
        .await
        .map_err(|e| progress.abort(e))?;
    progress.advance(TransferState::OwnershipVerified);

    let location = ctx
        .resolver()
        .resolve(recipient)
        .await
        .map_err(|e| progress.abort(e))?;
    progress.advance(TransferState::RecipientResolved);

    let recipient_keys = fetch_inbox_keys(ctx, &location)
        .await
        .map_err(|e| progress.abort(e))?;
    let updated = reassign_coin(ctx, coin_id, &observed, recipient_keys.wallet_public_key.clone())
        .await
        .map_err(|e| progress.abort(e))?;
    progress.advance(TransferState::CoinUpdated);

    let notification = match send_transfer_notification(
        ctx,
        &location,
        &recipient_keys.encryption_public_key,
        vec![*coin_id],
        message,
    )
    .await
    {
        Ok(tx_id) => {
            progress.advance(TransferState::NotificationSent);
            NotificationStatus::Delivered(tx_id)
        }
        Err(e) => {
            warn!(
                coin = %coin_id,
                inbox = %location,
                error = %e,
                "Coin transferred but recipient was not notified"
            );
            NotificationStatus::Failed(e)
        }
    };

    let outcome = TransferOutcome {
        coin_id: *coin_id,
        coin_version: updated.version,
        new_owner: updated.value.owner,
        recipient: location,
        recipient_keys,
        notification,
    };
    progress.advance(outcome.state());

    info!(
        version = outcome.coin_version,
        new_owner = %outcome.new_owner.short(),
        delivered = outcome.is_delivered(),
        "Transfer complete"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use url::Url;
    use xorcoin_core::traits::ContainerStore;
    use xorcoin_core::types::{ContainerEntry, ContainerPolicy, ContainerRef, IdentityDocument, Versioned};
    use xorcoin_identity::{inbox_location, GrantingAuthorizer, MemoryDocuments, RecipientResolver};
    use xorcoin_store::MemoryStore;

    use crate::coin::fetch_coin;
    use crate::inbox::{create_tx_inbox, list_tx_inbox};
    use crate::test_support::{memory_store, mint_coin, new_context};
    use crate::wallet::{create_wallet, load_wallet, store_coins};

    /// Store whose inserts can be switched off.
    struct FailingInserts {
        inner: MemoryStore,
        fail: AtomicBool,
    }

    impl FailingInserts {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl ContainerStore for FailingInserts {
        async fn create(
            &self,
            container: &ContainerRef,
            policy: ContainerPolicy,
            entries: Vec<(String, Vec<u8>)>,
        ) -> Result<()> {
            self.inner.create(container, policy, entries).await
        }

        async fn exists(&self, container: &ContainerRef) -> Result<bool> {
            self.inner.exists(container).await
        }

        async fn get(&self, container: &ContainerRef, key: &str) -> Result<Versioned<Vec<u8>>> {
            self.inner.get(container, key).await
        }

        async fn insert(&self, container: &ContainerRef, key: &str, value: Vec<u8>, signer: &PublicKey) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(CoinError::HttpError("insert dropped".into()));
            }
            self.inner.insert(container, key, value, signer).await
        }

        async fn update(
            &self,
            container: &ContainerRef,
            key: &str,
            value: Vec<u8>,
            observed_version: u64,
            signer: &PublicKey,
        ) -> Result<u64> {
            self.inner.update(container, key, value, observed_version, signer).await
        }

        async fn delete(
            &self,
            container: &ContainerRef,
            key: &str,
            observed_version: u64,
            signer: &PublicKey,
        ) -> Result<u64> {
            self.inner.delete(container, key, observed_version, signer).await
        }

        async fn entries(&self, container: &ContainerRef) -> Result<Vec<ContainerEntry>> {
            self.inner.entries(container).await
        }
    }

    #[tokio::test]
    async fn test_end_to_end_transfer() {
        let store = memory_store();
        let alice = new_context(store.clone());
        let bob = new_context(store.clone());

        create_wallet(&alice).await.unwrap();
        create_tx_inbox(&alice).await.unwrap();
        let bob_wallet = create_wallet(&bob).await.unwrap();
        let bob_inbox = create_tx_inbox(&bob).await.unwrap();

        let coin_id = mint_coin(store.as_ref(), &alice.public_key(), 3).await;

        let outcome = transfer_coin(&alice, &coin_id, &RecipientRef::Raw(bob.public_key()), "for lunch")
            .await
            .unwrap();
        assert_eq!(outcome.state(), TransferState::Done);
        assert_eq!(outcome.new_owner, bob.public_key());
        assert_eq!(outcome.coin_version, 4);

        let record = fetch_coin(&bob, &coin_id).await.unwrap();
        assert_eq!(record.version, 4);
        assert_eq!(record.value.owner, bob.public_key());
        assert_eq!(record.value.prev_owner, Some(alice.public_key()));

        let listing = list_tx_inbox(&bob, &bob_inbox).await.unwrap();
        assert_eq!(listing.received.len(), 1);
        assert!(listing.undecryptable.is_empty());
        let received = &listing.received[0];
        assert_eq!(received.notification.coin_ids, vec![coin_id]);
        assert_eq!(received.notification.message, "for lunch");
        assert!(matches!(&outcome.notification, NotificationStatus::Delivered(id) if *id == received.id));

        // Bob records the coin himself
        let mut coins = load_wallet(&bob, &bob_wallet).await.unwrap();
        coins.extend(received.notification.coin_ids.iter().copied());
        store_coins(&bob, &bob_wallet, &coins).await.unwrap();
        assert_eq!(load_wallet(&bob, &bob_wallet).await.unwrap(), vec![coin_id]);
    }

    #[tokio::test]
    async fn test_non_owner_writes_nothing() {
        let store = memory_store();
        let alice = new_context(store.clone());
        let bob = new_context(store.clone());
        let mallory = new_context(store.clone());
        let bob_inbox = create_tx_inbox(&bob).await.unwrap();
        let coin_id = mint_coin(store.as_ref(), &alice.public_key(), 1).await;
        let updates_before = store.stats().updates;

        let result = transfer_coin(&mallory, &coin_id, &RecipientRef::Raw(bob.public_key()), "").await;
        assert!(matches!(result, Err(CoinError::OwnershipMismatch { .. })));

        let record = fetch_coin(&alice, &coin_id).await.unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.value.owner, alice.public_key());
        assert_eq!(store.stats().updates, updates_before);
        assert!(list_tx_inbox(&bob, &bob_inbox).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recipient_without_inbox_aborts_before_update() {
        let store = memory_store();
        let alice = new_context(store.clone());
        let bob = new_context(store.clone());
        let coin_id = mint_coin(store.as_ref(), &alice.public_key(), 0).await;

        let result = transfer_coin(&alice, &coin_id, &RecipientRef::Raw(bob.public_key()), "").await;
        assert!(matches!(result, Err(CoinError::NotFound(_))));
        assert_eq!(fetch_coin(&alice, &coin_id).await.unwrap().value.owner, alice.public_key());
    }

    #[tokio::test]
    async fn test_identity_url_without_document_source_aborts() {
        let store = memory_store();
        let alice = new_context(store.clone());
        let coin_id = mint_coin(store.as_ref(), &alice.public_key(), 0).await;
        let url = Url::parse("https://bob.example/card#me").unwrap();

        let result = transfer_coin(&alice, &coin_id, &RecipientRef::Identity(url), "").await;
        assert!(matches!(result, Err(CoinError::ConfigError(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_double_spend_single_winner() {
        let store = memory_store();
        let alice = new_context(store.clone());
        let bob = new_context(store.clone());
        let carol = new_context(store.clone());
        create_tx_inbox(&bob).await.unwrap();
        create_tx_inbox(&carol).await.unwrap();
        let coin_id = mint_coin(store.as_ref(), &alice.public_key(), 0).await;

        let mut handles = Vec::new();
        for recipient in [bob.public_key(), carol.public_key(), bob.public_key(), carol.public_key()] {
            let ctx = alice.clone();
            handles.push(tokio::spawn(async move {
                transfer_coin(&ctx, &coin_id, &RecipientRef::Raw(recipient), "race").await
            }));
        }

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(outcome) => winners.push(outcome.new_owner),
                Err(CoinError::VersionConflict { .. }) | Err(CoinError::OwnershipMismatch { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(winners.len(), 1);
        let record = fetch_coin(&alice, &coin_id).await.unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.value.owner, winners[0]);
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_transfer() {
        let store = Arc::new(FailingInserts::new());
        let alice = new_context(store.clone());
        let bob = new_context(store.clone());
        let bob_inbox = create_tx_inbox(&bob).await.unwrap();
        let coin_id = mint_coin(store.as_ref(), &alice.public_key(), 2).await;

        store.fail.store(true, Ordering::SeqCst);
        let outcome = transfer_coin(&alice, &coin_id, &RecipientRef::Raw(bob.public_key()), "hi")
            .await
            .unwrap();
        assert_eq!(outcome.state(), TransferState::CoinUpdated);
        assert!(matches!(outcome.notification, NotificationStatus::Failed(CoinError::HttpError(_))));

        // Ownership moved and stays moved
        let record = fetch_coin(&alice, &coin_id).await.unwrap();
        assert_eq!(record.version, 3);
        assert_eq!(record.value.owner, bob.public_key());
        assert!(list_tx_inbox(&bob, &bob_inbox).await.unwrap().is_empty());

        // Delivery can be retried without touching the coin
        store.fail.store(false, Ordering::SeqCst);
        send_transfer_notification(
            &alice,
            &outcome.recipient,
            &outcome.recipient_keys.encryption_public_key,
            vec![coin_id],
            "hi",
        )
        .await
        .unwrap();

        let listing = list_tx_inbox(&bob, &bob_inbox).await.unwrap();
        assert_eq!(listing.received.len(), 1);
        assert_eq!(fetch_coin(&alice, &coin_id).await.unwrap().version, 3);

        // A second attempt of the whole transfer is refused
        let again = transfer_coin(&alice, &coin_id, &RecipientRef::Raw(bob.public_key()), "hi").await;
        assert!(matches!(again, Err(CoinError::OwnershipMismatch { .. })));
    }

    #[tokio::test]
    async fn test_transfer_to_identity_document() {
        let store = memory_store();
        let docs = Arc::new(MemoryDocuments::new());
        let card = Url::parse("https://bob.example/profile/card").unwrap();
        docs.publish(&card, IdentityDocument::profile());

        let bob_resolver = RecipientResolver::new(docs.clone())
            .with_authorizer(Arc::new(GrantingAuthorizer::granting(docs.clone())));
        let bob = new_context(store.clone()).with_resolver(bob_resolver);
        let bob_inbox = create_tx_inbox(&bob).await.unwrap();
        bob.resolver()
            .update_inbox_link(&card, Some(&bob.public_key()))
            .await
            .unwrap();

        let alice = new_context(store.clone()).with_resolver(RecipientResolver::new(docs.clone()));
        let coin_id = mint_coin(store.as_ref(), &alice.public_key(), 0).await;

        let mut me = card.clone();
        me.set_fragment(Some("me"));
        let outcome = transfer_coin(&alice, &coin_id, &RecipientRef::Identity(me), "via profile")
            .await
            .unwrap();

        assert!(outcome.is_delivered());
        assert_eq!(outcome.recipient, inbox_location(&bob.public_key()));
        assert_eq!(outcome.new_owner, bob.public_key());
        assert_eq!(list_tx_inbox(&bob, &bob_inbox).await.unwrap().received.len(), 1);
    }

    #[tokio::test]
    async fn test_identity_document_without_link_aborts() {
        let store = memory_store();
        let docs = Arc::new(MemoryDocuments::new());
        let card = Url::parse("https://bob.example/card").unwrap();
        docs.publish(&card, IdentityDocument::profile());

        let alice = new_context(store.clone()).with_resolver(RecipientResolver::new(docs));
        let coin_id = mint_coin(store.as_ref(), &alice.public_key(), 0).await;

        let result = transfer_coin(&alice, &coin_id, &RecipientRef::Identity(card), "").await;
        assert!(matches!(result, Err(CoinError::MissingInboxLink(_))));
        assert_eq!(fetch_coin(&alice, &coin_id).await.unwrap().version, 0);
    }
}
