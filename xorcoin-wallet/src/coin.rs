//! Coin ownership records and their reassignment.
//!
//! A coin is a container at its id holding one entry, the JSON
//! [`CoinRecord`]. The store accepts updates from anyone; what keeps a
//! transfer honest is that the writer first proves ownership on a read and
//! then writes on the version of that read. Two transfers racing from the
//! same read cannot both land.

use tracing::{debug, info, instrument, warn};

use xorcoin_core::constants::{COIN_ENTRY_KEY, TYPE_TAG_COIN};
use xorcoin_core::error::{CoinError, Result};
use xorcoin_core::types::{CoinId, CoinRecord, ContainerRef, PublicKey, Versioned};

use crate::context::WalletContext;

/// Location of the container holding `coin_id`.
pub fn coin_location(coin_id: &CoinId) -> ContainerRef {
    ContainerRef::new(*coin_id, TYPE_TAG_COIN)
}

/// Reads a coin's ownership record and the version it was read at.
#[instrument(skip(ctx), fields(coin = %coin_id))]
pub async fn fetch_coin(ctx: &WalletContext, coin_id: &CoinId) -> Result<Versioned<CoinRecord>> {
    let entry = ctx.store().get(&coin_location(coin_id), COIN_ENTRY_KEY).await?;
    if entry.value.is_empty() {
        return Err(CoinError::NotFound(format!("coin {} has no ownership record", coin_id)));
    }

    let record = entry.try_map(|bytes| CoinRecord::from_bytes(&bytes))?;
    debug!(version = record.version, owner = %record.value.owner.short(), "Fetched coin");
    Ok(record)
}

/// Reads a coin and confirms `claimant` currently owns it.
///
/// Fails with `OwnershipMismatch` otherwise. The returned version is what
/// a following [`reassign_coin`] must be conditioned on.
pub async fn check_ownership(
    ctx: &WalletContext,
    coin_id: &CoinId,
    claimant: &PublicKey,
) -> Result<Versioned<CoinRecord>> {
    let record = fetch_coin(ctx, coin_id).await?;
    if !record.value.is_owned_by(claimant) {
        warn!(coin = %coin_id, claimant = %claimant.short(), "Ownership mismatch");
        return Err(CoinError::OwnershipMismatch {
            coin: coin_id.to_hex(),
        });
    }
    Ok(record)
}

/// Writes `new_owner` into a coin, conditioned on the version `observed` was read at.
///
/// The current owner moves to `prev_owner`. Fails with `VersionConflict`
/// if the coin changed since `observed` was read; nothing is written then.
#[instrument(skip(ctx, observed, new_owner), fields(coin = %coin_id, observed = observed.version))]
pub async fn reassign_coin(
    ctx: &WalletContext,
    coin_id: &CoinId,
    observed: &Versioned<CoinRecord>,
    new_owner: PublicKey,
) -> Result<Versioned<CoinRecord>> {
    let record = observed.value.transferred_to(new_owner);

    let version = ctx
        .store()
        .update(
            &coin_location(coin_id),
            COIN_ENTRY_KEY,
            record.to_bytes()?,
            observed.version,
            &ctx.public_key(),
        )
        .await?;

    info!(version, new_owner = %record.owner.short(), "Reassigned coin");
    Ok(Versioned::new(record, version))
}
