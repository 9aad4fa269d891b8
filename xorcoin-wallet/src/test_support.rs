//! Shared fixtures for the protocol tests.

use std::sync::Arc;

use xorcoin_core::constants::COIN_ENTRY_KEY;
use xorcoin_core::traits::ContainerStore;
use xorcoin_core::types::{CoinId, CoinRecord, ContainerPolicy, PublicKey, TxId};
use xorcoin_crypto::{derive_address, generate_keypair};
use xorcoin_store::MemoryStore;

use crate::coin::coin_location;
use crate::context::WalletContext;

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// A context with a fresh identity on `store`.
pub fn new_context(store: Arc<dyn ContainerStore>) -> WalletContext {
    WalletContext::new(store, generate_keypair().unwrap())
}

/// Issues a coin owned by `owner` whose entry sits at `version`.
///
/// Minting is outside the protocol; this stands in for the issuer.
pub async fn mint_coin(store: &dyn ContainerStore, owner: &PublicKey, version: u64) -> CoinId {
    let issuer = PublicKey::from_bytes(b"test-issuer".to_vec());
    let coin_id = derive_address(TxId::random().as_str().as_bytes());
    let location = coin_location(&coin_id);
    let record = CoinRecord::new(owner.clone()).to_bytes().unwrap();

    store
        .create(
            &location,
            ContainerPolicy::public(issuer.clone()).with_open_update(),
            vec![(COIN_ENTRY_KEY.to_string(), record.clone())],
        )
        .await
        .unwrap();

    for observed in 0..version {
        store
            .update(&location, COIN_ENTRY_KEY, record.clone(), observed, &issuer)
            .await
            .unwrap();
    }

    coin_id
}
