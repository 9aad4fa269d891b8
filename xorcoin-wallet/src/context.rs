//! Explicit client context.
//!
//! Every protocol operation takes a [`WalletContext`]: the store it talks
//! to, the key pair it acts as, and how it resolves recipients. Nothing is
//! held globally, so several identities can work side by side in one
//! process.

use std::sync::Arc;

use xorcoin_core::traits::ContainerStore;
use xorcoin_core::types::{KeyPair, PublicKey};
use xorcoin_identity::RecipientResolver;

/// Store handle, identity key pair and recipient resolver.
#[derive(Clone)]
pub struct WalletContext {
    store: Arc<dyn ContainerStore>,
    identity: Arc<KeyPair>,
    resolver: RecipientResolver,
}

impl WalletContext {
    /// Creates a context that resolves raw public keys only.
    pub fn new(store: Arc<dyn ContainerStore>, identity: KeyPair) -> Self {
        Self {
            store,
            identity: Arc::new(identity),
            resolver: RecipientResolver::raw_only(),
        }
    }

    /// Replaces the recipient resolver (e.g. one that reads identity documents).
    pub fn with_resolver(mut self, resolver: RecipientResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// The store operations run against.
    pub fn store(&self) -> &dyn ContainerStore {
        self.store.as_ref()
    }

    /// The identity key pair operations act as.
    pub fn identity(&self) -> &KeyPair {
        &self.identity
    }

    /// The identity public key; owner of wallets, inboxes and coins.
    pub fn public_key(&self) -> PublicKey {
        self.identity.identity()
    }

    /// The recipient resolver.
    pub fn resolver(&self) -> &RecipientResolver {
        &self.resolver
    }
}

impl std::fmt::Debug for WalletContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletContext")
            .field("identity", &self.public_key())
            .finish_non_exhaustive()
    }
}
