//! In-process identity documents.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tracing::{debug, instrument};
use url::Url;

use xorcoin_core::error::{CoinError, Result};
use xorcoin_core::traits::{Authorizer, IdentityDocuments};
use xorcoin_core::types::IdentityDocument;

use crate::resolver::document_url;

/// In-memory identity documents.
///
/// Documents are keyed by URL without fragment. Committing requires a
/// write grant for that document, which [`GrantingAuthorizer`] hands out.
#[derive(Debug, Default)]
pub struct MemoryDocuments {
    documents: DashMap<Url, IdentityDocument>,
    write_grants: DashSet<Url>,
    commits: AtomicUsize,
}

impl MemoryDocuments {
    /// Creates an empty document source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a document without granting write access to it.
    pub fn publish(&self, url: &Url, document: IdentityDocument) {
        self.documents.insert(document_url(url), document);
    }

    /// Grants write access to the document at `url`.
    pub fn grant_write(&self, url: &Url) {
        self.write_grants.insert(document_url(url));
    }

    /// Revokes write access to the document at `url`.
    pub fn revoke_write(&self, url: &Url) {
        self.write_grants.remove(&document_url(url));
    }

    /// Returns true if the document at `url` may be committed.
    pub fn can_write(&self, url: &Url) -> bool {
        self.write_grants.contains(&document_url(url))
    }

    /// Returns the stored document, if any.
    pub fn document(&self, url: &Url) -> Option<IdentityDocument> {
        self.documents.get(&document_url(url)).map(|d| d.clone())
    }

    /// Number of commit attempts, successful or not.
    pub fn commit_attempts(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityDocuments for MemoryDocuments {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<IdentityDocument> {
        self.document(url)
            .ok_or_else(|| CoinError::NotFound(format!("identity document {}", document_url(url))))
    }

    #[instrument(skip(self, document), fields(url = %url))]
    async fn commit(&self, url: &Url, document: &IdentityDocument) -> Result<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);

        if !self.can_write(url) {
            return Err(CoinError::PermissionDenied(format!("write to {}", document_url(url))));
        }

        self.documents.insert(document_url(url), document.clone());
        debug!("Identity document committed");
        Ok(())
    }
}

/// Authorizer for [`MemoryDocuments`].
///
/// A granting authorizer adds the write grant it is asked for. A refusing
/// one completes the exchange without granting anything, which is what an
/// approved request for the wrong account looks like.
#[derive(Debug)]
pub struct GrantingAuthorizer {
    documents: Arc<MemoryDocuments>,
    grant: bool,
    calls: AtomicUsize,
}

impl GrantingAuthorizer {
    /// Authorizer that grants every request.
    pub fn granting(documents: Arc<MemoryDocuments>) -> Self {
        Self {
            documents,
            grant: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Authorizer whose requests never result in a grant.
    pub fn refusing(documents: Arc<MemoryDocuments>) -> Self {
        Self {
            documents,
            grant: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of authorization requests so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authorizer for GrantingAuthorizer {
    async fn authorize_write(&self, url: &Url) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.grant {
            self.documents.grant_write(url);
            debug!(url = %url, "Write access granted");
        }
        Ok(())
    }
}
