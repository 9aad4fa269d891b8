//! Recipient resolution and inbox link maintenance.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use url::Url;

use xorcoin_core::constants::{
    INBOX_LINK_FRAGMENT, PREDICATE_TYPE_TAG, PREDICATE_WALLET_INBOX, PREDICATE_XOR_NAME,
    PROFILE_SUBJECT_FRAGMENT, TYPE_TAG_WALLET_TX_INBOX,
};
use xorcoin_core::error::{CoinError, Result};
use xorcoin_core::traits::{Authorizer, IdentityDocuments};
use xorcoin_core::types::{
    subject_uri, IdentityDocument, InboxLocation, PublicKey, RecipientRef, Term, TypeTag, XorName,
};
use xorcoin_crypto::derive_address;

/// Location of the transaction inbox owned by `wallet_key`.
pub fn inbox_location(wallet_key: &PublicKey) -> InboxLocation {
    InboxLocation::new(derive_address(wallet_key.as_bytes()), TYPE_TAG_WALLET_TX_INBOX)
}

/// The document a URL points into, i.e. the URL without its fragment.
pub fn document_url(url: &Url) -> Url {
    let mut base = url.clone();
    base.set_fragment(None);
    base
}

/// Turns recipient references into inbox locations.
///
/// Raw keys resolve locally. Identity URLs need a document source; a
/// resolver built with [`RecipientResolver::raw_only`] rejects them.
#[derive(Clone, Default)]
pub struct RecipientResolver {
    documents: Option<Arc<dyn IdentityDocuments>>,
    authorizer: Option<Arc<dyn Authorizer>>,
}

impl RecipientResolver {
    /// Creates a resolver reading documents from `documents`.
    pub fn new(documents: Arc<dyn IdentityDocuments>) -> Self {
        Self {
            documents: Some(documents),
            authorizer: None,
        }
    }

    /// Creates a resolver that only accepts raw public keys.
    pub fn raw_only() -> Self {
        Self::default()
    }

    /// Sets the authorizer used when a document commit is refused.
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    fn documents(&self) -> Result<&Arc<dyn IdentityDocuments>> {
        self.documents
            .as_ref()
            .ok_or_else(|| CoinError::ConfigError("no identity document source configured".into()))
    }

    /// Resolves a recipient reference to the location of its inbox.
    #[instrument(skip(self), fields(recipient = %recipient))]
    pub async fn resolve(&self, recipient: &RecipientRef) -> Result<InboxLocation> {
        match recipient {
            RecipientRef::Raw(key) => {
                let location = inbox_location(key);
                debug!(inbox = %location, "Resolved raw key");
                Ok(location)
            }
            RecipientRef::Identity(url) => self.resolve_document(url).await,
        }
    }

    /// Reads the wallet inbox link of the identity document at `url`.
    pub async fn resolve_document(&self, url: &Url) -> Result<InboxLocation> {
        let document = self.documents()?.fetch(url).await.map_err(|e| match e {
            CoinError::HttpError(reason) => CoinError::Unreachable {
                url: url.to_string(),
                reason,
            },
            other => other,
        })?;

        let location = read_inbox_link(url, &document)?;
        info!(url = %url, inbox = %location, "Resolved identity document");
        Ok(location)
    }

    /// Points the document's wallet inbox link at `new_inbox_key`'s inbox,
    /// or removes the link when `None`.
    ///
    /// A refused commit triggers one authorization request and one more
    /// commit; if that is refused too the error is returned.
    #[instrument(skip(self, new_inbox_key), fields(url = %url, link = new_inbox_key.is_some()))]
    pub async fn update_inbox_link(&self, url: &Url, new_inbox_key: Option<&PublicKey>) -> Result<()> {
        let documents = self.documents()?;
        let mut document = documents.fetch(url).await?;
        if !document.is_profile() {
            return Err(CoinError::UnsupportedDocumentType {
                url: document_url(url).to_string(),
                found: document.document_type,
            });
        }

        write_inbox_link(url, &mut document, new_inbox_key.map(inbox_location));

        match documents.commit(url, &document).await {
            Err(CoinError::PermissionDenied(reason)) => {
                let authorizer = self.authorizer.as_ref().ok_or(CoinError::PermissionDenied(reason))?;
                warn!("Identity document commit refused, requesting write access");
                authorizer.authorize_write(url).await?;
                documents.commit(url, &document).await?;
            }
            other => other?,
        }

        info!("Updated wallet inbox link");
        Ok(())
    }
}

/// Extracts `<url>#me walletInbox → {xorName, typeTag}`.
///
/// The `xorName` literal is an opaque locator and is passed on as written.
fn read_inbox_link(url: &Url, document: &IdentityDocument) -> Result<InboxLocation> {
    let doc_url = document_url(url);

    if !document.is_profile() {
        return Err(CoinError::UnsupportedDocumentType {
            url: doc_url.to_string(),
            found: document.document_type.clone(),
        });
    }

    let me = subject_uri(&doc_url, PROFILE_SUBJECT_FRAGMENT);
    let link = document
        .relation(&me, PREDICATE_WALLET_INBOX)
        .ok_or_else(|| CoinError::MissingInboxLink(doc_url.to_string()))?;
    let node = link.as_node().ok_or_else(|| {
        CoinError::InvalidInboxLink(format!("{} on {} is not a node reference", PREDICATE_WALLET_INBOX, me))
    })?;

    let xor_name = link_attribute(document, node, PREDICATE_XOR_NAME, &doc_url)?;
    let type_tag = link_attribute(document, node, PREDICATE_TYPE_TAG, &doc_url)?;

    let address = XorName::new(xor_name)
        .map_err(|e| CoinError::InvalidInboxLink(format!("{} '{}': {}", PREDICATE_XOR_NAME, xor_name, e)))?;
    let type_tag: TypeTag = type_tag
        .trim()
        .parse()
        .map_err(|e| CoinError::InvalidInboxLink(format!("{} '{}': {}", PREDICATE_TYPE_TAG, type_tag, e)))?;

    Ok(InboxLocation::new(address, type_tag))
}

fn link_attribute<'a>(
    document: &'a IdentityDocument,
    node: &str,
    predicate: &str,
    doc_url: &Url,
) -> Result<&'a str> {
    document
        .relation(node, predicate)
        .and_then(Term::as_literal)
        .ok_or_else(|| CoinError::IncompleteInboxLink {
            url: doc_url.to_string(),
            missing: predicate.to_string(),
        })
}

/// Rewrites (or clears) the wallet inbox link and its node.
fn write_inbox_link(url: &Url, document: &mut IdentityDocument, location: Option<InboxLocation>) {
    let doc_url = document_url(url);
    let me = subject_uri(&doc_url, PROFILE_SUBJECT_FRAGMENT);

    // Drop the node the old link pointed at, wherever it was
    if let Some(old) = document.remove_relation(&me, PREDICATE_WALLET_INBOX) {
        if let Some(node) = old.as_node() {
            document.remove_subject(node);
        }
    }

    if let Some(location) = location {
        let node = subject_uri(&doc_url, INBOX_LINK_FRAGMENT);
        document.set_relation(me, PREDICATE_WALLET_INBOX, Term::node(node.clone()));
        document.set_relation(node.clone(), PREDICATE_XOR_NAME, Term::literal(location.address.to_string()));
        document.set_relation(node, PREDICATE_TYPE_TAG, Term::literal(location.type_tag.to_string()));
    }
}
