//! # XORCOIN Identity
//!
//! Resolves recipient references to transaction inbox locations.
//!
//! A recipient is either a raw wallet public key (the inbox address is
//! derived from it) or the URL of an identity document whose
//! `walletInbox` relation names the inbox. Documents come from an
//! [`IdentityDocuments`] source:
//!
//! - **Memory**: in-process documents with per-document write grants
//! - **HTTP**: JSON documents fetched with GET and committed with PUT
//!
//! ## Example
//!
//! ```rust,ignore
//! use xorcoin_identity::{HttpDocuments, RecipientResolver};
//!
//! let resolver = RecipientResolver::new(Arc::new(HttpDocuments::new()?));
//! let inbox = resolver.resolve(&"https://alice.example/card".parse()?).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod documents;
mod http;
mod resolver;

pub use documents::{GrantingAuthorizer, MemoryDocuments};
pub use http::{HttpDocuments, HttpDocumentsConfig, StaticTokenAuthorizer, TokenSlot};
pub use resolver::{document_url, inbox_location, RecipientResolver};

// Re-export the collaborator traits from core
pub use xorcoin_core::traits::{Authorizer, IdentityDocuments};
