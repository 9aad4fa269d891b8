//! Identity documents.
//!
//! A small graph model: subjects (URIs) carry predicates whose values are
//! literals or references to other subjects. Serialized as JSON:
//!
//! ```text
//! {
//!   "@type": "http://xmlns.com/foaf/0.1/PersonalProfileDocument",
//!   "graph": {
//!     "https://alice.example/card#me": { "walletInbox": { "@id": "https://alice.example/card#walletInbox" } },
//!     "https://alice.example/card#walletInbox": { "xorName": "…", "typeTag": "20082018" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::PROFILE_DOCUMENT_TYPE;

/// Value of a predicate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Term {
    /// Reference to another subject in the graph
    Node {
        /// Subject URI
        #[serde(rename = "@id")]
        id: String,
    },
    /// Plain string value
    Literal(String),
}

impl Term {
    /// Creates a node reference.
    pub fn node(id: impl Into<String>) -> Self {
        Term::Node { id: id.into() }
    }

    /// Creates a literal.
    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(value.into())
    }

    /// Returns the literal value, if this is a literal.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Term::Literal(v) => Some(v),
            Term::Node { .. } => None,
        }
    }

    /// Returns the referenced subject, if this is a node.
    pub fn as_node(&self) -> Option<&str> {
        match self {
            Term::Node { id } => Some(id),
            Term::Literal(_) => None,
        }
    }
}

/// A graph-structured identity document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDocument {
    /// Declared document type
    #[serde(rename = "@type")]
    pub document_type: String,
    /// Subject → predicate → value
    #[serde(default)]
    pub graph: BTreeMap<String, BTreeMap<String, Term>>,
}

impl IdentityDocument {
    /// Creates an empty document of the given type.
    pub fn new(document_type: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
            graph: BTreeMap::new(),
        }
    }

    /// Creates an empty personal profile document.
    pub fn profile() -> Self {
        Self::new(PROFILE_DOCUMENT_TYPE)
    }

    /// Returns true if the document is a personal profile.
    pub fn is_profile(&self) -> bool {
        self.document_type == PROFILE_DOCUMENT_TYPE
    }

    /// Looks up the value of `predicate` on `subject`.
    pub fn relation(&self, subject: &str, predicate: &str) -> Option<&Term> {
        self.graph.get(subject).and_then(|p| p.get(predicate))
    }

    /// Sets `predicate` on `subject`, replacing any previous value.
    pub fn set_relation(&mut self, subject: impl Into<String>, predicate: impl Into<String>, value: Term) {
        self.graph
            .entry(subject.into())
            .or_default()
            .insert(predicate.into(), value);
    }

    /// Removes `predicate` from `subject`, returning the old value.
    pub fn remove_relation(&mut self, subject: &str, predicate: &str) -> Option<Term> {
        let predicates = self.graph.get_mut(subject)?;
        let removed = predicates.remove(predicate);
        if predicates.is_empty() {
            self.graph.remove(subject);
        }
        removed
    }

    /// Removes a subject and all its predicates.
    pub fn remove_subject(&mut self, subject: &str) {
        self.graph.remove(subject);
    }
}

/// URI of a fragment-named subject inside the document at `base`.
pub fn subject_uri(base: &Url, fragment: &str) -> String {
    let mut uri = base.clone();
    uri.set_fragment(Some(fragment));
    uri.to_string()
}
