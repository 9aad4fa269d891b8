//! # XORCOIN Store
//!
//! Versioned key-value containers for the XORCOIN protocol.
//!
//! This crate provides two backends for [`ContainerStore`]:
//!
//! - **Memory**: Fast in-memory storage for development and testing
//! - **File**: Persistent file-based storage for single-user deployments
//!
//! Both enforce the same contract: per-entry versions, version-conditioned
//! updates and deletes, tombstones, and owner/open-insert/open-update
//! permissions from each container's policy.
//!
//! ## Example
//!
//! ```rust,ignore
//! use xorcoin_store::{ContainerStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.create(&container, ContainerPolicy::public(owner.clone()), vec![]).await?;
//! store.insert(&container, "tx1", payload, &anyone).await?;
//!
//! let entry = store.get(&container, "tx1").await?;
//! store.delete(&container, "tx1", entry.version, &owner).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod file;
mod memory;

pub use file::FileStore;
pub use memory::{MemoryStore, StoreStats, StoredContainer};

// Re-export the trait from core
pub use xorcoin_core::traits::ContainerStore;
