//! # XORCOIN Core
//!
//! Core types, errors, and collaborator traits for the XORCOIN wallet protocol.
//!
//! This crate provides the foundational building blocks used by all other XORCOIN crates:
//!
//! - **Types**: Keys, addresses, coin records, inbox notifications, identity documents
//! - **Errors**: The protocol error taxonomy
//! - **Constants**: Type tags, reserved entry keys, and cryptographic sizes
//! - **Traits**: The versioned container store and identity document interfaces
//!
//! ## Example
//!
//! ```rust
//! use xorcoin_core::{CoinRecord, PublicKey};
//!
//! let owner = PublicKey::from_bytes(vec![7u8; 32]);
//! let record = CoinRecord::new(owner);
//! let json = serde_json::to_string(&record).unwrap();
//! assert!(json.contains("owner"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{CoinError, Result};
pub use traits::*;
pub use types::*;
