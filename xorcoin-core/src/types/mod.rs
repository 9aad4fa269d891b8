//! Domain types for XORCOIN.
//!
//! This module provides all the core data structures used throughout the protocol:
//!
//! - [`PublicKey`], [`KeyPair`]: Identity and encryption keys
//! - [`XorAddress`], [`XorName`], [`ContainerRef`], [`RecipientRef`]: Addressing
//! - [`CoinRecord`], [`Versioned`]: Coin ownership state
//! - [`TxNotification`], [`EncryptedPayload`], [`InboxKeys`]: Inbox contents
//! - [`ContainerPolicy`], [`ContainerEntry`]: Store-facing container types
//! - [`IdentityDocument`]: Graph documents pointing at inboxes

mod keys;
mod address;
mod coin;
mod container;
mod identity;
mod inbox;

pub use keys::*;
pub use address::*;
pub use coin::*;
pub use container::*;
pub use identity::*;
pub use inbox::*;
