//! # XORCOIN Wallet Protocol
//!
//! High-level API for holding and transferring coins.
//!
//! This crate provides:
//!
//! - **Context**: The store handle and identity key pair every operation runs with
//! - **Wallet**: A private container listing the coins a user holds
//! - **Coin**: Reading ownership records and reassigning them under a version check
//! - **Inbox**: A public, insert-open container of sealed transfer notifications
//! - **Transfer**: Ownership check → coin update → recipient notification
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use xorcoin_wallet::{create_tx_inbox, create_wallet, transfer_coin, WalletContext};
//!
//! // Recipient: create a wallet and an inbox, keep the inbox key pair safe
//! let bob = WalletContext::new(store.clone(), bob_keys);
//! let handle = create_wallet(&bob).await?;
//! let inbox_keys = create_tx_inbox(&bob).await?;
//!
//! // Sender: hand a coin over
//! let outcome = transfer_coin(&alice, &coin_id, &RecipientRef::Raw(bob.public_key()), "thanks").await?;
//!
//! // Recipient: read notifications
//! let listing = list_tx_inbox(&bob, &inbox_keys).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod coin;
pub mod context;
pub mod inbox;
pub mod transfer;
pub mod wallet;

#[cfg(test)]
mod test_support;

pub use coin::{check_ownership, coin_location, fetch_coin, reassign_coin};
pub use context::WalletContext;
pub use inbox::{
    create_tx_inbox, fetch_inbox_keys, insert_notification, list_tx_inbox, remove_from_tx_inbox,
    send_transfer_notification, InboxListing, ReceivedTx, RemovalReport, TxReceipt, UndecryptableTx,
};
pub use transfer::{transfer_coin, NotificationStatus, TransferOutcome, TransferState};
pub use wallet::{create_wallet, load_wallet, load_wallet_versioned, store_coins, wallet_location, WalletHandle};
