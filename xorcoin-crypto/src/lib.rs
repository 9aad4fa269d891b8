//! # XORCOIN Cryptography
//!
//! Cryptographic primitives for the XORCOIN wallet protocol.
//!
//! This crate provides:
//!
//! - **Addresses**: SHA3-256 content addressing of wallets and inboxes
//! - **Kyber**: ML-KEM-768 key generation, encapsulation, decapsulation
//! - **Sealed channel**: anonymous encrypt-to-public-key for inbox notifications
//! - **Symmetric**: AES-256-GCM for private containers at rest
//!
//! ## Security Properties
//!
//! - Sealing needs no sender key pair; the recipient cannot tell who sealed
//! - Secret keys are zeroized on drop
//! - Domain separators keep key derivations for different uses apart
//!
//! ## Example
//!
//! ```rust,ignore
//! use xorcoin_crypto::{derive_address, generate_keypair, seal, unseal};
//!
//! let inbox_keys = generate_keypair()?;
//! let payload = seal(b"hello".as_slice(), &inbox_keys.public)?;
//! assert_eq!(unseal(&payload, &inbox_keys)?, b"hello");
//!
//! let address = derive_address(inbox_keys.public.as_bytes());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod hash;
pub mod kyber;
pub mod sealed;
pub mod symmetric;

// Re-export main functions at crate root
pub use hash::{derive_address, shake256, shake256_multi};
pub use kyber::{decapsulate, encapsulate, generate_keypair, KyberCiphertext};
pub use sealed::{seal, unseal, Plaintext};
pub use symmetric::{decrypt, encrypt, generate_container_key};
