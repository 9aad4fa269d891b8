//! Error types for XORCOIN.
//!
//! This module provides the protocol error taxonomy using `thiserror`.
//! Protocol failures (ownership, versioning, resolution) are distinct
//! variants so callers can decide between restart, re-authorization and abort.

use thiserror::Error;

/// Result type alias using `CoinError`.
pub type Result<T> = std::result::Result<T, CoinError>;

/// Main error type for all XORCOIN operations.
#[derive(Debug, Error)]
pub enum CoinError {
    // ═══════════════════════════════════════════════════════════════════════════
    // STORE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Container or entry does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A version-conditioned write lost the race to another writer.
    #[error("Version conflict on '{key}': expected version {expected}, found {actual}")]
    VersionConflict {
        /// Entry key the write targeted
        key: String,
        /// Version the writer observed
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// Entry id is already taken (including tombstoned entries).
    #[error("Duplicate entry id: {0}")]
    DuplicateId(String),

    /// A container already exists at the derived address.
    #[error("Container already exists: {0}")]
    AlreadyExists(String),

    /// Caller lacks permission for a store or identity-document write.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // PROTOCOL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The caller is not the current owner of the coin.
    #[error("Ownership mismatch for coin {coin}: caller is not the current owner")]
    OwnershipMismatch {
        /// Coin id (hex)
        coin: String,
    },

    /// Recipient reference is neither a public key nor an identity URL.
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Storage address is malformed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // IDENTITY DOCUMENT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Identity document declares an unexpected type.
    #[error("Unsupported document type at '{url}': {found}")]
    UnsupportedDocumentType {
        /// Document location
        url: String,
        /// Declared document type
        found: String,
    },

    /// Identity document has no wallet inbox relation.
    #[error("No wallet inbox link in identity document: {0}")]
    MissingInboxLink(String),

    /// Wallet inbox relation lacks a required attribute.
    #[error("Incomplete wallet inbox link in '{url}': missing {missing}")]
    IncompleteInboxLink {
        /// Document location
        url: String,
        /// Name of the missing attribute
        missing: String,
    },

    /// Wallet inbox relation has an attribute that cannot be parsed.
    #[error("Invalid wallet inbox link: {0}")]
    InvalidInboxLink(String),

    /// Identity document could not be fetched.
    #[error("Identity document unreachable at '{url}': {reason}")]
    Unreachable {
        /// Document location
        url: String,
        /// Transport failure description
        reason: String,
    },

    /// Malformed URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ═══════════════════════════════════════════════════════════════════════════
    // CRYPTOGRAPHIC ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Error in Kyber key generation.
    #[error("Key generation failed: {0}")]
    KeyGenerationError(String),

    /// Error in Kyber encapsulation.
    #[error("Encapsulation failed: {0}")]
    EncapsulationError(String),

    /// Error in Kyber decapsulation.
    #[error("Decapsulation failed: {0}")]
    DecapsulationError(String),

    /// Payload was not sealed to this key pair, or is corrupted.
    #[error("Decryption failed: {0}")]
    DecryptionFailure(String),

    /// Invalid key size or format.
    #[error("Invalid key: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Required size
        expected: usize,
        /// Provided size
        actual: usize,
    },

    /// Invalid ciphertext size or format.
    #[error("Invalid ciphertext: expected {expected} bytes, got {actual}")]
    InvalidCiphertextSize {
        /// Required size
        expected: usize,
        /// Provided size
        actual: usize,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Binary serialization error.
    #[error("Binary serialization error: {0}")]
    BinarySerializationError(String),

    /// Invalid hex encoding.
    #[error("Invalid hex encoding: {0}")]
    HexError(#[from] hex::FromHexError),

    /// Format version mismatch.
    #[error("Format version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Supported version
        expected: u8,
        /// Version found
        actual: u8,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Connection timeout.
    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Persistent store file is corrupted.
    #[error("Store error: {0}")]
    StoreError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl CoinError {
    /// Returns true if the caller may restart the operation from a fresh read.
    ///
    /// Nothing inside the protocol retries on its own; this only classifies.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoinError::VersionConflict { .. }
                | CoinError::HttpError(_)
                | CoinError::ConnectionTimeout(_)
                | CoinError::Unreachable { .. }
        )
    }

    /// Returns true if this is a cryptographic error.
    pub fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            CoinError::KeyGenerationError(_)
                | CoinError::EncapsulationError(_)
                | CoinError::DecapsulationError(_)
                | CoinError::DecryptionFailure(_)
                | CoinError::InvalidKeySize { .. }
                | CoinError::InvalidCiphertextSize { .. }
        )
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            CoinError::ValidationError(_)
                | CoinError::InvalidRecipient(_)
                | CoinError::InvalidAddress(_)
                | CoinError::InvalidInboxLink(_)
                | CoinError::InvalidUrl(_)
                | CoinError::VersionMismatch { .. }
        )
    }

    /// Returns true if this error comes from resolving a recipient's identity document.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            CoinError::UnsupportedDocumentType { .. }
                | CoinError::MissingInboxLink(_)
                | CoinError::IncompleteInboxLink { .. }
                | CoinError::InvalidInboxLink(_)
                | CoinError::Unreachable { .. }
        )
    }
}
