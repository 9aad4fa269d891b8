//! Protocol constants for XORCOIN.
//!
//! Cryptographic sizes come from ML-KEM-768 (NIST FIPS 203) and AES-256-GCM.
//! Type tags and reserved entry keys are part of the on-store format and must
//! not change once data has been written with them.

// ═══════════════════════════════════════════════════════════════════════════════
// ML-KEM-768 SIZES (NIST FIPS 203)
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of ML-KEM-768 public key (encapsulation key) in bytes.
pub const KYBER_PUBLIC_KEY_SIZE: usize = 1184;

/// Size of ML-KEM-768 secret key (decapsulation key) in bytes.
pub const KYBER_SECRET_KEY_SIZE: usize = 2400;

/// Size of ML-KEM-768 ciphertext in bytes.
/// Every sealed payload starts with one of these.
pub const KYBER_CIPHERTEXT_SIZE: usize = 1088;

/// Size of the shared secret derived from Kyber encapsulation/decapsulation.
pub const KYBER_SHARED_SECRET_SIZE: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// SYMMETRIC ENCRYPTION
// ═══════════════════════════════════════════════════════════════════════════════

/// AES-256-GCM key size.
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// AES-GCM nonce size.
pub const AEAD_NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size.
pub const AEAD_TAG_SIZE: usize = 16;

/// Smallest possible sealed payload (empty plaintext).
pub const SEALED_PAYLOAD_MIN_SIZE: usize = KYBER_CIPHERTEXT_SIZE + AEAD_TAG_SIZE;

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESSES
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of a storage address (SHA3-256 output).
pub const XOR_ADDRESS_SIZE: usize = 32;

/// Address of the empty input: SHA3-256("").
///
/// Deriving an address from an empty key must produce exactly this value.
pub const EMPTY_INPUT_ADDRESS_HEX: &str =
    "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a";

// ═══════════════════════════════════════════════════════════════════════════════
// TYPE TAGS
// ═══════════════════════════════════════════════════════════════════════════════
// The same derived address holds a wallet and an inbox; the type tag keeps
// them apart.

/// Type tag of coin containers.
pub const TYPE_TAG_COIN: u64 = 21_082_018;

/// Type tag of private wallet containers.
pub const TYPE_TAG_WALLET: u64 = 1_012_017;

/// Type tag of transaction inbox containers.
pub const TYPE_TAG_WALLET_TX_INBOX: u64 = 20_082_018;

// ═══════════════════════════════════════════════════════════════════════════════
// RESERVED ENTRY KEYS
// ═══════════════════════════════════════════════════════════════════════════════

/// Entry holding a coin's ownership record.
pub const COIN_ENTRY_KEY: &str = "coin";

/// Entry holding a wallet's encrypted coin list.
pub const WALLET_COINS_KEY: &str = "__coins";

/// Inbox metadata entry holding the owner's wallet public key.
pub const INBOX_WALLET_PK_KEY: &str = "__wallet_pk";

/// Inbox metadata entry holding the inbox encryption public key.
pub const INBOX_ENC_PK_KEY: &str = "__tx_enc_pk";

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITY DOCUMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Document type an identity document must declare to be usable.
pub const PROFILE_DOCUMENT_TYPE: &str = "http://xmlns.com/foaf/0.1/PersonalProfileDocument";

/// Fragment naming the document's primary subject.
pub const PROFILE_SUBJECT_FRAGMENT: &str = "me";

/// Fragment naming the inbox link node.
pub const INBOX_LINK_FRAGMENT: &str = "walletInbox";

/// Predicate linking a profile to its transaction inbox.
pub const PREDICATE_WALLET_INBOX: &str = "walletInbox";

/// Attribute of the inbox link holding the inbox address.
pub const PREDICATE_XOR_NAME: &str = "xorName";

/// Attribute of the inbox link holding the inbox type tag.
pub const PREDICATE_TYPE_TAG: &str = "typeTag";

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN SEPARATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Domain separator for deriving the AEAD key and nonce of a sealed payload.
pub const DOMAIN_SEAL_KEY: &[u8] = b"XORCOIN_SEAL_KEY_V1";

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL VERSIONING
// ═══════════════════════════════════════════════════════════════════════════════

/// Current wallet handle format version.
pub const WALLET_HANDLE_VERSION: u8 = 1;
