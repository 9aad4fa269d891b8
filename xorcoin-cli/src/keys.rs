//! Key pair and wallet handle files.
//!
//! Key pairs are JSON with hex-encoded halves; wallet handles are a single
//! line of hex. Existing files are never overwritten.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use xorcoin_core::types::{KeyPair, KyberPublicKey, KyberSecretKey};
use xorcoin_wallet::WalletHandle;

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct KeyFile {
    public_key: String,
    secret_key: String,
}

fn write_new(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        bail!("{} already exists, refusing to overwrite", path.display());
    }
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn save_keypair(path: &Path, keypair: &KeyPair) -> Result<()> {
    let file = KeyFile {
        public_key: keypair.public.to_hex(),
        secret_key: hex::encode(keypair.secret.as_bytes()),
    };
    let json = zeroize::Zeroizing::new(serde_json::to_string_pretty(&file)?);
    write_new(path, &json)
}

pub fn load_keypair(path: &Path) -> Result<KeyPair> {
    let json = zeroize::Zeroizing::new(
        std::fs::read_to_string(path).with_context(|| format!("Failed to read key file {}", path.display()))?,
    );
    let file: KeyFile = serde_json::from_str(&json).with_context(|| format!("Malformed key file {}", path.display()))?;

    let public = KyberPublicKey::from_hex(&file.public_key).context("Invalid public key in key file")?;
    let secret = KyberSecretKey::from_hex(&file.secret_key).context("Invalid secret key in key file")?;
    Ok(KeyPair::new(public, secret))
}

pub fn save_handle(path: &Path, handle: &WalletHandle) -> Result<()> {
    write_new(path, &format!("{}\n", handle.to_hex()?))
}

pub fn load_handle(path: &Path) -> Result<WalletHandle> {
    let text = zeroize::Zeroizing::new(
        std::fs::read_to_string(path).with_context(|| format!("Failed to read wallet handle {}", path.display()))?,
    );
    WalletHandle::from_hex(&text).with_context(|| format!("Malformed wallet handle {}", path.display()))
}
