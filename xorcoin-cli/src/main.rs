//! XORCOIN CLI
//!
//! Command-line interface for XORCOIN wallets, transaction inboxes and coin transfers.

mod config;
mod keys;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use xorcoin_core::types::{CoinId, RecipientRef, TxId, XorAddress};
use xorcoin_crypto::generate_keypair;
use xorcoin_identity::{
    inbox_location, HttpDocuments, HttpDocumentsConfig, RecipientResolver, StaticTokenAuthorizer,
};
use xorcoin_store::FileStore;
use xorcoin_wallet::{
    create_tx_inbox, create_wallet, fetch_coin, fetch_inbox_keys, list_tx_inbox, load_wallet,
    remove_from_tx_inbox, send_transfer_notification, store_coins, transfer_coin, wallet_location,
    NotificationStatus, WalletContext,
};

use crate::config::CliConfig;
use crate::keys::{load_handle, load_keypair, save_handle, save_keypair};

/// XORCOIN - coin wallets with sealed transaction inboxes
#[derive(Parser)]
#[command(name = "xorcoin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Container store file [env: XORCOIN_STORE]
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Identity key pair file
    #[arg(short, long, global = true, env = "XORCOIN_KEYS", default_value = "xorcoin-id.json")]
    keys: PathBuf,

    /// Bearer token for identity document writes [env: XORCOIN_IDENTITY_TOKEN]
    #[arg(long, global = true)]
    identity_token: Option<String>,

    /// Identity document request timeout in seconds [env: XORCOIN_HTTP_TIMEOUT]
    #[arg(long, global = true)]
    http_timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new identity key pair
    Keygen,

    /// Manage your wallet
    Wallet {
        /// Wallet handle file
        #[arg(long, global = true, env = "XORCOIN_WALLET", default_value = "xorcoin-wallet.handle")]
        handle: PathBuf,

        #[command(subcommand)]
        action: WalletCommand,
    },

    /// Manage your transaction inbox
    Inbox {
        /// Inbox encryption key pair file
        #[arg(long, global = true, env = "XORCOIN_INBOX_KEYS", default_value = "xorcoin-inbox.json")]
        inbox_keys: PathBuf,

        #[command(subcommand)]
        action: InboxCommand,
    },

    /// Show a coin's ownership record
    Coin {
        /// Coin id (hex)
        coin: String,
    },

    /// Transfer a coin you own
    Transfer {
        /// Coin id (hex)
        coin: String,
        /// Recipient public key (hex) or identity document URL
        recipient: String,
        /// Message for the recipient
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Manage the wallet inbox link of your identity document
    Identity {
        #[command(subcommand)]
        action: IdentityCommand,
    },

    /// Resolve a recipient to its inbox
    Resolve {
        /// Recipient public key (hex) or identity document URL
        recipient: String,
    },
}

#[derive(Subcommand)]
enum WalletCommand {
    /// Create your wallet and save its handle
    Create,
    /// List the coins in your wallet
    Show,
    /// Replace the coin list
    Set {
        /// Coin ids (hex)
        coins: Vec<String>,
    },
}

#[derive(Subcommand)]
enum InboxCommand {
    /// Create your inbox and save its encryption key pair
    Create,
    /// Read received notifications
    List,
    /// Remove read notifications
    Clear {
        /// Also remove entries that cannot be decrypted
        #[arg(long)]
        all: bool,
    },
    /// Re-send a transfer notification
    Notify {
        /// Recipient public key (hex) or identity document URL
        recipient: String,
        /// Coin ids (hex)
        #[arg(required = true)]
        coins: Vec<String>,
        /// Message for the recipient
        #[arg(short, long, default_value = "")]
        message: String,
    },
}

#[derive(Subcommand)]
enum IdentityCommand {
    /// Point the document's wallet inbox link at your inbox
    Link {
        /// Identity document URL
        url: Url,
    },
    /// Remove the document's wallet inbox link
    Unlink {
        /// Identity document URL
        url: Url,
    },
}

/// Store and configuration shared by every command.
struct Session {
    config: CliConfig,
    store: Arc<FileStore>,
}

impl Session {
    async fn open(config: CliConfig) -> Result<Self> {
        let store = FileStore::new(&config.store_path)
            .await
            .with_context(|| format!("Failed to open store {}", config.store_path.display()))?;
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    fn context(&self, keys: &Path) -> Result<WalletContext> {
        let identity = load_keypair(keys)?;
        Ok(WalletContext::new(self.store.clone(), identity).with_resolver(self.resolver()?))
    }

    fn resolver(&self) -> Result<RecipientResolver> {
        let documents = HttpDocuments::with_config(
            HttpDocumentsConfig::default().with_timeout(self.config.http_timeout_seconds),
        )?;

        let authorizer = self
            .config
            .identity_token
            .as_ref()
            .map(|token| StaticTokenAuthorizer::new(documents.token_slot(), token.clone()));

        let resolver = RecipientResolver::new(Arc::new(documents));
        Ok(match authorizer {
            Some(authorizer) => resolver.with_authorizer(Arc::new(authorizer)),
            None => resolver,
        })
    }

    async fn close(self) -> Result<()> {
        self.store.flush().await.context("Failed to save store")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = CliConfig::from_env()?;
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "xorcoin=debug,info" } else { "xorcoin=warn" };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config
        .with_store_path(cli.store)
        .with_identity_token(cli.identity_token)
        .with_http_timeout(cli.http_timeout);
    tracing::debug!(?config, "Configuration");

    if let Commands::Keygen = cli.command {
        return cmd_keygen(&cli.keys);
    }

    let session = Session::open(config).await?;
    let result = run(&session, &cli.keys, cli.command).await;
    session.close().await?;
    result
}

async fn run(session: &Session, keys: &Path, command: Commands) -> Result<()> {
    match command {
        Commands::Keygen => cmd_keygen(keys),
        Commands::Wallet { handle, action } => {
            let ctx = session.context(keys)?;
            match action {
                WalletCommand::Create => cmd_wallet_create(&ctx, &handle).await,
                WalletCommand::Show => cmd_wallet_show(&ctx, &handle).await,
                WalletCommand::Set { coins } => cmd_wallet_set(&ctx, &handle, &coins).await,
            }
        }
        Commands::Inbox { inbox_keys, action } => {
            let ctx = session.context(keys)?;
            match action {
                InboxCommand::Create => cmd_inbox_create(&ctx, &inbox_keys).await,
                InboxCommand::List => cmd_inbox_list(&ctx, &inbox_keys).await,
                InboxCommand::Clear { all } => cmd_inbox_clear(&ctx, &inbox_keys, all).await,
                InboxCommand::Notify {
                    recipient,
                    coins,
                    message,
                } => cmd_inbox_notify(&ctx, &recipient, &coins, &message).await,
            }
        }
        Commands::Coin { coin } => cmd_coin(&session.context(keys)?, &coin).await,
        Commands::Transfer {
            coin,
            recipient,
            message,
        } => cmd_transfer(&session.context(keys)?, &coin, &recipient, &message).await,
        Commands::Identity { action } => {
            let ctx = session.context(keys)?;
            match action {
                IdentityCommand::Link { url } => cmd_identity_link(&ctx, &url, true).await,
                IdentityCommand::Unlink { url } => cmd_identity_link(&ctx, &url, false).await,
            }
        }
        Commands::Resolve { recipient } => cmd_resolve(&session.context(keys)?, &recipient).await,
    }
}

fn parse_coin(s: &str) -> Result<CoinId> {
    XorAddress::from_hex(s.trim()).with_context(|| format!("Invalid coin id '{}'", s))
}

fn parse_recipient(s: &str) -> Result<RecipientRef> {
    RecipientRef::parse(s).with_context(|| format!("Invalid recipient '{}'", s))
}

fn ensure_absent(path: &Path, what: &str) -> Result<()> {
    if path.exists() {
        bail!("{} file {} already exists", what, path.display());
    }
    Ok(())
}

/// Generate an identity key pair
fn cmd_keygen(keys: &Path) -> Result<()> {
    println!("{}", "🔑 Generating identity key pair...".cyan().bold());

    let keypair = generate_keypair()?;
    save_keypair(keys, &keypair)?;
    let identity = keypair.identity();

    println!("{} {}", "✅ Keys saved to:".green(), keys.display());
    println!("   {} {}", "Public key:".dimmed(), identity.short());
    println!("   {} {}", "Wallet:".dimmed(), wallet_location(&identity));
    println!("   {} {}", "Inbox:".dimmed(), inbox_location(&identity));
    println!("\n{}", "⚠️  IMPORTANT: Keep your secret key safe!".red().bold());

    Ok(())
}

/// Create the wallet
async fn cmd_wallet_create(ctx: &WalletContext, handle_path: &Path) -> Result<()> {
    ensure_absent(handle_path, "Wallet handle")?;

    let handle = create_wallet(ctx).await.context("Failed to create wallet")?;
    save_handle(handle_path, &handle)?;

    println!("{} {}", "✅ Wallet created:".green().bold(), handle.container());
    println!("   {} {}", "Handle saved to:".dimmed(), handle_path.display());
    println!("   Anyone holding the handle can read your coin list.");

    Ok(())
}

/// List wallet coins
async fn cmd_wallet_show(ctx: &WalletContext, handle_path: &Path) -> Result<()> {
    let handle = load_handle(handle_path)?;
    let coins = load_wallet(ctx, &handle).await.context("Failed to load wallet")?;

    println!("{} {}", "👛 Wallet".cyan().bold(), handle.container());
    if coins.is_empty() {
        println!("   {}", "No coins.".yellow());
    }
    for coin in &coins {
        println!("   • {}", coin);
    }

    Ok(())
}

/// Replace the wallet's coin list
async fn cmd_wallet_set(ctx: &WalletContext, handle_path: &Path, coins: &[String]) -> Result<()> {
    let handle = load_handle(handle_path)?;
    let coin_ids = coins.iter().map(|c| parse_coin(c)).collect::<Result<Vec<_>>>()?;

    let version = store_coins(ctx, &handle, &coin_ids)
        .await
        .context("Failed to store coin list (re-run to retry on a conflict)")?;

    println!("{} {} coin(s), version {}", "✅ Stored".green(), coin_ids.len(), version);
    Ok(())
}

/// Create the inbox
async fn cmd_inbox_create(ctx: &WalletContext, inbox_keys_path: &Path) -> Result<()> {
    ensure_absent(inbox_keys_path, "Inbox key")?;

    let inbox_keys = create_tx_inbox(ctx).await.context("Failed to create inbox")?;
    save_keypair(inbox_keys_path, &inbox_keys)?;

    println!("{} {}", "✅ Inbox created:".green().bold(), inbox_location(&ctx.public_key()));
    println!("   {} {}", "Inbox keys saved to:".dimmed(), inbox_keys_path.display());
    println!("\n{}", "⚠️  IMPORTANT: Back up the inbox key file!".red().bold());
    println!("   There is no recovery: without it, received notifications cannot be read.");

    Ok(())
}

/// Read received notifications
async fn cmd_inbox_list(ctx: &WalletContext, inbox_keys_path: &Path) -> Result<()> {
    let inbox_keys = load_keypair(inbox_keys_path)?;
    let listing = list_tx_inbox(ctx, &inbox_keys).await.context("Failed to list inbox")?;

    println!("{} {} notification(s)", "📬".cyan(), listing.received.len());
    for tx in &listing.received {
        println!("\n   {} {}", "Tx:".green(), tx.id);
        println!("      {} {}", "Sent:".dimmed(), tx.notification.timestamp_utc);
        if !tx.notification.message.is_empty() {
            println!("      {} {}", "Message:".dimmed(), tx.notification.message);
        }
        for coin in &tx.notification.coin_ids {
            println!("      {} {}", "Coin:".dimmed(), coin);
        }
    }

    if !listing.undecryptable.is_empty() {
        println!(
            "\n{} {} entr(ies) could not be decrypted with these inbox keys",
            "⚠️ ".yellow(),
            listing.undecryptable.len()
        );
    }

    Ok(())
}

/// Remove read notifications
async fn cmd_inbox_clear(ctx: &WalletContext, inbox_keys_path: &Path, all: bool) -> Result<()> {
    let inbox_keys = load_keypair(inbox_keys_path)?;
    let listing = list_tx_inbox(ctx, &inbox_keys).await.context("Failed to list inbox")?;

    let receipts = if all {
        listing.receipts()
    } else {
        listing.received.iter().map(|tx| tx.receipt()).collect()
    };
    if receipts.is_empty() {
        println!("{}", "Nothing to remove.".yellow());
        return Ok(());
    }

    let report = remove_from_tx_inbox(ctx, &receipts).await?;
    println!("{} {} entr(ies)", "🧹 Removed".green(), report.removed.len());
    for (id, error) in &report.failed {
        println!("   {} {}: {}", "✗".red(), id, error);
    }
    if !report.is_complete() {
        println!("   Entries that failed stay in the inbox; list again and retry.");
    }

    Ok(())
}

/// Send a notification without touching any coin
async fn cmd_inbox_notify(ctx: &WalletContext, recipient: &str, coins: &[String], message: &str) -> Result<()> {
    let recipient = parse_recipient(recipient)?;
    let coin_ids = coins.iter().map(|c| parse_coin(c)).collect::<Result<Vec<_>>>()?;

    let location = ctx.resolver().resolve(&recipient).await.context("Failed to resolve recipient")?;
    let inbox = fetch_inbox_keys(ctx, &location).await.context("Failed to read recipient inbox")?;
    let tx_id: TxId = send_transfer_notification(ctx, &location, &inbox.encryption_public_key, coin_ids, message)
        .await
        .context("Failed to send notification")?;

    println!("{} {}", "✅ Notification sent:".green(), tx_id);
    Ok(())
}

/// Show a coin
async fn cmd_coin(ctx: &WalletContext, coin: &str) -> Result<()> {
    let coin_id = parse_coin(coin)?;
    let record = fetch_coin(ctx, &coin_id).await.context("Failed to read coin")?;

    let mine = if record.value.is_owned_by(&ctx.public_key()) { " (you)".green().to_string() } else { String::new() };

    println!("{} {}", "🪙 Coin".cyan().bold(), coin_id);
    println!("   {} {}{}", "Owner:".dimmed(), record.value.owner.short(), mine);
    if let Some(prev) = &record.value.prev_owner {
        println!("   {} {}", "Previous owner:".dimmed(), prev.short());
    }
    println!("   {} {}", "Version:".dimmed(), record.version);

    Ok(())
}

/// Transfer a coin
async fn cmd_transfer(ctx: &WalletContext, coin: &str, recipient: &str, message: &str) -> Result<()> {
    let coin_id = parse_coin(coin)?;
    let recipient = parse_recipient(recipient)?;
    println!("{} {} → {}", "💸 Transferring".cyan().bold(), coin_id, recipient);

    let outcome = transfer_coin(ctx, &coin_id, &recipient, message)
        .await
        .context("Transfer failed, the coin did not move")?;

    println!("\n{}", "✅ Coin transferred".green().bold());
    println!("   {} {}", "New owner:".dimmed(), outcome.new_owner.short());
    println!("   {} {}", "Coin version:".dimmed(), outcome.coin_version);

    match &outcome.notification {
        NotificationStatus::Delivered(tx_id) => {
            println!("   {} {}", "Notification:".dimmed(), tx_id);
        }
        NotificationStatus::Failed(error) => {
            println!("\n{} {}", "⚠️  The recipient was not notified:".yellow().bold(), error);
            println!("   The transfer stands. Re-send with:");
            println!("   xorcoin inbox notify {} {}", outcome.new_owner.to_hex(), coin_id);
        }
    }

    Ok(())
}

/// Link or unlink the identity document
async fn cmd_identity_link(ctx: &WalletContext, url: &Url, link: bool) -> Result<()> {
    let key = ctx.public_key();
    let target = if link { Some(&key) } else { None };

    ctx.resolver()
        .update_inbox_link(url, target)
        .await
        .context("Failed to update identity document (is XORCOIN_IDENTITY_TOKEN set?)")?;

    if link {
        println!("{} {} → {}", "✅ Linked".green(), url, inbox_location(&key));
    } else {
        println!("{} {}", "✅ Unlinked".green(), url);
    }
    Ok(())
}

/// Resolve a recipient
async fn cmd_resolve(ctx: &WalletContext, recipient: &str) -> Result<()> {
    let recipient = parse_recipient(recipient)?;
    println!("{} {}", "🔍 Resolving:".cyan().bold(), recipient);

    let location = ctx.resolver().resolve(&recipient).await.context("Failed to resolve recipient")?;
    println!("\n{} {}", "✅ Inbox:".green().bold(), location);

    match fetch_inbox_keys(ctx, &location).await {
        Ok(keys) => {
            println!("   {} {}", "Wallet key:".dimmed(), keys.wallet_public_key.short());
            println!("   {} {}", "Encryption key:".dimmed(), &keys.encryption_public_key.to_hex()[..32]);
        }
        Err(e) => println!("   {} {}", "Inbox not readable:".yellow(), e),
    }

    Ok(())
}
