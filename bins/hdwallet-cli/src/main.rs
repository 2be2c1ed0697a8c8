//! hdwallet: command-line front-end for the native HD wallet backend.
//!
//! Creates and unlocks the encrypted wallet file, derives addresses, lists
//! account paths, and signs Bitcoin-family transactions from JSON requests.

mod config;
mod store;

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use zeroize::Zeroizing;

use hdwallet_core::coins::Coin;
use hdwallet_core::path::{BtcGetAccountPaths, DerivationPath};
use hdwallet_core::script_type::ScriptType;
use hdwallet_core::traits::{BtcWallet, BtcWalletInfo};
use hdwallet_core::types::{BtcGetAddress, BtcSignTx};
use hdwallet_native::{NativeHdWallet, NativeWalletConfig};

use crate::config::CliConfig;
use crate::store::WalletFile;

/// Read instead of prompting when set.
const PASSWORD_ENV: &str = "HDWALLET_PASSWORD";

#[derive(Parser)]
#[command(name = "hdwallet", version, about = "Native HD wallet")]
struct Cli {
    /// Configuration file (default: <data dir>/hdwallet/hdwallet.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Wallet file (overrides the configured one).
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wallet file management.
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
    /// Derive an address.
    Address(AddressArgs),
    /// List account paths for a coin.
    Paths(PathsArgs),
    /// Sign a transaction request.
    Sign(SignArgs),
}

#[derive(Subcommand)]
enum WalletAction {
    /// Seal a new or imported mnemonic into a wallet file.
    Create(CreateArgs),
    /// Unlock the wallet file and print its mnemonic.
    Reveal,
}

#[derive(Args)]
struct CreateArgs {
    /// Identity the wallet key is bound to (e.g. an email address).
    #[arg(short, long)]
    identity: Option<String>,

    /// Prompt for an existing mnemonic instead of generating one.
    #[arg(long)]
    import: bool,
}

#[derive(Args)]
struct AddressArgs {
    /// Derivation path, e.g. m/84'/0'/0'/0/0.
    #[arg(short, long)]
    path: DerivationPath,

    #[arg(short, long)]
    coin: Option<Coin>,

    /// p2pkh, p2sh, p2wpkh or p2sh-p2wpkh.
    #[arg(short, long)]
    script_type: Option<ScriptType>,
}

#[derive(Args)]
struct PathsArgs {
    #[arg(short, long)]
    coin: Option<Coin>,

    #[arg(short, long, default_value_t = 0)]
    account: u32,

    #[arg(short, long)]
    script_type: Option<ScriptType>,
}

#[derive(Args)]
struct SignArgs {
    /// JSON signing request, or `-` for stdin.
    #[arg(short, long)]
    request: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = CliConfig::load(cli.config.as_deref())?;
    if let Some(file) = cli.file {
        cfg.wallet_file = file;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    debug!(wallet_file = %cfg.wallet_file.display(), "configuration loaded");

    match cli.command {
        Commands::Wallet { action } => match action {
            WalletAction::Create(args) => wallet_create(&cfg, args),
            WalletAction::Reveal => wallet_reveal(&cfg),
        },
        Commands::Address(args) => address(&cfg, args),
        Commands::Paths(args) => paths(&cfg, args),
        Commands::Sign(args) => sign(&cfg, args),
    }
}

fn wallet_create(cfg: &CliConfig, args: CreateArgs) -> Result<()> {
    if cfg.wallet_file.exists() {
        bail!("Wallet file already exists: {}", cfg.wallet_file.display());
    }
    let identity = args
        .identity
        .or_else(|| cfg.identity.clone())
        .context("No identity: pass --identity or set HDWALLET_IDENTITY")?;

    let imported = if args.import {
        Some(Zeroizing::new(
            rpassword::prompt_password("Enter mnemonic: ").context("Failed to read mnemonic")?,
        ))
    } else {
        None
    };

    let password = new_password()?;
    let wallet = backend(cfg);
    let container = wallet.container();
    container.initialize(&identity, &password)?;
    let sealed = container.create_wallet(imported.as_deref().map(String::as_str))?;
    let identity = container
        .identity()
        .context("Wallet container lost its identity")?;

    WalletFile::new(&identity, &sealed).save(&cfg.wallet_file)?;
    info!(path = %cfg.wallet_file.display(), "wallet file written");

    println!("Wallet saved to {}", cfg.wallet_file.display());
    println!("Identity: {}", identity);
    if !args.import {
        let phrase = container.decrypt(None)?;
        println!("\nMNEMONIC (write it down, it will not be shown again):");
        println!("  {}", phrase.as_str());
    }
    Ok(())
}

fn wallet_reveal(cfg: &CliConfig) -> Result<()> {
    let file = WalletFile::load(&cfg.wallet_file)?;
    let password = password("Wallet password")?;
    let wallet = backend(cfg);
    wallet.container().initialize(&file.identity, &password)?;
    let phrase = wallet
        .container()
        .decrypt(Some(&file.encrypted_wallet))
        .context("Failed to unlock wallet")?;
    println!("{}", phrase.as_str());
    Ok(())
}

fn address(cfg: &CliConfig, args: AddressArgs) -> Result<()> {
    let coin = args.coin.unwrap_or(cfg.coin);
    let script_type = args.script_type.unwrap_or_else(|| default_script_type(coin));
    let wallet = unlock(cfg)?;
    let address = wallet.btc_get_address(&BtcGetAddress {
        address_n_list: args.path,
        coin,
        script_type,
        show_display: false,
    })?;
    println!("{}", address);
    Ok(())
}

fn paths(cfg: &CliConfig, args: PathsArgs) -> Result<()> {
    let wallet = backend(cfg);
    let msg = BtcGetAccountPaths {
        coin: args.coin.unwrap_or(cfg.coin),
        account_idx: args.account,
        script_type: args.script_type,
    };
    let paths = wallet.btc_get_account_paths(&msg);
    if paths.is_empty() {
        bail!("No account paths for {} with the given script type", msg.coin);
    }
    for p in &paths {
        println!("{:<12} {:<12} {}", p.coin.id(), p.script_type, p.address_n_list);
    }
    Ok(())
}

fn sign(cfg: &CliConfig, args: SignArgs) -> Result<()> {
    let json = if args.request.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&args.request)
            .with_context(|| format!("Failed to read {}", args.request.display()))?
    };
    let msg: BtcSignTx = serde_json::from_str(&json).context("Invalid signing request")?;

    let wallet = unlock(cfg)?;
    let signed = wallet.btc_sign_tx(&msg)?;
    println!("{}", serde_json::to_string_pretty(&signed)?);
    Ok(())
}

/// Backend configured from the CLI settings, still locked.
fn backend(cfg: &CliConfig) -> NativeHdWallet {
    NativeHdWallet::new(NativeWalletConfig {
        kdf: cfg.kdf,
        ..NativeWalletConfig::default()
    })
}

/// Load the wallet file and unlock it.
fn unlock(cfg: &CliConfig) -> Result<NativeHdWallet> {
    let file = WalletFile::load(&cfg.wallet_file)?;
    let password = password("Wallet password")?;
    let wallet = backend(cfg);
    wallet
        .load_from_encrypted(&file.identity, &password, &file.encrypted_wallet)
        .context("Failed to unlock wallet")?;
    Ok(wallet)
}

fn default_script_type(coin: Coin) -> ScriptType {
    if coin.supports_segwit() {
        ScriptType::P2wpkh
    } else {
        ScriptType::P2pkh
    }
}

/// Password from `HDWALLET_PASSWORD`, otherwise prompted.
fn password(prompt: &str) -> Result<Zeroizing<String>> {
    if let Ok(p) = std::env::var(PASSWORD_ENV) {
        return Ok(Zeroizing::new(p));
    }
    prompt_password(prompt)
}

fn new_password() -> Result<Zeroizing<String>> {
    if let Ok(p) = std::env::var(PASSWORD_ENV) {
        return Ok(Zeroizing::new(p));
    }
    let password = prompt_password("Enter wallet password")?;
    let confirm = prompt_password("Confirm password")?;
    if password != confirm {
        bail!("Passwords do not match");
    }
    Ok(password)
}

fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    rpassword::prompt_password(format!("{}: ", prompt))
        .map(Zeroizing::new)
        .context("Failed to read password")
}
