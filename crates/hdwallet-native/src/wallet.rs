//! The native backend: a software wallet over a BIP-32 seed.
//!
//! [`NativeHdWallet`] composes the encrypted container, the seed slot and
//! the transaction assembler, and implements the backend traits from
//! `hdwallet_core::traits`. Until a seed is loaded every operation that
//! needs key material fails with [`WalletError::WalletLocked`].

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use hdwallet_core::coins::Coin;
use hdwallet_core::path::{self, BtcAccountPath, BtcGetAccountPaths, DerivationPath, OsmosisAccountPath};
use hdwallet_core::script_type::ScriptType;
use hdwallet_core::traits::{BtcWallet, BtcWalletInfo, Capabilities, EcdsaKey, HdWallet, OsmosisWalletInfo};
use hdwallet_core::types::{BtcGetAddress, BtcSignMessage, BtcSignTx, BtcSignedTx, BtcVerifyMessage};

use crate::assembler::TransactionAssembler;
use crate::config::NativeWalletConfig;
use crate::crypto::EncryptedWallet;
use crate::error::WalletError;
use crate::keys::{KeyHolder, Seed};
use crate::mnemonic;
use crate::payment::build_payment;
use crate::vault::OutputValidator;

pub const VENDOR: &str = "Native";
pub const MODEL: &str = "Native";

/// Software HD wallet backend.
pub struct NativeHdWallet {
    config: NativeWalletConfig,
    capabilities: Capabilities,
    seed: RwLock<Option<Seed>>,
    container: EncryptedWallet,
    validators: RwLock<Vec<Arc<dyn OutputValidator>>>,
}

impl NativeHdWallet {
    /// Backend with every capability enabled.
    pub fn new(config: NativeWalletConfig) -> Self {
        Self::with_capabilities(
            config,
            Capabilities {
                btc: true,
                btc_info: true,
                osmosis_info: true,
            },
        )
    }

    pub fn with_capabilities(config: NativeWalletConfig, capabilities: Capabilities) -> Self {
        Self {
            config,
            capabilities,
            seed: RwLock::new(None),
            container: EncryptedWallet::new(config.kdf),
            validators: RwLock::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &NativeWalletConfig {
        &self.config
    }

    /// The password-protected mnemonic container.
    pub fn container(&self) -> &EncryptedWallet {
        &self.container
    }

    /// Install `seed` as the signing seed, replacing any previous one.
    pub fn btc_initialize_wallet(&self, seed: Seed) {
        *self.seed.write() = Some(seed);
        info!("wallet unlocked");
    }

    /// Derive the seed from a BIP-39 phrase and load it.
    pub fn load_mnemonic(&self, phrase: &str, passphrase: &str) -> Result<(), WalletError> {
        let seed = mnemonic::mnemonic_to_seed(phrase, passphrase)?;
        self.btc_initialize_wallet(seed);
        Ok(())
    }

    /// Unlock the container with (identity, password), decrypt `encrypted`
    /// and load the mnemonic it holds. On failure the container is left
    /// uninitialized.
    pub fn load_from_encrypted(&self, identity: &str, password: &str, encrypted: &str) -> Result<(), WalletError> {
        self.container.initialize(identity, password)?;
        let loaded = self
            .container
            .decrypt(Some(encrypted))
            .and_then(|phrase| self.load_mnemonic(&phrase, ""));
        if let Err(e) = &loaded {
            warn!(error = %e, "unlock failed, container reset");
            self.container.reset();
        }
        loaded
    }

    /// Add a rule set checked against every signed transaction, after the
    /// built-in vault rules.
    pub fn register_output_validator(&self, validator: Arc<dyn OutputValidator>) {
        debug!(validator = validator.name(), "output validator registered");
        self.validators.write().push(validator);
    }

    /// Key holder for `path`, for callers needing the raw capabilities
    /// (ECDH, recoverable signatures).
    pub fn key_holder(&self, path: &DerivationPath, coin: Coin) -> Result<KeyHolder, WalletError> {
        self.with_seed(|seed| seed.derive(path, coin))
    }

    fn with_seed<T>(&self, f: impl FnOnce(&Seed) -> Result<T, WalletError>) -> Result<T, WalletError> {
        let guard = self.seed.read();
        let seed = guard.as_ref().ok_or(WalletError::WalletLocked)?;
        f(seed)
    }

    fn require(&self, enabled: bool, family: &str) -> Result<(), WalletError> {
        if enabled {
            Ok(())
        } else {
            Err(WalletError::UnsupportedOperation(format!("{family} capability disabled")))
        }
    }
}

impl Default for NativeHdWallet {
    fn default() -> Self {
        Self::new(NativeWalletConfig::default())
    }
}

impl HdWallet for NativeHdWallet {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn model(&self) -> &'static str {
        MODEL
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn is_locked(&self) -> bool {
        self.seed.read().is_none()
    }

    fn wipe(&self) {
        *self.seed.write() = None;
        self.container.reset();
        info!("wallet wiped");
    }
}

/// Bitcoin Cash is address-only: its sighash differs and is not signed here.
fn signable(coin: Coin) -> bool {
    coin != Coin::BitcoinCash
}

/// Every info query answers "unsupported" or "unknown" while the `btc_info`
/// capability is disabled.
impl BtcWalletInfo for NativeHdWallet {
    fn btc_supports_coin(&self, coin: Coin) -> bool {
        self.capabilities.btc_info && signable(coin)
    }

    fn btc_supports_script_type(&self, coin: Coin, script_type: ScriptType) -> bool {
        self.btc_supports_coin(coin) && (!script_type.is_segwit() || coin.supports_segwit())
    }

    fn btc_get_account_paths(&self, msg: &BtcGetAccountPaths) -> Vec<BtcAccountPath> {
        if !self.capabilities.btc_info {
            return Vec::new();
        }
        path::account_paths(msg.coin, msg.account_idx, msg.script_type)
    }

    fn btc_is_same_account(&self, msg: &[BtcAccountPath]) -> Option<bool> {
        self.capabilities.btc_info.then(|| path::is_same_account(msg)).flatten()
    }

    fn btc_next_account_path(&self, msg: &BtcAccountPath) -> Option<BtcAccountPath> {
        self.capabilities.btc_info.then(|| path::next_account_path(msg)).flatten()
    }
}

impl BtcWallet for NativeHdWallet {
    type Error = WalletError;

    fn btc_get_address(&self, msg: &BtcGetAddress) -> Result<String, WalletError> {
        self.require(self.capabilities.btc, "btc")?;
        let key = self.key_holder(&msg.address_n_list, msg.coin)?;
        let payment = build_payment(&key.public_key(), msg.script_type, msg.coin)?;
        if msg.show_display {
            debug!("no display attached, showDisplay ignored");
        }
        Ok(payment
            .address
            .to_cashaddr()
            .unwrap_or_else(|| payment.address.encode()))
    }

    fn btc_sign_tx(&self, msg: &BtcSignTx) -> Result<BtcSignedTx, WalletError> {
        self.require(self.capabilities.btc, "btc")?;
        if !signable(msg.coin) {
            return Err(WalletError::UnsupportedCoin(msg.coin.to_string()));
        }
        let validators = self.validators.read().clone();
        self.with_seed(|seed| {
            TransactionAssembler::new(seed)
                .grind_low_r(self.config.grind_low_r)
                .with_validators(validators)
                .assemble(msg)
        })
    }

    fn btc_sign_message(&self, _msg: &BtcSignMessage) -> Result<String, WalletError> {
        Err(WalletError::NotImplemented("btc_sign_message".into()))
    }

    fn btc_verify_message(&self, _msg: &BtcVerifyMessage) -> Result<bool, WalletError> {
        Err(WalletError::NotImplemented("btc_verify_message".into()))
    }
}

impl OsmosisWalletInfo for NativeHdWallet {
    fn osmosis_get_account_paths(&self, account_idx: u32) -> Vec<OsmosisAccountPath> {
        if !self.capabilities.osmosis_info {
            return Vec::new();
        }
        path::osmosis_account_paths(account_idx)
    }

    fn osmosis_next_account_path(&self, msg: &OsmosisAccountPath) -> Option<OsmosisAccountPath> {
        self.capabilities.osmosis_info.then(|| path::next_osmosis_account_path(msg)).flatten()
    }
}
