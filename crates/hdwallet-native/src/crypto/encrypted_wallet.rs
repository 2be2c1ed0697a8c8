//! Password-protected container for a wallet mnemonic.
//!
//! The container keeps its secret fields behind a single `RwLock`:
//! `initialize`, `create_wallet` and `reset` take the write side, so a
//! concurrent `decrypt` observes either the old state or the new one, never
//! a mix. Persistence is left to the caller, which stores the
//! [`CipherString`] returned by `create_wallet`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use parking_lot::RwLock;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;
use zeroize::Zeroizing;

use crate::config::KdfParams;
use crate::crypto::cipher_string::CipherString;
use crate::crypto::helper::{CryptoHelper, SymmetricKey};
use crate::error::WalletError;
use crate::mnemonic;

#[derive(Default)]
struct ContainerState {
    identity: Option<String>,
    key: Option<SymmetricKey>,
    password_hash: Option<String>,
    encrypted_wallet: Option<CipherString>,
}

/// Encrypted mnemonic container keyed by (identity, password).
pub struct EncryptedWallet {
    helper: CryptoHelper,
    state: RwLock<ContainerState>,
}

/// Case-fold, NFKC-normalize and trim an identity.
pub fn normalize_identity(identity: &str) -> String {
    identity.nfkc().collect::<String>().trim().to_lowercase()
}

impl EncryptedWallet {
    pub fn new(params: KdfParams) -> Self {
        Self {
            helper: CryptoHelper::new(params),
            state: RwLock::new(ContainerState::default()),
        }
    }

    /// True once identity, key and password hash are all present.
    pub fn is_initialized(&self) -> bool {
        let s = self.state.read();
        s.identity.is_some() && s.key.is_some() && s.password_hash.is_some()
    }

    /// Normalized identity, once initialized.
    pub fn identity(&self) -> Option<String> {
        self.state.read().identity.clone()
    }

    /// Base64 password verification hash, once initialized.
    pub fn password_hash(&self) -> Option<String> {
        self.state.read().password_hash.clone()
    }

    /// Persisted form of the encrypted mnemonic, if one is held.
    pub fn encrypted_wallet(&self) -> Option<String> {
        self.state.read().encrypted_wallet.as_ref().map(ToString::to_string)
    }

    /// Derive the container key from an identity and password.
    ///
    /// Replaces any previous state, including a held ciphertext.
    pub fn initialize(&self, identity: &str, password: &str) -> Result<(), WalletError> {
        if identity.trim().is_empty() {
            return Err(WalletError::InvalidIdentity);
        }
        if password.trim().is_empty() {
            return Err(WalletError::InvalidPassword);
        }

        let identity = normalize_identity(identity);
        let password: Zeroizing<String> = Zeroizing::new(password.nfkc().collect());
        let key = self.helper.make_key(&password, &identity)?;
        let hash = self.helper.password_hash(&key, &password)?;

        let mut s = self.state.write();
        *s = ContainerState {
            identity: Some(identity),
            key: Some(key),
            password_hash: Some(STANDARD.encode(hash)),
            encrypted_wallet: None,
        };
        debug!("wallet container initialized");
        Ok(())
    }

    /// Encrypt `mnemonic`, or a freshly generated one, into the container and
    /// return its persisted form.
    pub fn create_wallet(&self, mnemonic: Option<&str>) -> Result<String, WalletError> {
        let mut s = self.state.write();
        let key = match (&s.identity, &s.key, &s.password_hash) {
            (Some(_), Some(key), Some(_)) => key,
            _ => return Err(WalletError::NotInitialized),
        };

        let phrase = match mnemonic {
            Some(m) => Zeroizing::new(m.to_string()),
            None => mnemonic::generate_mnemonic(mnemonic::DEFAULT_WORD_COUNT)?,
        };
        let phrase = mnemonic::validate_mnemonic(&phrase)?;

        let enc_key = self.helper.stretch_key(key)?;
        let cs = self.helper.aes_encrypt(phrase.as_bytes(), &enc_key)?;
        let out = cs.to_string();
        s.encrypted_wallet = Some(cs);
        debug!("wallet container sealed a mnemonic");
        Ok(out)
    }

    /// Decrypt `encrypted`, or the held ciphertext when `None`.
    pub fn decrypt(&self, encrypted: Option<&str>) -> Result<Zeroizing<String>, WalletError> {
        let s = self.state.read();
        let key = match (&s.identity, &s.key, &s.password_hash) {
            (Some(_), Some(key), Some(_)) => key,
            _ => return Err(WalletError::NotInitialized),
        };

        let parsed;
        let cs = match encrypted {
            Some(text) => {
                parsed = text.trim().parse::<CipherString>()?;
                &parsed
            }
            None => s
                .encrypted_wallet
                .as_ref()
                .ok_or_else(|| WalletError::Corrupt("no encrypted wallet".into()))?,
        };

        let enc_key = self.helper.stretch_key(key)?;
        let plain = self.helper.aes_decrypt(cs, &enc_key)?;
        let text = std::str::from_utf8(&plain)
            .map_err(|_| WalletError::Corrupt("plaintext is not UTF-8".into()))?;
        Ok(Zeroizing::new(text.to_string()))
    }

    /// Clear every field. The container must be initialized again before use.
    pub fn reset(&self) {
        *self.state.write() = ContainerState::default();
        debug!("wallet container reset");
    }
}

impl Default for EncryptedWallet {
    fn default() -> Self {
        Self::new(KdfParams::default())
    }
}
