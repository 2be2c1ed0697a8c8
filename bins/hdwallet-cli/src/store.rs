//! On-disk wallet file: a small JSON document holding the identity and the
//! sealed mnemonic in its CipherString form.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const WALLET_MAGIC: &str = "HDWL";
pub const WALLET_FILE_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletFile {
    magic: String,
    version: u32,
    /// Normalized identity the container key was derived from.
    pub identity: String,
    /// `7.iv|ciphertext|tag`
    pub encrypted_wallet: String,
}

impl WalletFile {
    pub fn new(identity: impl Into<String>, encrypted_wallet: impl Into<String>) -> Self {
        Self {
            magic: WALLET_MAGIC.to_string(),
            version: WALLET_FILE_VERSION,
            identity: identity.into(),
            encrypted_wallet: encrypted_wallet.into(),
        }
    }

    /// Write to `path`, creating parent directories. Refuses to overwrite.
    pub fn save(&self, path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Wallet file already exists: {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let file: WalletFile = serde_json::from_slice(&data)
            .with_context(|| format!("{} is not a wallet file", path.display()))?;
        if file.magic != WALLET_MAGIC {
            bail!("{} is not a wallet file", path.display());
        }
        if file.version != WALLET_FILE_VERSION {
            bail!("Unsupported wallet file version {}", file.version);
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEALED: &str = "7.AAAAAAAAAAAAAAAA|AAAA|AAAAAAAAAAAAAAAAAAAAAA==";

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wallet.json");
        let file = WalletFile::new("alice@example.com", SEALED);
        file.save(&path).unwrap();
        assert_eq!(WalletFile::load(&path).unwrap(), file);
    }

    #[test]
    fn save_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        WalletFile::new("a", SEALED).save(&path).unwrap();
        assert!(WalletFile::new("b", SEALED).save(&path).is_err());
        assert_eq!(WalletFile::load(&path).unwrap().identity, "a");
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        fs::write(&path, b"garbage").unwrap();
        assert!(WalletFile::load(&path).is_err());
    }

    #[test]
    fn load_rejects_wrong_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        let json = r#"{"magic":"RIWL","version":1,"identity":"a","encryptedWallet":"7.x"}"#;
        fs::write(&path, json).unwrap();
        let err = WalletFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("not a wallet file"));
    }

    #[test]
    fn load_rejects_future_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        let json = r#"{"magic":"HDWL","version":9,"identity":"a","encryptedWallet":"7.x"}"#;
        fs::write(&path, json).unwrap();
        assert!(WalletFile::load(&path).is_err());
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(WalletFile::load(&dir.path().join("absent.json")).is_err());
    }
}
