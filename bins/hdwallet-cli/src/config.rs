//! CLI configuration from an optional `hdwallet.toml` and `HDWALLET_*`
//! environment variables.
//!
//! Nested keys use a double underscore, e.g. `HDWALLET_KDF__MEMORY_KIB`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use hdwallet_core::coins::Coin;
use hdwallet_native::KdfParams;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "HDWALLET";
pub const CONFIG_FILE: &str = "hdwallet.toml";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Encrypted wallet file.
    pub wallet_file: PathBuf,
    /// Identity the container key is bound to.
    pub identity: Option<String>,
    /// Default coin for address and path commands.
    pub coin: Coin,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    pub kdf: KdfParams,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            wallet_file: data_dir().join("wallet.json"),
            identity: None,
            coin: Coin::Bitcoin,
            log_level: "warn".to_string(),
            kdf: KdfParams::default(),
        }
    }
}

/// `<data dir>/hdwallet`, or `./hdwallet` when the platform has none.
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hdwallet")
}

impl CliConfig {
    /// Load from `path` (or `<data dir>/hdwallet.toml`) overlaid with the
    /// environment. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_dir().join(CONFIG_FILE));
        Self::load_with(&path, environment())
    }

    fn load_with(path: &Path, env: Environment) -> Result<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(env)
            .build()
            .and_then(Config::try_deserialize)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    }
}

/// `HDWALLET_` prefix, `__` between nested keys.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        environment().source(Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        ))
    }

    fn no_env() -> Environment {
        env(&[])
    }

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CliConfig::load_with(&dir.path().join("absent.toml"), no_env()).unwrap();
        assert_eq!(cfg.coin, Coin::Bitcoin);
        assert!(cfg.identity.is_none());
        assert_eq!(cfg.kdf, KdfParams::default());
        assert!(cfg.wallet_file.ends_with("hdwallet/wallet.json"));
    }

    #[test]
    fn file_values_apply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
identity = "alice@example.com"
coin = "litecoin"

[kdf]
iterations = 4
"#,
        )
        .unwrap();
        let cfg = CliConfig::load_with(&path, no_env()).unwrap();
        assert_eq!(cfg.identity.as_deref(), Some("alice@example.com"));
        assert_eq!(cfg.coin, Coin::Litecoin);
        assert_eq!(cfg.kdf.iterations, 4);
        assert_eq!(cfg.kdf.memory_kib, KdfParams::default().memory_kib);
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "identity = \"from-file\"\n").unwrap();

        let cfg = CliConfig::load_with(
            &path,
            env(&[("HDWALLET_IDENTITY", "from-env"), ("HDWALLET_LOG_LEVEL", "debug")]),
        )
        .unwrap();
        assert_eq!(cfg.identity.as_deref(), Some("from-env"));
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn nested_environment_keys_apply() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CliConfig::load_with(
            &dir.path().join("absent.toml"),
            env(&[("HDWALLET_KDF__ITERATIONS", "7"), ("HDWALLET_COIN", "dogecoin")]),
        )
        .unwrap();
        assert_eq!(cfg.kdf.iterations, 7);
        assert_eq!(cfg.coin, Coin::Dogecoin);
    }
}
