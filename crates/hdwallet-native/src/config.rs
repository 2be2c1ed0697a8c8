//! Native backend configuration.

use serde::{Deserialize, Serialize};

/// Argon2id cost parameters for the container key derivation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Lanes.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Minimal cost. Only for tests and benchmarks.
    pub fn light() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Settings for [`crate::wallet::NativeHdWallet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeWalletConfig {
    pub kdf: KdfParams,
    /// Search the nonce counter for signatures with a low R value.
    pub grind_low_r: bool,
}

impl Default for NativeWalletConfig {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            grind_low_r: true,
        }
    }
}
