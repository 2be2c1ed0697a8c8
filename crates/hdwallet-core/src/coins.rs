//! Coin identifiers and their network parameters.
//!
//! Every lookup returns a `&'static CoinParams` from an immutable table.
//!
//! # Examples
//!
//! ```
//! use hdwallet_core::coins::Coin;
//! let coin: Coin = "Litecoin".parse().unwrap();
//! assert_eq!(coin.params().slip44, 2);
//! assert_eq!(coin.params().bech32_hrp, Some("ltc"));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScriptError;

/// Hardened derivation bit.
pub const HARDENED: u32 = 0x8000_0000;

/// SLIP-44 coin type used by Osmosis (Cosmos SDK).
pub const OSMOSIS_SLIP44: u32 = 118;

/// A Bitcoin-family coin the native backend knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coin {
    Bitcoin,
    BitcoinCash,
    Dash,
    DigiByte,
    Dogecoin,
    Litecoin,
    Testnet,
}

/// Static network parameters for one coin.
#[derive(Debug, PartialEq, Eq)]
pub struct CoinParams {
    /// Canonical display name.
    pub name: &'static str,
    /// SLIP-44 registered coin type.
    pub slip44: u32,
    /// Base58check version byte for pay-to-pubkey-hash addresses.
    pub pubkey_hash_version: u8,
    /// Base58check version byte for pay-to-script-hash addresses.
    pub script_hash_version: u8,
    /// Bech32 human-readable part, if the coin supports segwit addresses.
    pub bech32_hrp: Option<&'static str>,
    /// CashAddr prefix for coins that use the CashAddr format.
    pub cashaddr_prefix: Option<&'static str>,
    /// Whether BIP-32 keys should be serialized with test-network versions.
    pub is_test_network: bool,
}

static BITCOIN: CoinParams = CoinParams {
    name: "Bitcoin",
    slip44: 0,
    pubkey_hash_version: 0x00,
    script_hash_version: 0x05,
    bech32_hrp: Some("bc"),
    cashaddr_prefix: None,
    is_test_network: false,
};

static TESTNET: CoinParams = CoinParams {
    name: "Testnet",
    slip44: 1,
    pubkey_hash_version: 0x6f,
    script_hash_version: 0xc4,
    bech32_hrp: Some("tb"),
    cashaddr_prefix: None,
    is_test_network: true,
};

static BITCOIN_CASH: CoinParams = CoinParams {
    name: "BitcoinCash",
    slip44: 145,
    pubkey_hash_version: 0x00,
    script_hash_version: 0x05,
    bech32_hrp: None,
    cashaddr_prefix: Some("bitcoincash"),
    is_test_network: false,
};

static DASH: CoinParams = CoinParams {
    name: "Dash",
    slip44: 5,
    pubkey_hash_version: 0x4c,
    script_hash_version: 0x10,
    bech32_hrp: None,
    cashaddr_prefix: None,
    is_test_network: false,
};

static DIGIBYTE: CoinParams = CoinParams {
    name: "DigiByte",
    slip44: 20,
    pubkey_hash_version: 0x1e,
    script_hash_version: 0x3f,
    bech32_hrp: Some("dgb"),
    cashaddr_prefix: None,
    is_test_network: false,
};

static DOGECOIN: CoinParams = CoinParams {
    name: "Dogecoin",
    slip44: 3,
    pubkey_hash_version: 0x1e,
    script_hash_version: 0x16,
    bech32_hrp: None,
    cashaddr_prefix: None,
    is_test_network: false,
};

static LITECOIN: CoinParams = CoinParams {
    name: "Litecoin",
    slip44: 2,
    pubkey_hash_version: 0x30,
    script_hash_version: 0x32,
    bech32_hrp: Some("ltc"),
    cashaddr_prefix: None,
    is_test_network: false,
};

impl Coin {
    /// Every coin in the table, in a stable order.
    pub const ALL: [Coin; 7] = [
        Coin::Bitcoin,
        Coin::BitcoinCash,
        Coin::Dash,
        Coin::DigiByte,
        Coin::Dogecoin,
        Coin::Litecoin,
        Coin::Testnet,
    ];

    /// Network parameters for this coin.
    pub fn params(&self) -> &'static CoinParams {
        match self {
            Coin::Bitcoin => &BITCOIN,
            Coin::BitcoinCash => &BITCOIN_CASH,
            Coin::Dash => &DASH,
            Coin::DigiByte => &DIGIBYTE,
            Coin::Dogecoin => &DOGECOIN,
            Coin::Litecoin => &LITECOIN,
            Coin::Testnet => &TESTNET,
        }
    }

    /// Lower-case identifier used in requests and configuration.
    pub fn id(&self) -> &'static str {
        match self {
            Coin::Bitcoin => "bitcoin",
            Coin::BitcoinCash => "bitcoincash",
            Coin::Dash => "dash",
            Coin::DigiByte => "digibyte",
            Coin::Dogecoin => "dogecoin",
            Coin::Litecoin => "litecoin",
            Coin::Testnet => "testnet",
        }
    }

    /// Whether the coin has native segwit addresses.
    pub fn supports_segwit(&self) -> bool {
        self.params().bech32_hrp.is_some()
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.params().name)
    }
}

impl FromStr for Coin {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Coin::ALL
            .into_iter()
            .find(|c| c.id() == lower)
            .ok_or_else(|| ScriptError::UnknownCoin(s.to_string()))
    }
}
