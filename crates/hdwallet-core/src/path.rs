//! BIP-32 derivation paths and the standard UTXO account templates.
//!
//! Paths are immutable values. Helpers that "advance" a path (for example
//! [`next_account_path`]) return a new [`DerivationPath`] instead of editing
//! a shared buffer.
//!
//! Functions that classify a path answer `None` (unknown) for anything that
//! is not a recognised BIP-44/49/84 template rather than raising an error;
//! callers branch on absence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::coins::{Coin, HARDENED, OSMOSIS_SLIP44};
use crate::error::PathError;
use crate::script_type::ScriptType;

/// Maximum BIP-32 depth (the depth byte is a `u8`).
pub const MAX_DEPTH: usize = 255;

/// An ordered list of BIP-32 child indices; the high bit marks hardened
/// segments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    /// Build a path from raw `u32` segments.
    pub fn new(segments: Vec<u32>) -> Self {
        Self(segments)
    }

    /// The empty path (`m`).
    pub fn master() -> Self {
        Self(Vec::new())
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A new path with `index` appended.
    pub fn child(&self, index: u32) -> Self {
        let mut segments = self.0.clone();
        segments.push(index);
        Self(segments)
    }

    /// A new path with the segment at `position` replaced, or `None` if the
    /// position does not exist.
    pub fn with_segment(&self, position: usize, value: u32) -> Option<Self> {
        if position >= self.0.len() {
            return None;
        }
        let mut segments = self.0.clone();
        segments[position] = value;
        Some(Self(segments))
    }

    /// Check the path can be walked by a BIP-32 deriver.
    pub fn validate(&self) -> Result<(), PathError> {
        if self.0.len() > MAX_DEPTH {
            return Err(PathError::TooDeep {
                depth: self.0.len(),
                max: MAX_DEPTH,
            });
        }
        Ok(())
    }
}

impl From<Vec<u32>> for DerivationPath {
    fn from(segments: Vec<u32>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for &segment in &self.0 {
            if segment & HARDENED != 0 {
                write!(f, "/{}'", segment & !HARDENED)?;
            } else {
                write!(f, "/{segment}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = PathError;

    /// Parse `m/44'/0'/0'/0/0`. Hardened segments may be marked with `'`,
    /// `h` or `H`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('/');
        match parts.next() {
            Some("m") | Some("M") => {}
            _ => return Err(PathError::MissingRoot),
        }

        let mut segments = Vec::new();
        for (position, part) in parts.enumerate() {
            if part.is_empty() {
                return Err(PathError::EmptySegment(position + 1));
            }
            let (digits, hardened) = match part.strip_suffix(['\'', 'h', 'H']) {
                Some(rest) => (rest, true),
                None => (part, false),
            };
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PathError::InvalidSegment(part.to_string()));
            }
            let index: u32 = digits
                .parse()
                .map_err(|_| PathError::IndexOutOfRange(part.to_string()))?;
            if index & HARDENED != 0 {
                return Err(PathError::IndexOutOfRange(part.to_string()));
            }
            segments.push(if hardened { index | HARDENED } else { index });
        }

        let path = Self(segments);
        path.validate()?;
        Ok(path)
    }
}

/// An account-level path together with the coin and script type it is
/// meant for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BtcAccountPath {
    pub coin: Coin,
    pub script_type: ScriptType,
    pub address_n_list: DerivationPath,
}

/// Request for the account templates of a coin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BtcGetAccountPaths {
    pub coin: Coin,
    pub account_idx: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_type: Option<ScriptType>,
}

/// An Osmosis (Cosmos SDK) account path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsmosisAccountPath {
    pub address_n_list: DerivationPath,
}

fn account_template(coin: Coin, purpose: u32, script_type: ScriptType, account_idx: u32) -> BtcAccountPath {
    BtcAccountPath {
        coin,
        script_type,
        address_n_list: DerivationPath::new(vec![
            HARDENED | purpose,
            HARDENED | coin.params().slip44,
            HARDENED | account_idx,
        ]),
    }
}

/// BIP-44 legacy account `m/44'/coin'/account'`.
pub fn legacy_account(coin: Coin, account_idx: u32) -> BtcAccountPath {
    account_template(coin, 44, ScriptType::P2pkh, account_idx)
}

/// BIP-49 wrapped-segwit account `m/49'/coin'/account'`.
pub fn segwit_account(coin: Coin, account_idx: u32) -> BtcAccountPath {
    account_template(coin, 49, ScriptType::P2shP2wpkh, account_idx)
}

/// BIP-84 native-segwit account `m/84'/coin'/account'`.
pub fn segwit_native_account(coin: Coin, account_idx: u32) -> BtcAccountPath {
    account_template(coin, 84, ScriptType::P2wpkh, account_idx)
}

/// Account templates for a coin, optionally filtered by script type.
///
/// Segwit templates are only offered for coins with segwit addresses.
pub fn account_paths(coin: Coin, account_idx: u32, script_type: Option<ScriptType>) -> Vec<BtcAccountPath> {
    let mut paths = vec![legacy_account(coin, account_idx)];
    if coin.supports_segwit() {
        paths.push(segwit_account(coin, account_idx));
        paths.push(segwit_native_account(coin, account_idx));
    }
    match script_type {
        Some(t) => paths.into_iter().filter(|p| p.script_type == t).collect(),
        None => paths,
    }
}

/// Osmosis account paths `m/44'/118'/account'/0/0`.
pub fn osmosis_account_paths(account_idx: u32) -> Vec<OsmosisAccountPath> {
    vec![OsmosisAccountPath {
        address_n_list: DerivationPath::new(vec![
            HARDENED + 44,
            HARDENED + OSMOSIS_SLIP44,
            HARDENED | account_idx,
            0,
            0,
        ]),
    }]
}

/// `m/44'/118'/n'/0/0` advanced to account `n + 1`, or `None` for any
/// other shape.
pub fn next_osmosis_account_path(msg: &OsmosisAccountPath) -> Option<OsmosisAccountPath> {
    let &[purpose, coin_type, account, 0, 0] = msg.address_n_list.as_slice() else {
        return None;
    };
    if purpose != HARDENED | 44 || coin_type != HARDENED | OSMOSIS_SLIP44 || account & HARDENED == 0 {
        return None;
    }
    let next = msg.address_n_list.with_segment(2, account.checked_add(1)?)?;
    Some(OsmosisAccountPath { address_n_list: next })
}

/// Human-oriented classification of a UTXO path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathDescription {
    pub verbose: String,
    pub is_known: bool,
    pub account_idx: Option<u32>,
    /// True for account-level (3 segment) paths.
    pub whole_account: bool,
    pub is_change: bool,
    pub address_idx: Option<u32>,
}

impl PathDescription {
    fn unknown(path: &DerivationPath) -> Self {
        Self {
            verbose: path.to_string(),
            is_known: false,
            account_idx: None,
            whole_account: false,
            is_change: false,
            address_idx: None,
        }
    }
}

/// Classify `path` against the BIP-44/49/84 template for `coin` and
/// `script_type`.
pub fn describe_utxo_path(path: &DerivationPath, coin: Coin, script_type: ScriptType) -> PathDescription {
    let unknown = PathDescription::unknown(path);
    let segments = path.as_slice();

    if segments.len() != 3 && segments.len() != 5 {
        return unknown;
    }

    let purpose = segments[0];
    if purpose & HARDENED == 0 {
        return unknown;
    }
    let purpose = purpose & !HARDENED;
    if script_type.purpose() != Some(purpose) {
        return unknown;
    }
    if purpose != 44 && !coin.supports_segwit() {
        return unknown;
    }

    if segments[1] != HARDENED + coin.params().slip44 {
        return unknown;
    }
    if segments[2] & HARDENED == 0 {
        return unknown;
    }
    let account_idx = segments[2] & !HARDENED;

    let flavour = match script_type {
        ScriptType::P2wpkh => " (Segwit Native)",
        ScriptType::P2shP2wpkh => " (Segwit)",
        _ => " (Legacy)",
    };
    let account = format!("{coin} Account #{account_idx}{flavour}");

    if segments.len() == 3 {
        return PathDescription {
            verbose: account,
            is_known: true,
            account_idx: Some(account_idx),
            whole_account: true,
            is_change: false,
            address_idx: None,
        };
    }

    let (change, address_idx) = (segments[3], segments[4]);
    if change > 1 || address_idx & HARDENED != 0 {
        return unknown;
    }
    let is_change = change == 1;
    let kind = if is_change { "Change Address" } else { "Address" };

    PathDescription {
        verbose: format!("{account}, {kind} #{address_idx}"),
        is_known: true,
        account_idx: Some(account_idx),
        whole_account: false,
        is_change,
        address_idx: Some(address_idx),
    }
}

/// The same template one account further on, or `None` when `msg` is not a
/// recognised template.
pub fn next_account_path(msg: &BtcAccountPath) -> Option<BtcAccountPath> {
    let description = describe_utxo_path(&msg.address_n_list, msg.coin, msg.script_type);
    if !description.is_known {
        return None;
    }

    let segments = msg.address_n_list.as_slice();
    if ![44, 49, 84].contains(&(segments[0] & !HARDENED)) {
        return None;
    }

    let next = segments[2].checked_add(1)?;
    let address_n_list = msg.address_n_list.with_segment(2, next)?;
    Some(BtcAccountPath {
        address_n_list,
        ..msg.clone()
    })
}

/// Whether every path belongs to the same coin and account, or `None` when
/// any of them is not a recognised template (or the list is empty).
pub fn is_same_account(paths: &[BtcAccountPath]) -> Option<bool> {
    if paths.is_empty() {
        return None;
    }
    let mut accounts = Vec::with_capacity(paths.len());
    for p in paths {
        let description = describe_utxo_path(&p.address_n_list, p.coin, p.script_type);
        if !description.is_known {
            return None;
        }
        accounts.push((p.coin, description.account_idx));
    }
    let (coin, account) = accounts[0];
    Some(accounts.iter().all(|(c, a)| *c == coin && *a == account))
}
