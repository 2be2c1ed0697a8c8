//! Locking-script families understood by the payment builder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScriptError;

/// Script type tag for an input being spent or an output being created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptType {
    /// Legacy pay-to-pubkey-hash.
    #[serde(rename = "p2pkh")]
    P2pkh,
    /// Script-hash wrapping a pay-to-pubkey-hash redeem script.
    #[serde(rename = "p2sh")]
    P2sh,
    /// Native segwit v0 pay-to-witness-pubkey-hash.
    #[serde(rename = "p2wpkh")]
    P2wpkh,
    /// Segwit v0 nested inside pay-to-script-hash.
    #[serde(rename = "p2sh-p2wpkh")]
    P2shP2wpkh,
}

impl ScriptType {
    pub const ALL: [ScriptType; 4] = [
        ScriptType::P2pkh,
        ScriptType::P2sh,
        ScriptType::P2wpkh,
        ScriptType::P2shP2wpkh,
    ];

    /// The wire tag (`p2pkh`, `p2sh`, `p2wpkh`, `p2sh-p2wpkh`).
    pub fn tag(&self) -> &'static str {
        match self {
            ScriptType::P2pkh => "p2pkh",
            ScriptType::P2sh => "p2sh",
            ScriptType::P2wpkh => "p2wpkh",
            ScriptType::P2shP2wpkh => "p2sh-p2wpkh",
        }
    }

    /// Inputs of this type are signed with the BIP-143 witness digest.
    pub fn is_segwit(&self) -> bool {
        matches!(self, ScriptType::P2wpkh | ScriptType::P2shP2wpkh)
    }

    /// Outputs of this type need a redeem script to be spent.
    pub fn is_script_hash(&self) -> bool {
        matches!(self, ScriptType::P2sh | ScriptType::P2shP2wpkh)
    }

    /// BIP-43 purpose used by the account template for this script type.
    pub fn purpose(&self) -> Option<u32> {
        match self {
            ScriptType::P2pkh => Some(44),
            ScriptType::P2shP2wpkh => Some(49),
            ScriptType::P2wpkh => Some(84),
            ScriptType::P2sh => None,
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ScriptType {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScriptType::ALL
            .into_iter()
            .find(|t| t.tag() == s)
            .ok_or_else(|| ScriptError::UnsupportedScriptType(s.to_string()))
    }
}
