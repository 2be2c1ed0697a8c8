//! Request and response types for the Bitcoin-family signing surface.
//!
//! Field names serialize in camelCase so JSON requests produced by other
//! wallet front-ends can be fed straight into [`crate::traits::BtcWallet`].

use serde::{Deserialize, Serialize};

use crate::coins::Coin;
use crate::path::DerivationPath;
use crate::script_type::ScriptType;

/// Previous output narrowed to what a witness signature commits to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrevOutput {
    /// Hex-encoded locking script of the spent output.
    pub script_pubkey: String,
    /// Value of the spent output in base units.
    pub amount: u64,
}

/// One input of an unsigned transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BtcSignTxInput {
    /// Previous transaction id, display (big-endian) hex.
    pub txid: String,
    pub vout: u32,
    pub address_n_list: DerivationPath,
    pub script_type: ScriptType,
    pub amount: u64,
    /// Full serialized previous transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
    /// Narrowed previous output, preferred for witness inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_output: Option<PrevOutput>,
}

impl BtcSignTxInput {
    /// True when at least one previous-output representation is present.
    pub fn has_prev_out_data(&self) -> bool {
        self.hex.is_some() || self.prev_output.is_some()
    }
}

/// One output of an unsigned transaction. Either `address` or
/// `address_n_list` must be set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BtcSignTxOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_n_list: Option<DerivationPath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_type: Option<ScriptType>,
    pub amount: u64,
    /// Marks a change output. Informational only.
    #[serde(default)]
    pub is_change: bool,
}

impl BtcSignTxOutput {
    pub fn to_address(address: impl Into<String>, amount: u64) -> Self {
        Self {
            address: Some(address.into()),
            amount,
            ..Self::default()
        }
    }

    pub fn to_path(path: DerivationPath, script_type: ScriptType, amount: u64) -> Self {
        Self {
            address_n_list: Some(path),
            script_type: Some(script_type),
            amount,
            ..Self::default()
        }
    }
}

/// An unsigned transaction to be assembled and signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BtcSignTx {
    pub coin: Coin,
    #[serde(default = "default_version")]
    pub version: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locktime: Option<u32>,
    pub inputs: Vec<BtcSignTxInput>,
    pub outputs: Vec<BtcSignTxOutput>,
    /// Payload for a trailing zero-value `OP_RETURN` output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_return_data: Option<String>,
    /// Vault address of an external protocol whose output rules apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_address: Option<String>,
}

fn default_version() -> i32 {
    1
}

/// Result of a successful signing call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BtcSignedTx {
    /// DER signatures (without sighash byte), hex, one per input in order.
    pub signatures: Vec<String>,
    /// Fully serialized transaction, hex.
    pub serialized_tx: String,
}

/// Address request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BtcGetAddress {
    pub address_n_list: DerivationPath,
    pub coin: Coin,
    pub script_type: ScriptType,
    #[serde(default)]
    pub show_display: bool,
}

/// Message signing request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BtcSignMessage {
    pub address_n_list: DerivationPath,
    pub coin: Coin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_type: Option<ScriptType>,
    pub message: String,
}

/// Message verification request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BtcVerifyMessage {
    pub address: String,
    pub message: String,
    pub signature: String,
    pub coin: Coin,
}
