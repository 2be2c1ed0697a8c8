//! Locking and redeem scripts for a public key.

use bitcoin::ScriptBuf;
use bitcoin::hashes::{Hash, hash160};
use secp256k1::PublicKey;

use hdwallet_core::address::{Address, Payload};
use hdwallet_core::coins::Coin;
use hdwallet_core::script_type::ScriptType;

use crate::error::WalletError;

/// Scripts and address for one public key under one script type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payment {
    pub script_type: ScriptType,
    pub address: Address,
    /// Locking script of outputs paying this key.
    pub script_pubkey: ScriptBuf,
    /// Redeem script, for script-hash types.
    pub redeem_script: Option<ScriptBuf>,
}

fn hash160(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

/// Build the payment for `pubkey` under `script_type` on `coin`.
pub fn build_payment(pubkey: &PublicKey, script_type: ScriptType, coin: Coin) -> Result<Payment, WalletError> {
    if script_type.is_segwit() && !coin.supports_segwit() {
        return Err(WalletError::UnsupportedScriptType(format!("{script_type} on {coin}")));
    }
    let pkh = hash160(&pubkey.serialize());

    let (payload, redeem_script) = match script_type {
        ScriptType::P2pkh => (Payload::PubkeyHash(pkh), None),
        ScriptType::P2wpkh => (Payload::WitnessPubkeyHash(pkh), None),
        ScriptType::P2sh => {
            let redeem = Address::new(coin, Payload::PubkeyHash(pkh))?.script_pubkey();
            (Payload::ScriptHash(hash160(redeem.as_bytes())), Some(redeem))
        }
        ScriptType::P2shP2wpkh => {
            let redeem = Address::new(coin, Payload::WitnessPubkeyHash(pkh))?.script_pubkey();
            (Payload::ScriptHash(hash160(redeem.as_bytes())), Some(redeem))
        }
    };

    let address = Address::new(coin, payload)?;
    Ok(Payment {
        script_type,
        script_pubkey: address.script_pubkey(),
        address,
        redeem_script,
    })
}

/// [`build_payment`] for a wire tag such as `p2sh-p2wpkh`.
pub fn build_payment_for_tag(pubkey: &PublicKey, tag: &str, coin: Coin) -> Result<Payment, WalletError> {
    let script_type: ScriptType = tag.parse()?;
    build_payment(pubkey, script_type, coin)
}
