//! Shared test helpers for integration and security tests.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::{deserialize, encode::serialize_hex};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};

use hdwallet_core::coins::Coin;
use hdwallet_core::path::DerivationPath;
use hdwallet_core::script_type::ScriptType;
use hdwallet_core::traits::EcdsaKey;
use hdwallet_core::types::{BtcSignTx, BtcSignTxInput, BtcSignTxOutput};
use hdwallet_native::{KdfParams, NativeHdWallet, NativeWalletConfig, build_payment};

/// BIP-39 test mnemonic used by the BIP-44/49/84 vectors.
pub const ABANDON: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// m/84'/0'/0'/0/0 of [`ABANDON`].
pub const ABANDON_BIP84_ADDRESS: &str = "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu";

/// An unrelated mainnet P2WPKH destination.
pub const EXTERNAL_ADDRESS: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

/// Backend config with the cheapest KDF.
pub fn fast_config() -> NativeWalletConfig {
    NativeWalletConfig {
        kdf: KdfParams::light(),
        ..NativeWalletConfig::default()
    }
}

/// A backend with [`ABANDON`] loaded.
pub fn unlocked_wallet() -> NativeHdWallet {
    let wallet = NativeHdWallet::new(fast_config());
    wallet.load_mnemonic(ABANDON, "").unwrap();
    wallet
}

pub fn path(s: &str) -> DerivationPath {
    s.parse().unwrap()
}

/// Locking script the wallet derives for `(path, script_type)`.
pub fn script_for(wallet: &NativeHdWallet, path: &DerivationPath, script_type: ScriptType, coin: Coin) -> ScriptBuf {
    let key = wallet.key_holder(path, coin).unwrap();
    build_payment(&key.public_key(), script_type, coin).unwrap().script_pubkey
}

/// A coinbase-shaped transaction paying `value` to `script_pubkey`.
///
/// `marker` goes into the scriptSig so each call can yield a distinct txid.
pub fn funding_tx(script_pubkey: ScriptBuf, value: u64, marker: u8) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::null(),
            script_sig: ScriptBuf::from_bytes(vec![0x01, marker]),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(value),
            script_pubkey,
        }],
    }
}

/// Funding transaction paying the wallet's own key at `path`.
pub fn fund(wallet: &NativeHdWallet, p: &str, script_type: ScriptType, coin: Coin, value: u64) -> Transaction {
    funding_tx(script_for(wallet, &path(p), script_type, coin), value, p.len() as u8)
}

/// Input spending output 0 of `prev`, carrying the full previous tx.
pub fn spend(prev: &Transaction, p: &str, script_type: ScriptType) -> BtcSignTxInput {
    BtcSignTxInput {
        txid: prev.compute_txid().to_string(),
        vout: 0,
        address_n_list: path(p),
        script_type,
        amount: prev.output[0].value.to_sat(),
        hex: Some(serialize_hex(prev)),
        prev_output: None,
    }
}

pub fn sign_request(coin: Coin, inputs: Vec<BtcSignTxInput>, outputs: Vec<BtcSignTxOutput>) -> BtcSignTx {
    BtcSignTx {
        coin,
        version: 2,
        locktime: None,
        inputs,
        outputs,
        op_return_data: None,
        vault_address: None,
    }
}

pub fn decode_tx(hex_tx: &str) -> Transaction {
    deserialize(&hex::decode(hex_tx).unwrap()).unwrap()
}
