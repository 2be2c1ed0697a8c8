//! Trait interfaces shared by signing backends.
//!
//! Two layers live here:
//! - key capabilities ([`EcdsaKey`], [`EcdsaRecoverableKey`], [`EcdhKey`]),
//!   the only operations through which a private scalar may be used;
//! - backend surfaces ([`HdWallet`], [`BtcWalletInfo`], [`BtcWallet`],
//!   [`OsmosisWalletInfo`]) selected through an explicit [`Capabilities`]
//!   value fixed when the backend is constructed.

use secp256k1::PublicKey;
use secp256k1::ecdsa::{RecoverableSignature, Signature};
use serde::{Deserialize, Serialize};

use crate::coins::Coin;
use crate::error::CapabilityError;
use crate::path::{self, BtcAccountPath, BtcGetAccountPaths, OsmosisAccountPath};
use crate::script_type::ScriptType;
use crate::types::{BtcGetAddress, BtcSignMessage, BtcSignTx, BtcSignedTx, BtcVerifyMessage};

/// Digest applied to the ECDH shared x-coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// Single SHA-256.
    Sha256,
    /// Double SHA-256.
    Hash256,
}

/// ECDSA signing over a 32-byte message digest.
///
/// Nonces are deterministic (RFC 6979). A `counter` is mixed into nonce
/// derivation so callers can search for an alternative encoding of the same
/// signature (for example low-R) without randomness. Implementations that
/// cannot honor a counter must return [`CapabilityError::UnsupportedOperation`]
/// when one is supplied.
pub trait EcdsaKey {
    /// Compressed public key of the holder.
    fn public_key(&self) -> PublicKey;

    fn ecdsa_sign(&self, digest: &[u8; 32], counter: Option<u32>) -> Result<Signature, CapabilityError>;
}

/// [`EcdsaKey`] that can also return public-key recovery information.
pub trait EcdsaRecoverableKey: EcdsaKey {
    fn ecdsa_sign_recoverable(
        &self,
        digest: &[u8; 32],
        counter: Option<u32>,
    ) -> Result<RecoverableSignature, CapabilityError>;
}

/// Elliptic-curve Diffie-Hellman agreement.
pub trait EcdhKey {
    /// Shared secret for `peer`: the x-coordinate of the agreed point, run
    /// through `digest` when one is given.
    fn ecdh(&self, peer: &PublicKey, digest: Option<DigestAlgorithm>) -> Result<[u8; 32], CapabilityError>;

    /// The agreed point itself.
    ///
    /// Default implementation reports the operation as unsupported.
    fn ecdh_raw(&self, _peer: &PublicKey) -> Result<PublicKey, CapabilityError> {
        Err(CapabilityError::UnsupportedOperation("ecdh_raw".into()))
    }
}

/// Feature families a backend exposes. Fixed at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub btc: bool,
    pub btc_info: bool,
    pub osmosis_info: bool,
}

/// Common surface of every wallet backend.
pub trait HdWallet: Send + Sync {
    fn vendor(&self) -> &'static str;

    fn model(&self) -> &'static str;

    /// The capability set chosen when the backend was built.
    fn capabilities(&self) -> Capabilities;

    /// True while no seed is loaded.
    fn is_locked(&self) -> bool;

    /// Drop all secret material held by the backend.
    fn wipe(&self);

    fn supports_btc(&self) -> bool {
        self.capabilities().btc
    }

    fn supports_btc_info(&self) -> bool {
        self.capabilities().btc_info
    }

    fn supports_osmosis_info(&self) -> bool {
        self.capabilities().osmosis_info
    }
}

/// Read-only Bitcoin-family queries that need no key material.
///
/// Account-path methods default to the standard BIP-44/49/84 templates.
pub trait BtcWalletInfo {
    /// Whether the backend can sign for `coin`.
    fn btc_supports_coin(&self, coin: Coin) -> bool;

    fn btc_supports_script_type(&self, coin: Coin, script_type: ScriptType) -> bool;

    fn btc_supports_secure_transfer(&self) -> bool {
        false
    }

    fn btc_supports_native_shapeshift(&self) -> bool {
        false
    }

    fn btc_get_account_paths(&self, msg: &BtcGetAccountPaths) -> Vec<BtcAccountPath> {
        path::account_paths(msg.coin, msg.account_idx, msg.script_type)
    }

    /// `None` when any path is not a recognised template.
    fn btc_is_same_account(&self, msg: &[BtcAccountPath]) -> Option<bool> {
        path::is_same_account(msg)
    }

    /// `None` when the path is not a recognised template.
    fn btc_next_account_path(&self, msg: &BtcAccountPath) -> Option<BtcAccountPath> {
        path::next_account_path(msg)
    }
}

/// Bitcoin-family address derivation and signing.
pub trait BtcWallet: BtcWalletInfo {
    type Error: std::error::Error;

    fn btc_get_address(&self, msg: &BtcGetAddress) -> Result<String, Self::Error>;

    fn btc_sign_tx(&self, msg: &BtcSignTx) -> Result<BtcSignedTx, Self::Error>;

    fn btc_sign_message(&self, msg: &BtcSignMessage) -> Result<String, Self::Error>;

    fn btc_verify_message(&self, msg: &BtcVerifyMessage) -> Result<bool, Self::Error>;
}

/// Osmosis account-path conventions.
pub trait OsmosisWalletInfo {
    fn osmosis_get_account_paths(&self, account_idx: u32) -> Vec<OsmosisAccountPath> {
        path::osmosis_account_paths(account_idx)
    }

    /// `None` unless the path is `m/44'/118'/n'/0/0`.
    fn osmosis_next_account_path(&self, msg: &OsmosisAccountPath) -> Option<OsmosisAccountPath> {
        path::next_osmosis_account_path(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::DerivationPath;

    struct InfoOnly;

    impl BtcWalletInfo for InfoOnly {
        fn btc_supports_coin(&self, coin: Coin) -> bool {
            coin == Coin::Bitcoin
        }

        fn btc_supports_script_type(&self, _coin: Coin, script_type: ScriptType) -> bool {
            script_type == ScriptType::P2pkh
        }
    }

    impl OsmosisWalletInfo for InfoOnly {}

    struct EcdhOnlyKey(PublicKey);

    impl EcdhKey for EcdhOnlyKey {
        fn ecdh(&self, _peer: &PublicKey, _digest: Option<DigestAlgorithm>) -> Result<[u8; 32], CapabilityError> {
            Ok([0; 32])
        }
    }

    fn some_pubkey() -> PublicKey {
        let secp = secp256k1::Secp256k1::signing_only();
        let sk = secp256k1::SecretKey::from_slice(&[1u8; 32]).unwrap();
        PublicKey::from_secret_key(&secp, &sk)
    }

    #[test]
    fn info_defaults() {
        let w = InfoOnly;
        assert!(!w.btc_supports_secure_transfer());
        assert!(!w.btc_supports_native_shapeshift());
        let paths = w.btc_get_account_paths(&BtcGetAccountPaths {
            coin: Coin::Bitcoin,
            account_idx: 0,
            script_type: None,
        });
        assert_eq!(paths.len(), 3);
        assert_eq!(w.btc_is_same_account(&paths[..1]), Some(true));
        let next = w.btc_next_account_path(&paths[0]).unwrap();
        assert_eq!(next.address_n_list.to_string(), "m/44'/0'/1'");
    }

    #[test]
    fn ecdh_raw_defaults_to_unsupported() {
        let pk = some_pubkey();
        let key = EcdhOnlyKey(pk);
        assert_eq!(
            key.ecdh_raw(&key.0),
            Err(CapabilityError::UnsupportedOperation("ecdh_raw".into()))
        );
    }

    #[test]
    fn osmosis_next_account() {
        let w = InfoOnly;
        let first = &w.osmosis_get_account_paths(4)[0];
        assert_eq!(first.address_n_list.to_string(), "m/44'/118'/4'/0/0");
        let next = w.osmosis_next_account_path(first).unwrap();
        assert_eq!(next.address_n_list.to_string(), "m/44'/118'/5'/0/0");
    }

    #[test]
    fn osmosis_next_account_unknown_path() {
        let w = InfoOnly;
        let btc = OsmosisAccountPath {
            address_n_list: "m/44'/0'/0'/0/0".parse::<DerivationPath>().unwrap(),
        };
        assert_eq!(w.osmosis_next_account_path(&btc), None);
        let short = OsmosisAccountPath {
            address_n_list: "m/44'/118'/0'".parse::<DerivationPath>().unwrap(),
        };
        assert_eq!(w.osmosis_next_account_path(&short), None);
    }

    #[test]
    fn capabilities_default_to_none() {
        let caps = Capabilities::default();
        assert!(!caps.btc && !caps.btc_info && !caps.osmosis_info);
    }
}
