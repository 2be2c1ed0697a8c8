//! Seed management and the isolated key holder.
//!
//! A [`KeyHolder`] is derived from a [`Seed`] along a BIP-32 path and is the
//! only value in the crate that owns a private scalar. It exposes the public
//! key and the capability traits from `hdwallet_core::traits`; there is no
//! accessor for the scalar itself.

use std::fmt;
use std::sync::OnceLock;

use bitcoin::NetworkKind;
use bitcoin::bip32::{ChildNumber, Xpriv};
use secp256k1::ecdsa::{RecoverableSignature, Signature};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use hdwallet_core::coins::Coin;
use hdwallet_core::error::CapabilityError;
use hdwallet_core::path::DerivationPath;
use hdwallet_core::traits::{DigestAlgorithm, EcdhKey, EcdsaKey, EcdsaRecoverableKey};

use crate::error::WalletError;

/// Shortest and longest seeds accepted by BIP-32.
const MIN_SEED_LEN: usize = 16;
const MAX_SEED_LEN: usize = 64;

static SECP: OnceLock<Secp256k1<All>> = OnceLock::new();

pub(crate) fn secp() -> &'static Secp256k1<All> {
    SECP.get_or_init(Secp256k1::new)
}

/// BIP-32 master seed.
///
/// Secret material is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    bytes: Vec<u8>,
}

impl Seed {
    /// Wrap raw seed bytes (16 to 64 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&bytes.len()) {
            return Err(WalletError::KeyDerivation(format!(
                "seed must be {MIN_SEED_LEN}..={MAX_SEED_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    #[cfg(test)]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Derive the key holder for `path`. The coin only selects the BIP-32
    /// network kind.
    pub fn derive(&self, path: &DerivationPath, coin: Coin) -> Result<KeyHolder, WalletError> {
        path.validate()?;
        let network = if coin.params().is_test_network {
            NetworkKind::Test
        } else {
            NetworkKind::Main
        };
        let mut master = Xpriv::new_master(network, &self.bytes)
            .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
        let children: Vec<ChildNumber> = path.as_slice().iter().map(|&i| ChildNumber::from(i)).collect();
        let derived = master.derive_priv(secp(), &children);
        master.private_key.non_secure_erase();
        let mut child = derived.map_err(|e| WalletError::KeyDerivation(e.to_string()))?;

        let holder = KeyHolder::new(child.private_key);
        child.private_key.non_secure_erase();
        Ok(holder)
    }
}

impl Clone for Seed {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
        }
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Opaque handle over one derived private key.
pub struct KeyHolder {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyHolder {
    fn new(secret: SecretKey) -> Self {
        let public = PublicKey::from_secret_key(secp(), &secret);
        Self { secret, public }
    }
}

impl Drop for KeyHolder {
    fn drop(&mut self) {
        self.secret.non_secure_erase();
    }
}

impl fmt::Debug for KeyHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyHolder")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// RFC 6979 extra entropy for a counter: 32-byte big-endian integer.
fn counter_entropy(counter: u32) -> [u8; 32] {
    let mut data = [0u8; 32];
    data[28..].copy_from_slice(&counter.to_be_bytes());
    data
}

impl EcdsaKey for KeyHolder {
    fn public_key(&self) -> PublicKey {
        self.public
    }

    fn ecdsa_sign(&self, digest: &[u8; 32], counter: Option<u32>) -> Result<Signature, CapabilityError> {
        let msg = Message::from_digest(*digest);
        Ok(match counter {
            None => secp().sign_ecdsa(&msg, &self.secret),
            Some(c) => secp().sign_ecdsa_with_noncedata(&msg, &self.secret, &counter_entropy(c)),
        })
    }
}

impl EcdsaRecoverableKey for KeyHolder {
    fn ecdsa_sign_recoverable(
        &self,
        digest: &[u8; 32],
        counter: Option<u32>,
    ) -> Result<RecoverableSignature, CapabilityError> {
        let msg = Message::from_digest(*digest);
        Ok(match counter {
            None => secp().sign_ecdsa_recoverable(&msg, &self.secret),
            Some(c) => secp().sign_ecdsa_recoverable_with_noncedata(&msg, &self.secret, &counter_entropy(c)),
        })
    }
}

impl EcdhKey for KeyHolder {
    fn ecdh(&self, peer: &PublicKey, digest: Option<DigestAlgorithm>) -> Result<[u8; 32], CapabilityError> {
        let point = Zeroizing::new(secp256k1::ecdh::shared_secret_point(peer, &self.secret));
        let mut x = [0u8; 32];
        x.copy_from_slice(&point[..32]);
        Ok(match digest {
            None => x,
            Some(DigestAlgorithm::Sha256) => Sha256::digest(x).into(),
            Some(DigestAlgorithm::Hash256) => Sha256::digest(Sha256::digest(x)).into(),
        })
    }

    fn ecdh_raw(&self, peer: &PublicKey) -> Result<PublicKey, CapabilityError> {
        let point = Zeroizing::new(secp256k1::ecdh::shared_secret_point(peer, &self.secret));
        let mut uncompressed = Zeroizing::new([0u8; 65]);
        uncompressed[0] = 0x04;
        uncompressed[1..].copy_from_slice(&point[..]);
        PublicKey::from_slice(&uncompressed[..]).map_err(|_| CapabilityError::InvalidPoint)
    }
}
