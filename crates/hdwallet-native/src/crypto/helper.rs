//! Key derivation and AES-256-GCM primitives for the wallet container.
//!
//! Key schedule:
//! - container key: Argon2id(password, salt = SHA-256(identity));
//! - password hash: HKDF-SHA256(salt = password, ikm = container key), sent
//!   to whoever authenticates the user, never the password itself;
//! - encryption key: HKDF-SHA256 expansion of the container key under the
//!   `enc` context, independent of the password hash.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::config::KdfParams;
use crate::crypto::cipher_string::{CipherString, EncryptionType};
use crate::error::WalletError;

/// AES-GCM nonce length in bytes.
pub const IV_LEN: usize = 12;

/// AES-GCM tag length in bytes.
pub const TAG_LEN: usize = 16;

const PASSWORD_HASH_INFO: &[u8] = b"password-hash";
const ENCRYPTION_INFO: &[u8] = b"enc";

pub type SymmetricKey = Zeroizing<[u8; 32]>;

#[derive(Clone, Debug, Default)]
pub struct CryptoHelper {
    params: KdfParams,
}

impl CryptoHelper {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    /// Memory-hard key for a normalized (password, identity) pair.
    pub fn make_key(&self, password: &str, identity: &str) -> Result<SymmetricKey, WalletError> {
        let salt: [u8; 32] = Sha256::digest(identity.as_bytes()).into();
        let params = Params::new(
            self.params.memory_kib,
            self.params.iterations,
            self.params.parallelism,
            Some(32),
        )
        .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; 32]);
        argon2
            .hash_password_into(password.as_bytes(), &salt, &mut key[..])
            .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
        Ok(key)
    }

    /// Verification hash derived from the password and the container key.
    pub fn password_hash(&self, key: &[u8; 32], password: &str) -> Result<[u8; 32], WalletError> {
        let mut out = [0u8; 32];
        Hkdf::<Sha256>::new(Some(password.as_bytes()), key)
            .expand(PASSWORD_HASH_INFO, &mut out)
            .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
        Ok(out)
    }

    /// Encryption key expanded from the container key.
    pub fn stretch_key(&self, key: &[u8; 32]) -> Result<SymmetricKey, WalletError> {
        let mut out = Zeroizing::new([0u8; 32]);
        Hkdf::<Sha256>::from_prk(key)
            .map_err(|e| WalletError::KeyDerivation(e.to_string()))?
            .expand(ENCRYPTION_INFO, &mut out[..])
            .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
        Ok(out)
    }

    /// Encrypt under a fresh random IV.
    pub fn aes_encrypt(&self, plaintext: &[u8], key: &[u8; 32]) -> Result<CipherString, WalletError> {
        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
        let mut sealed = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
        let mac = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(CipherString::new(EncryptionType::Aes256Gcm, iv.to_vec(), sealed, mac))
    }

    /// Decrypt and authenticate. A tag mismatch never yields plaintext.
    pub fn aes_decrypt(&self, cs: &CipherString, key: &[u8; 32]) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        if cs.iv.len() != IV_LEN {
            return Err(WalletError::Corrupt(format!("iv must be {IV_LEN} bytes, got {}", cs.iv.len())));
        }
        if cs.mac.len() != TAG_LEN {
            return Err(WalletError::Corrupt(format!("mac must be {TAG_LEN} bytes, got {}", cs.mac.len())));
        }

        let mut sealed = Vec::with_capacity(cs.data.len() + TAG_LEN);
        sealed.extend_from_slice(&cs.data);
        sealed.extend_from_slice(&cs.mac);

        let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(&cs.iv), sealed.as_slice())
            .map(Zeroizing::new)
            .map_err(|_| WalletError::AuthenticationFailure)
    }
}
