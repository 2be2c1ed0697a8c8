//! BIP-39 mnemonic generation, validation and seed expansion.

use bip39::{Language, Mnemonic};
use rand::RngCore;
use unicode_normalization::UnicodeNormalization;
use zeroize::Zeroizing;

use crate::error::WalletError;
use crate::keys::Seed;

/// Word count used for newly created wallets.
pub const DEFAULT_WORD_COUNT: usize = 12;

/// Lower-case, NFKD-normalize and collapse whitespace.
fn normalize(phrase: &str) -> Zeroizing<String> {
    let nfkd: Zeroizing<String> = Zeroizing::new(phrase.nfkd().collect());
    Zeroizing::new(nfkd.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
}

/// Generate a fresh English mnemonic of `word_count` words (12 to 24, in
/// steps of three).
pub fn generate_mnemonic(word_count: usize) -> Result<Zeroizing<String>, WalletError> {
    if !(12..=24).contains(&word_count) || word_count % 3 != 0 {
        return Err(WalletError::InvalidMnemonic(format!("unsupported word count {word_count}")));
    }
    let mut entropy = Zeroizing::new(vec![0u8; word_count / 3 * 4]);
    rand::rngs::OsRng.fill_bytes(&mut entropy);
    let m = Mnemonic::from_entropy_in(Language::English, &entropy)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    Ok(Zeroizing::new(m.to_string()))
}

/// Check a phrase against the English wordlist and its checksum, returning
/// the normalized form.
pub fn validate_mnemonic(phrase: &str) -> Result<Zeroizing<String>, WalletError> {
    let normalized = normalize(phrase);
    Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    Ok(normalized)
}

/// Expand a mnemonic and optional passphrase into the 64-byte BIP-39 seed.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Seed, WalletError> {
    let normalized = normalize(phrase);
    let m = Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    let passphrase: Zeroizing<String> = Zeroizing::new(passphrase.nfkd().collect());
    let bytes = Zeroizing::new(m.to_seed_normalized(&passphrase));
    Seed::from_bytes(&bytes[..])
}
