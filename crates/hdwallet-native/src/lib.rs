//! # hdwallet-native: software HD wallet backend.
//!
//! Holds a BIP-32 seed in memory, derives isolated key holders that expose
//! signing and ECDH capabilities without revealing scalars, protects the
//! mnemonic at rest in a password-derived AES-GCM container, and assembles
//! and signs Bitcoin-family transactions.
//!
//! # Modules
//!
//! - [`error`]: `WalletError` enum
//! - [`config`]: KDF cost and signing options
//! - [`keys`]: Seed and the opaque `KeyHolder`
//! - [`mnemonic`]: BIP-39 generation, validation and seed derivation
//! - [`crypto`]: CipherString, key schedule, encrypted wallet container
//! - [`payment`]: p2pkh / p2sh / p2wpkh / p2sh-p2wpkh scripts for a key
//! - [`assembler`]: transaction assembly and signing
//! - [`vault`]: output validators for external protocols
//! - [`wallet`]: `NativeHdWallet`, the backend itself

pub mod assembler;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod mnemonic;
pub mod payment;
pub mod vault;
pub mod wallet;

// Re-exports for convenient access
pub use assembler::TransactionAssembler;
pub use config::{KdfParams, NativeWalletConfig};
pub use crypto::{CipherString, EncryptedWallet};
pub use error::WalletError;
pub use keys::{KeyHolder, Seed};
pub use payment::{Payment, build_payment};
pub use vault::{OutputValidator, ValidationContext, VaultOrderingRules};
pub use wallet::NativeHdWallet;
