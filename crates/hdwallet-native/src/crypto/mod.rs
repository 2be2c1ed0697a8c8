//! At-rest protection of the wallet mnemonic.

pub mod cipher_string;
pub mod encrypted_wallet;
pub mod helper;

pub use cipher_string::{CipherString, EncryptionType};
pub use encrypted_wallet::EncryptedWallet;
pub use helper::CryptoHelper;
