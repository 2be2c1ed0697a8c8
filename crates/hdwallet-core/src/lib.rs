//! # hdwallet-core
//! Types and traits shared by hdwallet signing backends: coin parameters,
//! derivation paths and account templates, address encodings, sign-tx
//! request types, and the key-capability and backend traits.

pub mod address;
pub mod cashaddr;
pub mod coins;
pub mod error;
pub mod path;
pub mod script_type;
pub mod traits;
pub mod types;

pub use coins::{Coin, CoinParams, HARDENED};
pub use path::DerivationPath;
pub use script_type::ScriptType;
