//! Native wallet error types.

use hdwallet_core::error::{AddressError, CapabilityError, PathError, ScriptError};
use thiserror::Error;

/// Errors that can occur in native wallet operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Identity was empty or whitespace only.
    #[error("invalid identity")]
    InvalidIdentity,

    /// Password was empty or whitespace only.
    #[error("invalid password")]
    InvalidPassword,

    /// Malformed derivation path.
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// Address could not be parsed or encoded for the coin.
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("unsupported script type: {0}")]
    UnsupportedScriptType(String),

    #[error("unsupported coin: {0}")]
    UnsupportedCoin(String),

    /// Container operation attempted before `initialize`.
    #[error("wallet container is not initialized")]
    NotInitialized,

    /// Operation needs the seed but none is loaded.
    #[error("wallet is locked")]
    WalletLocked,

    /// Ciphertext failed its authentication tag check.
    #[error("authentication failure")]
    AuthenticationFailure,

    /// Encrypted container could not be parsed.
    #[error("corrupt container: {0}")]
    Corrupt(String),

    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Key derivation or cipher setup failed.
    #[error("key derivation: {0}")]
    KeyDerivation(String),

    /// Key capability failure other than an unsupported mode.
    #[error("capability: {0}")]
    Capability(CapabilityError),

    /// Input carries neither the previous transaction nor the spent output.
    #[error("missing previous output data")]
    MissingPrevOutData,

    /// Malformed input declaration (txid, previous transaction, amounts).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Output declares neither an address nor a derivation path, or carries
    /// an unusable data payload.
    #[error("invalid output: {0}")]
    InvalidOutput(String),

    /// Derived key does not control the output being spent.
    #[error("key does not match spent output script")]
    KeyMismatch,

    #[error("input {index}: {source}")]
    InputBuildFailure {
        index: usize,
        #[source]
        source: Box<WalletError>,
    },

    #[error("output {index}: {source}")]
    OutputBuildFailure {
        index: usize,
        #[source]
        source: Box<WalletError>,
    },

    #[error("signing input {index}: {source}")]
    SignFailure {
        index: usize,
        #[source]
        source: Box<WalletError>,
    },

    #[error("finalizing input {index}: {reason}")]
    FinalizationFailure { index: usize, reason: String },

    /// Transaction was built but breaks an external protocol's output rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl WalletError {
    pub fn input(index: usize, source: WalletError) -> Self {
        Self::InputBuildFailure {
            index,
            source: Box::new(source),
        }
    }

    pub fn output(index: usize, source: WalletError) -> Self {
        Self::OutputBuildFailure {
            index,
            source: Box::new(source),
        }
    }

    pub fn sign(index: usize, source: WalletError) -> Self {
        Self::SignFailure {
            index,
            source: Box::new(source),
        }
    }

    /// The innermost error beneath any indexed build or sign failures.
    pub fn root_cause(&self) -> &WalletError {
        let mut current = self;
        while let Self::InputBuildFailure { source, .. }
        | Self::OutputBuildFailure { source, .. }
        | Self::SignFailure { source, .. } = current
        {
            current = source.as_ref();
        }
        current
    }

    /// Operation attempted while locked or uninitialized.
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::NotInitialized | Self::WalletLocked)
    }

    /// Transaction could not be constructed (as opposed to signed, finalized
    /// or validated).
    pub fn is_build_failure(&self) -> bool {
        matches!(self, Self::InputBuildFailure { .. } | Self::OutputBuildFailure { .. })
    }
}

impl From<ScriptError> for WalletError {
    fn from(e: ScriptError) -> Self {
        match e {
            ScriptError::UnsupportedScriptType(t) => Self::UnsupportedScriptType(t),
            ScriptError::UnknownCoin(c) => Self::UnsupportedCoin(c),
        }
    }
}

impl From<CapabilityError> for WalletError {
    fn from(e: CapabilityError) -> Self {
        match e {
            CapabilityError::UnsupportedOperation(op) => Self::UnsupportedOperation(op),
            other => Self::Capability(other),
        }
    }
}
