//! Error types shared by hdwallet backends.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("empty path segment at position {0}")] EmptySegment(usize),
    #[error("invalid path segment: {0}")] InvalidSegment(String),
    #[error("path index out of range: {0}")] IndexOutOfRange(String),
    #[error("path must start with 'm'")] MissingRoot,
    #[error("path too deep: {depth} > {max}")] TooDeep { depth: usize, max: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58check encoding: {0}")] InvalidBase58(String),
    #[error("invalid bech32 encoding: {0}")] InvalidBech32(String),
    #[error("invalid cashaddr encoding: {0}")] InvalidCashAddr(String),
    #[error("unknown version byte {version:#04x} for {coin}")] UnknownVersion { coin: String, version: u8 },
    #[error("wrong network prefix: expected {expected}, got {got}")] WrongPrefix { expected: String, got: String },
    #[error("unsupported witness version {0}")] UnsupportedWitnessVersion(u8),
    #[error("invalid payload length: {0}")] InvalidLength(usize),
    #[error("{0} has no segwit support")] SegwitUnsupported(String),
    #[error("unrecognized output script")] UnrecognizedScript,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("unsupported script type: {0}")] UnsupportedScriptType(String),
    #[error("unknown coin: {0}")] UnknownCoin(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("unsupported operation: {0}")] UnsupportedOperation(String),
    #[error("invalid curve point")] InvalidPoint,
    #[error("signing failed: {0}")] SigningFailed(String),
}
