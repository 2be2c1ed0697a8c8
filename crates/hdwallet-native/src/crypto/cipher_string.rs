//! Delimited string form of an encrypted payload.
//!
//! ```text
//! <type>.<iv_b64>|<ciphertext_b64>|<mac_b64>
//! ```
//!
//! Segment order and separators are fixed.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::str::FromStr;

use crate::error::WalletError;

/// Algorithm marker carried in the first segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionType {
    /// AES-256-GCM; the MAC segment is the 16-byte GCM tag.
    Aes256Gcm,
}

impl EncryptionType {
    pub fn marker(&self) -> u8 {
        match self {
            EncryptionType::Aes256Gcm => 7,
        }
    }

    fn from_marker(marker: &str) -> Result<Self, WalletError> {
        match marker {
            "7" => Ok(EncryptionType::Aes256Gcm),
            other => Err(WalletError::Corrupt(format!("unknown encryption type {other:?}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CipherString {
    pub encryption_type: EncryptionType,
    pub iv: Vec<u8>,
    pub data: Vec<u8>,
    pub mac: Vec<u8>,
}

impl CipherString {
    pub fn new(encryption_type: EncryptionType, iv: Vec<u8>, data: Vec<u8>, mac: Vec<u8>) -> Self {
        Self {
            encryption_type,
            iv,
            data,
            mac,
        }
    }
}

impl fmt::Display for CipherString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}|{}|{}",
            self.encryption_type.marker(),
            STANDARD.encode(&self.iv),
            STANDARD.encode(&self.data),
            STANDARD.encode(&self.mac)
        )
    }
}

impl FromStr for CipherString {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (marker, rest) = s
            .split_once('.')
            .ok_or_else(|| WalletError::Corrupt("missing type separator".into()))?;
        let encryption_type = EncryptionType::from_marker(marker)?;

        let parts: Vec<&str> = rest.split('|').collect();
        let &[iv, data, mac] = parts.as_slice() else {
            return Err(WalletError::Corrupt(format!("expected 3 segments, got {}", parts.len())));
        };
        let decode = |name: &str, seg: &str| {
            STANDARD
                .decode(seg)
                .map_err(|e| WalletError::Corrupt(format!("{name}: {e}")))
        };
        Ok(Self {
            encryption_type,
            iv: decode("iv", iv)?,
            data: decode("data", data)?,
            mac: decode("mac", mac)?,
        })
    }
}
