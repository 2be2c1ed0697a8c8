//! CashAddr encoding for Bitcoin Cash.
//!
//! CashAddr reuses the bech32 character set with a 40-bit BCH checksum over
//! the lower five bits of the prefix. Only 160-bit hashes are produced or
//! accepted, which covers every P2PKH and P2SH output this backend builds.

use crate::error::AddressError;

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Address kind carried in the CashAddr version byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CashAddrKind {
    PubkeyHash,
    ScriptHash,
}

impl CashAddrKind {
    fn type_bits(self) -> u8 {
        match self {
            CashAddrKind::PubkeyHash => 0,
            CashAddrKind::ScriptHash => 1,
        }
    }
}

/// Encode a 20-byte hash as `prefix:payload`.
pub fn encode(prefix: &str, kind: CashAddrKind, hash: &[u8; 20]) -> String {
    // Size code 0 selects a 160-bit hash.
    let version = kind.type_bits() << 3;
    let mut raw = Vec::with_capacity(21);
    raw.push(version);
    raw.extend_from_slice(hash);

    let mut data = convert_bits(&raw, 8, 5, true).unwrap_or_default();
    data.extend(create_checksum(prefix, &data));

    let mut out = String::with_capacity(prefix.len() + 1 + data.len());
    out.push_str(prefix);
    out.push(':');
    for d in data {
        out.push(CHARSET[d as usize] as char);
    }
    out
}

/// Decode a CashAddr string. The prefix may be omitted, in which case
/// `default_prefix` is assumed for checksum validation.
pub fn decode(s: &str, default_prefix: &str) -> Result<(CashAddrKind, [u8; 20]), AddressError> {
    let has_lower = s.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = s.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(AddressError::InvalidCashAddr("mixed case".into()));
    }
    let lower = s.to_ascii_lowercase();

    let (prefix, payload) = match lower.rsplit_once(':') {
        Some((p, rest)) => (p.to_string(), rest),
        None => (default_prefix.to_string(), lower.as_str()),
    };
    if prefix != default_prefix {
        return Err(AddressError::WrongPrefix {
            expected: default_prefix.to_string(),
            got: prefix,
        });
    }
    if payload.len() < 8 {
        return Err(AddressError::InvalidCashAddr("payload too short".into()));
    }

    let mut data = Vec::with_capacity(payload.len());
    for c in payload.bytes() {
        let v = CHARSET
            .iter()
            .position(|&x| x == c)
            .ok_or_else(|| AddressError::InvalidCashAddr(format!("invalid character {:?}", c as char)))?;
        data.push(v as u8);
    }

    if !verify_checksum(&prefix, &data) {
        return Err(AddressError::InvalidCashAddr("checksum mismatch".into()));
    }

    let body = &data[..data.len() - 8];
    let raw = convert_bits(body, 5, 8, false)
        .ok_or_else(|| AddressError::InvalidCashAddr("invalid padding".into()))?;
    let (&version, hash) = raw
        .split_first()
        .ok_or_else(|| AddressError::InvalidCashAddr("empty payload".into()))?;

    if version & 0x07 != 0 || hash.len() != 20 {
        return Err(AddressError::InvalidLength(hash.len()));
    }
    let kind = match version >> 3 {
        0 => CashAddrKind::PubkeyHash,
        1 => CashAddrKind::ScriptHash,
        other => {
            return Err(AddressError::UnknownVersion {
                coin: "BitcoinCash".into(),
                version: other,
            });
        }
    };

    let mut out = [0u8; 20];
    out.copy_from_slice(hash);
    Ok((kind, out))
}

fn polymod(values: &[u8]) -> u64 {
    const GEN: [u64; 5] = [
        0x98f2bc8e61,
        0x79b76d99e2,
        0xf33e5fb3c4,
        0xae2eabe2a8,
        0x1e4f43e470,
    ];
    let mut c: u64 = 1;
    for &d in values {
        let c0 = (c >> 35) as u8;
        c = ((c & 0x07_ffff_ffff) << 5) ^ d as u64;
        for (i, &g) in GEN.iter().enumerate() {
            if (c0 >> i) & 1 != 0 {
                c ^= g;
            }
        }
    }
    c ^ 1
}

fn prefix_expand(prefix: &str) -> Vec<u8> {
    let mut ret: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
    ret.push(0);
    ret
}

fn create_checksum(prefix: &str, data: &[u8]) -> Vec<u8> {
    let mut values = prefix_expand(prefix);
    values.extend_from_slice(data);
    values.extend_from_slice(&[0; 8]);
    let m = polymod(&values);
    (0..8).map(|i| ((m >> (5 * (7 - i))) & 0x1f) as u8).collect()
}

fn verify_checksum(prefix: &str, data: &[u8]) -> bool {
    let mut values = prefix_expand(prefix);
    values.extend_from_slice(data);
    polymod(&values) == 0
}

/// Regroup bits between widths (8-bit bytes to 5-bit groups and back).
fn convert_bits(data: &[u8], from_bits: u32, to_bits: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut ret = Vec::new();
    let maxv = (1u32 << to_bits) - 1;
    for &value in data {
        let v = value as u32;
        if v >> from_bits != 0 {
            return None;
        }
        acc = (acc << from_bits) | v;
        bits += from_bits;
        while bits >= to_bits {
            bits -= to_bits;
            ret.push(((acc >> bits) & maxv) as u8);
        }
    }
    if pad {
        if bits > 0 {
            ret.push(((acc << (to_bits - bits)) & maxv) as u8);
        }
    } else if bits >= from_bits || ((acc << (to_bits - bits)) & maxv) != 0 {
        return None;
    }
    Some(ret)
}
