//! Coin-aware address encoding.
//!
//! Legacy addresses are base58check with the coin's version byte, segwit v0
//! addresses are bech32 with the coin's human-readable part, and Bitcoin Cash
//! additionally accepts and renders CashAddr.

use bech32::Hrp;
use bitcoin::hashes::Hash as _;
use bitcoin::script::{Instruction, Script, ScriptBuf};
use bitcoin::{PubkeyHash, ScriptHash, WPubkeyHash, WScriptHash};
use std::fmt;

use crate::cashaddr::{self, CashAddrKind};
use crate::coins::Coin;
use crate::error::AddressError;

/// What an address commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Payload {
    PubkeyHash([u8; 20]),
    ScriptHash([u8; 20]),
    WitnessPubkeyHash([u8; 20]),
    WitnessScriptHash([u8; 32]),
}

impl Payload {
    pub fn is_segwit(&self) -> bool {
        matches!(self, Payload::WitnessPubkeyHash(_) | Payload::WitnessScriptHash(_))
    }

    fn program(&self) -> &[u8] {
        match self {
            Payload::PubkeyHash(h) | Payload::ScriptHash(h) | Payload::WitnessPubkeyHash(h) => h,
            Payload::WitnessScriptHash(h) => h,
        }
    }
}

/// An address bound to the coin whose network parameters encode it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    coin: Coin,
    payload: Payload,
}

impl Address {
    /// Bind a payload to a coin. Segwit payloads require a bech32 hrp.
    pub fn new(coin: Coin, payload: Payload) -> Result<Self, AddressError> {
        if payload.is_segwit() && !coin.supports_segwit() {
            return Err(AddressError::SegwitUnsupported(coin.to_string()));
        }
        Ok(Self { coin, payload })
    }

    pub fn coin(&self) -> Coin {
        self.coin
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The locking script paying to this address.
    pub fn script_pubkey(&self) -> ScriptBuf {
        match self.payload {
            Payload::PubkeyHash(h) => ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(h)),
            Payload::ScriptHash(h) => ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(h)),
            Payload::WitnessPubkeyHash(h) => ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(h)),
            Payload::WitnessScriptHash(h) => ScriptBuf::new_p2wsh(&WScriptHash::from_byte_array(h)),
        }
    }

    /// Recognize a standard locking script.
    pub fn from_script_pubkey(script: &Script, coin: Coin) -> Result<Self, AddressError> {
        let bytes = script.as_bytes();
        let payload = if script.is_p2pkh() {
            Payload::PubkeyHash(array_at(bytes, 3)?)
        } else if script.is_p2sh() {
            Payload::ScriptHash(array_at(bytes, 2)?)
        } else if script.is_p2wpkh() {
            Payload::WitnessPubkeyHash(array_at(bytes, 2)?)
        } else if script.is_p2wsh() {
            Payload::WitnessScriptHash(array_at(bytes, 2)?)
        } else {
            return Err(AddressError::UnrecognizedScript);
        };
        Self::new(coin, payload)
    }

    /// Canonical string form: bech32 for segwit payloads, base58check otherwise.
    pub fn encode(&self) -> String {
        let params = self.coin.params();
        match self.payload {
            Payload::PubkeyHash(h) => base58check(params.pubkey_hash_version, &h),
            Payload::ScriptHash(h) => base58check(params.script_hash_version, &h),
            Payload::WitnessPubkeyHash(_) | Payload::WitnessScriptHash(_) => {
                // `new` guarantees an hrp for segwit payloads.
                let hrp = params.bech32_hrp.unwrap_or_default();
                let hrp = Hrp::parse(hrp).expect("static coin hrp is valid");
                bech32::segwit::encode(hrp, bech32::segwit::VERSION_0, self.payload.program())
                    .expect("20 and 32 byte v0 programs always encode")
            }
        }
    }

    /// CashAddr rendering, for coins that have a CashAddr prefix.
    pub fn to_cashaddr(&self) -> Option<String> {
        let prefix = self.coin.params().cashaddr_prefix?;
        match self.payload {
            Payload::PubkeyHash(h) => Some(cashaddr::encode(prefix, CashAddrKind::PubkeyHash, &h)),
            Payload::ScriptHash(h) => Some(cashaddr::encode(prefix, CashAddrKind::ScriptHash, &h)),
            _ => None,
        }
    }

    /// Parse an address string for the given coin.
    pub fn decode(s: &str, coin: Coin) -> Result<Self, AddressError> {
        let s = s.trim();
        let params = coin.params();

        if let Some(prefix) = params.cashaddr_prefix {
            if looks_like_cashaddr(s) {
                let (kind, hash) = cashaddr::decode(s, prefix)?;
                let payload = match kind {
                    CashAddrKind::PubkeyHash => Payload::PubkeyHash(hash),
                    CashAddrKind::ScriptHash => Payload::ScriptHash(hash),
                };
                return Self::new(coin, payload);
            }
        }

        if let Some(hrp) = params.bech32_hrp {
            let lower = s.to_ascii_lowercase();
            if lower.starts_with(&format!("{hrp}1")) {
                return Self::decode_segwit(s, hrp, coin);
            }
        }

        let data = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|e| AddressError::InvalidBase58(e.to_string()))?;
        let (&version, hash) = data
            .split_first()
            .ok_or(AddressError::InvalidLength(0))?;
        let hash: [u8; 20] = hash
            .try_into()
            .map_err(|_| AddressError::InvalidLength(hash.len()))?;

        let payload = if version == params.pubkey_hash_version {
            Payload::PubkeyHash(hash)
        } else if version == params.script_hash_version {
            Payload::ScriptHash(hash)
        } else {
            return Err(AddressError::UnknownVersion {
                coin: coin.to_string(),
                version,
            });
        };
        Self::new(coin, payload)
    }

    fn decode_segwit(s: &str, expected_hrp: &str, coin: Coin) -> Result<Self, AddressError> {
        let (hrp, version, program) =
            bech32::segwit::decode(s).map_err(|e| AddressError::InvalidBech32(e.to_string()))?;
        let got = hrp.to_lowercase();
        if got != expected_hrp {
            return Err(AddressError::WrongPrefix {
                expected: expected_hrp.to_string(),
                got,
            });
        }
        if version != bech32::segwit::VERSION_0 {
            return Err(AddressError::UnsupportedWitnessVersion(version.to_u8()));
        }
        let payload = match program.len() {
            20 => Payload::WitnessPubkeyHash(to_array(&program)?),
            32 => Payload::WitnessScriptHash(to_array(&program)?),
            n => return Err(AddressError::InvalidLength(n)),
        };
        Self::new(coin, payload)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

fn looks_like_cashaddr(s: &str) -> bool {
    s.contains(':') || matches!(s.as_bytes().first(), Some(b'q' | b'p' | b'Q' | b'P'))
}

fn base58check(version: u8, hash: &[u8; 20]) -> String {
    let mut data = Vec::with_capacity(21);
    data.push(version);
    data.extend_from_slice(hash);
    bs58::encode(data).with_check().into_string()
}

fn array_at<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N], AddressError> {
    bytes
        .get(offset..offset + N)
        .ok_or(AddressError::UnrecognizedScript)
        .and_then(to_array)
}

fn to_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], AddressError> {
    bytes
        .try_into()
        .map_err(|_| AddressError::InvalidLength(bytes.len()))
}

/// Extract the data carried by an `OP_RETURN` output, if the script is one.
pub fn op_return_data(script: &Script) -> Option<Vec<u8>> {
    if !script.is_op_return() {
        return None;
    }
    let mut data = Vec::new();
    for ins in script.instructions().skip(1) {
        match ins.ok()? {
            Instruction::PushBytes(p) => data.extend_from_slice(p.as_bytes()),
            Instruction::Op(_) => return None,
        }
    }
    Some(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKH: [u8; 20] = [
        0x76, 0xa0, 0x40, 0x53, 0xbd, 0xa0, 0xa8, 0x8b, 0xda, 0x51, 0x77, 0xb8, 0x6a, 0x15, 0xc3,
        0xb2, 0x9f, 0x55, 0x98, 0x73,
    ];

    #[test]
    fn base58_roundtrip_bitcoin() {
        let addr = Address::new(Coin::Bitcoin, Payload::PubkeyHash(PKH)).unwrap();
        assert_eq!(addr.encode(), "1BpEi6DfDAUFd7GtittLSdBeYJvcoaVggu");
        let back = Address::decode("1BpEi6DfDAUFd7GtittLSdBeYJvcoaVggu", Coin::Bitcoin).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn p2sh_uses_script_version() {
        let addr = Address::new(Coin::Bitcoin, Payload::ScriptHash(PKH)).unwrap();
        assert_eq!(addr.encode(), "3CWFddi6m4ndiGyKqzYvsFYagqDLPVMTzC");
    }

    #[test]
    fn litecoin_rejects_bitcoin_version() {
        let err = Address::decode("1BpEi6DfDAUFd7GtittLSdBeYJvcoaVggu", Coin::Litecoin).unwrap_err();
        assert_eq!(
            err,
            AddressError::UnknownVersion {
                coin: "Litecoin".into(),
                version: 0x00
            }
        );
    }

    #[test]
    fn bech32_known_vector() {
        let s = "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu";
        let addr = Address::decode(s, Coin::Bitcoin).unwrap();
        assert!(matches!(addr.payload(), Payload::WitnessPubkeyHash(_)));
        assert_eq!(addr.encode(), s);
        assert!(addr.script_pubkey().is_p2wpkh());
    }

    #[test]
    fn bech32_wrong_hrp() {
        let s = "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu";
        assert!(Address::decode(s, Coin::Testnet).is_err());
    }

    #[test]
    fn segwit_refused_for_dogecoin() {
        let err = Address::new(Coin::Dogecoin, Payload::WitnessPubkeyHash(PKH)).unwrap_err();
        assert_eq!(err, AddressError::SegwitUnsupported("Dogecoin".into()));
    }

    #[test]
    fn bitcoincash_accepts_both_forms() {
        let legacy = Address::decode("1BpEi6DfDAUFd7GtittLSdBeYJvcoaVggu", Coin::BitcoinCash).unwrap();
        let cash = Address::decode(
            "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a",
            Coin::BitcoinCash,
        )
        .unwrap();
        assert_eq!(legacy, cash);
        assert_eq!(
            cash.to_cashaddr().unwrap(),
            "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a"
        );
        let p2sh = Address::decode("3CWFddi6m4ndiGyKqzYvsFYagqDLPVMTzC", Coin::BitcoinCash).unwrap();
        assert_eq!(
            p2sh.to_cashaddr().unwrap(),
            "bitcoincash:ppm2qsznhks23z7629mms6s4cwef74vcwvn0h829pq"
        );
    }

    #[test]
    fn cashaddr_only_for_bitcoincash() {
        let addr = Address::new(Coin::Bitcoin, Payload::PubkeyHash(PKH)).unwrap();
        assert!(addr.to_cashaddr().is_none());
    }

    #[test]
    fn script_pubkey_roundtrip() {
        for payload in [
            Payload::PubkeyHash(PKH),
            Payload::ScriptHash(PKH),
            Payload::WitnessPubkeyHash(PKH),
            Payload::WitnessScriptHash([7u8; 32]),
        ] {
            let addr = Address::new(Coin::Bitcoin, payload).unwrap();
            let back = Address::from_script_pubkey(&addr.script_pubkey(), Coin::Bitcoin).unwrap();
            assert_eq!(back, addr);
        }
    }

    #[test]
    fn op_return_is_not_an_address() {
        let data = bitcoin::script::PushBytesBuf::try_from(vec![1u8, 2, 3]).unwrap();
        let script = ScriptBuf::new_op_return(data);
        assert_eq!(
            Address::from_script_pubkey(&script, Coin::Bitcoin),
            Err(AddressError::UnrecognizedScript)
        );
        assert_eq!(op_return_data(&script), Some(vec![1, 2, 3]));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            Address::decode("not-an-address", Coin::Bitcoin),
            Err(AddressError::InvalidBase58(_))
        ));
    }
}
