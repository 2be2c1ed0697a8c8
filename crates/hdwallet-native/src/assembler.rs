//! Transaction assembly and signing.
//!
//! [`TransactionAssembler::assemble`] turns a [`BtcSignTx`] into a signed,
//! serialized transaction:
//! 1. Set version and locktime
//! 2. Build inputs (previous-output data, key, payment scripts)
//! 3. Build outputs, with an optional trailing `OP_RETURN` memo
//! 4. Sign every input in order
//! 5. Finalize scriptSigs and witnesses
//! 6. Run output validators
//! 7. Extract signatures and serialize
//!
//! Any failure aborts the whole call; no partial result is returned.

use std::str::FromStr;
use std::sync::Arc;

use bitcoin::absolute::LockTime;
use bitcoin::consensus::{deserialize, encode::serialize_hex};
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, Instruction, PushBytesBuf};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use secp256k1::ecdsa::Signature;
use tracing::{debug, warn};

use hdwallet_core::address::Address;
use hdwallet_core::coins::Coin;
use hdwallet_core::error::CapabilityError;
use hdwallet_core::script_type::ScriptType;
use hdwallet_core::traits::EcdsaKey;
use hdwallet_core::types::{BtcSignTx, BtcSignTxInput, BtcSignTxOutput, BtcSignedTx};

use crate::error::WalletError;
use crate::keys::{KeyHolder, Seed};
use crate::payment::{Payment, build_payment};
use crate::vault::{OutputValidator, ValidationContext, VaultOrderingRules};

/// Largest memo carried by a standard `OP_RETURN` output.
pub const MAX_OP_RETURN_LEN: usize = 80;

/// Upper bound on nonce counters tried while grinding for a low-R signature.
const MAX_GRIND_ATTEMPTS: u32 = 256;

/// An input with everything needed to sign it.
struct PreparedInput {
    outpoint: OutPoint,
    key: KeyHolder,
    payment: Payment,
    prevout: TxOut,
}

/// Assembles and signs one transaction against a loaded seed.
///
/// # Example
/// ```ignore
/// let signed = TransactionAssembler::new(&seed)
///     .grind_low_r(true)
///     .with_validator(Arc::new(MyRules))
///     .assemble(&request)?;
/// ```
pub struct TransactionAssembler<'a> {
    seed: &'a Seed,
    grind_low_r: bool,
    validators: Vec<Arc<dyn OutputValidator>>,
}

impl<'a> TransactionAssembler<'a> {
    pub fn new(seed: &'a Seed) -> Self {
        Self {
            seed,
            grind_low_r: true,
            validators: Vec::new(),
        }
    }

    /// Retry signing with nonce counters until R has its high bit clear.
    pub fn grind_low_r(mut self, enabled: bool) -> Self {
        self.grind_low_r = enabled;
        self
    }

    /// Add a validator run after the built-in vault rules.
    pub fn with_validator(mut self, validator: Arc<dyn OutputValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_validators(mut self, validators: impl IntoIterator<Item = Arc<dyn OutputValidator>>) -> Self {
        self.validators.extend(validators);
        self
    }

    pub fn assemble(&self, msg: &BtcSignTx) -> Result<BtcSignedTx, WalletError> {
        let coin = msg.coin;

        // Refuse before any key is derived.
        for (i, input) in msg.inputs.iter().enumerate() {
            if !has_usable_prev_out(input) {
                return Err(WalletError::input(i, WalletError::MissingPrevOutData));
            }
        }

        let lock_time = msg.locktime.unwrap_or(0);
        let sequence = if lock_time > 0 {
            Sequence::ENABLE_LOCKTIME_NO_RBF
        } else {
            Sequence::MAX
        };

        let prepared = msg
            .inputs
            .iter()
            .enumerate()
            .map(|(i, input)| self.build_input(input, coin).map_err(|e| WalletError::input(i, e)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut outputs = msg
            .outputs
            .iter()
            .enumerate()
            .map(|(i, output)| self.build_output(output, coin).map_err(|e| WalletError::output(i, e)))
            .collect::<Result<Vec<_>, _>>()?;

        let memo = msg
            .op_return_data
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(|d| d.as_bytes().to_vec());
        if let Some(data) = &memo {
            let index = outputs.len();
            outputs.push(op_return_output(data).map_err(|e| WalletError::output(index, e))?);
        }

        let mut tx = Transaction {
            version: Version(msg.version.max(1)),
            lock_time: LockTime::from_consensus(lock_time),
            input: prepared
                .iter()
                .map(|p| TxIn {
                    previous_output: p.outpoint,
                    script_sig: ScriptBuf::new(),
                    sequence,
                    witness: Witness::new(),
                })
                .collect(),
            output: outputs,
        };
        debug!(
            inputs = tx.input.len(),
            outputs = tx.output.len(),
            coin = %coin,
            "transaction built"
        );

        let signatures = self.sign_inputs(&tx, &prepared)?;
        for (i, (p, sig)) in prepared.iter().zip(&signatures).enumerate() {
            finalize_input(&mut tx.input[i], p, sig).map_err(|reason| WalletError::FinalizationFailure {
                index: i,
                reason,
            })?;
        }

        self.validate(&tx, coin, msg.vault_address.as_deref(), memo)?;

        let signatures = tx
            .input
            .iter()
            .enumerate()
            .map(|(i, txin)| {
                extract_signature(txin).ok_or_else(|| WalletError::FinalizationFailure {
                    index: i,
                    reason: "no signature in finalized input".into(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(txid = %tx.compute_txid(), "transaction signed");
        Ok(BtcSignedTx {
            signatures,
            serialized_tx: serialize_hex(&tx),
        })
    }

    fn build_input(&self, input: &BtcSignTxInput, coin: Coin) -> Result<PreparedInput, WalletError> {
        let txid = parse_txid(&input.txid)?;

        let prevout = match (input.script_type.is_segwit(), &input.prev_output, &input.hex) {
            (true, Some(po), _) => TxOut {
                value: Amount::from_sat(po.amount),
                script_pubkey: ScriptBuf::from_bytes(
                    hex::decode(&po.script_pubkey)
                        .map_err(|e| WalletError::InvalidInput(format!("prev output script: {e}")))?,
                ),
            },
            (_, _, Some(raw)) => spent_output(raw, txid, input.vout)?,
            _ => return Err(WalletError::MissingPrevOutData),
        };
        if prevout.value.to_sat() != input.amount {
            return Err(WalletError::InvalidInput(format!(
                "declared amount {} but spent output holds {}",
                input.amount,
                prevout.value.to_sat()
            )));
        }

        let key = self.seed.derive(&input.address_n_list, coin)?;
        let payment = build_payment(&key.public_key(), input.script_type, coin)?;
        Ok(PreparedInput {
            outpoint: OutPoint { txid, vout: input.vout },
            key,
            payment,
            prevout,
        })
    }

    fn build_output(&self, output: &BtcSignTxOutput, coin: Coin) -> Result<TxOut, WalletError> {
        let script_pubkey = match (&output.address, &output.address_n_list, output.script_type) {
            (Some(addr), _, _) => Address::decode(addr, coin)?.script_pubkey(),
            (None, Some(path), Some(script_type)) => {
                let key = self.seed.derive(path, coin)?;
                build_payment(&key.public_key(), script_type, coin)?.script_pubkey
            }
            (None, Some(_), None) => {
                return Err(WalletError::InvalidOutput("derived output needs a script type".into()));
            }
            (None, None, _) => {
                return Err(WalletError::InvalidOutput("neither address nor derivation path".into()));
            }
        };
        Ok(TxOut {
            value: Amount::from_sat(output.amount),
            script_pubkey,
        })
    }

    fn sign_inputs(&self, tx: &Transaction, prepared: &[PreparedInput]) -> Result<Vec<Signature>, WalletError> {
        let mut cache = SighashCache::new(tx);
        let mut signatures = Vec::with_capacity(prepared.len());

        for (i, p) in prepared.iter().enumerate() {
            if p.payment.script_pubkey != p.prevout.script_pubkey {
                warn!(input = i, "derived key does not control the spent output");
                return Err(WalletError::sign(i, WalletError::KeyMismatch));
            }

            let digest = match (p.payment.script_type, &p.payment.redeem_script) {
                (ScriptType::P2pkh, _) => cache
                    .legacy_signature_hash(i, &p.prevout.script_pubkey, EcdsaSighashType::All.to_u32())
                    .map(|h| h.to_byte_array())
                    .map_err(|e| e.to_string()),
                (ScriptType::P2sh, Some(redeem)) => cache
                    .legacy_signature_hash(i, redeem, EcdsaSighashType::All.to_u32())
                    .map(|h| h.to_byte_array())
                    .map_err(|e| e.to_string()),
                (ScriptType::P2wpkh, _) => cache
                    .p2wpkh_signature_hash(i, &p.prevout.script_pubkey, p.prevout.value, EcdsaSighashType::All)
                    .map(|h| h.to_byte_array())
                    .map_err(|e| e.to_string()),
                (ScriptType::P2shP2wpkh, Some(redeem)) => cache
                    .p2wpkh_signature_hash(i, redeem, p.prevout.value, EcdsaSighashType::All)
                    .map(|h| h.to_byte_array())
                    .map_err(|e| e.to_string()),
                (_, None) => Err("script-hash input without redeem script".to_string()),
            }
            .map_err(|e| WalletError::sign(i, WalletError::InvalidInput(e)))?;

            let sig = sign_digest(&p.key, &digest, self.grind_low_r)
                .map_err(|e| WalletError::sign(i, e.into()))?;
            signatures.push(sig);
        }
        Ok(signatures)
    }

    fn validate(
        &self,
        tx: &Transaction,
        coin: Coin,
        vault_address: Option<&str>,
        memo: Option<Vec<u8>>,
    ) -> Result<(), WalletError> {
        let vault_script = vault_address
            .map(|addr| {
                Address::decode(addr, coin)
                    .map(|a| a.script_pubkey())
                    .map_err(|e| WalletError::ProtocolViolation(format!("vault address: {e}")))
            })
            .transpose()?;
        let ctx = ValidationContext {
            coin,
            vault_script,
            memo,
        };

        let builtin: &dyn OutputValidator = &VaultOrderingRules;
        for v in std::iter::once(builtin).chain(self.validators.iter().map(|v| v.as_ref())) {
            if let Err(e) = v.validate(tx, &ctx) {
                warn!(validator = v.name(), error = %e, "output validation failed");
                return Err(e);
            }
        }
        Ok(())
    }
}

fn has_usable_prev_out(input: &BtcSignTxInput) -> bool {
    input.hex.is_some() || (input.script_type.is_segwit() && input.prev_output.is_some())
}

fn parse_txid(s: &str) -> Result<Txid, WalletError> {
    Txid::from_str(s).map_err(|e| WalletError::InvalidInput(format!("txid: {e}")))
}

/// Output `vout` of the serialized previous transaction, checked against
/// the declared txid.
fn spent_output(raw: &str, txid: Txid, vout: u32) -> Result<TxOut, WalletError> {
    let bytes = hex::decode(raw).map_err(|e| WalletError::InvalidInput(format!("previous tx hex: {e}")))?;
    let prev: Transaction =
        deserialize(&bytes).map_err(|e| WalletError::InvalidInput(format!("previous tx: {e}")))?;
    if prev.compute_txid() != txid {
        return Err(WalletError::InvalidInput("previous tx does not hash to txid".into()));
    }
    prev.output
        .get(vout as usize)
        .cloned()
        .ok_or_else(|| WalletError::InvalidInput(format!("previous tx has no output {vout}")))
}

fn op_return_output(data: &[u8]) -> Result<TxOut, WalletError> {
    if data.len() > MAX_OP_RETURN_LEN {
        return Err(WalletError::InvalidOutput(format!(
            "memo is {} bytes, limit {MAX_OP_RETURN_LEN}",
            data.len()
        )));
    }
    let push = PushBytesBuf::try_from(data.to_vec()).map_err(|e| WalletError::InvalidOutput(e.to_string()))?;
    Ok(TxOut {
        value: Amount::ZERO,
        script_pubkey: ScriptBuf::new_op_return(push),
    })
}

fn is_low_r(sig: &Signature) -> bool {
    sig.serialize_compact()[0] < 0x80
}

/// Sign `digest`, grinding the nonce counter for a low-R encoding if asked.
pub(crate) fn sign_digest(
    key: &impl EcdsaKey,
    digest: &[u8; 32],
    grind_low_r: bool,
) -> Result<Signature, CapabilityError> {
    let mut sig = key.ecdsa_sign(digest, None)?;
    let mut counter = 1;
    while grind_low_r && !is_low_r(&sig) && counter <= MAX_GRIND_ATTEMPTS {
        sig = key.ecdsa_sign(digest, Some(counter))?;
        counter += 1;
    }
    Ok(sig)
}

fn finalize_input(txin: &mut TxIn, p: &PreparedInput, sig: &Signature) -> Result<(), String> {
    let ecdsa_sig = bitcoin::ecdsa::Signature {
        signature: *sig,
        sighash_type: EcdsaSighashType::All,
    };
    let sig_push = PushBytesBuf::try_from(ecdsa_sig.serialize().to_vec()).map_err(|e| e.to_string())?;
    let pubkey = bitcoin::PublicKey::new(p.key.public_key());
    let redeem = || {
        p.payment
            .redeem_script
            .as_ref()
            .ok_or_else(|| "missing redeem script".to_string())
            .and_then(|r| PushBytesBuf::try_from(r.to_bytes()).map_err(|e| e.to_string()))
    };

    match p.payment.script_type {
        ScriptType::P2pkh => {
            txin.script_sig = Builder::new().push_slice(&sig_push).push_key(&pubkey).into_script();
        }
        ScriptType::P2sh => {
            txin.script_sig = Builder::new()
                .push_slice(&sig_push)
                .push_key(&pubkey)
                .push_slice(redeem()?)
                .into_script();
        }
        ScriptType::P2wpkh => {
            txin.witness = witness(&ecdsa_sig, &pubkey);
        }
        ScriptType::P2shP2wpkh => {
            txin.script_sig = Builder::new().push_slice(redeem()?).into_script();
            txin.witness = witness(&ecdsa_sig, &pubkey);
        }
    }
    Ok(())
}

fn witness(sig: &bitcoin::ecdsa::Signature, pubkey: &bitcoin::PublicKey) -> Witness {
    let mut w = Witness::new();
    w.push(sig.serialize());
    w.push(pubkey.to_bytes());
    w
}

/// DER signature (sighash byte stripped) of a finalized input, hex.
fn extract_signature(txin: &TxIn) -> Option<String> {
    let with_hash_type = match txin.witness.nth(0) {
        Some(sig) => sig.to_vec(),
        None => match txin.script_sig.instructions().next()?.ok()? {
            Instruction::PushBytes(p) => p.as_bytes().to_vec(),
            Instruction::Op(_) => return None,
        },
    };
    let (_, der) = with_hash_type.split_last()?;
    Some(hex::encode(der))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::Message;
    use hdwallet_core::path::DerivationPath;
    use hdwallet_core::types::PrevOutput;

    use crate::keys::secp;

    fn seed() -> Seed {
        Seed::from_bytes(&[0x5a; 32]).unwrap()
    }

    fn path(s: &str) -> DerivationPath {
        s.parse().unwrap()
    }

    /// A transaction paying `value` to the payment at `path`.
    fn funding_tx(seed: &Seed, path: &DerivationPath, script_type: ScriptType, value: u64) -> Transaction {
        let key = seed.derive(path, Coin::Bitcoin).unwrap();
        let payment = build_payment(&key.public_key(), script_type, Coin::Bitcoin).unwrap();
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::from_bytes(vec![0x51]),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(value),
                script_pubkey: payment.script_pubkey,
            }],
        }
    }

    fn input_from(prev: &Transaction, p: &str, script_type: ScriptType) -> BtcSignTxInput {
        BtcSignTxInput {
            txid: prev.compute_txid().to_string(),
            vout: 0,
            address_n_list: path(p),
            script_type,
            amount: prev.output[0].value.to_sat(),
            hex: Some(serialize_hex(prev)),
            prev_output: None,
        }
    }

    fn request(inputs: Vec<BtcSignTxInput>, outputs: Vec<BtcSignTxOutput>) -> BtcSignTx {
        BtcSignTx {
            coin: Coin::Bitcoin,
            version: 1,
            locktime: None,
            inputs,
            outputs,
            op_return_data: None,
            vault_address: None,
        }
    }

    const DEST: &str = "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu";

    #[test]
    fn signs_every_script_type() {
        let s = seed();
        for (p, st) in [
            ("m/44'/0'/0'/0/0", ScriptType::P2pkh),
            ("m/44'/0'/0'/0/1", ScriptType::P2sh),
            ("m/84'/0'/0'/0/0", ScriptType::P2wpkh),
            ("m/49'/0'/0'/0/0", ScriptType::P2shP2wpkh),
        ] {
            let prev = funding_tx(&s, &path(p), st, 10_000);
            let msg = request(
                vec![input_from(&prev, p, st)],
                vec![BtcSignTxOutput::to_address(DEST, 9_000)],
            );
            let signed = TransactionAssembler::new(&s).assemble(&msg).unwrap();
            assert_eq!(signed.signatures.len(), 1, "{st}");

            let tx: Transaction = deserialize(&hex::decode(&signed.serialized_tx).unwrap()).unwrap();
            assert_eq!(tx.input[0].previous_output.txid, prev.compute_txid());
            assert_eq!(tx.output[0].value.to_sat(), 9_000);
            assert_eq!(tx.input[0].witness.is_empty(), !st.is_segwit(), "{st}");
        }
    }

    #[test]
    fn signature_verifies_against_sighash() {
        let s = seed();
        let p = "m/84'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2wpkh, 50_000);
        let msg = request(
            vec![input_from(&prev, p, ScriptType::P2wpkh)],
            vec![BtcSignTxOutput::to_address(DEST, 40_000)],
        );
        let signed = TransactionAssembler::new(&s).assemble(&msg).unwrap();
        let tx: Transaction = deserialize(&hex::decode(&signed.serialized_tx).unwrap()).unwrap();

        let sighash = SighashCache::new(&tx)
            .p2wpkh_signature_hash(0, &prev.output[0].script_pubkey, prev.output[0].value, EcdsaSighashType::All)
            .unwrap();
        let sig = Signature::from_der(&hex::decode(&signed.signatures[0]).unwrap()).unwrap();
        let key = s.derive(&path(p), Coin::Bitcoin).unwrap();
        secp()
            .verify_ecdsa(&Message::from_digest(sighash.to_byte_array()), &sig, &key.public_key())
            .unwrap();
    }

    #[test]
    fn deterministic_output() {
        let s = seed();
        let p = "m/44'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2pkh, 10_000);
        let msg = request(
            vec![input_from(&prev, p, ScriptType::P2pkh)],
            vec![BtcSignTxOutput::to_address(DEST, 9_000)],
        );
        let a = TransactionAssembler::new(&s).assemble(&msg).unwrap();
        let b = TransactionAssembler::new(&s).assemble(&msg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn version_is_at_least_one_and_locktime_applies() {
        let s = seed();
        let p = "m/84'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2wpkh, 10_000);
        let mut msg = request(
            vec![input_from(&prev, p, ScriptType::P2wpkh)],
            vec![BtcSignTxOutput::to_address(DEST, 9_000)],
        );
        msg.version = 0;
        msg.locktime = Some(800_000);
        let signed = TransactionAssembler::new(&s).assemble(&msg).unwrap();
        let tx: Transaction = deserialize(&hex::decode(&signed.serialized_tx).unwrap()).unwrap();
        assert_eq!(tx.version, Version::ONE);
        assert_eq!(tx.lock_time.to_consensus_u32(), 800_000);
        assert_eq!(tx.input[0].sequence, Sequence::ENABLE_LOCKTIME_NO_RBF);
    }

    #[test]
    fn narrowed_prev_output_for_segwit() {
        let s = seed();
        let p = "m/84'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2wpkh, 10_000);
        let mut input = input_from(&prev, p, ScriptType::P2wpkh);
        input.hex = None;
        input.prev_output = Some(PrevOutput {
            script_pubkey: hex::encode(prev.output[0].script_pubkey.as_bytes()),
            amount: 10_000,
        });
        let msg = request(vec![input], vec![BtcSignTxOutput::to_address(DEST, 9_000)]);
        assert!(TransactionAssembler::new(&s).assemble(&msg).is_ok());
    }

    #[test]
    fn missing_prev_out_data() {
        let s = seed();
        let p = "m/44'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2pkh, 10_000);
        let mut input = input_from(&prev, p, ScriptType::P2pkh);
        input.hex = None;
        // A narrowed output is not enough for a legacy input.
        input.prev_output = Some(PrevOutput {
            script_pubkey: hex::encode(prev.output[0].script_pubkey.as_bytes()),
            amount: 10_000,
        });
        let msg = request(vec![input], vec![BtcSignTxOutput::to_address(DEST, 9_000)]);
        let err = TransactionAssembler::new(&s).assemble(&msg).unwrap_err();
        assert!(matches!(err, WalletError::InputBuildFailure { index: 0, .. }));
        assert_eq!(err.root_cause(), &WalletError::MissingPrevOutData);
    }

    #[test]
    fn prev_tx_must_match_txid() {
        let s = seed();
        let p = "m/44'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2pkh, 10_000);
        let mut input = input_from(&prev, p, ScriptType::P2pkh);
        input.txid = Txid::all_zeros().to_string();
        let msg = request(vec![input], vec![BtcSignTxOutput::to_address(DEST, 9_000)]);
        let err = TransactionAssembler::new(&s).assemble(&msg).unwrap_err();
        assert!(matches!(err.root_cause(), WalletError::InvalidInput(_)));
    }

    #[test]
    fn amount_mismatch_rejected() {
        let s = seed();
        let p = "m/44'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2pkh, 10_000);
        let mut input = input_from(&prev, p, ScriptType::P2pkh);
        input.amount = 20_000;
        let msg = request(vec![input], vec![BtcSignTxOutput::to_address(DEST, 9_000)]);
        assert!(TransactionAssembler::new(&s).assemble(&msg).unwrap_err().is_build_failure());
    }

    #[test]
    fn wrong_key_is_sign_failure() {
        let s = seed();
        let prev = funding_tx(&s, &path("m/44'/0'/0'/0/0"), ScriptType::P2pkh, 10_000);
        let input = input_from(&prev, "m/44'/0'/0'/0/7", ScriptType::P2pkh);
        let msg = request(vec![input], vec![BtcSignTxOutput::to_address(DEST, 9_000)]);
        let err = TransactionAssembler::new(&s).assemble(&msg).unwrap_err();
        assert!(matches!(err, WalletError::SignFailure { index: 0, .. }));
        assert_eq!(err.root_cause(), &WalletError::KeyMismatch);
    }

    #[test]
    fn bad_output_is_indexed() {
        let s = seed();
        let p = "m/84'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2wpkh, 10_000);
        let msg = request(
            vec![input_from(&prev, p, ScriptType::P2wpkh)],
            vec![
                BtcSignTxOutput::to_address(DEST, 1_000),
                BtcSignTxOutput::to_address("not-an-address", 1_000),
            ],
        );
        let err = TransactionAssembler::new(&s).assemble(&msg).unwrap_err();
        assert!(matches!(err, WalletError::OutputBuildFailure { index: 1, .. }));
        assert!(matches!(err.root_cause(), WalletError::InvalidAddress(_)));
    }

    #[test]
    fn output_needs_a_destination() {
        let s = seed();
        let p = "m/84'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2wpkh, 10_000);
        let output = BtcSignTxOutput {
            amount: 5,
            ..BtcSignTxOutput::default()
        };
        let msg = request(vec![input_from(&prev, p, ScriptType::P2wpkh)], vec![output]);
        let err = TransactionAssembler::new(&s).assemble(&msg).unwrap_err();
        assert!(matches!(err.root_cause(), WalletError::InvalidOutput(_)));
    }

    #[test]
    fn change_output_from_path() {
        let s = seed();
        let p = "m/84'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2wpkh, 10_000);
        let change = path("m/84'/0'/0'/1/0");
        let msg = request(
            vec![input_from(&prev, p, ScriptType::P2wpkh)],
            vec![
                BtcSignTxOutput::to_address(DEST, 5_000),
                BtcSignTxOutput::to_path(change.clone(), ScriptType::P2wpkh, 4_000),
            ],
        );
        let signed = TransactionAssembler::new(&s).assemble(&msg).unwrap();
        let tx: Transaction = deserialize(&hex::decode(&signed.serialized_tx).unwrap()).unwrap();
        let key = s.derive(&change, Coin::Bitcoin).unwrap();
        let expected = build_payment(&key.public_key(), ScriptType::P2wpkh, Coin::Bitcoin).unwrap();
        assert_eq!(tx.output[1].script_pubkey, expected.script_pubkey);
    }

    #[test]
    fn memo_is_last_and_zero_valued() {
        let s = seed();
        let p = "m/84'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2wpkh, 10_000);
        let mut msg = request(
            vec![input_from(&prev, p, ScriptType::P2wpkh)],
            vec![BtcSignTxOutput::to_address(DEST, 9_000)],
        );
        msg.op_return_data = Some("hello".into());
        let signed = TransactionAssembler::new(&s).assemble(&msg).unwrap();
        let tx: Transaction = deserialize(&hex::decode(&signed.serialized_tx).unwrap()).unwrap();
        let last = tx.output.last().unwrap();
        assert_eq!(last.value, Amount::ZERO);
        assert_eq!(
            hdwallet_core::address::op_return_data(&last.script_pubkey).as_deref(),
            Some(&b"hello"[..])
        );
    }

    #[test]
    fn empty_memo_adds_no_output() {
        let s = seed();
        let p = "m/84'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2wpkh, 10_000);
        let mut msg = request(
            vec![input_from(&prev, p, ScriptType::P2wpkh)],
            vec![BtcSignTxOutput::to_address(DEST, 9_000)],
        );
        msg.op_return_data = Some(String::new());
        let signed = TransactionAssembler::new(&s).assemble(&msg).unwrap();
        let tx: Transaction = deserialize(&hex::decode(&signed.serialized_tx).unwrap()).unwrap();
        assert_eq!(tx.output.len(), 1);
        assert!(!tx.output[0].script_pubkey.is_op_return());
    }

    #[test]
    fn oversized_memo_rejected() {
        let s = seed();
        let p = "m/84'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2wpkh, 10_000);
        let mut msg = request(
            vec![input_from(&prev, p, ScriptType::P2wpkh)],
            vec![BtcSignTxOutput::to_address(DEST, 9_000)],
        );
        msg.op_return_data = Some("x".repeat(MAX_OP_RETURN_LEN + 1));
        let err = TransactionAssembler::new(&s).assemble(&msg).unwrap_err();
        assert!(matches!(err, WalletError::OutputBuildFailure { index: 1, .. }));
    }

    #[test]
    fn vault_rules_enforced() {
        let s = seed();
        let p = "m/84'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2wpkh, 10_000);
        let mut msg = request(
            vec![input_from(&prev, p, ScriptType::P2wpkh)],
            vec![
                BtcSignTxOutput::to_address(DEST, 5_000),
                BtcSignTxOutput::to_path(path("m/84'/0'/0'/1/0"), ScriptType::P2wpkh, 4_000),
            ],
        );
        msg.op_return_data = Some("SWAP:ETH.ETH:0xabc".into());
        msg.vault_address = Some(DEST.into());
        assert!(TransactionAssembler::new(&s).assemble(&msg).is_ok());

        msg.outputs.swap(0, 1);
        assert!(matches!(
            TransactionAssembler::new(&s).assemble(&msg),
            Err(WalletError::ProtocolViolation(_))
        ));
    }

    struct RejectAll;

    impl OutputValidator for RejectAll {
        fn name(&self) -> &str {
            "reject-all"
        }

        fn validate(&self, _tx: &Transaction, _ctx: &ValidationContext) -> Result<(), WalletError> {
            Err(WalletError::ProtocolViolation("rejected".into()))
        }
    }

    #[test]
    fn registered_validator_runs() {
        let s = seed();
        let p = "m/84'/0'/0'/0/0";
        let prev = funding_tx(&s, &path(p), ScriptType::P2wpkh, 10_000);
        let msg = request(
            vec![input_from(&prev, p, ScriptType::P2wpkh)],
            vec![BtcSignTxOutput::to_address(DEST, 9_000)],
        );
        let err = TransactionAssembler::new(&s)
            .with_validator(Arc::new(RejectAll))
            .assemble(&msg)
            .unwrap_err();
        assert_eq!(err, WalletError::ProtocolViolation("rejected".into()));
    }

    #[test]
    fn grinding_yields_low_r() {
        let s = seed();
        for i in 0..8 {
            let key = s.derive(&path(&format!("m/0/{i}")), Coin::Bitcoin).unwrap();
            let sig = sign_digest(&key, &[i as u8; 32], true).unwrap();
            assert!(is_low_r(&sig));
        }
    }

    #[test]
    fn multiple_inputs_signed_in_order() {
        let s = seed();
        let a = funding_tx(&s, &path("m/84'/0'/0'/0/0"), ScriptType::P2wpkh, 6_000);
        let b = funding_tx(&s, &path("m/44'/0'/0'/0/0"), ScriptType::P2pkh, 7_000);
        let msg = request(
            vec![
                input_from(&a, "m/84'/0'/0'/0/0", ScriptType::P2wpkh),
                input_from(&b, "m/44'/0'/0'/0/0", ScriptType::P2pkh),
            ],
            vec![BtcSignTxOutput::to_address(DEST, 12_000)],
        );
        let signed = TransactionAssembler::new(&s).assemble(&msg).unwrap();
        assert_eq!(signed.signatures.len(), 2);
        assert_ne!(signed.signatures[0], signed.signatures[1]);
    }
}
