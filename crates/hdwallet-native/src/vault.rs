//! Post-assembly output rules for external protocols.
//!
//! Validators see the finalized transaction, so rules can inspect the
//! concrete output scripts and their order. The built-in
//! [`VaultOrderingRules`] encode the vout layout a cross-chain vault expects
//! from inbound transactions:
//!
//! ```text
//! vout 0  pays the vault, nonzero value
//! vout 1  change (not checked)
//! vout 2  OP_RETURN memo, zero value (required when a memo is carried)
//! vout 3  must not be a second OP_RETURN
//! ```
//!
//! More than four outputs, or more than two value-bearing outputs, are
//! rejected.

use bitcoin::{ScriptBuf, Transaction};

use hdwallet_core::coins::Coin;

use crate::error::WalletError;

/// Maximum number of outputs a vault transaction may carry.
pub const MAX_VAULT_OUTPUTS: usize = 4;

/// Maximum number of outputs with nonzero value.
pub const MAX_VALUE_OUTPUTS: usize = 2;

/// What a validator knows about the transaction besides its outputs.
#[derive(Clone, Debug)]
pub struct ValidationContext {
    pub coin: Coin,
    /// Locking script of the declared vault address, if one was declared.
    pub vault_script: Option<ScriptBuf>,
    /// Memo payload of the trailing `OP_RETURN` output, if any.
    pub memo: Option<Vec<u8>>,
}

/// A pluggable rule set applied to a finalized transaction.
pub trait OutputValidator: Send + Sync {
    fn name(&self) -> &str;

    /// Reject with [`WalletError::ProtocolViolation`].
    fn validate(&self, tx: &Transaction, ctx: &ValidationContext) -> Result<(), WalletError>;
}

/// Vault vout ordering. A no-op unless a vault address was declared.
#[derive(Clone, Copy, Debug, Default)]
pub struct VaultOrderingRules;

impl OutputValidator for VaultOrderingRules {
    fn name(&self) -> &str {
        "vault-ordering"
    }

    fn validate(&self, tx: &Transaction, ctx: &ValidationContext) -> Result<(), WalletError> {
        let Some(vault) = &ctx.vault_script else {
            return Ok(());
        };
        let violation = |reason: &str| Err(WalletError::ProtocolViolation(reason.to_string()));
        let outs = &tx.output;

        let Some(first) = outs.first() else {
            return violation("transaction has no outputs");
        };
        if first.script_pubkey != *vault {
            return violation("vout 0 does not pay the vault address");
        }
        if first.value.to_sat() == 0 {
            return violation("vout 0 carries no value");
        }

        if outs.len() > MAX_VAULT_OUTPUTS {
            return violation("too many outputs");
        }
        if outs.iter().filter(|o| o.value.to_sat() > 0).count() > MAX_VALUE_OUTPUTS {
            return violation("too many value-bearing outputs");
        }

        if ctx.memo.is_some() {
            match outs.get(2) {
                None => return violation("memo output missing at vout 2"),
                Some(o) if !o.script_pubkey.is_op_return() => {
                    return violation("vout 2 is not an OP_RETURN memo");
                }
                Some(o) if o.value.to_sat() != 0 => return violation("memo output carries value"),
                Some(_) => {}
            }
        }

        if outs.get(3).is_some_and(|o| o.script_pubkey.is_op_return()) {
            return violation("second OP_RETURN output at vout 3");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::absolute::LockTime;
    use bitcoin::script::PushBytesBuf;
    use bitcoin::transaction::Version;
    use bitcoin::{Amount, TxOut};

    fn script(tag: u8) -> ScriptBuf {
        ScriptBuf::from_bytes(vec![0x00, 0x14].into_iter().chain([tag; 20]).collect())
    }

    fn memo_script() -> ScriptBuf {
        ScriptBuf::new_op_return(PushBytesBuf::try_from(b"SWAP:ETH.ETH:0xabc".to_vec()).unwrap())
    }

    fn out(value: u64, script_pubkey: ScriptBuf) -> TxOut {
        TxOut {
            value: Amount::from_sat(value),
            script_pubkey,
        }
    }

    fn tx(outputs: Vec<TxOut>) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![],
            output: outputs,
        }
    }

    fn ctx(memo: bool) -> ValidationContext {
        ValidationContext {
            coin: Coin::Bitcoin,
            vault_script: Some(script(1)),
            memo: memo.then(|| b"SWAP:ETH.ETH:0xabc".to_vec()),
        }
    }

    fn check(t: &Transaction, c: &ValidationContext) -> Result<(), WalletError> {
        VaultOrderingRules.validate(t, c)
    }

    #[test]
    fn canonical_layout_passes() {
        let t = tx(vec![out(1000, script(1)), out(500, script(2)), out(0, memo_script())]);
        assert!(check(&t, &ctx(true)).is_ok());
    }

    #[test]
    fn no_vault_declared_is_noop() {
        let t = tx(vec![out(1000, script(9))]);
        let c = ValidationContext {
            vault_script: None,
            ..ctx(false)
        };
        assert!(check(&t, &c).is_ok());
    }

    #[test]
    fn vout0_must_pay_vault() {
        let t = tx(vec![out(1000, script(2)), out(500, script(1)), out(0, memo_script())]);
        assert!(matches!(check(&t, &ctx(true)), Err(WalletError::ProtocolViolation(_))));
    }

    #[test]
    fn vout0_must_carry_value() {
        let t = tx(vec![out(0, script(1)), out(500, script(2)), out(0, memo_script())]);
        assert!(matches!(check(&t, &ctx(true)), Err(WalletError::ProtocolViolation(_))));
    }

    #[test]
    fn memo_must_sit_at_vout2() {
        let t = tx(vec![out(1000, script(1)), out(0, memo_script())]);
        assert!(matches!(check(&t, &ctx(true)), Err(WalletError::ProtocolViolation(_))));

        let t = tx(vec![out(1000, script(1)), out(0, memo_script()), out(500, script(2))]);
        assert!(matches!(check(&t, &ctx(true)), Err(WalletError::ProtocolViolation(_))));
    }

    #[test]
    fn second_memo_rejected() {
        let t = tx(vec![
            out(1000, script(1)),
            out(500, script(2)),
            out(0, memo_script()),
            out(0, memo_script()),
        ]);
        assert!(matches!(check(&t, &ctx(true)), Err(WalletError::ProtocolViolation(_))));
    }

    #[test]
    fn too_many_outputs() {
        let t = tx(vec![
            out(1000, script(1)),
            out(500, script(2)),
            out(0, memo_script()),
            out(0, script(3)),
            out(0, script(4)),
        ]);
        assert!(matches!(check(&t, &ctx(true)), Err(WalletError::ProtocolViolation(_))));
    }

    #[test]
    fn too_many_value_outputs() {
        let t = tx(vec![out(1000, script(1)), out(500, script(2)), out(400, script(3))]);
        assert!(matches!(check(&t, &ctx(false)), Err(WalletError::ProtocolViolation(_))));
    }

    #[test]
    fn empty_outputs_rejected() {
        assert!(matches!(check(&tx(vec![]), &ctx(false)), Err(WalletError::ProtocolViolation(_))));
    }
}
