//! The apply-transaction entry point.
//!
//! A deliberately small executor: value transfers plus the two
//! governance actions the system producer may include. VM opcode
//! execution is not part of this layer.
//!
//! Every validation runs before the first state or gas-pool mutation,
//! so a rejected transaction leaves both untouched. Mutations on the
//! success path are journaled; the caller's savepoint makes the whole
//! application atomic.

use mc_state::StateDb;
use primitive_types::U256;
use shared_types::params::{ACTION_GAS, GAS_PER_PAYLOAD_BYTE};
use shared_types::{ActionType, BlockHeader, GasPool, Name, Receipt, Transaction, TxError};
use tracing::trace;

/// Apply `tx` to `state`, charging gas against `pool`.
///
/// On success returns the receipt and the gas consumed; the caller
/// accumulates the latter into the header. On failure the state and
/// the pool are unchanged.
pub fn apply_transaction(
    coinbase: Option<&Name>,
    pool: &mut GasPool,
    state: &mut StateDb,
    header: &BlockHeader,
    sys_name: &Name,
    tx: &Transaction,
) -> Result<(Receipt, u64), TxError> {
    let action = tx.primary();
    let sender = &action.sender;

    if !state.account_exists(sender) {
        return Err(TxError::AccountNotFound(sender.clone()));
    }
    let expected = state
        .nonce(sender)
        .map_err(|e| TxError::Other(e.to_string()))?;
    if action.nonce < expected {
        return Err(TxError::NonceTooLow {
            have: action.nonce,
            want: expected,
        });
    }
    if action.nonce > expected {
        return Err(TxError::NonceTooHigh {
            have: action.nonce,
            want: expected,
        });
    }

    let intrinsic = ACTION_GAS + action.payload.len() as u64 * GAS_PER_PAYLOAD_BYTE;
    if action.gas_limit < intrinsic {
        return Err(TxError::IntrinsicGas {
            limit: action.gas_limit,
            need: intrinsic,
        });
    }

    let gas_used = intrinsic;
    let fee = tx
        .gas_price
        .checked_mul(U256::from(gas_used))
        .ok_or_else(|| TxError::Other("fee overflow".to_string()))?;
    let need = action
        .value
        .checked_add(fee)
        .ok_or_else(|| TxError::Other("cost overflow".to_string()))?;
    let have = state
        .balance(sender)
        .map_err(|e| TxError::Other(e.to_string()))?;
    if have < need {
        return Err(TxError::InsufficientBalance {
            name: sender.clone(),
            need,
            have,
        });
    }

    // Kind-specific validation, still before any mutation.
    match action.kind {
        ActionType::Transfer => {
            if !state.account_exists(&action.recipient) {
                return Err(TxError::AccountNotFound(action.recipient.clone()));
            }
        }
        ActionType::KickedCandidate => {
            decode_subject(&action.payload)?;
        }
        ActionType::ExitTakeOver => {}
    }

    // Last fallible step: reserve the transaction's gas allowance.
    pool.sub_gas(action.gas_limit)?;

    apply_effects(state, coinbase, sys_name, tx, fee);
    pool.add_gas(action.gas_limit - gas_used);

    let logs = state
        .tx_logs()
        .iter()
        .cloned()
        .map(|mut log| {
            log.block_number = header.number;
            log
        })
        .collect();
    let receipt = Receipt {
        tx_hash: tx.hash(),
        tx_index: state.tx_index(),
        status: 1,
        gas_used,
        logs,
    };

    trace!(
        sender = %action.sender,
        nonce = action.nonce,
        gas = gas_used,
        "[mc-chain] transaction applied"
    );
    Ok((receipt, gas_used))
}

/// Mutate state for a fully validated action. Infallible by
/// construction: every precondition was checked by the caller.
fn apply_effects(
    state: &mut StateDb,
    coinbase: Option<&Name>,
    sys_name: &Name,
    tx: &Transaction,
    fee: U256,
) {
    let action = tx.primary();
    let _ = state.inc_nonce(&action.sender);
    let _ = state.sub_balance(&action.sender, action.value.saturating_add(fee));

    match action.kind {
        ActionType::Transfer => {
            let _ = state.add_balance(&action.recipient, action.value);
            let mut amount = [0u8; 32];
            action.value.to_big_endian(&mut amount);
            state.add_log(action.recipient.clone(), vec![], amount.to_vec());
        }
        ActionType::KickedCandidate => {
            // Validated to decode by the caller.
            if let Ok(kicked) = decode_subject(&action.payload) {
                let mut candidates: Vec<Name> = state
                    .get(sys_name, mc_dpos::CANDIDATES_KEY)
                    .and_then(|bytes| serde_json::from_slice(&bytes).ok())
                    .unwrap_or_default();
                candidates.retain(|c| c != &kicked);
                let bytes = serde_json::to_vec(&candidates).unwrap_or_default();
                state.put(sys_name, mc_dpos::CANDIDATES_KEY, bytes);
                state.add_log(sys_name.clone(), vec![], action.payload.clone());
            }
        }
        ActionType::ExitTakeOver => {
            state.put(sys_name, mc_dpos::TAKEOVER_KEY, b"0".to_vec());
            state.add_log(sys_name.clone(), vec![], Vec::new());
        }
    }

    // The producer collects the fee, provided it has an account.
    if let Some(name) = coinbase {
        if !fee.is_zero() && state.account_exists(name) {
            let _ = state.add_balance(name, fee);
        }
    }
}

fn decode_subject(payload: &[u8]) -> Result<Name, TxError> {
    serde_json::from_slice(payload)
        .map_err(|e| TxError::Other(format!("undecodable governance payload: {e}")))
}
