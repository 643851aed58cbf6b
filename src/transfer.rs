//! Asset transfer seam
//!
//! The engine composes token movements but does not implement them; it hands
//! a complete batch of steps to an [`AssetTransfer`] implementation which
//! must apply all of them or none. This keeps the "pull tokens, then mutate
//! ledger" sequence replaceable with a test double that simulates failures.
//!
//! [`TokenBank`] is the in-process implementation used by the service and
//! the test harness. It models the ERC-20 surface the engine needs:
//! balances, per-(token, owner) allowances granted to a spender, and a
//! funding hook for provisioning accounts before a scenario.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// TRANSFER PRIMITIVES
// ============================================================================

/// A single token movement: `amount` of `token` from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStep {
    pub token: String,
    pub from: String,
    pub to: String,
    pub amount: u64,
}

/// Why a transfer batch could not be applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient balance of {token} in account {account}")]
    InsufficientBalance { token: String, account: String },

    #[error("insufficient allowance of {token} from account {account}")]
    InsufficientAllowance { token: String, account: String },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Capability to move tokens on the engine's behalf.
///
/// `execute` is all-or-nothing: if any step cannot be applied, no step may
/// be applied. Steps whose `from` is not the spender itself require a prior
/// allowance from `from` to the spender; the engine consumes that allowance
/// but never manages it.
#[async_trait]
pub trait AssetTransfer: Send + Sync {
    /// Applies the batch atomically on behalf of `spender`.
    async fn execute(&self, spender: &str, steps: &[TransferStep]) -> Result<(), TransferError>;

    /// Current balance of `token` held by `account`.
    async fn balance_of(&self, token: &str, account: &str) -> u64;
}

// ============================================================================
// IN-MEMORY TOKEN BANK
// ============================================================================

/// Balance and allowance tables for all tokens, behind one mutex so a batch
/// commits as a unit.
#[derive(Debug, Default)]
struct BankState {
    /// (token, account) -> balance
    balances: HashMap<(String, String), u64>,
    /// (token, owner) -> remaining allowance granted to the spender
    allowances: HashMap<(String, String), u64>,
}

/// In-memory token bank.
///
/// Stands in for the external token contracts: the service runs against it
/// directly and the integration tests use it to reproduce the funding and
/// approval steps a live harness performs against a chain.
#[derive(Debug, Default)]
pub struct TokenBank {
    state: Mutex<BankState>,
}

impl TokenBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the balance of `token` for `account`, overwriting any previous
    /// value. Funding hook, mirrors a faucet rather than a mint with supply
    /// accounting.
    pub fn set_balance(&self, token: &str, account: &str, amount: u64) {
        let mut state = self.state.lock().expect("bank mutex poisoned");
        state
            .balances
            .insert((token.to_string(), account.to_string()), amount);
        debug!(token, account, amount, "balance set");
    }

    /// Grants the spender an allowance of `amount` of `token` from `owner`,
    /// replacing any previous allowance for that pair.
    pub fn approve(&self, token: &str, owner: &str, amount: u64) {
        let mut state = self.state.lock().expect("bank mutex poisoned");
        state
            .allowances
            .insert((token.to_string(), owner.to_string()), amount);
        debug!(token, owner, amount, "allowance approved");
    }

    /// Remaining allowance of `token` granted by `owner` to the spender.
    pub fn allowance(&self, token: &str, owner: &str) -> u64 {
        let state = self.state.lock().expect("bank mutex poisoned");
        *state
            .allowances
            .get(&(token.to_string(), owner.to_string()))
            .unwrap_or(&0)
    }

    /// Synchronous balance read used internally and by `balance_of`.
    pub fn balance(&self, token: &str, account: &str) -> u64 {
        let state = self.state.lock().expect("bank mutex poisoned");
        *state
            .balances
            .get(&(token.to_string(), account.to_string()))
            .unwrap_or(&0)
    }
}

#[async_trait]
impl AssetTransfer for TokenBank {
    /// Applies the batch atomically: every step is validated and staged
    /// against a working copy of the tables, and the copy replaces the live
    /// state only once all steps have cleared. A failure in any step leaves
    /// every balance and allowance untouched.
    async fn execute(&self, spender: &str, steps: &[TransferStep]) -> Result<(), TransferError> {
        let mut state = self.state.lock().expect("bank mutex poisoned");

        let mut balances = state.balances.clone();
        let mut allowances = state.allowances.clone();

        for step in steps {
            let from_key = (step.token.clone(), step.from.clone());
            let to_key = (step.token.clone(), step.to.clone());

            // Pulls from third-party accounts consume allowance; the
            // spender moves its own funds freely.
            if step.from != spender {
                let allowance = allowances.entry(from_key.clone()).or_insert(0);
                if *allowance < step.amount {
                    return Err(TransferError::InsufficientAllowance {
                        token: step.token.clone(),
                        account: step.from.clone(),
                    });
                }
                *allowance -= step.amount;
            }

            let from_balance = balances.entry(from_key).or_insert(0);
            if *from_balance < step.amount {
                return Err(TransferError::InsufficientBalance {
                    token: step.token.clone(),
                    account: step.from.clone(),
                });
            }
            *from_balance -= step.amount;

            let to_balance = balances.entry(to_key).or_insert(0);
            *to_balance = to_balance.checked_add(step.amount).ok_or_else(|| {
                TransferError::Rejected(format!(
                    "balance overflow crediting {} to {}",
                    step.amount, step.to
                ))
            })?;
        }

        state.balances = balances;
        state.allowances = allowances;

        debug!(spender, steps = steps.len(), "transfer batch committed");
        Ok(())
    }

    async fn balance_of(&self, token: &str, account: &str) -> u64 {
        self.balance(token, account)
    }
}
