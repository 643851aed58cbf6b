//! Shared test helpers for unit tests
//!
//! This module provides constants and builder functions used by the test
//! files: dummy accounts and tokens, pre-funded bank builders, and a
//! transfer double that rejects every batch.

use async_trait::async_trait;
use std::sync::Arc;

use orderbook::config::{ApiConfig, Config, LedgerConfig};
use orderbook::engine::EscrowEngine;
use orderbook::transfer::{AssetTransfer, TokenBank, TransferError, TransferStep};

// ============================================================================
// CONSTANTS
// ============================================================================

// -------------------------------- TOKENS --------------------------------

/// Token offered by the maker in the reference scenario (USDC, 6 decimals)
pub const DUMMY_TOKEN_A: &str = "0xaf88d065e77c8cC2239327C5EDb3A432268e5831";

/// Token requested by the maker in the reference scenario (6 decimals)
pub const DUMMY_TOKEN_B: &str = "0x2433D6AC11193b4695D9ca73530de93c538aD18a";

// -------------------------------- ACCOUNTS ------------------------------

/// Dummy maker account (creates orders)
pub const DUMMY_MAKER_ADDR: &str = "0x00000000000000000000000000000000000A5Ce1";

/// Dummy filler account (fills orders)
pub const DUMMY_FILLER_ADDR: &str = "0x0000000000000000000000000000000000F111e2";

/// Dummy third account with no role in any order
#[allow(dead_code)]
pub const DUMMY_OUTSIDER_ADDR: &str = "0x0000000000000000000000000000000000000bad";

/// Custody account label used by test engines
pub const DUMMY_CUSTODY_ACCOUNT: &str = "orderbook-custody";

// -------------------------------- AMOUNTS -------------------------------

/// 100 units of token A in smallest units (6 decimals)
pub const OFFERED_AMOUNT: u64 = 100_000_000;

/// 50,000 units of token B in smallest units (6 decimals)
pub const REQUESTED_AMOUNT: u64 = 50_000_000_000;

/// First id a fresh test ledger assigns
pub const BASE_ORDER_ID: u64 = 1;

// ============================================================================
// BUILDERS
// ============================================================================

/// Creates a test configuration with the dummy custody account and an
/// ephemeral API port.
#[allow(dead_code)]
pub fn build_test_config() -> Config {
    Config {
        ledger: LedgerConfig {
            base_order_id: BASE_ORDER_ID,
            custody_account: DUMMY_CUSTODY_ACCOUNT.to_string(),
        },
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
        },
        funding: Vec::new(),
    }
}

/// Creates a bank funded for the reference scenario: the maker holds 100
/// token A, the filler holds 50,000 token B. No allowances are granted;
/// tests perform the approval step explicitly, like the original harness.
#[allow(dead_code)]
pub fn build_funded_bank() -> Arc<TokenBank> {
    let bank = Arc::new(TokenBank::new());
    bank.set_balance(DUMMY_TOKEN_A, DUMMY_MAKER_ADDR, OFFERED_AMOUNT);
    bank.set_balance(DUMMY_TOKEN_B, DUMMY_FILLER_ADDR, REQUESTED_AMOUNT);
    bank
}

/// Creates an engine over the given bank with the dummy custody account.
#[allow(dead_code)]
pub fn build_engine(bank: Arc<TokenBank>) -> EscrowEngine {
    EscrowEngine::new(DUMMY_CUSTODY_ACCOUNT.to_string(), BASE_ORDER_ID, bank)
}

/// Creates a funded bank and an engine over it in one step.
#[allow(dead_code)]
pub fn build_funded_engine() -> (EscrowEngine, Arc<TokenBank>) {
    let bank = build_funded_bank();
    let engine = build_engine(bank.clone());
    (engine, bank)
}

// ============================================================================
// TRANSFER DOUBLE
// ============================================================================

/// Transfer double that rejects every batch, for exercising the engine's
/// no-state-change guarantee on `TransferFailed`.
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct RejectingBank;

#[async_trait]
impl AssetTransfer for RejectingBank {
    async fn execute(&self, _spender: &str, _steps: &[TransferStep]) -> Result<(), TransferError> {
        Err(TransferError::Rejected("injected failure".to_string()))
    }

    async fn balance_of(&self, _token: &str, _account: &str) -> u64 {
        0
    }
}
