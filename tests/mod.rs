//! Test module organization
//!
//! This module re-exports test helpers for use in test files.

mod helpers;

#[allow(unused_imports)]
pub use helpers::{
    build_engine, build_funded_bank, build_funded_engine, build_test_config, RejectingBank,
    BASE_ORDER_ID, DUMMY_CUSTODY_ACCOUNT, DUMMY_FILLER_ADDR, DUMMY_MAKER_ADDR,
    DUMMY_OUTSIDER_ADDR, DUMMY_TOKEN_A, DUMMY_TOKEN_B, OFFERED_AMOUNT, REQUESTED_AMOUNT,
};
