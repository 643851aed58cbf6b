//! Error types for the order book core.
//!
//! Every mutating operation surfaces exactly one of these to its caller;
//! nothing is swallowed or retried internally. A failed operation leaves the
//! ledger and the token bank exactly as they were before the call.

use thiserror::Error;

use crate::ledger::OrderId;
use crate::transfer::TransferError;

/// Domain errors for ledger and engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderBookError {
    #[error("Invalid amount: offered and requested amounts must be positive")]
    InvalidAmount,

    #[error("Transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    #[error("Order {0} is already filled or cancelled")]
    AlreadyClosed(OrderId),

    #[error("Caller is not authorized to perform this operation")]
    NotAuthorized,

    #[error("Order id {0} already exists in the ledger")]
    DuplicateId(OrderId),
}

/// Result alias for ledger and engine operations.
pub type Result<T> = std::result::Result<T, OrderBookError>;
