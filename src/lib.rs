//! Order Book Service Library
//!
//! This crate implements an order book for peer-to-peer token swaps: makers
//! escrow an offered token against a requested token, fillers settle open
//! orders one-to-one, and makers may cancel. Token custody movements and
//! ledger transitions are coupled so that either both happen or neither
//! does.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod transfer;

// Re-export commonly used types
pub use config::{ApiConfig, Config, FundingConfig, LedgerConfig};
pub use engine::EscrowEngine;
pub use error::OrderBookError;
pub use events::OrderEvent;
pub use ledger::{Order, OrderId, OrderLedger};
pub use transfer::{AssetTransfer, TokenBank, TransferError, TransferStep};
