//! Order lifecycle events
//!
//! Every successful mutation emits an event record. The creation event
//! carries the full order, so callers that only see an opaque success signal
//! can recover the ledger-assigned id without racing a follow-up query.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::ledger::{Order, OrderId};

/// Event emitted by the escrow engine on a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    /// A new order was created and its offered tokens escrowed.
    Created {
        /// Full order record, including the assigned id
        order: Order,
        /// Unix timestamp when the event was recorded
        timestamp: u64,
    },
    /// An open order was filled.
    Filled {
        order_id: OrderId,
        /// Account that supplied the requested token
        filler: String,
        timestamp: u64,
    },
    /// An open order was cancelled by its maker.
    Cancelled {
        order_id: OrderId,
        timestamp: u64,
    },
}

impl OrderEvent {
    /// Id of the order this event concerns.
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::Created { order, .. } => order.order_id,
            OrderEvent::Filled { order_id, .. } => *order_id,
            OrderEvent::Cancelled { order_id, .. } => *order_id,
        }
    }
}

/// Current unix timestamp for event records.
pub(crate) fn now_timestamp() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
