//! Order Ledger
//!
//! Owns the set of orders and their lifecycle state. The ledger is the
//! authoritative record of every order ever created: orders are never
//! physically deleted, closed orders remain queryable with their terminal
//! flags set.
//!
//! Lifecycle per order:
//! 1. **Open**: created by the escrow engine with the offered tokens already
//!    in custody; neither terminal flag is set.
//! 2. **Filled** (terminal): set exactly once by `mark_filled`.
//! 3. **Cancelled** (terminal): set exactly once by `mark_cancelled`.
//!
//! The two terminal flags are mutually exclusive and one-way. The ledger is
//! only mutated from within engine operations that already serialize access,
//! so it carries no locking of its own.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{OrderBookError, Result};

/// Monotonically increasing order identifier, assigned by the ledger and
/// never reused.
pub type OrderId = u64;

// ============================================================================
// ORDER RECORD
// ============================================================================

/// A single swap order.
///
/// All fields except the terminal flags are immutable after creation.
/// Amounts are denominated in the token's smallest indivisible unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Ledger-assigned identifier
    pub order_id: OrderId,
    /// Account that created the order
    pub maker: String,
    /// Token the maker put into escrow
    pub offered_token: String,
    /// Escrowed quantity of the offered token (smallest unit, > 0)
    pub offered_amount: u64,
    /// Token the maker wants in return
    pub requested_token: String,
    /// Quantity of the requested token (smallest unit, > 0)
    pub requested_amount: u64,
    /// Set exactly once on successful fill
    pub is_filled: bool,
    /// Set exactly once on successful cancellation
    pub is_cancelled: bool,
}

impl Order {
    /// Whether the order is open: neither filled nor cancelled. While open,
    /// its `offered_amount` of `offered_token` is held in custody.
    pub fn is_open(&self) -> bool {
        !self.is_filled && !self.is_cancelled
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// In-memory order store with the next-id counter.
///
/// Ids form a dense, strictly increasing sequence starting at the configured
/// base value. `next_id` advances the counter even if the caller never
/// follows through with an insertion; such gaps are an accepted, documented
/// policy for upstream misuse, not an error. The engine avoids them on its
/// own failure paths by allocating an id only after the escrow pull succeeds.
#[derive(Debug)]
pub struct OrderLedger {
    /// All orders ever created, keyed by id
    orders: HashMap<OrderId, Order>,
    /// Next unassigned id
    next_id: OrderId,
}

impl OrderLedger {
    /// Creates an empty ledger whose first assigned id will be `base_id`.
    pub fn new(base_id: OrderId) -> Self {
        Self {
            orders: HashMap::new(),
            next_id: base_id,
        }
    }

    /// Returns the next unused id and advances the counter.
    ///
    /// Callers must follow through with an insertion; an abandoned id is
    /// consumed forever (the gap policy above).
    pub fn next_id(&mut self) -> OrderId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Reads the next unassigned id without advancing the counter.
    ///
    /// Query surface for deployment verification and harnesses.
    pub fn peek_next_id(&self) -> OrderId {
        self.next_id
    }

    /// Stores a new open order.
    ///
    /// Fails with `DuplicateId` if the id is already present. Unreachable
    /// when ids come from `next_id`, kept as a defensive check.
    pub fn insert(&mut self, order: Order) -> Result<()> {
        if self.orders.contains_key(&order.order_id) {
            return Err(OrderBookError::DuplicateId(order.order_id));
        }
        self.orders.insert(order.order_id, order);
        Ok(())
    }

    /// Looks up an order by id.
    pub fn get(&self, id: OrderId) -> Result<&Order> {
        self.orders.get(&id).ok_or(OrderBookError::OrderNotFound(id))
    }

    /// Marks an open order as filled.
    ///
    /// Fails with `OrderNotFound` if absent, `AlreadyClosed` if either
    /// terminal flag is already set.
    pub fn mark_filled(&mut self, id: OrderId) -> Result<()> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or(OrderBookError::OrderNotFound(id))?;
        if !order.is_open() {
            return Err(OrderBookError::AlreadyClosed(id));
        }
        order.is_filled = true;
        Ok(())
    }

    /// Marks an open order as cancelled. Symmetric to `mark_filled`.
    pub fn mark_cancelled(&mut self, id: OrderId) -> Result<()> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or(OrderBookError::OrderNotFound(id))?;
        if !order.is_open() {
            return Err(OrderBookError::AlreadyClosed(id));
        }
        order.is_cancelled = true;
        Ok(())
    }

    /// Total quantity of `token` attributable to currently open orders.
    ///
    /// While the conservation invariant holds, this equals the custody
    /// balance of `token` in the bank.
    pub fn escrow_total(&self, token: &str) -> u64 {
        self.orders
            .values()
            .filter(|o| o.is_open() && o.offered_token == token)
            .map(|o| o.offered_amount)
            .sum()
    }

    /// Number of orders ever created.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether no order has ever been created.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
