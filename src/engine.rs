//! Escrow Engine
//!
//! Couples token custody movements to ledger transitions so that either both
//! happen or neither does. Every mutating operation runs under the ledger's
//! write lock, held across the transfer batch and the ledger mutation, so
//! operations execute one at a time to completion and no reader can observe
//! a state where custody and ledger flags disagree.
//!
//! State machine per order: `Open -> Filled` (terminal) or
//! `Open -> Cancelled` (terminal); no transition leads back to `Open`.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{OrderBookError, Result};
use crate::events::{now_timestamp, OrderEvent};
use crate::ledger::{Order, OrderId, OrderLedger};
use crate::transfer::{AssetTransfer, TransferStep};

/// Escrow engine over an order ledger and an injected transfer service.
///
/// Cloning is cheap and shares the underlying state; the API server and
/// background tasks hold clones.
#[derive(Clone)]
pub struct EscrowEngine {
    /// Account under which escrowed tokens are held
    custody: String,
    /// Order records and the next-id counter. The write lock is the
    /// serialization point for all mutating operations.
    ledger: Arc<RwLock<OrderLedger>>,
    /// Token movement capability (spender = custody account)
    bank: Arc<dyn AssetTransfer>,
    /// Cache of emitted events, in emission order
    events: Arc<RwLock<Vec<OrderEvent>>>,
}

impl EscrowEngine {
    /// Creates an engine with an empty ledger.
    ///
    /// # Arguments
    ///
    /// * `custody_account` - account label the bank attributes escrow to
    /// * `base_order_id` - first id the ledger will assign
    /// * `bank` - transfer service; pulls from makers and fillers require a
    ///   prior allowance to `custody_account`
    pub fn new(custody_account: String, base_order_id: OrderId, bank: Arc<dyn AssetTransfer>) -> Self {
        Self {
            custody: custody_account,
            ledger: Arc::new(RwLock::new(OrderLedger::new(base_order_id))),
            bank,
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Account label under which escrowed tokens are held.
    pub fn custody_account(&self) -> &str {
        &self.custody
    }

    // ========================================================================
    // MUTATING OPERATIONS
    // ========================================================================

    /// Creates a new open order, pulling the offered tokens into custody.
    ///
    /// The pull happens before an id is allocated, so a failed pull consumes
    /// no id and leaves the ledger untouched.
    ///
    /// # Returns
    ///
    /// * `Ok(OrderId)` - id of the new open order
    /// * `Err(OrderBookError)` - `InvalidAmount` for zero amounts,
    ///   `TransferFailed` if the maker's balance or allowance is insufficient
    pub async fn create_order(
        &self,
        maker: &str,
        offered_token: &str,
        offered_amount: u64,
        requested_token: &str,
        requested_amount: u64,
    ) -> Result<OrderId> {
        if offered_amount == 0 || requested_amount == 0 {
            return Err(OrderBookError::InvalidAmount);
        }

        let mut ledger = self.ledger.write().await;

        let pull = TransferStep {
            token: offered_token.to_string(),
            from: maker.to_string(),
            to: self.custody.clone(),
            amount: offered_amount,
        };
        self.bank.execute(&self.custody, &[pull]).await?;

        let order_id = ledger.next_id();
        let order = Order {
            order_id,
            maker: maker.to_string(),
            offered_token: offered_token.to_string(),
            offered_amount,
            requested_token: requested_token.to_string(),
            requested_amount,
            is_filled: false,
            is_cancelled: false,
        };
        ledger.insert(order.clone())?;

        self.emit(OrderEvent::Created {
            order,
            timestamp: now_timestamp(),
        })
        .await;

        info!(
            order_id,
            maker, offered_token, offered_amount, requested_token, requested_amount,
            "order created"
        );
        Ok(order_id)
    }

    /// Fills an open order.
    ///
    /// Pulls the requested tokens from the filler into custody, pays the
    /// escrowed tokens out to the filler and the requested tokens out to the
    /// maker, and marks the order filled, all as one unit. The three legs go
    /// to the bank as a single batch, so a failure in any of them leaves the
    /// order open with its escrow untouched.
    ///
    /// The filler's identity is not checked against the maker: self-fill is
    /// permitted.
    pub async fn fill_order(&self, filler: &str, order_id: OrderId) -> Result<()> {
        let mut ledger = self.ledger.write().await;

        let order = ledger.get(order_id)?.clone();
        if !order.is_open() {
            return Err(OrderBookError::AlreadyClosed(order_id));
        }

        let steps = [
            // Pull the requested tokens from the filler
            TransferStep {
                token: order.requested_token.clone(),
                from: filler.to_string(),
                to: self.custody.clone(),
                amount: order.requested_amount,
            },
            // Release the escrowed tokens to the filler
            TransferStep {
                token: order.offered_token.clone(),
                from: self.custody.clone(),
                to: filler.to_string(),
                amount: order.offered_amount,
            },
            // Release the just-pulled tokens to the maker
            TransferStep {
                token: order.requested_token.clone(),
                from: self.custody.clone(),
                to: order.maker.clone(),
                amount: order.requested_amount,
            },
        ];
        self.bank.execute(&self.custody, &steps).await?;

        ledger.mark_filled(order_id)?;

        self.emit(OrderEvent::Filled {
            order_id,
            filler: filler.to_string(),
            timestamp: now_timestamp(),
        })
        .await;

        info!(order_id, filler, "order filled");
        Ok(())
    }

    /// Cancels an open order, returning the escrowed tokens to the maker.
    ///
    /// Only the order's maker may cancel it.
    pub async fn cancel_order(&self, caller: &str, order_id: OrderId) -> Result<()> {
        let mut ledger = self.ledger.write().await;

        let order = ledger.get(order_id)?.clone();
        if !order.is_open() {
            return Err(OrderBookError::AlreadyClosed(order_id));
        }
        if order.maker != caller {
            return Err(OrderBookError::NotAuthorized);
        }

        let refund = TransferStep {
            token: order.offered_token.clone(),
            from: self.custody.clone(),
            to: order.maker.clone(),
            amount: order.offered_amount,
        };
        self.bank.execute(&self.custody, &[refund]).await?;

        ledger.mark_cancelled(order_id)?;

        self.emit(OrderEvent::Cancelled {
            order_id,
            timestamp: now_timestamp(),
        })
        .await;

        info!(order_id, caller, "order cancelled");
        Ok(())
    }

    // ========================================================================
    // QUERY SURFACE
    // ========================================================================

    /// Read-only projection of an order record.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        let ledger = self.ledger.read().await;
        ledger.get(order_id).cloned()
    }

    /// Next unassigned order id. Deployment-verification read; does not
    /// advance the counter.
    pub async fn next_order_id(&self) -> OrderId {
        let ledger = self.ledger.read().await;
        ledger.peek_next_id()
    }

    /// Total quantity of `token` the ledger attributes to open orders.
    ///
    /// Equal to the custody balance of `token` while the conservation
    /// invariant holds.
    pub async fn escrow_total(&self, token: &str) -> u64 {
        let ledger = self.ledger.read().await;
        ledger.escrow_total(token)
    }

    /// All events emitted so far, in emission order.
    pub async fn cached_events(&self) -> Vec<OrderEvent> {
        let events = self.events.read().await;
        events.clone()
    }

    /// Appends an event to the cache. Called while the ledger write lock is
    /// held, so readers of the cache see events in commit order.
    async fn emit(&self, event: OrderEvent) {
        let mut events = self.events.write().await;
        events.push(event);
    }
}
