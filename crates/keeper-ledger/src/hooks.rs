//! Callbacks from the ledger into strategy code.
//!
//! [`OrderEvents`] is invoked synchronously by the engine when it detects a
//! fill, adopts a new order or cancels one. [`Strategy`] adds the entry points
//! the tick driver calls. Every default only writes a debug log.

use keeper_core::{MarketId, OrderId};
use tracing::debug;

use crate::engine::LedgerEngine;
use crate::error::LedgerResult;

/// Order lifecycle notifications.
pub trait OrderEvents {
    /// An owned order is no longer open on the exchange (fully filled).
    fn on_order_filled(&mut self, market: &MarketId, id: &OrderId) {
        debug!(market = %market, order_id = %id, "Order filled, no handler defined");
    }

    /// A new open order was adopted into the ledger.
    fn on_order_placed(&mut self, market: &MarketId, id: &OrderId) {
        debug!(market = %market, order_id = %id, "New order, no handler defined");
    }

    /// A cancel was attempted for `id`.
    fn on_order_canceled(&mut self, id: &OrderId) {
        debug!(order_id = %id, "Order canceled, no handler defined");
    }
}

/// Handler that keeps every default.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnly;

impl OrderEvents for LogOnly {}

/// Strategy entry points driven by the tick loop.
pub trait Strategy: OrderEvents {
    /// Called once after the engine is constructed.
    fn init(&mut self, engine: &mut LedgerEngine) -> LedgerResult<()> {
        debug!(bot = engine.name(), "init not defined");
        Ok(())
    }

    /// Place the initial set of orders.
    fn place(&mut self, engine: &mut LedgerEngine) -> LedgerResult<()> {
        debug!(bot = engine.name(), "place not defined");
        Ok(())
    }

    /// Called every tick, between reconciliation and bookkeeping.
    ///
    /// Advancing the lifecycle counter is up to the strategy.
    fn tick(&mut self, engine: &mut LedgerEngine) -> LedgerResult<()> {
        debug!(bot = engine.name(), "tick not defined");
        Ok(())
    }
}
