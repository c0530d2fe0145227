//! Exchange gateway trait.
//!
//! Provides a trait-based abstraction over the exchange so the ledger can be
//! driven by a real client, the paper exchange, or a test mock.

use std::collections::HashMap;

use keeper_core::{Amount, MarketId, OpenOrder, OrderId, OrderRequest};

use crate::error::GatewayResult;

/// Full open order records per market.
pub type OpenOrders = HashMap<MarketId, Vec<OpenOrder>>;

/// Open order ids per market.
pub type OpenOrderIds = HashMap<MarketId, Vec<OrderId>>;

/// What the exchange returned for a placement.
///
/// Placement returns transaction data; an order id is only present when the
/// exchange reports one. The ledger does not rely on it and adopts new orders
/// by comparing open-order snapshots instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementReceipt {
    /// Transaction or request reference.
    pub transaction_id: String,
    /// Order id, if the exchange reported one.
    pub order_id: Option<OrderId>,
}

/// Blocking exchange capability consumed by the ledger.
///
/// Markets with no open orders may be omitted from listings; callers treat a
/// missing market as an empty one. Retry and backoff, if any, belong to the
/// implementation.
pub trait ExchangeGateway: Send + Sync {
    /// Full open order records for the account in `markets`.
    fn open_orders(&self, markets: &[MarketId]) -> GatewayResult<OpenOrders>;

    /// Open order ids for the account in `markets`.
    fn open_order_ids(&self, markets: &[MarketId]) -> GatewayResult<OpenOrderIds> {
        Ok(self
            .open_orders(markets)?
            .into_iter()
            .map(|(market, orders)| (market, orders.into_iter().map(|o| o.id).collect()))
            .collect())
    }

    /// Place a limit order.
    fn place_order(&self, request: &OrderRequest) -> GatewayResult<PlacementReceipt>;

    /// Cancel an order by id.
    fn cancel_order(&self, id: &OrderId) -> GatewayResult<()>;

    /// Free balances per asset symbol.
    fn balances(&self) -> GatewayResult<HashMap<String, Amount>>;
}
