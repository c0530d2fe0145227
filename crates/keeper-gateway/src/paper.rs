//! In-memory paper exchange.
//!
//! Holds an account's open orders and balances in memory. Orders placed
//! through it rest until canceled or until [`PaperGateway::fill`] simulates a
//! counterparty taking them. Failures can be injected per operation, and every
//! cancel and placement is recorded for verification.

use std::collections::{BTreeMap, HashMap, HashSet};

use keeper_core::{Amount, MarketId, OpenOrder, OrderId, OrderRequest};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{ExchangeGateway, OpenOrders, PlacementReceipt};

/// Object-id prefix used for paper order ids (`1.7.<n>`).
const ORDER_ID_PREFIX: &str = "1.7.";

#[derive(Debug, Default)]
struct PaperBook {
    next_seq: u64,
    orders: BTreeMap<MarketId, Vec<OpenOrder>>,
    balances: HashMap<String, Amount>,
    failing_cancels: HashSet<OrderId>,
    listing_failure: Option<GatewayError>,
    placement_failure: Option<GatewayError>,
    cancel_calls: Vec<OrderId>,
    placements: Vec<OrderRequest>,
    listing_calls: usize,
}

impl PaperBook {
    fn next_id(&mut self) -> OrderId {
        self.next_seq += 1;
        OrderId::new(format!("{ORDER_ID_PREFIX}{}", self.next_seq))
    }

    fn take_order(&mut self, id: &OrderId) -> Option<(MarketId, OpenOrder)> {
        for (market, orders) in self.orders.iter_mut() {
            if let Some(pos) = orders.iter().position(|o| &o.id == id) {
                return Some((market.clone(), orders.remove(pos)));
            }
        }
        None
    }
}

/// In-memory exchange implementing [`ExchangeGateway`].
#[derive(Debug, Default)]
pub struct PaperGateway {
    book: Mutex<PaperBook>,
}

impl PaperGateway {
    /// Create an empty paper exchange.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free balance of `asset`.
    pub fn set_balance(&self, asset: &str, amount: Amount) {
        self.book.lock().balances.insert(asset.to_string(), amount);
    }

    /// Rest an order directly in the book, as if placed by another bot
    /// sharing the account.
    pub fn insert_order(&self, market: &MarketId, order: OpenOrder) {
        self.book
            .lock()
            .orders
            .entry(market.clone())
            .or_default()
            .push(order);
    }

    /// Simulate a counterparty fully filling order `id`.
    ///
    /// Returns false if no such order is open.
    pub fn fill(&self, id: &OrderId) -> bool {
        let filled = self.book.lock().take_order(id);
        if let Some((market, _)) = &filled {
            debug!(order_id = %id, market = %market, "Paper order filled");
        }
        filled.is_some()
    }

    /// Make every cancel of `id` fail with a rejection.
    pub fn fail_cancel_for(&self, id: &OrderId) {
        self.book.lock().failing_cancels.insert(id.clone());
    }

    /// Make open-order listings fail with `error` (or succeed again on `None`).
    pub fn set_listing_failure(&self, error: Option<GatewayError>) {
        self.book.lock().listing_failure = error;
    }

    /// Make placements fail with `error` (or succeed again on `None`).
    pub fn set_placement_failure(&self, error: Option<GatewayError>) {
        self.book.lock().placement_failure = error;
    }

    /// Ids passed to `cancel_order`, in call order.
    pub fn cancel_calls(&self) -> Vec<OrderId> {
        self.book.lock().cancel_calls.clone()
    }

    /// Requests passed to `place_order`, in call order.
    pub fn placements(&self) -> Vec<OrderRequest> {
        self.book.lock().placements.clone()
    }

    /// Number of open-order listing calls served.
    pub fn listing_calls(&self) -> usize {
        self.book.lock().listing_calls
    }

    /// Ids currently open in `market`.
    pub fn open_ids_in(&self, market: &MarketId) -> Vec<OrderId> {
        self.book
            .lock()
            .orders
            .get(market)
            .map(|orders| orders.iter().map(|o| o.id.clone()).collect())
            .unwrap_or_default()
    }
}

impl ExchangeGateway for PaperGateway {
    fn open_orders(&self, markets: &[MarketId]) -> GatewayResult<OpenOrders> {
        let mut book = self.book.lock();
        book.listing_calls += 1;
        if let Some(err) = &book.listing_failure {
            return Err(err.clone());
        }

        // Markets without open orders are omitted, like a real listing.
        Ok(markets
            .iter()
            .filter_map(|market| {
                book.orders
                    .get(market)
                    .filter(|orders| !orders.is_empty())
                    .map(|orders| (market.clone(), orders.clone()))
            })
            .collect())
    }

    fn place_order(&self, request: &OrderRequest) -> GatewayResult<PlacementReceipt> {
        let mut book = self.book.lock();
        book.placements.push(request.clone());
        if let Some(err) = &book.placement_failure {
            return Err(err.clone());
        }
        if !request.price.is_positive() || request.amount.is_zero() {
            return Err(GatewayError::Rejected(format!(
                "invalid order: price={} amount={}",
                request.price, request.amount
            )));
        }

        let id = book.next_id();
        book.orders
            .entry(request.market.clone())
            .or_default()
            .push(OpenOrder::new(
                id.clone(),
                request.side,
                request.price,
                request.amount,
            ));
        debug!(order_id = %id, market = %request.market, side = %request.side, "Paper order placed");

        Ok(PlacementReceipt {
            transaction_id: format!("paper-tx-{}", book.next_seq),
            order_id: Some(id),
        })
    }

    fn cancel_order(&self, id: &OrderId) -> GatewayResult<()> {
        let mut book = self.book.lock();
        book.cancel_calls.push(id.clone());
        if book.failing_cancels.contains(id) {
            return Err(GatewayError::Rejected(format!("cancel of {id} refused")));
        }
        match book.take_order(id) {
            Some(_) => Ok(()),
            None => Err(GatewayError::NotFound(id.clone())),
        }
    }

    fn balances(&self) -> GatewayResult<HashMap<String, Amount>> {
        Ok(self.book.lock().balances.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_core::{OrderSide, Price};
    use rust_decimal_macros::dec;

    fn usd_bts() -> MarketId {
        MarketId::new("USD_BTS")
    }

    fn request(side: OrderSide) -> OrderRequest {
        OrderRequest::new(
            usd_bts(),
            side,
            Price::new(dec!(300)),
            Amount::new(dec!(1)),
        )
    }

    #[test]
    fn test_place_and_list() {
        let gateway = PaperGateway::new();
        let receipt = gateway.place_order(&request(OrderSide::Buy)).unwrap();

        let id = receipt.order_id.unwrap();
        assert_eq!(id.as_str(), "1.7.1");
        let ids = gateway.open_order_ids(&[usd_bts()]).unwrap();
        assert_eq!(ids.get(&usd_bts()), Some(&vec![id]));
    }

    #[test]
    fn test_empty_markets_are_omitted() {
        let gateway = PaperGateway::new();
        let listing = gateway.open_orders(&[usd_bts()]).unwrap();
        assert!(listing.is_empty());
    }

    #[test]
    fn test_cancel_unknown_is_not_found() {
        let gateway = PaperGateway::new();
        let err = gateway.cancel_order(&OrderId::new("1.7.99")).unwrap_err();
        assert_eq!(err, GatewayError::NotFound(OrderId::new("1.7.99")));
        assert_eq!(gateway.cancel_calls().len(), 1);
    }

    #[test]
    fn test_injected_cancel_failure_keeps_order() {
        let gateway = PaperGateway::new();
        let id = gateway
            .place_order(&request(OrderSide::Sell))
            .unwrap()
            .order_id
            .unwrap();
        gateway.fail_cancel_for(&id);

        assert!(gateway.cancel_order(&id).is_err());
        assert_eq!(gateway.open_ids_in(&usd_bts()), vec![id]);
    }

    #[test]
    fn test_fill_removes_order() {
        let gateway = PaperGateway::new();
        let id = gateway
            .place_order(&request(OrderSide::Sell))
            .unwrap()
            .order_id
            .unwrap();

        assert!(gateway.fill(&id));
        assert!(!gateway.fill(&id));
        assert!(gateway.open_ids_in(&usd_bts()).is_empty());
    }

    #[test]
    fn test_rejects_zero_amount() {
        let gateway = PaperGateway::new();
        let mut req = request(OrderSide::Buy);
        req.amount = Amount::ZERO;

        assert!(matches!(
            gateway.place_order(&req),
            Err(GatewayError::Rejected(_))
        ));
    }
}
