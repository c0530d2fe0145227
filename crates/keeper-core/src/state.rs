//! Persisted per-bot state document.
//!
//! `BotState` records which order ids a bot believes it owns in each market,
//! plus opaque per-market attributes set by strategy code. Every mutation path
//! keeps the ids within one market unique.

use crate::{MarketId, OrderId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-market key/value attributes owned by strategy code.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// The ledger document persisted for one bot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotState {
    /// Order ids this bot believes are open, per market.
    #[serde(default)]
    pub orders: BTreeMap<MarketId, Vec<OrderId>>,
    /// Strategy attributes, per market. Not interpreted by the ledger.
    #[serde(default)]
    pub attributes: BTreeMap<MarketId, Attributes>,
}

impl BotState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids recorded in `market`, empty if the market has no entry.
    pub fn orders_in(&self, market: &MarketId) -> &[OrderId] {
        self.orders.get(market).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check whether `id` is recorded under `market`.
    pub fn contains(&self, market: &MarketId, id: &OrderId) -> bool {
        self.orders_in(market).contains(id)
    }

    /// Create an empty order list for `market` if missing.
    pub fn ensure_market(&mut self, market: &MarketId) {
        self.orders.entry(market.clone()).or_default();
    }

    /// Append `id` to `market`, creating the entry if needed.
    ///
    /// Returns false if the id was already recorded there.
    pub fn record(&mut self, market: &MarketId, id: OrderId) -> bool {
        let ids = self.orders.entry(market.clone()).or_default();
        if ids.contains(&id) {
            return false;
        }
        ids.push(id);
        true
    }

    /// Remove `id` from `market`. Returns true if it was present.
    pub fn remove(&mut self, market: &MarketId, id: &OrderId) -> bool {
        match self.orders.get_mut(market) {
            Some(ids) => {
                let before = ids.len();
                ids.retain(|existing| existing != id);
                ids.len() != before
            }
            None => false,
        }
    }

    /// Remove `id` from every market it appears in.
    ///
    /// Returns the number of markets it was removed from.
    pub fn remove_everywhere(&mut self, id: &OrderId) -> usize {
        let mut removed = 0;
        for ids in self.orders.values_mut() {
            let before = ids.len();
            ids.retain(|existing| existing != id);
            if ids.len() != before {
                removed += 1;
            }
        }
        removed
    }

    /// Total number of recorded ids across all markets.
    pub fn order_count(&self) -> usize {
        self.orders.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(s: &str) -> MarketId {
        MarketId::new(s)
    }

    fn id(s: &str) -> OrderId {
        OrderId::new(s)
    }

    #[test]
    fn test_record_is_deduplicated() {
        let mut state = BotState::new();
        assert!(state.record(&m("USD_BTS"), id("1.7.1")));
        assert!(!state.record(&m("USD_BTS"), id("1.7.1")));
        assert_eq!(state.orders_in(&m("USD_BTS")), &[id("1.7.1")]);
    }

    #[test]
    fn test_remove_everywhere() {
        let mut state = BotState::new();
        state.record(&m("USD_BTS"), id("1.7.1"));
        state.record(&m("EUR_BTS"), id("1.7.1"));
        state.record(&m("EUR_BTS"), id("1.7.2"));

        assert_eq!(state.remove_everywhere(&id("1.7.1")), 2);
        assert_eq!(state.remove_everywhere(&id("1.7.1")), 0);
        assert!(state.orders_in(&m("USD_BTS")).is_empty());
        assert_eq!(state.orders_in(&m("EUR_BTS")), &[id("1.7.2")]);
    }

    #[test]
    fn test_orders_in_unknown_market_does_not_create_entry() {
        let state = BotState::new();
        assert!(state.orders_in(&m("USD_BTS")).is_empty());
        assert!(state.orders.is_empty());
    }

    #[test]
    fn test_deserialize_legacy_document_without_attributes() {
        let state: BotState =
            serde_json::from_str(r#"{"orders":{"USD_BTS":["1.7.1","1.7.2"]}}"#).unwrap();
        assert_eq!(state.order_count(), 2);
        assert!(state.attributes.is_empty());
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let result = serde_json::from_str::<BotState>(r#"{"orders":{},"ordres":{}}"#);
        assert!(result.is_err());
    }
}
