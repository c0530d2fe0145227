//! Order ledger: the bot's persisted belief about which orders it owns.
//!
//! Owns the in-memory [`BotState`] and mediates every read and write of it
//! against the [`StateStore`]. The ledger never talks to the exchange; the
//! engine feeds it with what the gateway reports.

use std::collections::BTreeMap;
use std::sync::Arc;

use keeper_core::{BotState, MarketId, OrderId};
use keeper_persistence::StateStore;
use keeper_telemetry::{EventSink, LedgerEvent};
use serde_json::Value;

use crate::error::{ConfigError, LedgerResult};
use crate::settings::BotSettings;

/// Per-bot order ledger.
pub struct OrderLedger {
    bot: String,
    markets: Vec<MarketId>,
    persist: bool,
    state: BotState,
    store: Arc<dyn StateStore>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for OrderLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderLedger")
            .field("bot", &self.bot)
            .field("markets", &self.markets)
            .field("persist", &self.persist)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl OrderLedger {
    /// Open the ledger for `settings.name`, restoring any stored state.
    ///
    /// Unreadable stored state is a fatal configuration error.
    pub fn open(
        settings: &BotSettings,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn EventSink>,
    ) -> LedgerResult<Self> {
        let mut ledger = Self {
            bot: settings.name.clone(),
            markets: settings.markets.clone(),
            persist: settings.persist,
            state: BotState::new(),
            store,
            sink,
        };
        ledger.restore()?;
        Ok(ledger)
    }

    /// Reload the state from the store, replacing the in-memory state.
    ///
    /// Nothing stored yet yields the empty state.
    pub fn restore(&mut self) -> LedgerResult<&BotState> {
        let loaded = self
            .store
            .load(&self.bot)
            .map_err(|source| ConfigError::UnreadableState {
                bot: self.bot.clone(),
                source,
            })?;

        let fresh = loaded.is_none();
        self.state = loaded.unwrap_or_default();
        self.sink.emit(
            &self.bot,
            LedgerEvent::Restored {
                orders: self.state.order_count(),
                fresh,
            },
        );
        Ok(&self.state)
    }

    /// Write the state to the store.
    ///
    /// Succeeds without writing when persistence is disabled.
    pub fn store(&self) -> LedgerResult<()> {
        if !self.persist {
            self.sink.emit(&self.bot, LedgerEvent::StoreSkipped);
            return Ok(());
        }
        self.store.save(&self.bot, &self.state)?;
        self.sink.emit(
            &self.bot,
            LedgerEvent::Stored {
                orders: self.state.order_count(),
            },
        );
        Ok(())
    }

    /// Read strategy attribute `key` of `market`.
    ///
    /// An unknown market gets an empty attribute entry as a side effect, so
    /// the market exists in the state after any `get`.
    pub fn get(&mut self, market: &MarketId, key: &str) -> Option<&Value> {
        self.state
            .attributes
            .entry(market.clone())
            .or_default()
            .get(key)
    }

    /// Set strategy attribute `key` of `market`, creating the market entry.
    pub fn set(&mut self, market: &MarketId, key: impl Into<String>, value: impl Into<Value>) {
        self.state
            .attributes
            .entry(market.clone())
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Recorded ids for every served market, empty lists included.
    pub fn my_orders(&self) -> BTreeMap<MarketId, Vec<OrderId>> {
        self.markets
            .iter()
            .map(|market| (market.clone(), self.state.orders_in(market).to_vec()))
            .collect()
    }

    /// Check whether `id` is recorded as ours in `market`.
    pub fn owns(&self, market: &MarketId, id: &OrderId) -> bool {
        self.state.contains(market, id)
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut BotState {
        &mut self.state
    }

    /// Make sure every served market has an order list.
    pub(crate) fn ensure_served_markets(&mut self) {
        for market in &self.markets {
            self.state.ensure_market(market);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_persistence::{JsonFileStore, MemoryStore};
    use keeper_telemetry::RecordingSink;
    use serde_json::json;
    use tempfile::TempDir;

    fn settings() -> BotSettings {
        BotSettings::new(
            "maker",
            vec![MarketId::new("USD_BTS"), MarketId::new("EUR_BTS")],
        )
    }

    fn open_with(store: Arc<MemoryStore>, settings: &BotSettings) -> OrderLedger {
        OrderLedger::open(settings, store, Arc::new(RecordingSink::new())).unwrap()
    }

    #[test]
    fn test_restore_without_stored_state_is_empty() {
        let sink = Arc::new(RecordingSink::new());
        let ledger =
            OrderLedger::open(&settings(), Arc::new(MemoryStore::new()), sink.clone()).unwrap();

        assert_eq!(ledger.state(), &BotState::new());
        assert_eq!(
            sink.events(),
            vec![LedgerEvent::Restored {
                orders: 0,
                fresh: true
            }]
        );
    }

    #[test]
    fn test_restore_loads_stored_orders() {
        let mut stored = BotState::new();
        stored.record(&MarketId::new("USD_BTS"), OrderId::new("1.7.5"));
        let store = Arc::new(MemoryStore::with_state("maker", stored.clone()));

        let ledger = open_with(store, &settings());

        assert_eq!(ledger.state(), &stored);
    }

    #[test]
    fn test_corrupt_state_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("maker.json"), "not json").unwrap();
        let store = Arc::new(JsonFileStore::new(temp_dir.path()).unwrap());

        let err =
            OrderLedger::open(&settings(), store, Arc::new(RecordingSink::new())).unwrap_err();
        assert!(matches!(
            err,
            crate::LedgerError::Config(ConfigError::UnreadableState { .. })
        ));
    }

    #[test]
    fn test_get_materializes_unknown_market() {
        let mut ledger = open_with(Arc::new(MemoryStore::new()), &settings());
        let market = MarketId::new("GOLD_BTS");

        assert!(ledger.get(&market, "spread").is_none());
        assert!(ledger.state().attributes.contains_key(&market));
        assert!(ledger.state().attributes[&market].is_empty());
    }

    #[test]
    fn test_set_creates_market_with_value() {
        let mut ledger = open_with(Arc::new(MemoryStore::new()), &settings());
        let market = MarketId::new("GOLD_BTS");

        ledger.set(&market, "spread", json!(0.02));

        assert_eq!(ledger.get(&market, "spread"), Some(&json!(0.02)));
    }

    #[test]
    fn test_my_orders_lists_every_served_market() {
        let mut ledger = open_with(Arc::new(MemoryStore::new()), &settings());
        ledger
            .state_mut()
            .record(&MarketId::new("USD_BTS"), OrderId::new("1.7.1"));
        // Not served: must not show up
        ledger
            .state_mut()
            .record(&MarketId::new("GOLD_BTS"), OrderId::new("1.7.2"));

        let mine = ledger.my_orders();

        assert_eq!(mine.len(), 2);
        assert_eq!(mine[&MarketId::new("USD_BTS")], vec![OrderId::new("1.7.1")]);
        assert!(mine[&MarketId::new("EUR_BTS")].is_empty());
    }

    #[test]
    fn test_store_writes_when_persistent() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = open_with(store.clone(), &settings());
        ledger
            .state_mut()
            .record(&MarketId::new("USD_BTS"), OrderId::new("1.7.1"));

        ledger.store().unwrap();

        assert_eq!(store.get("maker").unwrap().order_count(), 1);
    }

    #[test]
    fn test_store_is_noop_in_safe_mode() {
        let store = Arc::new(MemoryStore::new());
        let safe = settings().with_persistence(false);
        let mut ledger = open_with(store.clone(), &safe);
        ledger
            .state_mut()
            .record(&MarketId::new("USD_BTS"), OrderId::new("1.7.1"));

        for _ in 0..3 {
            ledger.store().unwrap();
        }

        assert!(store.get("maker").is_none());
        assert_eq!(store.save_count(), 0);
    }
}
