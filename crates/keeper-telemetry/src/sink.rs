//! Diagnostic sink for ledger events.
//!
//! The ledger reports everything it does to an injected [`EventSink`] instead
//! of logging through ambient global state. Production code uses
//! [`TracingSink`], which turns events into structured `tracing` records and
//! Prometheus counter updates. Tests use [`RecordingSink`] to assert on the
//! exact events emitted.

use keeper_core::{MarketId, OrderId};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::metrics::Metrics;

/// Something the ledger did or observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    /// State loaded at startup. `fresh` is true when nothing was stored yet.
    Restored { orders: usize, fresh: bool },
    /// State written to the persistent store.
    Stored { orders: usize },
    /// Store skipped because persistence is disabled.
    StoreSkipped,
    /// An owned order is no longer open on the exchange.
    Filled { market: MarketId, id: OrderId },
    /// A new open order was adopted into the ledger.
    Placed { market: MarketId, id: OrderId },
    /// A cancel request was issued and accepted by the gateway.
    Canceled { id: OrderId },
    /// A cancel request was issued and the gateway reported a failure.
    CancelFailed { id: OrderId, error: String },
    /// A placement request failed at the gateway.
    PlacementFailed { market: MarketId, error: String },
    /// A served market with owned orders was absent from the live snapshot.
    MarketMissingFromSnapshot { market: MarketId },
    /// A gateway call other than cancel/place failed.
    GatewayFailure {
        operation: &'static str,
        error: String,
    },
    /// The lifecycle state machine moved to a new state.
    StateChanged { from: String, to: String },
}

impl LedgerEvent {
    /// Short label for grouping events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Restored { .. } => "restored",
            Self::Stored { .. } => "stored",
            Self::StoreSkipped => "store_skipped",
            Self::Filled { .. } => "filled",
            Self::Placed { .. } => "placed",
            Self::Canceled { .. } => "canceled",
            Self::CancelFailed { .. } => "cancel_failed",
            Self::PlacementFailed { .. } => "placement_failed",
            Self::MarketMissingFromSnapshot { .. } => "market_missing",
            Self::GatewayFailure { .. } => "gateway_failure",
            Self::StateChanged { .. } => "state_changed",
        }
    }
}

/// Receiver of ledger diagnostics.
pub trait EventSink: Send + Sync {
    /// Record `event` emitted by the bot named `bot`.
    fn emit(&self, bot: &str, event: LedgerEvent);
}

/// Sink that writes structured logs and updates Prometheus counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, bot: &str, event: LedgerEvent) {
        match event {
            LedgerEvent::Restored { orders, fresh } => {
                info!(bot, orders, fresh, "Ledger restored");
            }
            LedgerEvent::Stored { orders } => {
                Metrics::state_stored(bot);
                debug!(bot, orders, "Ledger stored");
            }
            LedgerEvent::StoreSkipped => {
                debug!(bot, "Persistence disabled, ledger kept in memory only");
            }
            LedgerEvent::Filled { market, id } => {
                Metrics::order_filled(bot);
                info!(bot, market = %market, order_id = %id, "Order filled");
            }
            LedgerEvent::Placed { market, id } => {
                Metrics::order_placed(bot);
                info!(bot, market = %market, order_id = %id, "Order adopted");
            }
            LedgerEvent::Canceled { id } => {
                Metrics::cancel_attempted(bot);
                info!(bot, order_id = %id, "Order canceled");
            }
            LedgerEvent::CancelFailed { id, error } => {
                Metrics::cancel_attempted(bot);
                Metrics::cancel_failed(bot);
                error!(bot, order_id = %id, error = %error, "Cancel failed");
            }
            LedgerEvent::PlacementFailed { market, error } => {
                Metrics::gateway_error(bot, "place_order");
                error!(bot, market = %market, error = %error, "Order placement failed");
            }
            LedgerEvent::MarketMissingFromSnapshot { market } => {
                warn!(
                    bot,
                    market = %market,
                    "Market absent from open-order snapshot, treating as no open orders"
                );
            }
            LedgerEvent::GatewayFailure { operation, error } => {
                Metrics::gateway_error(bot, operation);
                error!(bot, operation, error = %error, "Gateway call failed");
            }
            LedgerEvent::StateChanged { from, to } => {
                debug!(bot, from = %from, to = %to, "Changing state");
            }
        }
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, LedgerEvent)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    /// Recorded events whose [`LedgerEvent::kind`] is `kind`.
    pub fn events_of(&self, kind: &str) -> Vec<LedgerEvent> {
        self.events
            .lock()
            .iter()
            .filter(|(_, e)| e.kind() == kind)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Names of the bots that emitted events, oldest first.
    pub fn bots(&self) -> Vec<String> {
        self.events.lock().iter().map(|(b, _)| b.clone()).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, bot: &str, event: LedgerEvent) {
        self.events.lock().push((bot.to_string(), event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_filters_by_kind() {
        let sink = RecordingSink::new();
        sink.emit("maker", LedgerEvent::StoreSkipped);
        sink.emit(
            "maker",
            LedgerEvent::Filled {
                market: MarketId::new("USD_BTS"),
                id: OrderId::new("1.7.1"),
            },
        );

        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.events_of("filled").len(), 1);
        assert_eq!(sink.bots(), vec!["maker".to_string(), "maker".to_string()]);

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_tracing_sink_accepts_every_event() {
        let sink = TracingSink;
        sink.emit(
            "sink-test",
            LedgerEvent::CancelFailed {
                id: OrderId::new("1.7.1"),
                error: "refused".to_string(),
            },
        );
        sink.emit(
            "sink-test",
            LedgerEvent::GatewayFailure {
                operation: "list_open_orders",
                error: "timeout".to_string(),
            },
        );
    }
}
