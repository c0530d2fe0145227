//! Prometheus counters for the order ledger.
//!
//! All counters are labelled by bot name so several bot instances in one
//! process can be told apart.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means duplicate metric
//! names, a startup-time programming error that should crash immediately.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

use crate::error::TelemetryResult;

/// Orders detected as filled by reconciliation.
pub static ORDERS_FILLED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "keeper_orders_filled_total",
        "Owned orders detected as filled by reconciliation",
        &["bot"]
    )
    .unwrap()
});

/// Orders adopted into the ledger by the bookkeeping pass.
pub static ORDERS_PLACED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "keeper_orders_placed_total",
        "Orders adopted into the ledger after placement",
        &["bot"]
    )
    .unwrap()
});

/// Cancel requests issued to the gateway.
pub static CANCEL_ATTEMPTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "keeper_cancel_attempts_total",
        "Cancel requests issued to the exchange gateway",
        &["bot"]
    )
    .unwrap()
});

/// Cancel requests the gateway reported as failed.
pub static CANCEL_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "keeper_cancel_failures_total",
        "Cancel requests that failed at the exchange gateway",
        &["bot"]
    )
    .unwrap()
});

/// Gateway errors outside of cancellation.
/// Labels: bot, operation (list_open_orders/place_order/balances)
pub static GATEWAY_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "keeper_gateway_errors_total",
        "Exchange gateway errors by operation",
        &["bot", "operation"]
    )
    .unwrap()
});

/// Ledger writes to the persistent store.
pub static STATE_STORES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "keeper_state_stores_total",
        "Ledger documents written to the persistent store",
        &["bot"]
    )
    .unwrap()
});

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    pub fn order_filled(bot: &str) {
        ORDERS_FILLED_TOTAL.with_label_values(&[bot]).inc();
    }

    pub fn order_placed(bot: &str) {
        ORDERS_PLACED_TOTAL.with_label_values(&[bot]).inc();
    }

    pub fn cancel_attempted(bot: &str) {
        CANCEL_ATTEMPTS_TOTAL.with_label_values(&[bot]).inc();
    }

    pub fn cancel_failed(bot: &str) {
        CANCEL_FAILURES_TOTAL.with_label_values(&[bot]).inc();
    }

    pub fn gateway_error(bot: &str, operation: &str) {
        GATEWAY_ERRORS_TOTAL
            .with_label_values(&[bot, operation])
            .inc();
    }

    pub fn state_stored(bot: &str) {
        STATE_STORES_TOTAL.with_label_values(&[bot]).inc();
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_labelled_by_bot() {
        Metrics::order_filled("metrics-test-a");
        Metrics::order_filled("metrics-test-a");
        Metrics::order_filled("metrics-test-b");

        assert_eq!(
            ORDERS_FILLED_TOTAL
                .with_label_values(&["metrics-test-a"])
                .get(),
            2
        );
        assert_eq!(
            ORDERS_FILLED_TOTAL
                .with_label_values(&["metrics-test-b"])
                .get(),
            1
        );
    }

    #[test]
    fn test_render_contains_registered_counters() {
        Metrics::gateway_error("metrics-test-render", "place_order");
        let text = Metrics::render().unwrap();
        assert!(text.contains("keeper_gateway_errors_total"));
    }
}
