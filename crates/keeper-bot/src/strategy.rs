//! Paper wall strategy.
//!
//! Keeps one buy wall below and one sell wall above a per-market center
//! price. When either wall of a market fills, the remaining own orders of
//! that market are canceled and both walls are placed again in the strategy
//! phase of the same tick.
//!
//! Lifecycle: `waiting` → `placing` (during init/place) → `monitoring`.

use std::collections::BTreeSet;

use keeper_core::{MarketId, OrderId, Price, SideFilter};
use keeper_ledger::{LedgerEngine, LedgerResult, OrderEvents, Strategy};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::WallConfig;

const CENTER_KEY: &str = "center";
const FILLS_KEY: &str = "fills";

/// Buy and sell wall around a center price, per served market.
#[derive(Debug)]
pub struct WallStrategy {
    config: WallConfig,
    /// Markets whose walls must be replaced.
    refill: BTreeSet<MarketId>,
    fills: u64,
}

impl WallStrategy {
    pub fn new(config: WallConfig) -> Self {
        Self {
            config,
            refill: BTreeSet::new(),
            fills: 0,
        }
    }

    /// Fills observed since start.
    pub fn fills(&self) -> u64 {
        self.fills
    }

    /// Markets waiting for their walls to be replaced.
    pub fn pending_refill(&self) -> &BTreeSet<MarketId> {
        &self.refill
    }

    /// Wall prices `(buy, sell)` around `center`.
    pub fn wall_prices(&self, center: Price) -> (Price, Price) {
        let offset = self.config.spread_bps / Decimal::from(10_000);
        let center = center.inner();
        (
            Price::new(center * (Decimal::ONE - offset)),
            Price::new(center * (Decimal::ONE + offset)),
        )
    }

    fn center(&self, engine: &mut LedgerEngine, market: &MarketId) -> Price {
        engine
            .get(market, CENTER_KEY)
            .and_then(|value| value.as_str())
            .and_then(|raw| raw.parse::<Price>().ok())
            .unwrap_or(self.config.center_price)
    }

    fn place_walls(&self, engine: &mut LedgerEngine, market: &MarketId) -> usize {
        let (buy, sell) = self.wall_prices(self.center(engine, market));
        let placed = [
            engine.buy(market, buy, self.config.amount),
            engine.sell(market, sell, self.config.amount),
        ];
        placed.iter().filter(|ok| **ok).count()
    }
}

impl OrderEvents for WallStrategy {
    fn on_order_filled(&mut self, market: &MarketId, id: &OrderId) {
        info!(market = %market, order_id = %id, "Wall filled");
        self.fills += 1;
        self.refill.insert(market.clone());
    }

    fn on_order_placed(&mut self, market: &MarketId, id: &OrderId) {
        debug!(market = %market, order_id = %id, "Wall adopted");
    }
}

impl Strategy for WallStrategy {
    fn init(&mut self, engine: &mut LedgerEngine) -> LedgerResult<()> {
        engine.change_state("placing");
        let markets = engine.settings().markets.clone();
        for market in &markets {
            if engine.get(market, CENTER_KEY).is_none() {
                engine.set(market, CENTER_KEY, self.config.center_price.to_string());
            }
        }
        Ok(())
    }

    fn place(&mut self, engine: &mut LedgerEngine) -> LedgerResult<()> {
        let mine = engine.my_orders();
        for (market, ids) in &mine {
            if ids.is_empty() {
                let placed = self.place_walls(engine, market);
                debug!(market = %market, placed, "Initial walls");
            } else {
                debug!(market = %market, orders = ids.len(), "Walls already resting");
            }
        }
        engine.change_state("monitoring");
        Ok(())
    }

    fn tick(&mut self, engine: &mut LedgerEngine) -> LedgerResult<()> {
        engine.lifecycle_mut().increment_counter();
        let markets = std::mem::take(&mut self.refill);
        for market in &markets {
            let market_list = std::slice::from_ref(market);
            let canceled = engine.cancel_mine(Some(market_list), SideFilter::Both, self)?;
            let placed = self.place_walls(engine, market);

            let fills = engine
                .get(market, FILLS_KEY)
                .and_then(|value| value.as_u64())
                .unwrap_or(0);
            engine.set(market, FILLS_KEY, fills + 1);

            info!(market = %market, canceled, placed, "Walls replaced");
        }
        Ok(())
    }
}
