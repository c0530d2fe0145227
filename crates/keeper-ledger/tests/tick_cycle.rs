//! Full tick cycles against the paper exchange with a JSON file store.
//!
//! Two bot instances share one exchange account and one state directory.

use std::sync::Arc;

use keeper_core::{Amount, MarketId, OrderId, Price, SideFilter};
use keeper_gateway::PaperGateway;
use keeper_ledger::{BotSettings, LedgerEngine, LedgerResult, OrderEvents, Strategy};
use keeper_persistence::JsonFileStore;
use keeper_telemetry::RecordingSink;
use rust_decimal_macros::dec;
use tempfile::TempDir;

/// Places one buy per served market during `place` and on every tick.
#[derive(Debug, Default)]
struct Buyer {
    buy_on_tick: bool,
    filled: Vec<OrderId>,
    placed: Vec<OrderId>,
    canceled: Vec<OrderId>,
}

impl Buyer {
    fn buy_everywhere(engine: &mut LedgerEngine) {
        let markets = engine.settings().markets.clone();
        for market in &markets {
            assert!(engine.buy(market, Price::new(dec!(300)), Amount::new(dec!(1))));
        }
    }
}

impl OrderEvents for Buyer {
    fn on_order_filled(&mut self, _market: &MarketId, id: &OrderId) {
        self.filled.push(id.clone());
    }

    fn on_order_placed(&mut self, _market: &MarketId, id: &OrderId) {
        self.placed.push(id.clone());
    }

    fn on_order_canceled(&mut self, id: &OrderId) {
        self.canceled.push(id.clone());
    }
}

impl Strategy for Buyer {
    fn place(&mut self, engine: &mut LedgerEngine) -> LedgerResult<()> {
        Self::buy_everywhere(engine);
        Ok(())
    }

    fn tick(&mut self, engine: &mut LedgerEngine) -> LedgerResult<()> {
        if self.buy_on_tick {
            Self::buy_everywhere(engine);
        }
        Ok(())
    }
}

fn usd() -> MarketId {
    MarketId::new("USD_BTS")
}

fn eur() -> MarketId {
    MarketId::new("EUR_BTS")
}

fn id(s: &str) -> OrderId {
    OrderId::new(s)
}

fn engine(
    name: &str,
    markets: Vec<MarketId>,
    paper: &Arc<PaperGateway>,
    store: &Arc<JsonFileStore>,
) -> LedgerEngine {
    LedgerEngine::new(
        BotSettings::new(name, markets),
        paper.clone(),
        store.clone(),
        Arc::new(RecordingSink::new()),
    )
    .unwrap()
}

#[test]
fn test_bots_sharing_an_account_only_own_their_orders() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(temp_dir.path()).unwrap());
    let paper = Arc::new(PaperGateway::new());

    let mut alpha = engine("alpha", vec![usd()], &paper, &store);
    let mut beta = engine("beta", vec![usd(), eur()], &paper, &store);
    let mut alpha_strategy = Buyer::default();
    let mut beta_strategy = Buyer::default();

    assert!(alpha.start(&mut alpha_strategy).is_clean());
    assert!(beta.start(&mut beta_strategy).is_clean());

    // alpha placed 1.7.1; beta placed 1.7.2 (USD) and 1.7.3 (EUR)
    assert_eq!(alpha.my_orders()[&usd()], vec![id("1.7.1")]);
    assert_eq!(beta.my_orders()[&usd()], vec![id("1.7.2")]);
    assert_eq!(beta.my_orders()[&eur()], vec![id("1.7.3")]);
    assert_eq!(alpha_strategy.placed, vec![id("1.7.1")]);
    assert_eq!(beta_strategy.placed, vec![id("1.7.2"), id("1.7.3")]);

    // beta cancels its own orders; alpha's order stays live
    let attempted = beta
        .cancel_mine(None, SideFilter::Both, &mut beta_strategy)
        .unwrap();
    assert_eq!(attempted, 2);
    assert_eq!(paper.open_ids_in(&usd()), vec![id("1.7.1")]);
    assert!(paper.open_ids_in(&eur()).is_empty());

    // Neither bot mistakes the other's activity for its own
    let alpha_tick = alpha.run_tick(&mut alpha_strategy);
    let beta_tick = beta.run_tick(&mut beta_strategy);
    assert_eq!((alpha_tick.filled, alpha_tick.adopted), (0, 0));
    assert_eq!((beta_tick.filled, beta_tick.adopted), (0, 0));
    assert_eq!(alpha.ledger().state().order_count(), 1);
    assert_eq!(beta.ledger().state().order_count(), 0);
}

#[test]
fn test_fills_and_placements_across_ticks() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(temp_dir.path()).unwrap());
    let paper = Arc::new(PaperGateway::new());
    let mut bot = engine("maker", vec![usd()], &paper, &store);
    let mut strategy = Buyer {
        buy_on_tick: true,
        ..Buyer::default()
    };

    bot.start(&mut strategy);
    bot.run_tick(&mut strategy);
    assert_eq!(bot.my_orders()[&usd()], vec![id("1.7.1"), id("1.7.2")]);

    assert!(paper.fill(&id("1.7.1")));
    let report = bot.run_tick(&mut strategy);

    assert!(report.is_clean());
    assert_eq!((report.filled, report.adopted), (1, 1));
    assert_eq!(strategy.filled, vec![id("1.7.1")]);
    assert_eq!(bot.my_orders()[&usd()], vec![id("1.7.2"), id("1.7.3")]);
}

#[test]
fn test_restart_restores_and_silently_drops_fills_while_down() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(temp_dir.path()).unwrap());
    let paper = Arc::new(PaperGateway::new());

    {
        let mut bot = engine("maker", vec![usd(), eur()], &paper, &store);
        bot.start(&mut Buyer::default());
        assert_eq!(bot.ledger().state().order_count(), 2);
    }

    // Persisted envelope names the bot
    let raw = std::fs::read_to_string(temp_dir.path().join("maker.json")).unwrap();
    let document: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(document["bot"], "maker");
    assert_eq!(document["state"]["orders"]["USD_BTS"][0], "1.7.1");

    // One order fills while the bot is down
    assert!(paper.fill(&id("1.7.2")));

    let mut bot = engine("maker", vec![usd(), eur()], &paper, &store);
    assert_eq!(bot.ledger().state().order_count(), 2);

    let mut strategy = Buyer::default();
    // Start-up reconciles silently, then places again
    let report = bot.start(&mut strategy);

    assert_eq!(report.filled, 1);
    assert!(strategy.filled.is_empty());
    assert_eq!(bot.my_orders()[&usd()], vec![id("1.7.1"), id("1.7.3")]);
    assert_eq!(bot.my_orders()[&eur()], vec![id("1.7.4")]);
}

#[test]
fn test_cancel_all_reaches_other_bots_orders() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(temp_dir.path()).unwrap());
    let paper = Arc::new(PaperGateway::new());
    let mut alpha = engine("alpha", vec![usd()], &paper, &store);
    let mut beta = engine("beta", vec![usd()], &paper, &store);
    alpha.start(&mut Buyer::default());
    beta.start(&mut Buyer::default());

    let attempted = beta
        .cancel_all(None, SideFilter::Both, &mut Buyer::default())
        .unwrap();

    assert_eq!(attempted, 2);
    assert!(paper.open_ids_in(&usd()).is_empty());

    // alpha learns about it as a fill on its next tick
    let mut alpha_strategy = Buyer::default();
    let report = alpha.run_tick(&mut alpha_strategy);
    assert_eq!(report.filled, 1);
    assert_eq!(alpha_strategy.filled, vec![id("1.7.1")]);
}
