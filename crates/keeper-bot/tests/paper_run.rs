//! End-to-end runs of the application against the paper exchange.

use keeper_bot::{AppConfig, Application};
use keeper_core::{Amount, MarketId};
use rust_decimal_macros::dec;
use tempfile::TempDir;

fn config_for(state_dir: &std::path::Path, safe_mode: bool) -> AppConfig {
    let toml = format!(
        r#"
safe_mode = {safe_mode}
state_dir = "{}"
tick_interval_ms = 1

[reserves]
BTS = "1000"

[bots.maker]
markets = ["USD_BTS", "EUR_BTS"]

[strategy]
center_price = "300"
spread_bps = "100"
amount = "1"

[paper]
fill_every_ticks = 2

[paper.balances]
BTS = "5000"
USD = "10"
"#,
        state_dir.display()
    );
    AppConfig::from_toml(&toml).unwrap()
}

#[test]
fn test_start_places_walls_in_every_market() {
    let temp_dir = TempDir::new().unwrap();
    let mut app = Application::new(config_for(temp_dir.path(), false), "maker").unwrap();

    let report = app.start();

    assert!(report.is_clean());
    assert_eq!(report.adopted, 4);
    assert_eq!(app.engine().lifecycle().name(), "monitoring");
    assert_eq!(app.paper().open_ids_in(&MarketId::new("USD_BTS")).len(), 2);
    assert!(temp_dir.path().join("maker.json").exists());

    let balances = app.engine().balances().unwrap();
    assert_eq!(balances["BTS"], Amount::new(dec!(4000)));
    assert_eq!(balances["USD"], Amount::new(dec!(10)));
}

#[test]
fn test_filled_wall_is_replaced() {
    let temp_dir = TempDir::new().unwrap();
    let mut app = Application::new(config_for(temp_dir.path(), false), "maker").unwrap();
    app.start();

    let first = app.tick();
    assert_eq!((first.filled, first.adopted), (0, 0));

    // Tick 2 fills the oldest own order before reconciling; the strategy
    // cancels the surviving wall of that market and places a fresh pair
    let second = app.tick();

    assert!(second.is_clean());
    assert_eq!((second.filled, second.adopted), (1, 2));
    assert_eq!(app.strategy().fills(), 1);
    assert_eq!(app.engine().lifecycle().counter(), 2);
    assert!(app.strategy().pending_refill().is_empty());
    assert_eq!(app.engine().ledger().state().order_count(), 4);
    assert_eq!(app.paper().open_ids_in(&MarketId::new("EUR_BTS")).len(), 2);
}

#[test]
fn test_restart_keeps_ownership() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut app = Application::new(config_for(temp_dir.path(), false), "maker").unwrap();
        app.start();
        app.shutdown().unwrap();
    }

    let app = Application::new(config_for(temp_dir.path(), false), "maker").unwrap();

    assert_eq!(app.engine().ledger().state().order_count(), 4);
}

#[test]
fn test_safe_mode_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let state_dir = temp_dir.path().join("state");
    let mut app = Application::new(config_for(&state_dir, true), "maker").unwrap();

    app.start();
    for _ in 0..4 {
        app.tick();
    }
    app.shutdown().unwrap();

    assert!(!state_dir.exists());
}

#[test]
fn test_unknown_bot_fails_construction() {
    let temp_dir = TempDir::new().unwrap();
    assert!(Application::new(config_for(temp_dir.path(), false), "ghost").is_err());
}

#[tokio::test]
async fn test_run_stops_after_tick_limit() {
    let temp_dir = TempDir::new().unwrap();
    let mut app = Application::new(config_for(temp_dir.path(), false), "maker").unwrap();

    app.run(Some(3)).await.unwrap();

    assert_eq!(app.ticks_run(), 3);
    assert!(app.strategy().fills() >= 1);
}
