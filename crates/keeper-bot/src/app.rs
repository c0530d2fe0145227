//! Main application orchestration.
//!
//! Wires one bot instance together:
//! - Paper exchange gateway seeded from the config
//! - JSON file state store (in-memory in safe mode without a state dir)
//! - Tracing event sink feeding the Prometheus counters
//! - Ledger engine driving the wall strategy once per tick

use std::sync::Arc;
use std::time::Duration;

use keeper_core::{OrderId, SideFilter};
use keeper_gateway::PaperGateway;
use keeper_ledger::{LedgerEngine, TickReport};
use keeper_persistence::{JsonFileStore, MemoryStore, StateStore};
use keeper_telemetry::{Metrics, TracingSink};
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::strategy::WallStrategy;

/// Main application.
pub struct Application {
    config: AppConfig,
    engine: LedgerEngine,
    paper: Arc<PaperGateway>,
    strategy: WallStrategy,
    ticks_run: u64,
    started: bool,
}

impl Application {
    /// Create the application for bot `bot`.
    ///
    /// Fails on invalid bot settings or unreadable stored state.
    pub fn new(config: AppConfig, bot: &str) -> AppResult<Self> {
        let settings = config.bot_settings(bot)?;

        let paper = Arc::new(PaperGateway::new());
        for (asset, amount) in &config.paper.balances {
            paper.set_balance(asset, *amount);
        }

        let store = Self::open_store(&config)?;
        let engine = LedgerEngine::new(settings, paper.clone(), store, Arc::new(TracingSink))?;
        let strategy = WallStrategy::new(config.strategy.clone());

        Ok(Self {
            config,
            engine,
            paper,
            strategy,
            ticks_run: 0,
            started: false,
        })
    }

    /// Safe mode never creates the state directory; it still reads state
    /// left by earlier runs when the directory exists.
    fn open_store(config: &AppConfig) -> AppResult<Arc<dyn StateStore>> {
        if config.safe_mode && !config.state_dir.is_dir() {
            info!("Safe mode without state directory, using in-memory store");
            return Ok(Arc::new(MemoryStore::new()));
        }
        Ok(Arc::new(JsonFileStore::new(&config.state_dir)?))
    }

    pub fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    pub fn paper(&self) -> &PaperGateway {
        &self.paper
    }

    pub fn strategy(&self) -> &WallStrategy {
        &self.strategy
    }

    pub fn ticks_run(&self) -> u64 {
        self.ticks_run
    }

    /// Start-up pass: reconcile, init, place, bookkeeping.
    pub fn start(&mut self) -> TickReport {
        let report = self.engine.start(&mut self.strategy);
        self.started = true;

        match self.engine.balances() {
            Ok(balances) => info!(bot = %self.engine.name(), ?balances, "Available balances"),
            Err(e) => warn!(bot = %self.engine.name(), error = %e, "Balances unavailable"),
        }
        report
    }

    /// One tick, preceded by a simulated paper fill when due.
    pub fn tick(&mut self) -> TickReport {
        self.ticks_run += 1;
        self.simulate_fill();
        self.engine.run_tick(&mut self.strategy)
    }

    fn simulate_fill(&self) {
        let every = self.config.paper.fill_every_ticks;
        if every == 0 || self.ticks_run % every != 0 {
            return;
        }

        let oldest: Option<OrderId> = self
            .engine
            .my_orders()
            .into_values()
            .flatten()
            .next();
        if let Some(id) = oldest {
            if self.paper.fill(&id) {
                info!(order_id = %id, tick = self.ticks_run, "Simulated paper fill");
            }
        }
    }

    /// Run until Ctrl-C or until `max_ticks` ticks have completed.
    pub async fn run(&mut self, max_ticks: Option<u64>) -> AppResult<()> {
        if !self.started {
            self.start();
        }

        let period = Duration::from_millis(self.config.tick_interval_ms.max(1));
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately; start-up already ran.
        interval.tick().await;

        info!(
            bot = %self.engine.name(),
            interval_ms = self.config.tick_interval_ms,
            ?max_ticks,
            "Entering tick loop"
        );

        loop {
            if max_ticks.is_some_and(|max| self.ticks_run >= max) {
                info!(ticks = self.ticks_run, "Tick limit reached");
                break;
            }

            tokio::select! {
                _ = interval.tick() => {
                    let report = self.tick();
                    if !report.is_clean() {
                        error!(tick = self.ticks_run, errors = ?report.errors, "Tick failed");
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown()
    }

    /// Optionally cancel own orders, persist, and dump the metrics.
    pub fn shutdown(&mut self) -> AppResult<()> {
        if self.config.cancel_on_shutdown {
            match self
                .engine
                .cancel_mine(None, SideFilter::Both, &mut self.strategy)
            {
                Ok(canceled) => info!(canceled, "Canceled own orders"),
                Err(e) => warn!(error = %e, "Failed to cancel own orders"),
            }
        }
        self.engine.ledger().store()?;

        info!(
            bot = %self.engine.name(),
            ticks = self.ticks_run,
            fills = self.strategy.fills(),
            orders = self.engine.ledger().state().order_count(),
            "Shutting down"
        );
        match Metrics::render() {
            Ok(text) => debug!("Final metrics:\n{text}"),
            Err(e) => warn!(error = %e, "Failed to render metrics"),
        }
        Ok(())
    }
}
