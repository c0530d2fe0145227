//! Ledger engine: reconciliation, bookkeeping and cancellation.
//!
//! Ties the [`OrderLedger`] to the exchange gateway for one bot instance.
//! A tick runs in a fixed order:
//!
//! 1. [`LedgerEngine::reconcile`]: drop owned ids the exchange no longer
//!    reports as open (fills) and take the tick's baseline snapshot.
//! 2. Strategy logic, which may place and cancel orders.
//! 3. [`LedgerEngine::finish_tick`]: adopt ids that appeared since the
//!    baseline, then persist.
//!
//! Ownership is the only safety mechanism between bot instances sharing an
//! account: nothing here mutates or cancels an order it did not record,
//! except the explicit `All`/`ServedMarkets` cancellation scopes.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use keeper_core::{Amount, MarketId, OrderId, OrderRequest, OrderSide, Price, SideFilter};
use keeper_gateway::{ExchangeGateway, GatewayError, GatewayResult, OpenOrderIds};
use keeper_persistence::StateStore;
use keeper_telemetry::{EventSink, LedgerEvent};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cancel::{self, CancelScope};
use crate::error::LedgerResult;
use crate::hooks::{OrderEvents, Strategy};
use crate::ledger::OrderLedger;
use crate::lifecycle::Lifecycle;
use crate::settings::BotSettings;

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Owned ids found no longer open, with their market.
    pub filled: Vec<(MarketId, OrderId)>,
    /// Served markets with owned ids that were absent from the snapshot.
    pub missing_markets: Vec<MarketId>,
}

/// Outcome of the end-of-tick bookkeeping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookkeepingReport {
    /// Ids adopted into the ledger, with their market.
    pub adopted: Vec<(MarketId, OrderId)>,
    /// The open-order listing failed, so nothing was adopted.
    pub listing_failed: bool,
}

/// Outcome of one full tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub filled: usize,
    pub adopted: usize,
    /// Errors caught at the tick boundary, in order of occurrence.
    pub errors: Vec<String>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Order ledger engine for one bot instance.
pub struct LedgerEngine {
    settings: BotSettings,
    ledger: OrderLedger,
    gateway: Arc<dyn ExchangeGateway>,
    sink: Arc<dyn EventSink>,
    /// Open ids at the start of the current tick.
    previously_open: Option<OpenOrderIds>,
    /// The last bookkeeping pass could not list open orders, so the next
    /// reconciliation keeps `previously_open` instead of replacing it.
    carry_baseline: bool,
    lifecycle: Lifecycle,
}

impl std::fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("settings", &self.settings)
            .field("ledger", &self.ledger)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl LedgerEngine {
    /// Validate `settings` and open the ledger.
    ///
    /// Fails fast on invalid settings or unreadable stored state; nothing is
    /// partially initialized.
    pub fn new(
        settings: BotSettings,
        gateway: Arc<dyn ExchangeGateway>,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn EventSink>,
    ) -> LedgerResult<Self> {
        settings.validate()?;
        let ledger = OrderLedger::open(&settings, store, sink.clone())?;

        info!(
            bot = %settings.name,
            markets = ?settings.markets,
            persist = settings.persist,
            "Ledger engine ready"
        );

        Ok(Self {
            settings,
            ledger,
            gateway,
            sink,
            previously_open: None,
            carry_baseline: false,
            lifecycle: Lifecycle::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &OrderLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut OrderLedger {
        &mut self.ledger
    }

    /// Recorded ids for every served market, without a gateway call.
    pub fn my_orders(&self) -> BTreeMap<MarketId, Vec<OrderId>> {
        self.ledger.my_orders()
    }

    /// Strategy attribute of `market`. See [`OrderLedger::get`].
    pub fn get(&mut self, market: &MarketId, key: &str) -> Option<&Value> {
        self.ledger.get(market, key)
    }

    /// Set a strategy attribute of `market`. See [`OrderLedger::set`].
    pub fn set(&mut self, market: &MarketId, key: impl Into<String>, value: impl Into<Value>) {
        self.ledger.set(market, key, value);
    }

    /// Open ids captured by the last reconciliation, if any.
    pub fn previously_open(&self) -> Option<&OpenOrderIds> {
        self.previously_open.as_ref()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    /// Move the lifecycle to `name`, resetting its counter.
    pub fn change_state(&mut self, name: impl Into<String>) {
        let to: String = name.into();
        let from = self.lifecycle.change_state(to.clone());
        self.sink
            .emit(&self.settings.name, LedgerEvent::StateChanged { from, to });
    }

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    /// Compare owned ids against the exchange and drop the ones no longer
    /// open, calling `on_order_filled` for each if `notify_fills` is set.
    ///
    /// Never adopts ids it has not recorded. Running it twice against an
    /// unchanged exchange changes nothing the second time. The fetched
    /// snapshot becomes the baseline for [`finish_tick`](Self::finish_tick),
    /// unless the previous bookkeeping pass failed to list open orders: then
    /// the older baseline is kept so orders placed since are still adopted.
    ///
    /// If the listing fails nothing is mutated, the baseline is kept and the
    /// gateway error is returned.
    pub fn reconcile(
        &mut self,
        notify_fills: bool,
        events: &mut dyn OrderEvents,
    ) -> LedgerResult<ReconcileReport> {
        let live = match self.gateway.open_order_ids(&self.settings.markets) {
            Ok(live) => live,
            Err(e) => {
                self.gateway_failure("list_open_orders", &e);
                return Err(e.into());
            }
        };

        let mut report = ReconcileReport::default();
        for market in &self.settings.markets {
            let owned = self.ledger.state().orders_in(market).to_vec();
            if owned.is_empty() {
                continue;
            }

            let live_ids: HashSet<&OrderId> = match live.get(market) {
                Some(ids) => ids.iter().collect(),
                None => {
                    self.sink.emit(
                        &self.settings.name,
                        LedgerEvent::MarketMissingFromSnapshot {
                            market: market.clone(),
                        },
                    );
                    report.missing_markets.push(market.clone());
                    HashSet::new()
                }
            };

            for id in owned {
                if live_ids.contains(&id) {
                    continue;
                }
                self.ledger.state_mut().remove(market, &id);
                self.sink.emit(
                    &self.settings.name,
                    LedgerEvent::Filled {
                        market: market.clone(),
                        id: id.clone(),
                    },
                );
                if notify_fills {
                    events.on_order_filled(market, &id);
                }
                report.filled.push((market.clone(), id));
            }
        }

        if self.carry_baseline && self.previously_open.is_some() {
            debug!(bot = %self.settings.name, "Keeping baseline from unfinished bookkeeping");
        } else {
            self.previously_open = Some(live);
        }
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Bookkeeping
    // ------------------------------------------------------------------

    /// Adopt ids that appeared since the tick's baseline, then persist.
    ///
    /// Every served market gets an order list. Each id open now but absent
    /// from the baseline is recorded and reported via `on_order_placed`.
    /// Without a baseline nothing is adopted. A failed listing skips adoption
    /// but still persists, and the baseline carries over to the next tick.
    pub fn finish_tick(&mut self, events: &mut dyn OrderEvents) -> LedgerResult<BookkeepingReport> {
        self.ledger.ensure_served_markets();

        let mut report = BookkeepingReport::default();
        let listing = self.gateway.open_order_ids(&self.settings.markets);
        self.carry_baseline = listing.is_err();
        match listing {
            Ok(now) => match self.previously_open.as_ref() {
                Some(baseline) => {
                    for market in &self.settings.markets {
                        let Some(current) = now.get(market) else {
                            continue;
                        };
                        let before: HashSet<&OrderId> = baseline
                            .get(market)
                            .map(|ids| ids.iter().collect())
                            .unwrap_or_default();

                        for id in current {
                            if before.contains(id) {
                                continue;
                            }
                            if !self.ledger.state_mut().record(market, id.clone()) {
                                continue;
                            }
                            self.sink.emit(
                                &self.settings.name,
                                LedgerEvent::Placed {
                                    market: market.clone(),
                                    id: id.clone(),
                                },
                            );
                            events.on_order_placed(market, id);
                            report.adopted.push((market.clone(), id.clone()));
                        }
                    }
                }
                None => {
                    debug!(bot = %self.settings.name, "No baseline snapshot, skipping adoption");
                }
            },
            Err(e) => {
                self.gateway_failure("list_open_orders", &e);
                report.listing_failed = true;
            }
        }

        self.ledger.store()?;
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------

    /// Ids a cancellation under `scope` would cover right now.
    ///
    /// `markets` defaults to the served markets. Under `Mine` only ids that
    /// are both live and recorded in the ledger are returned, so stale ledger
    /// ids never reach the gateway.
    pub fn plan_cancellation(
        &self,
        scope: CancelScope,
        markets: Option<&[MarketId]>,
        side: SideFilter,
    ) -> LedgerResult<BTreeSet<OrderId>> {
        let targets = cancel::target_markets(scope, markets, &self.settings.markets);
        if targets.is_empty() {
            return Ok(BTreeSet::new());
        }

        let live = self.gateway.open_orders(&targets).map_err(|e| {
            self.gateway_failure("list_open_orders", &e);
            e
        })?;

        let planned = cancel::select(scope, &targets, &live, self.ledger.state(), side);
        debug!(
            bot = %self.settings.name,
            scope = %scope,
            side = %side,
            markets = ?targets,
            count = planned.len(),
            "Planned cancellation"
        );
        Ok(planned)
    }

    /// Issue a cancel for every id and return the number attempted.
    ///
    /// A failed cancel is reported and the batch continues. After every
    /// attempt `on_order_canceled` runs and the id is removed from every
    /// market list in the ledger; the next reconciliation confirms the rest.
    pub fn execute_cancellation<I>(&mut self, ids: I, events: &mut dyn OrderEvents) -> usize
    where
        I: IntoIterator<Item = OrderId>,
    {
        let mut attempted = 0;
        for id in ids {
            info!(bot = %self.settings.name, order_id = %id, "Canceling");
            let event = match self.gateway.cancel_order(&id) {
                Ok(()) => LedgerEvent::Canceled { id: id.clone() },
                Err(e) => LedgerEvent::CancelFailed {
                    id: id.clone(),
                    error: e.to_string(),
                },
            };
            self.sink.emit(&self.settings.name, event);

            events.on_order_canceled(&id);
            self.ledger.state_mut().remove_everywhere(&id);
            attempted += 1;
        }
        attempted
    }

    /// Plan under `scope` and execute. Returns the number of attempts.
    pub fn cancel(
        &mut self,
        scope: CancelScope,
        markets: Option<&[MarketId]>,
        side: SideFilter,
        events: &mut dyn OrderEvents,
    ) -> LedgerResult<usize> {
        let planned = self.plan_cancellation(scope, markets, side)?;
        Ok(self.execute_cancellation(planned, events))
    }

    /// Cancel every order in `markets` (default: served), including orders
    /// of other bot instances on the same account.
    pub fn cancel_all(
        &mut self,
        markets: Option<&[MarketId]>,
        side: SideFilter,
        events: &mut dyn OrderEvents,
    ) -> LedgerResult<usize> {
        self.cancel(CancelScope::All, markets, side, events)
    }

    /// Cancel only this bot's own orders.
    pub fn cancel_mine(
        &mut self,
        markets: Option<&[MarketId]>,
        side: SideFilter,
        events: &mut dyn OrderEvents,
    ) -> LedgerResult<usize> {
        self.cancel(CancelScope::Mine, markets, side, events)
    }

    /// Cancel every order in the markets this bot serves.
    pub fn cancel_this_markets(
        &mut self,
        markets: Option<&[MarketId]>,
        side: SideFilter,
        events: &mut dyn OrderEvents,
    ) -> LedgerResult<usize> {
        self.cancel(CancelScope::ServedMarkets, markets, side, events)
    }

    pub fn cancel_all_buy_orders(&mut self, events: &mut dyn OrderEvents) -> LedgerResult<usize> {
        self.cancel_all(None, SideFilter::Buy, events)
    }

    pub fn cancel_all_sell_orders(&mut self, events: &mut dyn OrderEvents) -> LedgerResult<usize> {
        self.cancel_all(None, SideFilter::Sell, events)
    }

    pub fn cancel_my_buy_orders(&mut self, events: &mut dyn OrderEvents) -> LedgerResult<usize> {
        self.cancel_mine(None, SideFilter::Buy, events)
    }

    pub fn cancel_my_sell_orders(&mut self, events: &mut dyn OrderEvents) -> LedgerResult<usize> {
        self.cancel_mine(None, SideFilter::Sell, events)
    }

    /// Cancel a single order. The ledger is not touched; callers that need
    /// it consistent use [`execute_cancellation`](Self::execute_cancellation).
    pub fn cancel_one(&self, id: &OrderId) -> GatewayResult<()> {
        info!(bot = %self.settings.name, order_id = %id, "Canceling");
        let result = self.gateway.cancel_order(id);
        let event = match &result {
            Ok(()) => LedgerEvent::Canceled { id: id.clone() },
            Err(e) => LedgerEvent::CancelFailed {
                id: id.clone(),
                error: e.to_string(),
            },
        };
        self.sink.emit(&self.settings.name, event);
        result
    }

    // ------------------------------------------------------------------
    // Placement and balances
    // ------------------------------------------------------------------

    /// Place an order. Returns false if the gateway reported a failure.
    ///
    /// The ledger is not updated here; the new id is adopted by the next
    /// [`finish_tick`](Self::finish_tick).
    pub fn place_order(&self, request: &OrderRequest) -> bool {
        let separator = &self.settings.market_separator;
        let (quote, base) = request
            .market
            .split_pair(separator)
            .unwrap_or((request.market.as_str(), "?"));
        let total = request
            .amount
            .notional(request.price)
            .map_or_else(|| "?".to_string(), |total| total.to_string());
        match request.side {
            OrderSide::Sell => info!(
                bot = %self.settings.name,
                "Selling {} {} for {} {} @{} {}/{}",
                request.amount, quote, total, base, request.price, base, quote
            ),
            OrderSide::Buy => info!(
                bot = %self.settings.name,
                "Buying {} {} with {} {} @{} {}/{}",
                request.amount, quote, total, base, request.price, base, quote
            ),
        }

        match self.gateway.place_order(request) {
            Ok(receipt) => {
                debug!(
                    bot = %self.settings.name,
                    transaction = %receipt.transaction_id,
                    order_id = ?receipt.order_id,
                    "Placement accepted"
                );
                true
            }
            Err(e) => {
                self.sink.emit(
                    &self.settings.name,
                    LedgerEvent::PlacementFailed {
                        market: request.market.clone(),
                        error: e.to_string(),
                    },
                );
                false
            }
        }
    }

    /// Sell `amount` of the market's quote asset at `price` (base per quote).
    pub fn sell(&self, market: &MarketId, price: Price, amount: Amount) -> bool {
        self.place_order(&OrderRequest::new(
            market.clone(),
            OrderSide::Sell,
            price,
            amount,
        ))
    }

    /// Buy `amount` of the market's quote asset at `price` (base per quote).
    pub fn buy(&self, market: &MarketId, price: Price, amount: Amount) -> bool {
        self.place_order(&OrderRequest::new(
            market.clone(),
            OrderSide::Buy,
            price,
            amount,
        ))
    }

    /// Account balances minus the configured reserves, clamped at zero.
    pub fn balances(&self) -> LedgerResult<BTreeMap<String, Amount>> {
        let raw = self.gateway.balances().map_err(|e| {
            self.gateway_failure("balances", &e);
            e
        })?;

        Ok(raw
            .into_iter()
            .map(|(asset, amount)| {
                let available = amount.saturating_sub(self.settings.reserve_for(&asset));
                (asset, available)
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Tick driver
    // ------------------------------------------------------------------

    /// Start-up sequence: silent reconciliation (drops ids filled while the
    /// bot was down and takes a baseline), `init`, `place`, then bookkeeping.
    pub fn start<S: Strategy>(&mut self, strategy: &mut S) -> TickReport {
        let mut report = TickReport::default();

        match self.reconcile(false, strategy) {
            Ok(r) => report.filled = r.filled.len(),
            Err(e) => report.errors.push(format!("reconcile: {e}")),
        }
        if let Err(e) = strategy.init(self) {
            report.errors.push(format!("init: {e}"));
        }
        if let Err(e) = strategy.place(self) {
            report.errors.push(format!("place: {e}"));
        }
        self.finish_into(strategy, &mut report);

        self.log_tick("Start-up complete", &report);
        report
    }

    /// One tick: reconcile with fill notifications, strategy `tick`, then
    /// bookkeeping and persistence.
    ///
    /// Errors are caught here and returned in the report so one failing call
    /// cannot wedge the bot. The lifecycle counter is left to the strategy.
    pub fn run_tick<S: Strategy>(&mut self, strategy: &mut S) -> TickReport {
        let mut report = TickReport::default();

        match self.reconcile(true, strategy) {
            Ok(r) => report.filled = r.filled.len(),
            Err(e) => report.errors.push(format!("reconcile: {e}")),
        }
        if let Err(e) = strategy.tick(self) {
            report.errors.push(format!("tick: {e}"));
        }
        self.finish_into(strategy, &mut report);

        self.log_tick("Tick complete", &report);
        report
    }

    fn finish_into<S: Strategy>(&mut self, strategy: &mut S, report: &mut TickReport) {
        match self.finish_tick(strategy) {
            Ok(r) => {
                report.adopted = r.adopted.len();
                if r.listing_failed {
                    report.errors.push("bookkeeping: open-order listing failed".to_string());
                }
            }
            Err(e) => report.errors.push(format!("bookkeeping: {e}")),
        }
    }

    fn log_tick(&self, message: &str, report: &TickReport) {
        if report.is_clean() {
            debug!(
                bot = %self.settings.name,
                filled = report.filled,
                adopted = report.adopted,
                state = self.lifecycle.name(),
                "{message}"
            );
        } else {
            warn!(
                bot = %self.settings.name,
                filled = report.filled,
                adopted = report.adopted,
                errors = ?report.errors,
                "{message} with errors"
            );
        }
    }

    fn gateway_failure(&self, operation: &'static str, error: &GatewayError) {
        self.sink.emit(
            &self.settings.name,
            LedgerEvent::GatewayFailure {
                operation,
                error: error.to_string(),
            },
        );
    }
}
