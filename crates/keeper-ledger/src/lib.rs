//! Order ledger and reconciliation engine.
//!
//! Lets several bot instances share one exchange account without touching
//! each other's orders. Each instance records the ids it owns, reconciles
//! them against the exchange every tick and persists them across restarts.
//!
//! # Key Components
//!
//! - [`LedgerEngine`]: Tick driver. Reconciliation, bookkeeping, cancellation, placement
//! - [`OrderLedger`]: Persisted per-bot state with lazy per-market attributes
//! - [`CancelScope`]: Which orders a cancellation may touch
//! - [`BotSettings`]: Validated per-instance configuration
//! - [`Lifecycle`]: Named state register with a tick counter
//! - [`OrderEvents`] / [`Strategy`]: Callbacks into strategy code

pub mod cancel;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod ledger;
pub mod lifecycle;
pub mod settings;

pub use cancel::CancelScope;
pub use engine::{BookkeepingReport, LedgerEngine, ReconcileReport, TickReport};
pub use error::{ConfigError, LedgerError, LedgerResult};
pub use hooks::{LogOnly, OrderEvents, Strategy};
pub use ledger::OrderLedger;
pub use lifecycle::{Lifecycle, INITIAL_STATE};
pub use settings::{BotSettings, DEFAULT_MARKET_SEPARATOR};
