//! Order keeper application.
//!
//! Runs one bot instance against the paper exchange:
//! - TOML configuration with per-bot market lists and reserves
//! - Tick loop driving the ledger engine and the wall strategy
//! - Structured logging and Prometheus counters via `keeper-telemetry`

pub mod app;
pub mod config;
pub mod error;
pub mod strategy;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use strategy::WallStrategy;
