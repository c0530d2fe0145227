//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown bot '{0}' (not under [bots] in the config file)")]
    UnknownBot(String),

    #[error("No bot selected: configured bots are {0:?}")]
    NoBotSelected(Vec<String>),

    #[error("Ledger error: {0}")]
    Ledger(#[from] keeper_ledger::LedgerError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] keeper_persistence::PersistenceError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] keeper_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
