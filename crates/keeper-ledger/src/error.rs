//! Ledger error types.

use keeper_core::MarketId;
use keeper_gateway::GatewayError;
use keeper_persistence::PersistenceError;
use thiserror::Error;

/// Fatal configuration problems, raised at construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing parameter 'name'")]
    MissingName,

    #[error("Missing parameter 'markets' for bot '{0}'")]
    MissingMarkets(String),

    #[error("Empty market id in bot '{0}'")]
    EmptyMarketId(String),

    #[error("Market {market} listed twice for bot '{bot}'")]
    DuplicateMarket { bot: String, market: MarketId },

    #[error("Market separator must not be empty")]
    EmptySeparator,

    #[error("Negative reserve for asset {0}")]
    NegativeReserve(String),

    #[error("Unreadable stored state for bot '{bot}': {source}")]
    UnreadableState {
        bot: String,
        #[source]
        source: PersistenceError,
    },
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
