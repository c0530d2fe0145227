//! Per-bot settings consumed by the ledger.

use std::collections::{BTreeMap, HashSet};

use keeper_core::{Amount, MarketId};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default token between quote and base in a market id (`USD_BTS`).
pub const DEFAULT_MARKET_SEPARATOR: &str = "_";

/// Settings for one bot instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotSettings {
    /// Bot name; also the key of its persisted state.
    pub name: String,
    /// Markets this bot serves.
    pub markets: Vec<MarketId>,
    /// Balance held back per asset; never reported as available.
    #[serde(default)]
    pub reserves: BTreeMap<String, Amount>,
    /// Write the ledger to the persistent store after each tick.
    /// `false` is "safe mode": state lives in memory only.
    #[serde(default = "default_persist")]
    pub persist: bool,
    /// Token between quote and base in market ids.
    #[serde(default = "default_market_separator")]
    pub market_separator: String,
}

fn default_persist() -> bool {
    true
}

fn default_market_separator() -> String {
    DEFAULT_MARKET_SEPARATOR.to_string()
}

impl BotSettings {
    /// Settings with persistence enabled, no reserves and the default separator.
    pub fn new(name: impl Into<String>, markets: Vec<MarketId>) -> Self {
        Self {
            name: name.into(),
            markets,
            reserves: BTreeMap::new(),
            persist: default_persist(),
            market_separator: default_market_separator(),
        }
    }

    #[must_use]
    pub fn with_reserve(mut self, asset: impl Into<String>, amount: Amount) -> Self {
        self.reserves.insert(asset.into(), amount);
        self
    }

    #[must_use]
    pub fn with_persistence(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.market_separator = separator.into();
        self
    }

    /// Check whether `market` is one of the served markets.
    pub fn serves(&self, market: &MarketId) -> bool {
        self.markets.contains(market)
    }

    /// Reserve configured for `asset`, zero if none.
    pub fn reserve_for(&self, asset: &str) -> Amount {
        self.reserves.get(asset).copied().unwrap_or(Amount::ZERO)
    }

    /// Validate the settings, failing on the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingName);
        }
        if self.markets.is_empty() {
            return Err(ConfigError::MissingMarkets(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for market in &self.markets {
            if market.as_str().trim().is_empty() {
                return Err(ConfigError::EmptyMarketId(self.name.clone()));
            }
            if !seen.insert(market) {
                return Err(ConfigError::DuplicateMarket {
                    bot: self.name.clone(),
                    market: market.clone(),
                });
            }
        }

        if self.market_separator.is_empty() {
            return Err(ConfigError::EmptySeparator);
        }

        if let Some((asset, _)) = self
            .reserves
            .iter()
            .find(|(_, amount)| amount.inner().is_sign_negative() && !amount.is_zero())
        {
            return Err(ConfigError::NegativeReserve(asset.clone()));
        }

        Ok(())
    }
}
