//! Application configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use keeper_core::{Amount, MarketId, Price};
use keeper_ledger::{BotSettings, LedgerError, DEFAULT_MARKET_SEPARATOR};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Per-bot section (`[bots.<name>]`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    /// Markets this bot serves.
    #[serde(default)]
    pub markets: Vec<MarketId>,
    /// Per-asset reserves, overriding the top-level ones.
    #[serde(default)]
    pub reserves: BTreeMap<String, Amount>,
}

/// Paper wall strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallConfig {
    /// Center price used when a market has no stored center.
    #[serde(default = "default_center_price")]
    pub center_price: Price,
    /// Distance of each wall from the center (bps).
    #[serde(default = "default_spread_bps")]
    pub spread_bps: Decimal,
    /// Amount of the quote asset per wall.
    #[serde(default = "default_wall_amount")]
    pub amount: Amount,
}

fn default_center_price() -> Price {
    Price::new(Decimal::ONE)
}

fn default_spread_bps() -> Decimal {
    Decimal::new(50, 0)
}

fn default_wall_amount() -> Amount {
    Amount::new(Decimal::ONE)
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            center_price: default_center_price(),
            spread_bps: default_spread_bps(),
            amount: default_wall_amount(),
        }
    }
}

/// Paper exchange simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Starting balances.
    #[serde(default)]
    pub balances: BTreeMap<String, Amount>,
    /// Fill the oldest owned order every N ticks. 0 disables fills.
    #[serde(default = "default_fill_every_ticks")]
    pub fill_every_ticks: u64,
}

fn default_fill_every_ticks() -> u64 {
    5
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            balances: BTreeMap::new(),
            fill_every_ticks: default_fill_every_ticks(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Never write the state store (dry runs).
    #[serde(default)]
    pub safe_mode: bool,
    /// Token between quote and base in market ids.
    #[serde(default = "default_market_separator")]
    pub market_separator: String,
    /// Directory holding one `<bot>.json` per bot.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    /// Tick interval (ms).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Cancel this bot's own orders on shutdown.
    #[serde(default)]
    pub cancel_on_shutdown: bool,
    /// Per-asset reserves shared by every bot.
    #[serde(default)]
    pub reserves: BTreeMap<String, Amount>,
    #[serde(default)]
    pub bots: BTreeMap<String, BotConfig>,
    #[serde(default)]
    pub strategy: WallConfig,
    #[serde(default)]
    pub paper: PaperConfig,
}

fn default_market_separator() -> String {
    DEFAULT_MARKET_SEPARATOR.to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}

fn default_tick_interval_ms() -> u64 {
    1_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            safe_mode: false,
            market_separator: default_market_separator(),
            state_dir: default_state_dir(),
            tick_interval_ms: default_tick_interval_ms(),
            cancel_on_shutdown: false,
            reserves: BTreeMap::new(),
            bots: BTreeMap::new(),
            strategy: WallConfig::default(),
            paper: PaperConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Pick the bot to run: `requested` if given, otherwise the only
    /// configured bot.
    pub fn select_bot(&self, requested: Option<&str>) -> AppResult<String> {
        match requested {
            Some(name) if self.bots.contains_key(name) => Ok(name.to_string()),
            Some(name) => Err(AppError::UnknownBot(name.to_string())),
            None if self.bots.len() == 1 => Ok(self.bots.keys().next().cloned().unwrap_or_default()),
            None => Err(AppError::NoBotSelected(self.bots.keys().cloned().collect())),
        }
    }

    /// Validated ledger settings for bot `name`.
    ///
    /// Per-bot reserves override top-level ones for the same asset.
    pub fn bot_settings(&self, name: &str) -> AppResult<BotSettings> {
        let bot = self
            .bots
            .get(name)
            .ok_or_else(|| AppError::UnknownBot(name.to_string()))?;

        let mut settings = BotSettings::new(name, bot.markets.clone())
            .with_separator(self.market_separator.clone())
            .with_persistence(!self.safe_mode);
        for (asset, amount) in self.reserves.iter().chain(bot.reserves.iter()) {
            settings = settings.with_reserve(asset.clone(), *amount);
        }

        settings.validate().map_err(LedgerError::from)?;
        Ok(settings)
    }
}
