//! Storage trait and the on-disk document envelope.

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, Utc};
use keeper_core::BotState;
use serde::{Deserialize, Serialize};

/// Durable key-value storage of bot state, keyed by bot name.
pub trait StateStore: Send + Sync {
    /// Load the state stored for `bot`.
    ///
    /// Returns `Ok(None)` when nothing has been stored yet; that is the normal
    /// first-run condition, not an error.
    fn load(&self, bot: &str) -> PersistenceResult<Option<BotState>>;

    /// Store `state` for `bot`, replacing any previous document.
    fn save(&self, bot: &str, state: &BotState) -> PersistenceResult<()>;
}

/// Document written for each bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoredState {
    pub bot: String,
    pub saved_at: DateTime<Utc>,
    pub state: BotState,
}

impl StoredState {
    pub fn new(bot: &str, state: BotState) -> Self {
        Self {
            bot: bot.to_string(),
            saved_at: Utc::now(),
            state,
        }
    }

    /// Parse a stored document for `bot`.
    ///
    /// Accepts the envelope written by this crate as well as a bare
    /// `{"orders": {...}}` document written by older bots.
    pub fn parse(bot: &str, raw: &str) -> PersistenceResult<BotState> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| PersistenceError::Corrupt {
                bot: bot.to_string(),
                reason: e.to_string(),
            })?;

        let is_envelope = value.get("state").is_some() && value.get("bot").is_some();
        if !is_envelope {
            return serde_json::from_value::<BotState>(value).map_err(|e| {
                PersistenceError::Corrupt {
                    bot: bot.to_string(),
                    reason: e.to_string(),
                }
            });
        }

        let stored: StoredState =
            serde_json::from_value(value).map_err(|e| PersistenceError::Corrupt {
                bot: bot.to_string(),
                reason: e.to_string(),
            })?;
        if stored.bot != bot {
            return Err(PersistenceError::Corrupt {
                bot: bot.to_string(),
                reason: format!("document belongs to bot '{}'", stored.bot),
            });
        }
        Ok(stored.state)
    }
}
