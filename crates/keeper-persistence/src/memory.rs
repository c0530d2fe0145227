//! In-memory `StateStore` for tests and dry runs.

use crate::error::PersistenceResult;
use crate::store::StateStore;
use keeper_core::BotState;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Keeps bot documents in a map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, BotState>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a document for `bot`.
    pub fn with_state(bot: &str, state: BotState) -> Self {
        let store = Self::new();
        store.documents.lock().insert(bot.to_string(), state);
        store
    }

    /// Current document for `bot`, bypassing the trait.
    pub fn get(&self, bot: &str) -> Option<BotState> {
        self.documents.lock().get(bot).cloned()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl StateStore for MemoryStore {
    fn load(&self, bot: &str) -> PersistenceResult<Option<BotState>> {
        Ok(self.documents.lock().get(bot).cloned())
    }

    fn save(&self, bot: &str, state: &BotState) -> PersistenceResult<()> {
        self.documents.lock().insert(bot.to_string(), state.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}
