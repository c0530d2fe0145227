//! JSON file store: one document per bot.
//!
//! Each bot's state lives in `{dir}/{bot}.json`. Writes go to a sibling
//! `.tmp` file which is synced and renamed over the target, so an interrupted
//! write never leaves a half-written document behind.

use crate::error::{PersistenceError, PersistenceResult};
use crate::store::{StateStore, StoredState};
use keeper_core::BotState;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File-backed `StateStore`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    /// Directory holding one file per bot.
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> PersistenceResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "Opened state directory");
        Ok(Self { dir })
    }

    /// Path of the document for `bot`.
    pub fn path_for(&self, bot: &str) -> PersistenceResult<PathBuf> {
        let valid = !bot.is_empty()
            && bot != "."
            && bot != ".."
            && !bot.contains(['/', '\\', '\0']);
        if !valid {
            return Err(PersistenceError::InvalidName(bot.to_string()));
        }
        Ok(self.dir.join(format!("{bot}.json")))
    }
}

impl StateStore for JsonFileStore {
    fn load(&self, bot: &str) -> PersistenceResult<Option<BotState>> {
        let path = self.path_for(bot)?;
        if !path.exists() {
            debug!(bot, path = %path.display(), "No stored state");
            return Ok(None);
        }

        let raw = fs::read_to_string(&path)?;
        let state = StoredState::parse(bot, &raw)?;
        debug!(
            bot,
            path = %path.display(),
            orders = state.order_count(),
            "Loaded stored state"
        );
        Ok(Some(state))
    }

    fn save(&self, bot: &str, state: &BotState) -> PersistenceResult<()> {
        let path = self.path_for(bot)?;
        let tmp = path.with_extension("json.tmp");

        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &StoredState::new(bot, state.clone()))?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        debug!(
            bot,
            path = %path.display(),
            orders = state.order_count(),
            "Stored state"
        );
        Ok(())
    }
}
