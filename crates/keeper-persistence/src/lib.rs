//! Durable per-bot state storage for the order keeper.
//!
//! Stores one `BotState` document per bot name. `JsonFileStore` keeps each
//! document in its own JSON file; `MemoryStore` keeps them in memory for tests
//! and dry runs.

pub mod error;
pub mod file;
pub mod memory;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use store::{StateStore, StoredState};
