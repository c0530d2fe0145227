//! Core domain types for the order keeper.
//!
//! This crate provides the types shared by every other crate in the workspace:
//! - `MarketId`, `OrderId`: Opaque exchange identifiers
//! - `Price`, `Amount`: Precision-safe numeric types
//! - `OrderSide`, `SideFilter`: Trading enums
//! - `OpenOrder`, `OrderRequest`: Open order records and placement requests
//! - `BotState`: The persisted per-bot ledger document

pub mod decimal;
pub mod error;
pub mod market;
pub mod order;
pub mod state;

pub use decimal::{Amount, Price};
pub use error::{CoreError, Result};
pub use market::MarketId;
pub use order::{
    OpenOrder, OrderId, OrderRequest, OrderSide, PlaceOptions, SideFilter,
    DEFAULT_EXPIRATION_SECS,
};
pub use state::{Attributes, BotState};
