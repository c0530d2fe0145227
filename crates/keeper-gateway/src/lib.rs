//! Exchange gateway capability for the order keeper.
//!
//! The ledger never talks to an exchange directly. It consumes the
//! [`ExchangeGateway`] trait, which lists open orders, places and cancels
//! orders, and reads balances. Every call returns a typed [`GatewayResult`].
//!
//! # Key Components
//!
//! - [`ExchangeGateway`]: The capability consumed by the ledger
//! - [`GatewayError`]: Typed per-operation failures
//! - [`PaperGateway`]: In-memory exchange for dry runs and tests

pub mod error;
pub mod gateway;
pub mod paper;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{ExchangeGateway, OpenOrderIds, OpenOrders, PlacementReceipt};
pub use paper::PaperGateway;
