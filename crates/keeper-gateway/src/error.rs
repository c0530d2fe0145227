//! Gateway error types.

use keeper_core::OrderId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Request rejected by exchange: {0}")]
    Rejected(String),

    #[error("Order not found: {0}")]
    NotFound(OrderId),

    #[error("Exchange unavailable: {0}")]
    Unavailable(String),

    #[error("Gateway error: {0}")]
    Other(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
