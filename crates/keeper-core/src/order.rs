//! Order-related types and identifiers.
//!
//! Provides order ids, sides, side filters for cancellation, open order
//! records as reported by the exchange, and placement requests.

use crate::error::CoreError;
use crate::{Amount, MarketId, Price};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default order expiration: 24 hours.
pub const DEFAULT_EXPIRATION_SECS: u64 = 60 * 60 * 24;

/// Exchange-assigned order id.
///
/// Opaque to the ledger; only compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Which sides a cancellation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideFilter {
    Buy,
    Sell,
    #[default]
    Both,
}

impl SideFilter {
    /// Check whether an order on `side` passes this filter.
    pub fn matches(&self, side: OrderSide) -> bool {
        match self {
            Self::Both => true,
            Self::Buy => side == OrderSide::Buy,
            Self::Sell => side == OrderSide::Sell,
        }
    }
}

impl From<OrderSide> for SideFilter {
    fn from(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => Self::Buy,
            OrderSide::Sell => Self::Sell,
        }
    }
}

impl fmt::Display for SideFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
            Self::Both => write!(f, "both"),
        }
    }
}

impl FromStr for SideFilter {
    type Err = CoreError;

    /// Accepts `buy`/`bid`, `sell`/`ask` and `both`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" | "bid" => Ok(Self::Buy),
            "sell" | "ask" => Ok(Self::Sell),
            "both" => Ok(Self::Both),
            other => Err(CoreError::InvalidSide(other.to_string())),
        }
    }
}

/// An open order as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub id: OrderId,
    pub side: OrderSide,
    pub price: Price,
    pub amount: Amount,
}

impl OpenOrder {
    pub fn new(id: impl Into<OrderId>, side: OrderSide, price: Price, amount: Amount) -> Self {
        Self {
            id: id.into(),
            side,
            price,
            amount,
        }
    }
}

/// Optional placement flags forwarded verbatim to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaceOptions {
    /// Fill the whole amount immediately or cancel.
    pub fill_or_kill: bool,
}

/// Request to place a limit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub market: MarketId,
    pub side: OrderSide,
    pub price: Price,
    /// Amount of the market's quote asset.
    pub amount: Amount,
    pub expiration_secs: u64,
    pub options: PlaceOptions,
}

impl OrderRequest {
    /// Create a request with the default expiration and no options.
    pub fn new(market: MarketId, side: OrderSide, price: Price, amount: Amount) -> Self {
        Self {
            market,
            side,
            price,
            amount,
            expiration_secs: DEFAULT_EXPIRATION_SECS,
            options: PlaceOptions::default(),
        }
    }

    #[must_use]
    pub fn with_expiration(mut self, expiration_secs: u64) -> Self {
        self.expiration_secs = expiration_secs;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: PlaceOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_filter_matches() {
        assert!(SideFilter::Both.matches(OrderSide::Buy));
        assert!(SideFilter::Both.matches(OrderSide::Sell));
        assert!(SideFilter::Buy.matches(OrderSide::Buy));
        assert!(!SideFilter::Buy.matches(OrderSide::Sell));
        assert!(SideFilter::Sell.matches(OrderSide::Sell));
        assert!(!SideFilter::Sell.matches(OrderSide::Buy));
    }

    #[test]
    fn test_side_filter_parse_aliases() {
        assert_eq!("bid".parse::<SideFilter>().unwrap(), SideFilter::Buy);
        assert_eq!("ASK".parse::<SideFilter>().unwrap(), SideFilter::Sell);
        assert_eq!("both".parse::<SideFilter>().unwrap(), SideFilter::Both);
        assert!("long".parse::<SideFilter>().is_err());
    }

    #[test]
    fn test_order_request_defaults() {
        let req = OrderRequest::new(
            MarketId::new("USD_BTS"),
            OrderSide::Sell,
            Price::ZERO,
            Amount::ZERO,
        );
        assert_eq!(req.expiration_secs, DEFAULT_EXPIRATION_SECS);
        assert!(!req.options.fill_or_kill);
    }
}
