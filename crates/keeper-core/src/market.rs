//! Market identification.
//!
//! A market is a tradable pair such as `USD_BTS`: the `quote` asset comes
//! first, the `base` asset (in which prices are denoted) second, joined by a
//! configurable separator token.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a market the bot may serve (e.g. `"USD_BTS"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(String);

impl MarketId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into `(quote, base)` using `separator`.
    ///
    /// Returns `None` if the separator does not occur exactly once or either
    /// half is empty.
    pub fn split_pair(&self, separator: &str) -> Option<(&str, &str)> {
        if separator.is_empty() {
            return None;
        }
        let mut parts = self.0.split(separator);
        let quote = parts.next()?;
        let base = parts.next()?;
        if parts.next().is_some() || quote.is_empty() || base.is_empty() {
            return None;
        }
        Some((quote, base))
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MarketId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MarketId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for MarketId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pair() {
        let market = MarketId::new("USD_BTS");
        assert_eq!(market.split_pair("_"), Some(("USD", "BTS")));
        assert_eq!(market.split_pair(":"), None);
    }

    #[test]
    fn test_split_pair_rejects_malformed() {
        assert_eq!(MarketId::new("USD_BTS_X").split_pair("_"), None);
        assert_eq!(MarketId::new("_BTS").split_pair("_"), None);
        assert_eq!(MarketId::new("USD_BTS").split_pair(""), None);
    }

    #[test]
    fn test_market_id_as_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(MarketId::new("USD_BTS"), 1u32);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"USD_BTS":1}"#);
    }
}
