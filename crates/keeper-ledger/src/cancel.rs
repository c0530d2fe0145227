//! Cancellation planning.
//!
//! Computes which open orders a cancellation covers. Planning is pure: it
//! works on a fresh open-order snapshot and the ledger state, and the engine
//! drives the resulting set through the gateway.

use std::collections::BTreeSet;
use std::fmt;

use keeper_core::{BotState, MarketId, OrderId, SideFilter};
use keeper_gateway::OpenOrders;

/// Which orders are eligible for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelScope {
    /// Every open order in the target markets, whoever placed it.
    All,
    /// Only open orders recorded in this bot's ledger.
    Mine,
    /// Every open order, restricted to markets this bot serves.
    ServedMarkets,
}

impl fmt::Display for CancelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Mine => write!(f, "mine"),
            Self::ServedMarkets => write!(f, "served_markets"),
        }
    }
}

/// Markets a cancellation looks at.
///
/// `All` and `Mine` use `requested` when given and non-empty, otherwise the
/// served markets. `ServedMarkets` intersects `requested` with the served
/// markets. Duplicates are dropped, order is kept.
pub fn target_markets(
    scope: CancelScope,
    requested: Option<&[MarketId]>,
    served: &[MarketId],
) -> Vec<MarketId> {
    let requested = requested.filter(|markets| !markets.is_empty());
    let candidates: Vec<&MarketId> = match (scope, requested) {
        (CancelScope::ServedMarkets, Some(markets)) => {
            markets.iter().filter(|m| served.contains(m)).collect()
        }
        (_, Some(markets)) => markets.iter().collect(),
        (_, None) => served.iter().collect(),
    };

    let mut seen = BTreeSet::new();
    candidates
        .into_iter()
        .filter(|m| seen.insert(*m))
        .cloned()
        .collect()
}

/// Select the ids to cancel from `live` for `markets`.
///
/// A market with no open orders contributes nothing. Under `Mine`, only ids
/// recorded in `state` for the same market are selected.
pub fn select(
    scope: CancelScope,
    markets: &[MarketId],
    live: &OpenOrders,
    state: &BotState,
    side: SideFilter,
) -> BTreeSet<OrderId> {
    let mut selected = BTreeSet::new();
    for market in markets {
        let Some(orders) = live.get(market) else {
            continue;
        };
        for order in orders {
            if !side.matches(order.side) {
                continue;
            }
            if scope == CancelScope::Mine && !state.contains(market, &order.id) {
                continue;
            }
            selected.insert(order.id.clone());
        }
    }
    selected
}
