use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::symbol::Symbol;

/// A tracked long/short pairing, watched as `long / short`.
///
/// Pairs are not holdings: they carry no quantity and no cost basis, and
/// they have no update operation. Create a new one instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairDefinition {
    pub id: Uuid,
    pub long_symbol: Symbol,
    pub short_symbol: Symbol,
    pub created_at: DateTime<Utc>,
}

impl PairDefinition {
    pub fn new(long_symbol: Symbol, short_symbol: Symbol) -> Self {
        Self {
            id: Uuid::new_v4(),
            long_symbol,
            short_symbol,
            created_at: Utc::now(),
        }
    }

    /// Display label, e.g. `BTC/ETH`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.long_symbol, self.short_symbol)
    }
}

/// A pair together with the prices it was evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairValuation {
    pub pair: PairDefinition,
    pub long_price: Option<f64>,
    pub short_price: Option<f64>,
    /// `long_price / short_price`, only when both prices are known
    pub ratio: Option<f64>,
}
