use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::symbol::Symbol;

/// One held lot of an asset.
///
/// Every buy creates its own record; two buys of AAPL are two positions.
/// A partial sell lowers `quantity` and keeps `cost_basis_price`, a full
/// sell removes the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Unique identifier
    pub id: Uuid,

    /// The held ticker
    pub symbol: Symbol,

    /// Units held (always positive while the position exists)
    pub quantity: f64,

    /// Acquisition price per unit
    pub cost_basis_price: f64,

    /// When the lot was opened
    pub opened_at: DateTime<Utc>,
}

impl Position {
    pub fn new(symbol: Symbol, quantity: f64, cost_basis_price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol,
            quantity,
            cost_basis_price,
            opened_at: Utc::now(),
        }
    }

    /// Same as [`Position::new`] with an explicit open time (imports, tests).
    pub fn with_opened_at(
        symbol: Symbol,
        quantity: f64,
        cost_basis_price: f64,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            opened_at,
            ..Self::new(symbol, quantity, cost_basis_price)
        }
    }

    /// Value of the lot at its acquisition price.
    pub fn cost_basis_value(&self) -> f64 {
        self.cost_basis_price * self.quantity
    }
}
