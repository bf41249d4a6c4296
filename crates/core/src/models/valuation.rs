use serde::{Deserialize, Serialize};

use super::position::Position;
use super::quote::Quote;
use super::symbol::Symbol;

/// A position evaluated against the latest price map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedPosition {
    /// The underlying lot
    pub position: Position,

    /// Live quote, if one was available for the symbol
    pub quote: Option<Quote>,

    /// Quote price, or the cost basis price when there is no quote
    pub current_price: f64,

    /// current_price × quantity
    pub current_value: f64,

    /// cost_basis_price × quantity
    pub cost_basis_value: f64,

    /// current_value − cost_basis_value
    pub profit_loss: f64,

    /// profit_loss / cost_basis_value × 100, or 0 when cost basis is 0
    pub profit_loss_percent: f64,

    /// quote.absolute_change × quantity, or 0 without a quote
    pub daily_change: f64,
}

impl PricedPosition {
    /// `true` when the valuation fell back to the cost basis price.
    pub fn is_stale(&self) -> bool {
        self.quote.is_none()
    }
}

/// Aggregate figures for a set of priced positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Number of positions summarized
    pub position_count: usize,

    /// Σ current_value
    pub total_value: f64,

    /// Σ cost_basis_value
    pub total_cost_basis: f64,

    /// total_value − total_cost_basis
    pub total_profit_loss: f64,

    /// total_profit_loss / total_cost_basis × 100, or 0 when cost basis is 0
    pub total_profit_loss_percent: f64,

    /// Σ daily_change
    pub daily_profit_loss: f64,

    /// Per-symbol weights, largest first. Empty when total_value is 0.
    pub allocation: Vec<AllocationSlice>,
}

/// Share of total portfolio value held in one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSlice {
    pub symbol: Symbol,

    /// Σ current_value of every position in this symbol
    pub value: f64,

    /// value / total_value × 100
    pub weight_percent: f64,
}
