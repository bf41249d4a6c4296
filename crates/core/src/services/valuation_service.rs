use std::collections::BTreeMap;

use crate::models::position::Position;
use crate::models::quote::PriceMap;
use crate::models::symbol::Symbol;
use crate::models::valuation::{AllocationSlice, PortfolioSummary, PricedPosition};

/// Turns positions plus a price map into P&L, daily change and allocation.
///
/// Pure business logic: no I/O, no mutation of inputs.
pub struct ValuationService;

impl ValuationService {
    pub fn new() -> Self {
        Self
    }

    /// Value one position against the latest prices.
    ///
    /// Without a quote the position is valued at its cost basis price, so
    /// P&L is zero rather than a total loss. Daily change has no such
    /// fallback and is zero.
    pub fn value_position(&self, position: &Position, prices: &PriceMap) -> PricedPosition {
        let quote = prices.get(&position.symbol).cloned();
        let current_price = quote
            .as_ref()
            .map(|q| q.price)
            .unwrap_or(position.cost_basis_price);

        let current_value = current_price * position.quantity;
        let cost_basis_value = position.cost_basis_value();
        let profit_loss = current_value - cost_basis_value;
        let daily_change = quote
            .as_ref()
            .map(|q| q.absolute_change * position.quantity)
            .unwrap_or(0.0);

        PricedPosition {
            position: position.clone(),
            quote,
            current_price,
            current_value,
            cost_basis_value,
            profit_loss,
            profit_loss_percent: percent_of(profit_loss, cost_basis_value),
            daily_change,
        }
    }

    /// Value every position, preserving input order.
    pub fn value_positions(&self, positions: &[Position], prices: &PriceMap) -> Vec<PricedPosition> {
        positions
            .iter()
            .map(|p| self.value_position(p, prices))
            .collect()
    }

    /// Aggregate totals and allocation for a set of priced positions.
    pub fn summarize(&self, priced: &[PricedPosition]) -> PortfolioSummary {
        let total_value: f64 = priced.iter().map(|p| p.current_value).sum();
        let total_cost_basis: f64 = priced.iter().map(|p| p.cost_basis_value).sum();
        let daily_profit_loss: f64 = priced.iter().map(|p| p.daily_change).sum();
        let total_profit_loss = total_value - total_cost_basis;

        PortfolioSummary {
            position_count: priced.len(),
            total_value,
            total_cost_basis,
            total_profit_loss,
            total_profit_loss_percent: percent_of(total_profit_loss, total_cost_basis),
            daily_profit_loss,
            allocation: self.allocation(priced),
        }
    }

    /// Per-symbol share of total value, largest first (ties by symbol).
    ///
    /// Symbols whose positions are worth nothing get no slice. An empty or
    /// worthless portfolio has an empty allocation.
    pub fn allocation(&self, priced: &[PricedPosition]) -> Vec<AllocationSlice> {
        let mut by_symbol: BTreeMap<&Symbol, f64> = BTreeMap::new();
        for p in priced {
            *by_symbol.entry(&p.position.symbol).or_insert(0.0) += p.current_value;
        }

        let total_value: f64 = by_symbol.values().sum();
        if total_value <= 0.0 {
            return Vec::new();
        }

        let mut slices: Vec<AllocationSlice> = by_symbol
            .into_iter()
            .filter(|(_, value)| *value > 0.0)
            .map(|(symbol, value)| AllocationSlice {
                symbol: symbol.clone(),
                value,
                weight_percent: value / total_value * 100.0,
            })
            .collect();

        slices.sort_by(|a, b| {
            b.weight_percent
                .partial_cmp(&a.weight_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        slices
    }
}

impl Default for ValuationService {
    fn default() -> Self {
        Self::new()
    }
}

/// `part / whole × 100`, or 0 when `whole` is not positive.
fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
