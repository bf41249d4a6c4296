use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::pair::PairDefinition;
use crate::models::portfolio::Portfolio;
use crate::models::position::Position;
use crate::models::symbol::Symbol;

/// Relative slack when comparing a sell against the held quantity.
/// Repeated partial sells accumulate float error proportional to the lot size.
const QUANTITY_TOLERANCE: f64 = 1e-9;

/// Result of a sell against one position.
#[derive(Debug, Clone, PartialEq)]
pub enum SellOutcome {
    /// Part of the lot was sold; the position stays with this quantity.
    Reduced { remaining: f64 },
    /// The whole lot was sold; the position record is gone.
    Closed(Position),
}

/// Manages positions, pairs and the watchlist.
///
/// Pure bookkeeping, no I/O and no prices. Every failing operation leaves
/// the portfolio unchanged.
pub struct HoldingsService;

impl HoldingsService {
    pub fn new() -> Self {
        Self
    }

    /// Open a new lot. Repeated buys of one symbol stay separate records.
    pub fn buy(
        &self,
        portfolio: &mut Portfolio,
        symbol: Symbol,
        quantity: f64,
        cost_basis_price: f64,
    ) -> Result<Uuid, CoreError> {
        self.add_position(portfolio, Position::new(symbol, quantity, cost_basis_price))
    }

    /// Insert a fully built position (imports, restores).
    pub fn add_position(&self, portfolio: &mut Portfolio, position: Position) -> Result<Uuid, CoreError> {
        self.validate_position(&position)?;
        if portfolio.positions.iter().any(|p| p.id == position.id) {
            return Err(CoreError::ValidationError(format!(
                "Position {} already exists",
                position.id
            )));
        }
        let id = position.id;
        portfolio.positions.push(position);
        Ok(id)
    }

    /// Sell `quantity` units from one position.
    ///
    /// Selling everything (within a tolerance relative to the held quantity)
    /// removes the record; otherwise only the quantity drops and the cost
    /// basis price is kept.
    pub fn sell(
        &self,
        portfolio: &mut Portfolio,
        position_id: Uuid,
        quantity: f64,
    ) -> Result<SellOutcome, CoreError> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Sell quantity must be positive, got {quantity}"
            )));
        }

        let idx = Self::index_of(portfolio, position_id)?;
        let held = portfolio.positions[idx].quantity;
        let remaining = held - quantity;
        let tolerance = held.abs().max(1.0) * QUANTITY_TOLERANCE;

        if remaining < -tolerance {
            return Err(CoreError::ValidationError(format!(
                "Cannot sell {} {}: position only holds {}",
                quantity, portfolio.positions[idx].symbol, held
            )));
        }

        if remaining <= tolerance {
            let closed = portfolio.positions.remove(idx);
            return Ok(SellOutcome::Closed(closed));
        }

        portfolio.positions[idx].quantity = remaining;
        Ok(SellOutcome::Reduced { remaining })
    }

    /// Delete a position outright.
    pub fn remove_position(&self, portfolio: &mut Portfolio, position_id: Uuid) -> Result<Position, CoreError> {
        let idx = Self::index_of(portfolio, position_id)?;
        Ok(portfolio.positions.remove(idx))
    }

    /// All positions, most recently opened first.
    pub fn get_positions<'a>(&self, portfolio: &'a Portfolio) -> Vec<&'a Position> {
        let mut positions: Vec<&Position> = portfolio.positions.iter().collect();
        positions.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        positions
    }

    /// Total units held across every lot of `symbol`.
    pub fn quantity_held(&self, portfolio: &Portfolio, symbol: &Symbol) -> f64 {
        portfolio
            .positions
            .iter()
            .filter(|p| &p.symbol == symbol)
            .map(|p| p.quantity)
            .sum()
    }

    // ── Pairs ───────────────────────────────────────────────────────

    pub fn add_pair(
        &self,
        portfolio: &mut Portfolio,
        long_symbol: Symbol,
        short_symbol: Symbol,
    ) -> Result<Uuid, CoreError> {
        if long_symbol == short_symbol {
            return Err(CoreError::ValidationError(format!(
                "Pair legs must differ, got {long_symbol}/{short_symbol}"
            )));
        }
        let pair = PairDefinition::new(long_symbol, short_symbol);
        let id = pair.id;
        portfolio.pairs.push(pair);
        Ok(id)
    }

    pub fn remove_pair(&self, portfolio: &mut Portfolio, pair_id: Uuid) -> Result<PairDefinition, CoreError> {
        let idx = portfolio
            .pairs
            .iter()
            .position(|p| p.id == pair_id)
            .ok_or_else(|| CoreError::PairNotFound(pair_id.to_string()))?;
        Ok(portfolio.pairs.remove(idx))
    }

    // ── Watchlist ───────────────────────────────────────────────────

    /// Returns `false` if the symbol was already watched.
    pub fn watch(&self, portfolio: &mut Portfolio, symbol: Symbol) -> bool {
        portfolio.watchlist.insert(symbol)
    }

    /// Returns `false` if the symbol was not watched.
    pub fn unwatch(&self, portfolio: &mut Portfolio, symbol: &Symbol) -> bool {
        portfolio.watchlist.remove(symbol)
    }

    // ── Validation ──────────────────────────────────────────────────

    /// Rules:
    /// - Quantity must be positive and finite
    /// - Cost basis price must be non-negative and finite
    fn validate_position(&self, position: &Position) -> Result<(), CoreError> {
        if !position.quantity.is_finite() || position.quantity <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Quantity must be positive, got {}",
                position.quantity
            )));
        }
        if !position.cost_basis_price.is_finite() || position.cost_basis_price < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Cost basis price must be non-negative, got {}",
                position.cost_basis_price
            )));
        }
        Ok(())
    }

    fn index_of(portfolio: &Portfolio, position_id: Uuid) -> Result<usize, CoreError> {
        portfolio
            .positions
            .iter()
            .position(|p| p.id == position_id)
            .ok_or_else(|| CoreError::PositionNotFound(position_id.to_string()))
    }
}

impl Default for HoldingsService {
    fn default() -> Self {
        Self::new()
    }
}
