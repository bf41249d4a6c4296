use crate::models::pair::{PairDefinition, PairValuation};
use crate::models::quote::PriceMap;
use crate::models::symbol::Symbol;

/// Relative value of long/short pairs.
///
/// Stricter than position valuation: a ratio needs a live quote on both
/// legs and never falls back to anything else. A zero short price is left
/// to IEEE arithmetic (infinity or NaN) for the display layer to handle.
pub struct RatioService;

impl RatioService {
    pub fn new() -> Self {
        Self
    }

    /// `long / short`, or `None` if either price is missing.
    pub fn compute_ratio(&self, long: &Symbol, short: &Symbol, prices: &PriceMap) -> Option<f64> {
        let long_price = prices.price(long)?;
        let short_price = prices.price(short)?;
        Some(long_price / short_price)
    }

    pub fn value_pair(&self, pair: &PairDefinition, prices: &PriceMap) -> PairValuation {
        PairValuation {
            pair: pair.clone(),
            long_price: prices.price(&pair.long_symbol),
            short_price: prices.price(&pair.short_symbol),
            ratio: self.compute_ratio(&pair.long_symbol, &pair.short_symbol, prices),
        }
    }

    pub fn value_pairs(&self, pairs: &[PairDefinition], prices: &PriceMap) -> Vec<PairValuation> {
        pairs.iter().map(|p| self.value_pair(p, prices)).collect()
    }
}

impl Default for RatioService {
    fn default() -> Self {
        Self::new()
    }
}
