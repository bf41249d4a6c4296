use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

use super::symbol::Symbol;

/// A point-in-time price reading for one symbol.
///
/// Quotes are never patched field by field: a fresh quote replaces the
/// previous one for its symbol as a whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,

    /// Last traded price (never negative)
    pub price: f64,

    /// Absolute change since the previous close
    pub absolute_change: f64,

    /// Percentage change since the previous close
    pub percent_change: f64,

    /// Day high, when the provider reports one
    #[serde(default)]
    pub high: Option<f64>,

    /// Day low, when the provider reports one
    #[serde(default)]
    pub low: Option<f64>,

    /// Day open, when the provider reports one
    #[serde(default)]
    pub open: Option<f64>,

    /// Previous close, when the provider reports one
    #[serde(default)]
    pub previous_close: Option<f64>,

    /// When this quote was received
    pub fetched_at: DateTime<Utc>,
}

impl Quote {
    /// Build a quote with only the required fields set.
    pub fn new(symbol: Symbol, price: f64, absolute_change: f64, percent_change: f64) -> Self {
        Self {
            symbol,
            price,
            absolute_change,
            percent_change,
            high: None,
            low: None,
            open: None,
            previous_close: None,
            fetched_at: Utc::now(),
        }
    }
}

/// Cumulative symbol → quote cache built up across polling cycles.
///
/// Keys only ever get added or overwritten; a failed poll leaves the last
/// good quote in place. The map is owned by the session and cleared on
/// logout via [`PriceMap::clear`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceMap {
    quotes: BTreeMap<Symbol, Quote>,
}

impl PriceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    /// Latest price for a symbol, if any quote has been seen.
    pub fn price(&self, symbol: &Symbol) -> Option<f64> {
        self.quotes.get(symbol).map(|q| q.price)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.quotes.contains_key(symbol)
    }

    /// Insert or replace the quote for its symbol.
    pub fn insert(&mut self, quote: Quote) {
        self.quotes.insert(quote.symbol.clone(), quote);
    }

    /// Additive merge: every key present in `fresh` overwrites ours,
    /// keys missing from `fresh` keep their previous value.
    /// Returns the number of quotes written.
    pub fn merge(&mut self, fresh: PriceMap) -> usize {
        let written = fresh.quotes.len();
        self.quotes.extend(fresh.quotes);
        written
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.quotes.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Symbol, Quote> {
        self.quotes.iter()
    }

    /// Forget every quote (end of session).
    pub fn clear(&mut self) {
        self.quotes.clear();
    }
}

impl FromIterator<Quote> for PriceMap {
    fn from_iter<T: IntoIterator<Item = Quote>>(iter: T) -> Self {
        let mut map = PriceMap::new();
        for quote in iter {
            map.insert(quote);
        }
        map
    }
}

impl<'a> IntoIterator for &'a PriceMap {
    type Item = (&'a Symbol, &'a Quote);
    type IntoIter = btree_map::Iter<'a, Symbol, Quote>;

    fn into_iter(self) -> Self::IntoIter {
        self.quotes.iter()
    }
}

/// Outcome of one refresh tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshReport {
    /// Symbols requested this tick
    pub requested: usize,

    /// Symbols that returned a quote and were merged
    pub updated: Vec<Symbol>,

    /// Symbols with no quote this tick (their cached value, if any, is kept)
    pub missing: Vec<Symbol>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Placeholder rendered wherever a number is unavailable.
pub const NO_DATA: &str = "---";

/// Format an optional number with fixed decimals. Missing, NaN and
/// infinite values render as [`NO_DATA`].
pub fn display_number(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => NO_DATA.to_string(),
    }
}
