use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::pair::PairDefinition;
use super::position::Position;
use super::symbol::Symbol;

/// The user's tracked state: held lots, watched pairs and watched symbols.
///
/// This is the in-memory counterpart of the external holdings and pair
/// stores. The valuation code never reads it directly; it only sees the
/// positions and pairs handed to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Open lots, in insertion order
    pub positions: Vec<Position>,

    /// Tracked long/short pairs, in insertion order
    pub pairs: Vec<PairDefinition>,

    /// Symbols watched without being held
    #[serde(default)]
    pub watchlist: BTreeSet<Symbol>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every symbol that needs a price: held, paired or watched.
    pub fn tracked_symbols(&self) -> BTreeSet<Symbol> {
        let mut symbols = self.held_symbols();
        symbols.extend(self.watched_symbols());
        symbols
    }

    /// Symbols of pair legs and the watchlist, held or not.
    pub fn watched_symbols(&self) -> BTreeSet<Symbol> {
        let mut symbols = self.watchlist.clone();
        for pair in &self.pairs {
            symbols.insert(pair.long_symbol.clone());
            symbols.insert(pair.short_symbol.clone());
        }
        symbols
    }

    /// Symbols of held positions only.
    pub fn held_symbols(&self) -> BTreeSet<Symbol> {
        self.positions.iter().map(|p| p.symbol.clone()).collect()
    }
}
