use async_trait::async_trait;
use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Mutex;

use super::traits::QuoteProvider;
use crate::errors::CoreError;
use crate::models::quote::Quote;
use crate::models::symbol::{AssetClass, Symbol, SymbolMatch};

/// Maximum simulated move away from the base price, as a fraction.
pub const MAX_DRIFT: f64 = 0.02;

/// Base price for symbols missing from [`BASE_PRICES`].
pub const DEFAULT_BASE_PRICE: f64 = 150.0;

/// Reference prices the simulator perturbs.
pub const BASE_PRICES: [(&str, &str, f64); 9] = [
    ("BTC", "Bitcoin", 65_000.0),
    ("ETH", "Ethereum", 3_500.0),
    ("SOL", "Solana", 145.0),
    ("AAPL", "Apple Inc.", 230.50),
    ("MSFT", "Microsoft Corp.", 420.20),
    ("GOOGL", "Alphabet Inc.", 175.40),
    ("AMZN", "Amazon.com", 190.80),
    ("TSLA", "Tesla, Inc.", 240.10),
    ("NVDA", "NVIDIA Corp.", 130.50),
];

/// Offline quote source used when no provider credential is configured.
///
/// Every quote is `base × (1 + u)` with `u` uniform in ±2%, so the rest of
/// the system stays exercisable without live data. Seed it for
/// reproducible sequences.
pub struct SimulatedProvider {
    rng: Mutex<ChaCha8Rng>,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    pub fn base_price(symbol: &Symbol) -> f64 {
        BASE_PRICES
            .iter()
            .find(|(s, _, _)| *s == symbol.as_str())
            .map(|(_, _, p)| *p)
            .unwrap_or(DEFAULT_BASE_PRICE)
    }

    fn drift(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(-MAX_DRIFT..=MAX_DRIFT)
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteProvider for SimulatedProvider {
    fn name(&self) -> &str {
        "Simulated"
    }

    fn supported_classes(&self) -> Vec<AssetClass> {
        vec![AssetClass::Crypto, AssetClass::Equity]
    }

    async fn get_quote(&self, symbol: &Symbol) -> Result<Quote, CoreError> {
        let base = Self::base_price(symbol);
        let drift = self.drift();
        let price = base * (1.0 + drift);

        Ok(Quote {
            symbol: symbol.clone(),
            price,
            absolute_change: price - base,
            percent_change: drift * 100.0,
            high: None,
            low: None,
            open: Some(base),
            previous_close: Some(base),
            fetched_at: Utc::now(),
        })
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        let q = query.trim().to_lowercase();
        Ok(BASE_PRICES
            .iter()
            .filter(|(sym, name, _)| {
                sym.to_lowercase().contains(&q) || name.to_lowercase().contains(&q)
            })
            .map(|(sym, name, _)| SymbolMatch {
                symbol: sym.to_string(),
                display_symbol: sym.to_string(),
                description: name.to_string(),
                kind: if crate::models::symbol::CRYPTO_SYMBOLS.contains(sym) {
                    "Crypto".to_string()
                } else {
                    "Common Stock".to_string()
                },
            })
            .collect())
    }
}
