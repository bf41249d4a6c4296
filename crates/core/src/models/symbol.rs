use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Crypto tickers the quote providers route to a crypto market.
/// Anything outside this set is treated as an equity.
pub const CRYPTO_SYMBOLS: [&str; 9] = [
    "BTC", "ETH", "SOL", "DOGE", "ADA", "XRP", "DOT", "MATIC", "LINK",
];

/// Market class of a ticker. Determines how providers phrase the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    /// Crypto assets (BTC, ETH, ...), quoted against USDT
    Crypto,
    /// Stocks and ETFs (AAPL, MSFT, ...), queried as-is
    Equity,
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetClass::Crypto => write!(f, "Crypto"),
            AssetClass::Equity => write!(f, "Equity"),
        }
    }
}

/// A normalized ticker symbol: trimmed, uppercase, non-empty.
///
/// Allowed characters are ASCII letters, digits, `.` and `-` (for tickers
/// like `BRK.B`). Every map in the crate is keyed by `Symbol`, so two
/// spellings of the same ticker (`" aapl"`, `"AAPL"`) always collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Normalize and validate raw user input.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(CoreError::ValidationError("Symbol must not be empty".into()));
        }
        if let Some(bad) = normalized
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '-'))
        {
            return Err(CoreError::ValidationError(format!(
                "Invalid character '{bad}' in symbol '{raw}'"
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn asset_class(&self) -> AssetClass {
        if CRYPTO_SYMBOLS.contains(&self.0.as_str()) {
            AssetClass::Crypto
        } else {
            AssetClass::Equity
        }
    }

    pub fn is_crypto(&self) -> bool {
        self.asset_class() == AssetClass::Crypto
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Symbol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One result of a provider symbol search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMatch {
    /// Ticker as the provider queries it (e.g., "AAPL", "BINANCE:BTCUSDT")
    pub symbol: String,

    /// Ticker as shown to users
    pub display_symbol: String,

    /// Company or asset name
    pub description: String,

    /// Provider's instrument type (e.g., "Common Stock", "Crypto")
    pub kind: String,
}
