use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::quote::Quote;
use crate::models::symbol::{AssetClass, Symbol, SymbolMatch};

/// Trait abstraction for all quote sources.
///
/// Each backend (Finnhub, the offline simulator, test doubles) implements
/// this trait. Errors returned here are reported to the quote service,
/// which logs them and turns them into an absent quote.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Which asset classes this provider can quote.
    fn supported_classes(&self) -> Vec<AssetClass>;

    /// Provider-specific query string for a symbol.
    /// Defaults to the symbol itself.
    fn query_symbol(&self, symbol: &Symbol) -> String {
        symbol.to_string()
    }

    /// Fetch the latest quote for a symbol.
    ///
    /// Unknown symbols should be reported as `CoreError::SymbolNotFound`.
    async fn get_quote(&self, symbol: &Symbol) -> Result<Quote, CoreError>;

    /// Look up tickers matching free text. Providers without a search
    /// endpoint return no matches.
    async fn search_symbols(&self, _query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        Ok(Vec::new())
    }
}
