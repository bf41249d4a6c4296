use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::quote::Quote;
use crate::models::symbol::{AssetClass, Symbol, SymbolMatch};
use crate::providers::registry::QuoteProviderRegistry;

/// Fetches a single quote per symbol, absorbing every failure.
///
/// Providers are tried in registration order for the symbol's asset class.
/// Network errors, bad payloads and unknown symbols all end up as `None`
/// plus a `warn` log line; nothing is retried here, the next poll is the
/// retry.
pub struct QuoteService {
    registry: QuoteProviderRegistry,
}

impl QuoteService {
    pub fn new(registry: QuoteProviderRegistry) -> Self {
        Self { registry }
    }

    /// Check if at least one provider can quote the given asset class.
    pub fn has_provider_for(&self, class: AssetClass) -> bool {
        self.registry.get_provider_for(class).is_some()
    }

    /// Names of all registered providers, in priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Latest quote for `symbol`, or `None` if no provider produced one.
    pub async fn fetch_quote(&self, symbol: &Symbol) -> Option<Quote> {
        let class = symbol.asset_class();
        let providers = self.registry.get_providers_for(class);
        if providers.is_empty() {
            warn!(%symbol, %class, "no quote provider registered");
            return None;
        }

        for provider in providers {
            match provider.get_quote(symbol).await {
                Ok(quote) => {
                    debug!(%symbol, provider = provider.name(), price = quote.price, "quote received");
                    return Some(quote);
                }
                Err(CoreError::SymbolNotFound { .. }) => {
                    warn!(
                        %symbol,
                        provider = provider.name(),
                        query = %provider.query_symbol(symbol),
                        "symbol not found"
                    );
                }
                Err(e) => {
                    warn!(%symbol, provider = provider.name(), error = %e, "quote fetch failed");
                }
            }
        }

        None
    }

    /// Search the first provider that answers for tickers matching `query`.
    /// Provider errors are logged and yield an empty list.
    pub async fn search_symbols(&self, query: &str) -> Vec<SymbolMatch> {
        let providers = self.registry.get_providers_for(AssetClass::Equity);
        for provider in providers {
            match provider.search_symbols(query).await {
                Ok(matches) => return matches,
                Err(e) => {
                    warn!(query, provider = provider.name(), error = %e, "symbol search failed");
                }
            }
        }
        Vec::new()
    }
}
