use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use super::traits::QuoteProvider;
use crate::errors::CoreError;
use crate::models::quote::Quote;
use crate::models::settings::NotFoundRule;
use crate::models::symbol::{AssetClass, Symbol, SymbolMatch};

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER: &str = "Finnhub";

/// Finnhub API provider for equity and crypto quotes.
///
/// - **Requires**: API key (set via settings as "finnhub").
/// - **Endpoints**: `/quote?symbol=`, `/search?q=`
/// - **Crypto**: routed through Binance USDT markets (`BTC` → `BINANCE:BTCUSDT`).
///
/// Finnhub replies to unknown symbols with HTTP 200 and zeros everywhere;
/// the configured [`NotFoundRule`] decides when that means "not found".
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
    base_url: String,
    not_found: NotFoundRule,
}

impl FinnhubProvider {
    pub fn new(api_key: String, timeout: Duration, not_found: NotFoundRule) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            warn!(error = %e, ?timeout, "HTTP client setup failed, requests will run without a timeout");
            Client::new()
        });
        Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
            not_found,
        }
    }

    /// Point the provider at a different host (proxies, local stubs).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn not_found_rule(&self) -> NotFoundRule {
        self.not_found
    }

    /// Crypto symbols map to their Binance USDT market, equities pass through.
    pub fn market_symbol(symbol: &Symbol) -> String {
        match symbol.asset_class() {
            AssetClass::Crypto => format!("BINANCE:{symbol}USDT"),
            AssetClass::Equity => symbol.to_string(),
        }
    }
}

// ── Finnhub API response types ──────────────────────────────────────

/// `/quote` body. Every field is optional: unknown symbols come back as
/// zeros or nulls, and nothing here is trusted until validated.
#[derive(Debug, Default, Deserialize)]
pub struct FinnhubQuote {
    /// Current price
    pub c: Option<f64>,
    /// Change
    pub d: Option<f64>,
    /// Percent change
    pub dp: Option<f64>,
    /// Day high
    pub h: Option<f64>,
    /// Day low
    pub l: Option<f64>,
    /// Day open
    pub o: Option<f64>,
    /// Previous close
    pub pc: Option<f64>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchEntry>,
}

#[derive(Deserialize)]
struct SearchEntry {
    #[serde(default)]
    description: String,
    #[serde(rename = "displaySymbol", default)]
    display_symbol: String,
    symbol: String,
    #[serde(rename = "type", default)]
    kind: String,
}

/// Validate a raw `/quote` body into a [`Quote`].
///
/// Fails with `SymbolNotFound` when the price is missing or the not-found
/// rule matches, and with `Api` for negative or non-finite prices.
pub fn parse_quote(symbol: &Symbol, body: &str, rule: NotFoundRule) -> Result<Quote, CoreError> {
    let raw: FinnhubQuote = serde_json::from_str(body).map_err(|e| CoreError::Api {
        provider: PROVIDER.into(),
        message: format!("Failed to parse quote for {symbol}: {e}"),
    })?;
    into_quote(symbol, raw, rule)
}

fn into_quote(symbol: &Symbol, raw: FinnhubQuote, rule: NotFoundRule) -> Result<Quote, CoreError> {
    let not_found = || CoreError::SymbolNotFound {
        provider: PROVIDER.into(),
        symbol: symbol.to_string(),
    };

    let price = raw.c.ok_or_else(not_found)?;
    if rule.is_not_found(price, raw.h) {
        return Err(not_found());
    }
    if !price.is_finite() || price < 0.0 {
        return Err(CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid price returned for {symbol}: {price}"),
        });
    }

    Ok(Quote {
        symbol: symbol.clone(),
        price,
        absolute_change: raw.d.unwrap_or(0.0),
        percent_change: raw.dp.unwrap_or(0.0),
        high: raw.h,
        low: raw.l,
        open: raw.o,
        previous_close: raw.pc,
        fetched_at: Utc::now(),
    })
}

#[async_trait]
impl QuoteProvider for FinnhubProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_classes(&self) -> Vec<AssetClass> {
        vec![AssetClass::Crypto, AssetClass::Equity]
    }

    fn query_symbol(&self, symbol: &Symbol) -> String {
        Self::market_symbol(symbol)
    }

    async fn get_quote(&self, symbol: &Symbol) -> Result<Quote, CoreError> {
        let url = format!("{}/quote", self.base_url);
        let query = self.query_symbol(symbol);

        let raw: FinnhubQuote = self
            .client
            .get(&url)
            .query(&[("symbol", query.as_str()), ("token", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse quote for {symbol}: {e}"),
            })?;

        into_quote(symbol, raw, self.not_found)
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        let url = format!("{}/search", self.base_url);

        let resp: SearchResponse = self
            .client
            .get(&url)
            .query(&[("q", query), ("token", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse search results for '{query}': {e}"),
            })?;

        Ok(resp
            .result
            .into_iter()
            .map(|e| SymbolMatch {
                symbol: e.symbol,
                display_symbol: e.display_symbol,
                description: e.description,
                kind: e.kind,
            })
            .collect())
    }
}
