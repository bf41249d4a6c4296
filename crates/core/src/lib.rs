pub mod errors;
pub mod models;
pub mod providers;
pub mod services;

use models::{
    pair::{PairDefinition, PairValuation},
    portfolio::Portfolio,
    position::Position,
    quote::{PriceMap, Quote, RefreshReport},
    settings::Settings,
    symbol::{AssetClass, Symbol, SymbolMatch},
    valuation::{PortfolioSummary, PricedPosition},
};
use providers::registry::QuoteProviderRegistry;
use services::{
    holdings_service::{HoldingsService, SellOutcome},
    poller::{PollerHandle, PricePoller},
    price_service::{PriceService, SessionEpoch},
    quote_service::QuoteService,
    ratio_service::RatioService,
    valuation_service::ValuationService,
};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use errors::CoreError;

/// Queries shorter than this are not sent to the symbol search.
const MIN_SEARCH_LEN: usize = 2;

/// Maximum number of symbol search results returned.
const MAX_SEARCH_RESULTS: usize = 5;

/// Equities shown on the market overview, with display names.
pub const POPULAR_EQUITIES: [(&str, &str); 6] = [
    ("AAPL", "Apple Inc."),
    ("NVDA", "NVIDIA Corp."),
    ("MSFT", "Microsoft Corp."),
    ("TSLA", "Tesla, Inc."),
    ("AMZN", "Amazon.com"),
    ("GOOGL", "Alphabet Inc."),
];

/// Main entry point for the Quotefolio core library.
///
/// One tracker is one user session: it owns the tracked portfolio, the
/// quote services, and the cumulative price map. The map is created empty
/// with the session and cleared by [`PortfolioTracker::end_session`].
#[must_use]
pub struct PortfolioTracker {
    portfolio: Portfolio,
    settings: Settings,
    holdings_service: HoldingsService,
    price_service: Arc<PriceService>,
    valuation_service: ValuationService,
    ratio_service: RatioService,
    price_cache: Arc<RwLock<PriceMap>>,
    /// Advanced by `end_session` so in-flight refreshes of the old session
    /// never repopulate the cleared map.
    session_epoch: Arc<SessionEpoch>,
    /// Symbol sets the background pollers read; kept in sync with `portfolio`.
    held_symbols: Arc<RwLock<BTreeSet<Symbol>>>,
    watched_symbols: Arc<RwLock<BTreeSet<Symbol>>>,
}

impl std::fmt::Debug for PortfolioTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioTracker")
            .field("positions", &self.portfolio.positions.len())
            .field("pairs", &self.portfolio.pairs.len())
            .field("watchlist", &self.portfolio.watchlist.len())
            .field("cached_quotes", &self.read_cache().len())
            .field("simulated", &self.settings.is_simulated())
            .finish()
    }
}

/// Background pollers started by [`PortfolioTracker::start_polling`].
pub struct SessionPollers {
    /// Refreshes held symbols on `asset_poll_secs`
    pub assets: PollerHandle,
    /// Refreshes pair and watchlist symbols on `watch_poll_secs`
    pub watch: PollerHandle,
}

impl SessionPollers {
    pub async fn stop(self) {
        self.assets.stop().await;
        self.watch.stop().await;
    }
}

impl PortfolioTracker {
    /// Start a session with settings taken from the environment.
    pub fn from_env() -> Self {
        Self::new(Settings::from_env())
    }

    /// Start a session with an empty portfolio.
    pub fn new(settings: Settings) -> Self {
        let registry = QuoteProviderRegistry::new_with_defaults(&settings);
        Self::with_registry(settings, registry)
    }

    /// Start a session with a custom provider registry (tests, extra providers).
    pub fn with_registry(settings: Settings, registry: QuoteProviderRegistry) -> Self {
        Self::build(Portfolio::new(), settings, registry)
    }

    /// Resume a session over an existing portfolio snapshot.
    pub fn with_portfolio(portfolio: Portfolio, settings: Settings) -> Self {
        let registry = QuoteProviderRegistry::new_with_defaults(&settings);
        Self::build(portfolio, settings, registry)
    }

    /// Forget every cached quote and tracked item (logout).
    ///
    /// Running pollers stay alive but poll nothing until symbols are
    /// tracked again; ticks and refreshes already in flight are discarded.
    pub fn end_session(&mut self) {
        let epoch = self.session_epoch.advance();
        self.write_cache().clear();
        debug!(epoch, "session ended");
        self.portfolio = Portfolio::new();
        self.sync_polled_symbols();
    }

    // ── Positions ───────────────────────────────────────────────────

    /// Record a buy as a new position. Returns the position id.
    pub fn buy(&mut self, symbol: &str, quantity: f64, price: f64) -> Result<Uuid, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        let id = self
            .holdings_service
            .buy(&mut self.portfolio, symbol, quantity, price)?;
        self.sync_polled_symbols();
        Ok(id)
    }

    /// Insert an existing position record.
    pub fn add_position(&mut self, position: Position) -> Result<Uuid, CoreError> {
        let id = self
            .holdings_service
            .add_position(&mut self.portfolio, position)?;
        self.sync_polled_symbols();
        Ok(id)
    }

    /// Sell from one position; a full sell closes it.
    pub fn sell(&mut self, position_id: Uuid, quantity: f64) -> Result<SellOutcome, CoreError> {
        let outcome = self
            .holdings_service
            .sell(&mut self.portfolio, position_id, quantity)?;
        self.sync_polled_symbols();
        Ok(outcome)
    }

    /// Delete a position regardless of quantity.
    pub fn remove_position(&mut self, position_id: Uuid) -> Result<Position, CoreError> {
        let removed = self
            .holdings_service
            .remove_position(&mut self.portfolio, position_id)?;
        self.sync_polled_symbols();
        Ok(removed)
    }

    #[must_use]
    pub fn get_position(&self, position_id: Uuid) -> Option<&Position> {
        self.portfolio.positions.iter().find(|p| p.id == position_id)
    }

    /// All positions, most recently opened first.
    #[must_use]
    pub fn get_positions(&self) -> Vec<&Position> {
        self.holdings_service.get_positions(&self.portfolio)
    }

    /// Total units held across every lot of a symbol.
    pub fn quantity_held(&self, symbol: &str) -> Result<f64, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        Ok(self.holdings_service.quantity_held(&self.portfolio, &symbol))
    }

    // ── Pairs & Watchlist ───────────────────────────────────────────

    pub fn add_pair(&mut self, long_symbol: &str, short_symbol: &str) -> Result<Uuid, CoreError> {
        let long_symbol = Symbol::parse(long_symbol)?;
        let short_symbol = Symbol::parse(short_symbol)?;
        let id = self
            .holdings_service
            .add_pair(&mut self.portfolio, long_symbol, short_symbol)?;
        self.sync_polled_symbols();
        Ok(id)
    }

    pub fn remove_pair(&mut self, pair_id: Uuid) -> Result<PairDefinition, CoreError> {
        let removed = self
            .holdings_service
            .remove_pair(&mut self.portfolio, pair_id)?;
        self.sync_polled_symbols();
        Ok(removed)
    }

    #[must_use]
    pub fn get_pairs(&self) -> &[PairDefinition] {
        &self.portfolio.pairs
    }

    /// Watch a symbol. Returns `false` if it was already watched.
    pub fn watch(&mut self, symbol: &str) -> Result<bool, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        let added = self.holdings_service.watch(&mut self.portfolio, symbol);
        self.sync_polled_symbols();
        Ok(added)
    }

    /// Stop watching a symbol. Returns `false` if it was not watched.
    pub fn unwatch(&mut self, symbol: &str) -> Result<bool, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        let removed = self.holdings_service.unwatch(&mut self.portfolio, &symbol);
        self.sync_polled_symbols();
        Ok(removed)
    }

    #[must_use]
    pub fn get_watchlist(&self) -> &BTreeSet<Symbol> {
        &self.portfolio.watchlist
    }

    /// Every symbol the session needs prices for.
    #[must_use]
    pub fn tracked_symbols(&self) -> BTreeSet<Symbol> {
        self.portfolio.tracked_symbols()
    }

    #[must_use]
    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    // ── Prices ──────────────────────────────────────────────────────

    /// Poll every tracked symbol once and merge the results.
    pub async fn refresh_prices(&self) -> RefreshReport {
        let symbols = self.tracked_symbols();
        self.refresh_symbols(&symbols).await
    }

    /// Poll an explicit symbol set once and merge the results.
    pub async fn refresh_symbols(&self, symbols: &BTreeSet<Symbol>) -> RefreshReport {
        self.price_service
            .refresh_in_session(&self.price_cache, symbols, &self.session_epoch)
            .await
    }

    /// Fetch a fresh map for `symbols` without touching the session cache.
    pub async fn fetch_prices(&self, symbols: &BTreeSet<Symbol>) -> PriceMap {
        self.price_service.fetch_prices(symbols).await
    }

    /// Quotes for the popular equities list, fetched concurrently.
    /// Symbols that fail are left out.
    pub async fn popular_quotes(&self) -> Vec<(Quote, &'static str)> {
        let symbols: BTreeSet<Symbol> = POPULAR_EQUITIES
            .iter()
            .filter_map(|(s, _)| Symbol::parse(s).ok())
            .collect();
        let fresh = self.price_service.fetch_prices(&symbols).await;

        POPULAR_EQUITIES
            .iter()
            .filter_map(|(s, name)| {
                let symbol = Symbol::parse(s).ok()?;
                fresh.get(&symbol).cloned().map(|q| (q, *name))
            })
            .collect()
    }

    /// Snapshot of the cumulative price map.
    #[must_use]
    pub fn price_map(&self) -> PriceMap {
        self.read_cache().clone()
    }

    #[must_use]
    pub fn get_quote(&self, symbol: &Symbol) -> Option<Quote> {
        self.read_cache().get(symbol).cloned()
    }

    /// Manually insert a quote (offline use, tests).
    pub fn set_quote(&self, quote: Quote) {
        self.write_cache().insert(quote);
    }

    /// Search provider symbols. Queries shorter than two characters
    /// return nothing; at most five matches are returned.
    pub async fn search_symbols(&self, query: &str) -> Vec<SymbolMatch> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            return Vec::new();
        }
        let mut matches = self.price_service.quote_service().search_symbols(query).await;
        matches.truncate(MAX_SEARCH_RESULTS);
        matches
    }

    /// Start background polling: held symbols every `asset_poll_secs`,
    /// pair and watchlist symbols every `watch_poll_secs`.
    /// Must be called from within a Tokio runtime.
    pub fn start_polling(&self) -> SessionPollers {
        let assets = PricePoller::new(
            Arc::clone(&self.price_service),
            Arc::clone(&self.price_cache),
            Arc::clone(&self.held_symbols),
            Duration::from_secs(self.settings.asset_poll_secs.max(1)),
        )
        .with_epoch(Arc::clone(&self.session_epoch));
        let watch = PricePoller::new(
            Arc::clone(&self.price_service),
            Arc::clone(&self.price_cache),
            Arc::clone(&self.watched_symbols),
            Duration::from_secs(self.settings.watch_poll_secs.max(1)),
        )
        .with_epoch(Arc::clone(&self.session_epoch));
        SessionPollers {
            assets: assets.spawn(),
            watch: watch.spawn(),
        }
    }

    // ── Valuation ───────────────────────────────────────────────────

    /// Every position valued against the current price map, newest first.
    #[must_use]
    pub fn priced_positions(&self) -> Vec<PricedPosition> {
        let prices = self.read_cache();
        self.get_positions()
            .into_iter()
            .map(|p| self.valuation_service.value_position(p, &prices))
            .collect()
    }

    /// Totals, P&L and allocation for the whole portfolio.
    #[must_use]
    pub fn summary(&self) -> PortfolioSummary {
        self.valuation_service.summarize(&self.priced_positions())
    }

    /// Every tracked pair with its current ratio.
    #[must_use]
    pub fn pair_valuations(&self) -> Vec<PairValuation> {
        self.ratio_service
            .value_pairs(&self.portfolio.pairs, &self.read_cache())
    }

    /// Ratio of two arbitrary symbols from the current price map.
    pub fn ratio(&self, long_symbol: &str, short_symbol: &str) -> Result<Option<f64>, CoreError> {
        let long_symbol = Symbol::parse(long_symbol)?;
        let short_symbol = Symbol::parse(short_symbol)?;
        Ok(self
            .ratio_service
            .compute_ratio(&long_symbol, &short_symbol, &self.read_cache()))
    }

    /// The BTC/ETH headline ratio, polled independently of user pairs.
    pub async fn market_ratio(&self) -> Option<f64> {
        let btc = Symbol::parse("BTC").ok()?;
        let eth = Symbol::parse("ETH").ok()?;
        let symbols: BTreeSet<Symbol> = [btc.clone(), eth.clone()].into_iter().collect();
        self.refresh_symbols(&symbols).await;
        self.ratio_service
            .compute_ratio(&btc, &eth, &self.read_cache())
    }

    // ── Settings & Providers ────────────────────────────────────────

    #[must_use]
    pub fn get_settings(&self) -> &Settings {
        &self.settings
    }

    /// `true` when quotes come from the simulator rather than a live provider.
    #[must_use]
    pub fn is_simulated(&self) -> bool {
        self.settings.is_simulated()
    }

    /// Set an API key for a provider (e.g., "finnhub").
    /// Rebuilds the provider registry so the new key takes effect immediately.
    /// Pollers already running keep the registry they were started with.
    pub fn set_api_key(&mut self, provider: String, key: String) {
        self.settings.api_keys.insert(provider, key);
        self.rebuild_registry();
    }

    /// Remove an API key for a provider.
    /// Rebuilds the provider registry so the removal takes effect immediately.
    pub fn remove_api_key(&mut self, provider: &str) -> bool {
        let removed = self.settings.api_keys.remove(provider).is_some();
        if removed {
            self.rebuild_registry();
        }
        removed
    }

    #[must_use]
    pub fn is_provider_available(&self, class: AssetClass) -> bool {
        self.price_service.quote_service().has_provider_for(class)
    }

    #[must_use]
    pub fn get_provider_names(&self) -> Vec<String> {
        self.price_service.quote_service().provider_names()
    }

    // ── Export ──────────────────────────────────────────────────────

    /// Serialize positions, pairs and watchlist as JSON.
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.portfolio)
            .map_err(|e| CoreError::Deserialization(format!("Failed to serialize portfolio: {e}")))
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(portfolio: Portfolio, settings: Settings, registry: QuoteProviderRegistry) -> Self {
        let mut tracker = Self {
            portfolio,
            settings,
            holdings_service: HoldingsService::new(),
            price_service: Arc::new(PriceService::new(QuoteService::new(registry))),
            valuation_service: ValuationService::new(),
            ratio_service: RatioService::new(),
            price_cache: Arc::new(RwLock::new(PriceMap::new())),
            session_epoch: Arc::new(SessionEpoch::new()),
            held_symbols: Arc::new(RwLock::new(BTreeSet::new())),
            watched_symbols: Arc::new(RwLock::new(BTreeSet::new())),
        };
        tracker.sync_polled_symbols();
        tracker
    }

    fn rebuild_registry(&mut self) {
        let registry = QuoteProviderRegistry::new_with_defaults(&self.settings);
        self.price_service = Arc::new(PriceService::new(QuoteService::new(registry)));
    }

    fn sync_polled_symbols(&mut self) {
        let held = self.portfolio.held_symbols();
        let watched = self.portfolio.watched_symbols();

        *self.held_symbols.write().unwrap_or_else(|e| e.into_inner()) = held;
        *self.watched_symbols.write().unwrap_or_else(|e| e.into_inner()) = watched;
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, PriceMap> {
        self.price_cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_cache(&self) -> std::sync::RwLockWriteGuard<'_, PriceMap> {
        self.price_cache.write().unwrap_or_else(|e| e.into_inner())
    }
}
