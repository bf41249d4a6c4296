// ═══════════════════════════════════════════════════════════════════
// Integration Tests — PortfolioTracker end to end
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::time::Duration;

use quotefolio_core::errors::CoreError;
use quotefolio_core::models::quote::Quote;
use quotefolio_core::models::settings::{Settings, FINNHUB};
use quotefolio_core::models::symbol::{AssetClass, Symbol, SymbolMatch};
use quotefolio_core::providers::registry::QuoteProviderRegistry;
use quotefolio_core::providers::traits::QuoteProvider;
use quotefolio_core::services::holdings_service::SellOutcome;
use quotefolio_core::{PortfolioTracker, POPULAR_EQUITIES};

fn sym(s: &str) -> Symbol {
    Symbol::parse(s).unwrap()
}

/// Fixed prices; `OFFLINE` always fails; search returns eight matches.
struct FixedProvider;

#[async_trait]
impl QuoteProvider for FixedProvider {
    fn name(&self) -> &str {
        "Fixed"
    }

    fn supported_classes(&self) -> Vec<AssetClass> {
        vec![AssetClass::Crypto, AssetClass::Equity]
    }

    async fn get_quote(&self, symbol: &Symbol) -> Result<Quote, CoreError> {
        let (price, change) = match symbol.as_str() {
            "AAPL" => (200.0, 2.0),
            "MSFT" => (400.0, -4.0),
            "BTC" => (65_000.0, 1_000.0),
            "ETH" => (3_250.0, 50.0),
            "OFFLINE" => return Err(CoreError::Network("timed out".into())),
            other => {
                return Err(CoreError::SymbolNotFound {
                    provider: "Fixed".into(),
                    symbol: other.into(),
                })
            }
        };
        Ok(Quote::new(symbol.clone(), price, change, 0.0))
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        Ok((0..8)
            .map(|i| SymbolMatch {
                symbol: format!("{}{i}", query.to_uppercase()),
                display_symbol: format!("{}{i}", query.to_uppercase()),
                description: format!("Match {i}"),
                kind: "Common Stock".into(),
            })
            .collect())
    }
}

/// Every quote takes 200 ms to arrive.
struct SlowProvider;

#[async_trait]
impl QuoteProvider for SlowProvider {
    fn name(&self) -> &str {
        "Slow"
    }

    fn supported_classes(&self) -> Vec<AssetClass> {
        vec![AssetClass::Crypto, AssetClass::Equity]
    }

    async fn get_quote(&self, symbol: &Symbol) -> Result<Quote, CoreError> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(Quote::new(symbol.clone(), 1.0, 0.0, 0.0))
    }
}

fn fixed_tracker() -> PortfolioTracker {
    let mut registry = QuoteProviderRegistry::new();
    registry.register(Box::new(FixedProvider));
    PortfolioTracker::with_registry(Settings::default(), registry)
}

fn simulated_tracker() -> PortfolioTracker {
    PortfolioTracker::new(Settings::default())
}

// ── Holdings through the facade ─────────────────────────────────────

#[tokio::test]
async fn buy_refresh_and_summarize() {
    let mut tracker = fixed_tracker();
    tracker.buy("aapl", 10.0, 150.0).unwrap();
    tracker.buy("MSFT", 1.0, 500.0).unwrap();

    let report = tracker.refresh_prices().await;
    assert!(report.is_complete());

    let summary = tracker.summary();
    assert_eq!(summary.position_count, 2);
    assert_eq!(summary.total_value, 2_400.0);
    assert_eq!(summary.total_cost_basis, 2_000.0);
    assert_eq!(summary.total_profit_loss, 400.0);
    assert_eq!(summary.total_profit_loss_percent, 20.0);
    assert_eq!(summary.daily_profit_loss, 16.0);
    assert_eq!(summary.allocation[0].symbol, sym("AAPL"));
}

#[tokio::test]
async fn failed_refresh_keeps_last_known_price() {
    let mut tracker = fixed_tracker();
    tracker.buy("OFFLINE", 2.0, 10.0).unwrap();
    tracker.set_quote(Quote::new(sym("OFFLINE"), 12.0, 0.0, 0.0));

    let report = tracker.refresh_prices().await;

    assert_eq!(report.missing, vec![sym("OFFLINE")]);
    assert_eq!(tracker.get_quote(&sym("OFFLINE")).unwrap().price, 12.0);
    assert_eq!(tracker.summary().total_value, 24.0);
}

#[tokio::test]
async fn unquoted_position_is_valued_at_cost() {
    let mut tracker = fixed_tracker();
    tracker.buy("ZZZZ", 3.0, 7.0).unwrap();
    tracker.refresh_prices().await;

    let priced = tracker.priced_positions();
    assert!(priced[0].is_stale());
    assert_eq!(priced[0].current_value, 21.0);
    assert_eq!(priced[0].profit_loss, 0.0);
}

#[test]
fn sell_and_remove_update_tracked_symbols() {
    let mut tracker = fixed_tracker();
    let id = tracker.buy("AAPL", 2.0, 100.0).unwrap();
    assert!(tracker.tracked_symbols().contains(&sym("AAPL")));

    assert_eq!(tracker.sell(id, 1.0).unwrap(), SellOutcome::Reduced { remaining: 1.0 });
    assert_eq!(tracker.quantity_held("aapl").unwrap(), 1.0);

    assert!(matches!(tracker.sell(id, 1.0).unwrap(), SellOutcome::Closed(_)));
    assert!(tracker.get_position(id).is_none());
    assert!(tracker.tracked_symbols().is_empty());
    assert!(tracker.remove_position(id).is_err());
}

#[test]
fn invalid_symbols_are_rejected_at_the_boundary() {
    let mut tracker = fixed_tracker();
    assert!(matches!(
        tracker.buy("not a ticker", 1.0, 1.0),
        Err(CoreError::ValidationError(_))
    ));
    assert!(tracker.watch("").is_err());
    assert!(tracker.get_positions().is_empty());
}

// ── Pairs, watchlist, ratios ────────────────────────────────────────

#[tokio::test]
async fn pair_valuations_follow_refresh() {
    let mut tracker = fixed_tracker();
    tracker.add_pair("BTC", "ETH").unwrap();
    tracker.add_pair("AAPL", "NOPE").unwrap();

    let before = tracker.pair_valuations();
    assert!(before.iter().all(|v| v.ratio.is_none()));

    tracker.refresh_prices().await;
    let after = tracker.pair_valuations();

    assert_eq!(after[0].ratio, Some(20.0));
    assert_eq!(after[1].long_price, Some(200.0));
    assert_eq!(after[1].ratio, None);
    assert_eq!(tracker.ratio("btc", "eth").unwrap(), Some(20.0));
}

#[test]
fn pair_with_identical_legs_is_rejected() {
    let mut tracker = fixed_tracker();
    assert!(tracker.add_pair("ETH", "eth").is_err());
    assert!(tracker.get_pairs().is_empty());
}

#[test]
fn remove_pair_stops_tracking_legs() {
    let mut tracker = fixed_tracker();
    let id = tracker.add_pair("BTC", "ETH").unwrap();
    assert_eq!(tracker.tracked_symbols().len(), 2);

    tracker.remove_pair(id).unwrap();
    assert!(tracker.tracked_symbols().is_empty());
}

#[test]
fn watchlist_round_trip() {
    let mut tracker = fixed_tracker();
    assert!(tracker.watch("nvda").unwrap());
    assert!(!tracker.watch("NVDA").unwrap());
    assert!(tracker.get_watchlist().contains(&sym("NVDA")));

    assert!(tracker.unwatch("NVDA").unwrap());
    assert!(tracker.get_watchlist().is_empty());
}

#[tokio::test]
async fn market_ratio_refreshes_both_legs() {
    let tracker = fixed_tracker();
    assert_eq!(tracker.market_ratio().await, Some(20.0));
    assert!(tracker.get_quote(&sym("BTC")).is_some());
}

#[tokio::test]
async fn simulated_market_ratio_is_finite() {
    let tracker = simulated_tracker();
    let ratio = tracker.market_ratio().await.unwrap();
    assert!(ratio.is_finite());
    assert!(ratio > 0.0);
}

// ── Search & overview ───────────────────────────────────────────────

#[tokio::test]
async fn short_queries_are_not_searched() {
    let tracker = fixed_tracker();
    assert!(tracker.search_symbols("a").await.is_empty());
    assert!(tracker.search_symbols("  a  ").await.is_empty());
}

#[tokio::test]
async fn search_is_capped_at_five() {
    let tracker = fixed_tracker();
    let matches = tracker.search_symbols("ap").await;
    assert_eq!(matches.len(), 5);
    assert_eq!(matches[0].symbol, "AP0");
}

#[tokio::test]
async fn popular_quotes_in_listed_order() {
    let tracker = simulated_tracker();
    let quotes = tracker.popular_quotes().await;

    let got: Vec<&str> = quotes.iter().map(|(q, _)| q.symbol.as_str()).collect();
    let expected: Vec<&str> = POPULAR_EQUITIES.iter().map(|(s, _)| *s).collect();
    assert_eq!(got, expected);
    assert_eq!(quotes[0].1, "Apple Inc.");
}

#[tokio::test]
async fn popular_quotes_skip_failures() {
    let tracker = fixed_tracker();
    let quotes = tracker.popular_quotes().await;

    let got: Vec<&str> = quotes.iter().map(|(q, _)| q.symbol.as_str()).collect();
    assert_eq!(got, vec!["AAPL", "MSFT"]);
}

#[tokio::test]
async fn fetch_prices_leaves_session_cache_alone() {
    let tracker = fixed_tracker();
    let symbols: BTreeSet<Symbol> = [sym("AAPL")].into_iter().collect();

    let fresh = tracker.fetch_prices(&symbols).await;

    assert_eq!(fresh.len(), 1);
    assert!(tracker.price_map().is_empty());
}

// ── Session & settings ──────────────────────────────────────────────

#[tokio::test]
async fn end_session_clears_everything() {
    let mut tracker = fixed_tracker();
    tracker.buy("AAPL", 1.0, 1.0).unwrap();
    tracker.add_pair("BTC", "ETH").unwrap();
    tracker.watch("MSFT").unwrap();
    tracker.refresh_prices().await;
    assert!(!tracker.price_map().is_empty());

    tracker.end_session();

    assert!(tracker.price_map().is_empty());
    assert!(tracker.tracked_symbols().is_empty());
    assert_eq!(tracker.summary().position_count, 0);
}

#[tokio::test]
async fn end_session_discards_poll_in_flight() {
    let mut registry = QuoteProviderRegistry::new();
    registry.register(Box::new(SlowProvider));
    let mut tracker = PortfolioTracker::with_registry(Settings::default(), registry);
    tracker.buy("AAPL", 1.0, 1.0).unwrap();

    let pollers = tracker.start_polling();
    tokio::time::sleep(Duration::from_millis(50)).await;
    tracker.end_session();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(tracker.price_map().is_empty());
    assert!(tracker.get_positions().is_empty());
    pollers.stop().await;
    assert!(tracker.price_map().is_empty());
}

#[tokio::test]
async fn new_session_after_logout_refreshes_again() {
    let mut tracker = fixed_tracker();
    tracker.buy("AAPL", 1.0, 1.0).unwrap();
    tracker.refresh_prices().await;
    tracker.end_session();

    tracker.buy("MSFT", 1.0, 1.0).unwrap();
    let report = tracker.refresh_prices().await;

    assert_eq!(report.updated, vec![sym("MSFT")]);
    assert_eq!(tracker.price_map().len(), 1);
}

#[test]
fn defaults_are_simulated() {
    let tracker = simulated_tracker();
    assert!(tracker.is_simulated());
    assert_eq!(tracker.get_provider_names(), vec!["Simulated".to_string()]);
    assert!(tracker.is_provider_available(AssetClass::Crypto));
    assert!(tracker.is_provider_available(AssetClass::Equity));
}

#[test]
fn api_key_switches_provider() {
    let mut tracker = simulated_tracker();

    tracker.set_api_key(FINNHUB.to_string(), "test-key".to_string());
    assert!(!tracker.is_simulated());
    assert_eq!(tracker.get_provider_names(), vec!["Finnhub".to_string()]);

    assert!(tracker.remove_api_key(FINNHUB));
    assert!(tracker.is_simulated());
    assert_eq!(tracker.get_provider_names(), vec!["Simulated".to_string()]);
    assert!(!tracker.remove_api_key(FINNHUB));
}

#[tokio::test]
async fn polling_populates_cache_and_stops() {
    let mut tracker = fixed_tracker();
    tracker.buy("AAPL", 1.0, 1.0).unwrap();
    tracker.add_pair("BTC", "ETH").unwrap();

    let pollers = tracker.start_polling();
    tokio::time::timeout(Duration::from_secs(5), async {
        while tracker.price_map().len() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("pollers never refreshed");

    pollers.stop().await;
    assert_eq!(tracker.ratio("BTC", "ETH").unwrap(), Some(20.0));
}

#[tokio::test]
async fn pollers_pick_up_new_symbols() {
    let mut tracker = fixed_tracker();
    let pollers = tracker.start_polling();

    tracker.watch("MSFT").unwrap();
    let report = tracker.refresh_prices().await;
    assert_eq!(report.updated, vec![sym("MSFT")]);

    pollers.stop().await;
}

#[test]
fn export_json() {
    let mut tracker = fixed_tracker();
    tracker.buy("AAPL", 1.5, 100.0).unwrap();
    tracker.watch("NVDA").unwrap();

    let json = tracker.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["positions"][0]["symbol"], "AAPL");
    assert_eq!(value["positions"][0]["quantity"], 1.5);
    assert_eq!(value["watchlist"][0], "NVDA");
    assert!(value["pairs"].as_array().unwrap().is_empty());
}
