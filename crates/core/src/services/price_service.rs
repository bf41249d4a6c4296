use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::debug;

use crate::models::quote::{PriceMap, Quote, RefreshReport};
use crate::models::symbol::Symbol;
use crate::services::quote_service::QuoteService;

/// Generation counter for a session-owned price map.
///
/// Advancing it invalidates every [`PriceService::refresh_in_session`]
/// started under an earlier generation. Advance before clearing the map.
#[derive(Debug, Default)]
pub struct SessionEpoch(AtomicU64);

impl SessionEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Start a new generation and return it.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Fans quote fetches out across a symbol set and merges the results.
///
/// All fetches in a batch run concurrently and independently: a symbol
/// that fails is simply missing from the result, it never aborts its
/// siblings. The only state that outlives a batch is the cumulative
/// [`PriceMap`] the caller hands in.
pub struct PriceService {
    quotes: QuoteService,
}

impl PriceService {
    pub fn new(quotes: QuoteService) -> Self {
        Self { quotes }
    }

    pub fn quote_service(&self) -> &QuoteService {
        &self.quotes
    }

    /// Fetch every symbol concurrently and return only the ones that
    /// produced a quote.
    pub async fn fetch_prices(&self, symbols: &BTreeSet<Symbol>) -> PriceMap {
        let results = join_all(symbols.iter().map(|s| self.quotes.fetch_quote(s))).await;
        let fresh: PriceMap = results.into_iter().flatten().collect();

        debug!(requested = symbols.len(), received = fresh.len(), "price batch settled");
        fresh
    }

    /// Fetch every symbol and merge each quote into `cache` as soon as it
    /// arrives. Symbols without a quote leave their cached entry untouched.
    pub async fn refresh(&self, cache: &mut PriceMap, symbols: &BTreeSet<Symbol>) -> RefreshReport {
        let mut report = RefreshReport {
            requested: symbols.len(),
            ..RefreshReport::default()
        };

        let mut pending = self.pending(symbols);
        while let Some((symbol, quote)) = pending.next().await {
            match quote {
                Some(q) => {
                    cache.insert(q);
                    report.updated.push(symbol.clone());
                }
                None => report.missing.push(symbol.clone()),
            }
        }

        finish(report)
    }

    /// Like [`PriceService::refresh`], for a cache shared between tasks.
    /// The write lock is taken once per arriving quote and never held
    /// across an await, so overlapping refreshes interleave safely with
    /// last-writer-wins per symbol.
    pub async fn refresh_shared(
        &self,
        cache: &RwLock<PriceMap>,
        symbols: &BTreeSet<Symbol>,
    ) -> RefreshReport {
        self.refresh_locked(cache, symbols, None).await
    }

    /// Like [`PriceService::refresh_shared`], bound to the epoch current
    /// when the refresh starts. Once the epoch advances, quotes still in
    /// flight are dropped instead of merged.
    pub async fn refresh_in_session(
        &self,
        cache: &RwLock<PriceMap>,
        symbols: &BTreeSet<Symbol>,
        epoch: &SessionEpoch,
    ) -> RefreshReport {
        self.refresh_locked(cache, symbols, Some((epoch, epoch.current())))
            .await
    }

    async fn refresh_locked(
        &self,
        cache: &RwLock<PriceMap>,
        symbols: &BTreeSet<Symbol>,
        session: Option<(&SessionEpoch, u64)>,
    ) -> RefreshReport {
        let mut report = RefreshReport {
            requested: symbols.len(),
            ..RefreshReport::default()
        };

        let mut pending = self.pending(symbols);
        while let Some((symbol, quote)) = pending.next().await {
            let Some(q) = quote else {
                report.missing.push(symbol.clone());
                continue;
            };

            // checked under the write lock so an epoch advance followed by
            // a clear can never interleave with this insert
            let mut map = cache.write().unwrap_or_else(|e| e.into_inner());
            if let Some((epoch, started)) = session {
                if epoch.current() != started {
                    debug!(started, current = epoch.current(), "session ended, dropping refresh");
                    return finish(report);
                }
            }
            map.insert(q);
            report.updated.push(symbol.clone());
        }

        finish(report)
    }

    fn pending<'a>(
        &'a self,
        symbols: &'a BTreeSet<Symbol>,
    ) -> FuturesUnordered<impl std::future::Future<Output = (&'a Symbol, Option<Quote>)> + 'a> {
        symbols
            .iter()
            .map(|symbol| async move { (symbol, self.quotes.fetch_quote(symbol).await) })
            .collect()
    }
}

fn finish(mut report: RefreshReport) -> RefreshReport {
    // arrival order is nondeterministic
    report.updated.sort();
    report.missing.sort();
    debug!(
        requested = report.requested,
        updated = report.updated.len(),
        missing = report.missing.len(),
        "price refresh settled"
    );
    report
}
