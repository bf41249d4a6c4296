use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::models::quote::{PriceMap, RefreshReport};
use crate::models::symbol::Symbol;
use crate::services::price_service::{PriceService, SessionEpoch};

/// Refreshes a shared price map on a fixed interval.
///
/// Each tick runs as its own task, so a slow tick never delays the next
/// one. Overlapping ticks write into the same map one quote at a time;
/// whichever finishes last for a symbol wins. When bound to a
/// [`SessionEpoch`], a tick started before the epoch advances merges
/// nothing afterwards.
#[derive(Clone)]
pub struct PricePoller {
    prices: Arc<PriceService>,
    cache: Arc<RwLock<PriceMap>>,
    symbols: Arc<RwLock<BTreeSet<Symbol>>>,
    period: Duration,
    epoch: Option<Arc<SessionEpoch>>,
}

impl PricePoller {
    pub fn new(
        prices: Arc<PriceService>,
        cache: Arc<RwLock<PriceMap>>,
        symbols: Arc<RwLock<BTreeSet<Symbol>>>,
        period: Duration,
    ) -> Self {
        Self {
            prices,
            cache,
            symbols,
            period,
            epoch: None,
        }
    }

    /// Bind every tick to the session generation current when it starts.
    pub fn with_epoch(mut self, epoch: Arc<SessionEpoch>) -> Self {
        self.epoch = Some(epoch);
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run one refresh over the current symbol set.
    pub async fn tick(&self) -> RefreshReport {
        let symbols = self.symbols.read().unwrap_or_else(|e| e.into_inner()).clone();
        if symbols.is_empty() {
            return RefreshReport::default();
        }
        match &self.epoch {
            Some(epoch) => {
                self.prices
                    .refresh_in_session(&self.cache, &symbols, epoch)
                    .await
            }
            None => self.prices.refresh_shared(&self.cache, &symbols).await,
        }
    }

    /// Start polling in the background. The first tick fires immediately.
    /// Polling stops when the returned handle is stopped or dropped.
    pub fn spawn(self) -> PollerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let period = self.period;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut ticks = JoinSet::new();
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let poller = self.clone();
                        ticks.spawn(async move {
                            poller.tick().await;
                        });
                    }
                    Some(_) = ticks.join_next(), if !ticks.is_empty() => {}
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            let in_flight = ticks.len();
            ticks.shutdown().await;
            debug!(?period, in_flight, "price poller stopped");
        });

        PollerHandle {
            stop: stop_tx,
            task,
        }
    }
}

/// Owner of a running [`PricePoller`].
pub struct PollerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signal the poller to stop and wait for its loop to exit.
    /// Ticks still in flight are aborted; nothing merges after this returns.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
