use crate::broker_client::ChainSource;
use crate::config::CollectorConfig;
use crate::detector;
use crate::max_pain;
use crate::models::OptionChain;
use crate::store::{ChainSummary, Store, StoredQuote};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{error, info, warn};

/// Snapshot of the collector's process-wide state. Not persisted; a
/// restart comes back stopped.
#[derive(Debug, Clone, Serialize)]
pub struct CollectorStatus {
    pub running: bool,
    pub symbols: Vec<String>,
    pub poll_interval_ms: u64,
    pub naked_threshold: f64,
    pub cycles_completed: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

/// Owns the polling loop: start/stop lifecycle plus the per-cycle
/// fetch -> detect -> persist sequence.
#[derive(Clone)]
pub struct Collector {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn ChainSource>,
    store: Arc<dyn Store>,
    config: CollectorConfig,
    // Present while running; sending true cancels the loop
    cancel: Mutex<Option<watch::Sender<bool>>>,
    cycles: AtomicU64,
    last_cycle_at: RwLock<Option<DateTime<Utc>>>,
}

impl Collector {
    pub fn new(source: Arc<dyn ChainSource>, store: Arc<dyn Store>, config: CollectorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                store,
                config,
                cancel: Mutex::new(None),
                cycles: AtomicU64::new(0),
                last_cycle_at: RwLock::new(None),
            }),
        }
    }

    /// Begin collecting: one immediate cycle, then one per interval.
    ///
    /// Idempotent: calling start on a running collector logs and returns.
    pub async fn start(&self) {
        let mut cancel = self.inner.cancel.lock().await;
        if cancel.is_some() {
            info!("collector already running, start ignored");
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        *cancel = Some(tx);

        info!(
            symbols = ?self.inner.config.symbols,
            interval_ms = self.inner.config.poll_interval.as_millis() as u64,
            "collector started"
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                inner.run_cycle().await;

                // Await the delay, but wake early on cancellation. A stop
                // only prevents future cycles; the cycle above always runs
                // to completion.
                tokio::select! {
                    _ = tokio::time::sleep(inner.config.poll_interval) => {}
                    _ = rx.changed() => {}
                }
                if *rx.borrow() {
                    info!("collector loop exiting");
                    break;
                }
            }
        });
    }

    /// Signal the loop to stop re-arming. No-op when already stopped.
    pub async fn stop(&self) {
        let mut cancel = self.inner.cancel.lock().await;
        match cancel.take() {
            Some(tx) => {
                let _ = tx.send(true);
                info!("collector stopped");
            }
            None => {
                info!("collector already stopped, stop ignored");
            }
        }
    }

    pub async fn status(&self) -> CollectorStatus {
        CollectorStatus {
            running: self.inner.cancel.lock().await.is_some(),
            symbols: self.inner.config.symbols.clone(),
            poll_interval_ms: self.inner.config.poll_interval.as_millis() as u64,
            naked_threshold: self.inner.config.naked_threshold,
            cycles_completed: self.inner.cycles.load(Ordering::SeqCst),
            last_cycle_at: *self.inner.last_cycle_at.read().await,
        }
    }

    /// Run exactly one collection cycle outside the timer (one-shot mode).
    pub async fn collect_once(&self) {
        self.inner.run_cycle().await;
    }
}

impl Inner {
    /// One pass over the tracked symbols. Symbols are fetched sequentially,
    /// never concurrently, to stay inside the upstream rate limit.
    async fn run_cycle(&self) {
        for symbol in &self.config.symbols {
            match self.source.fetch(symbol).await {
                Ok(chain) => self.process_chain(&chain).await,
                Err(e) => {
                    // Skip this symbol; the next scheduled cycle retries it
                    warn!(symbol = %symbol, error = %e, "chain fetch failed, skipping symbol");
                }
            }
        }

        self.cycles.fetch_add(1, Ordering::SeqCst);
        *self.last_cycle_at.write().await = Some(Utc::now());
    }

    async fn process_chain(&self, chain: &OptionChain) {
        let mut anomalies = 0usize;

        for contract in &chain.contracts {
            if let Some(event) = detector::check_contract(contract, self.config.naked_threshold) {
                anomalies += 1;
                if let Err(e) = self.store.insert_event(&event).await {
                    error!(symbol = %chain.symbol, strike = contract.strike, error = %e,
                        "failed to persist anomaly event");
                }
            }

            let quote = StoredQuote {
                contract: contract.clone(),
                fetched_at: chain.fetched_at,
            };
            if let Err(e) = self.store.insert_quote(&quote).await {
                error!(symbol = %chain.symbol, strike = contract.strike, error = %e,
                    "failed to persist quote");
            }
        }

        let pain = max_pain::compute(&chain.calls(), &chain.puts());

        let summary = ChainSummary {
            symbol: chain.symbol.clone(),
            underlying_price: chain.underlying_price,
            contract_count: chain.contract_count(),
            max_pain: pain,
            fetched_at: chain.fetched_at,
        };
        if let Err(e) = self.store.insert_summary(&summary).await {
            error!(symbol = %chain.symbol, error = %e, "failed to persist chain summary");
        }

        info!(
            symbol = %chain.symbol,
            contracts = chain.contract_count(),
            anomalies,
            max_pain = ?pain,
            "cycle processed chain"
        );
    }
}
