use crate::aggregates::DailyAggregate;
use crate::detector::NakedPositionEvent;
use crate::models::OptionContract;
use crate::scorer::ScoredCandidate;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// One contract snapshot as persisted: the quote plus its poll timestamp.
/// Successive cycles append new rows for the same logical key; nothing is
/// ever updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredQuote {
    pub contract: OptionContract,
    pub fetched_at: DateTime<Utc>,
}

/// Latest whole-chain snapshot per symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSummary {
    pub symbol: String,
    pub underlying_price: f64,
    pub contract_count: usize,
    pub max_pain: Option<f64>,
    pub fetched_at: DateTime<Utc>,
}

/// Durable store boundary: append-only writes, time-windowed and
/// latest-per-key reads. The hosted backend lives behind this trait;
/// the pipeline never rolls back or retries a failed write.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_quote(&self, quote: &StoredQuote) -> Result<()>;
    async fn insert_event(&self, event: &NakedPositionEvent) -> Result<()>;
    async fn insert_scored(&self, scored: &ScoredCandidate) -> Result<()>;
    async fn insert_aggregate(&self, aggregate: &DailyAggregate) -> Result<()>;
    async fn insert_summary(&self, summary: &ChainSummary) -> Result<()>;

    /// Events detected within the trailing window.
    async fn recent_events(&self, window: Duration) -> Result<Vec<NakedPositionEvent>>;

    /// Scored candidates recorded within the trailing window.
    async fn recent_scored(&self, window: Duration) -> Result<Vec<ScoredCandidate>>;

    /// Most recent chain summary for a symbol.
    async fn latest_summary(&self, symbol: &str) -> Result<Option<ChainSummary>>;

    async fn quotes_for_day(&self, symbol: &str, date: NaiveDate) -> Result<Vec<StoredQuote>>;
    async fn events_for_day(&self, symbol: &str, date: NaiveDate)
        -> Result<Vec<NakedPositionEvent>>;
}

// -----------------------------------------------
// IN-MEMORY IMPLEMENTATION
// -----------------------------------------------

/// Process-local store used as the server default and in tests.
#[derive(Default)]
pub struct MemoryStore {
    quotes: RwLock<Vec<StoredQuote>>,
    events: RwLock<Vec<NakedPositionEvent>>,
    scored: RwLock<Vec<ScoredCandidate>>,
    aggregates: RwLock<Vec<DailyAggregate>>,
    summaries: RwLock<Vec<ChainSummary>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn quote_count(&self) -> usize {
        self.quotes.read().await.len()
    }

    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_quote(&self, quote: &StoredQuote) -> Result<()> {
        self.quotes.write().await.push(quote.clone());
        Ok(())
    }

    async fn insert_event(&self, event: &NakedPositionEvent) -> Result<()> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn insert_scored(&self, scored: &ScoredCandidate) -> Result<()> {
        self.scored.write().await.push(scored.clone());
        Ok(())
    }

    async fn insert_aggregate(&self, aggregate: &DailyAggregate) -> Result<()> {
        self.aggregates.write().await.push(aggregate.clone());
        Ok(())
    }

    async fn insert_summary(&self, summary: &ChainSummary) -> Result<()> {
        self.summaries.write().await.push(summary.clone());
        Ok(())
    }

    async fn recent_events(&self, window: Duration) -> Result<Vec<NakedPositionEvent>> {
        let cutoff = Utc::now() - window;
        Ok(self
            .events
            .read()
            .await
            .iter()
            .filter(|e| e.detected_at >= cutoff)
            .cloned()
            .collect())
    }

    async fn recent_scored(&self, window: Duration) -> Result<Vec<ScoredCandidate>> {
        let cutoff = Utc::now() - window;
        Ok(self
            .scored
            .read()
            .await
            .iter()
            .filter(|s| s.scored_at >= cutoff)
            .cloned()
            .collect())
    }

    async fn latest_summary(&self, symbol: &str) -> Result<Option<ChainSummary>> {
        Ok(self
            .summaries
            .read()
            .await
            .iter()
            .rev()
            .find(|s| s.symbol == symbol)
            .cloned())
    }

    async fn quotes_for_day(&self, symbol: &str, date: NaiveDate) -> Result<Vec<StoredQuote>> {
        Ok(self
            .quotes
            .read()
            .await
            .iter()
            .filter(|q| q.contract.symbol == symbol && q.fetched_at.date_naive() == date)
            .cloned()
            .collect())
    }

    async fn events_for_day(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Vec<NakedPositionEvent>> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .filter(|e| e.symbol == symbol && e.detected_at.date_naive() == date)
            .cloned()
            .collect())
    }
}
