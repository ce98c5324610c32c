use crate::store::Store;
use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-symbol rollup of one trading day's collected snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub symbol: String,
    pub date: NaiveDate,
    pub quote_count: usize,
    pub total_volume: u64,
    pub total_open_interest: u64,
    pub anomaly_count: usize,
    /// Mean volume/OI ratio over quotes where the ratio is defined
    pub avg_volume_oi_ratio: f64,
    /// Max pain from the day's most recent chain summary, when one exists
    pub max_pain: Option<f64>,
}

/// Recompute and persist the aggregate for one symbol and day.
///
/// Reads the day's quotes and anomaly events back out of the store, folds
/// them into a fresh row, and appends it. Manual operation, also exposed
/// over HTTP.
pub async fn recompute(store: &dyn Store, symbol: &str, date: NaiveDate) -> Result<DailyAggregate> {
    let quotes = store.quotes_for_day(symbol, date).await?;
    let events = store.events_for_day(symbol, date).await?;

    let mut total_volume = 0u64;
    let mut total_open_interest = 0u64;
    let mut ratio_sum = 0.0;
    let mut ratio_count = 0usize;

    for quote in &quotes {
        total_volume += quote.contract.volume;
        total_open_interest += quote.contract.open_interest;
        if quote.contract.open_interest > 0 && quote.contract.volume > 0 {
            ratio_sum += quote.contract.volume as f64 / quote.contract.open_interest as f64;
            ratio_count += 1;
        }
    }

    let avg_volume_oi_ratio = if ratio_count > 0 {
        ratio_sum / ratio_count as f64
    } else {
        0.0
    };

    let max_pain = match store.latest_summary(symbol).await? {
        Some(summary) if summary.fetched_at.date_naive() == date => summary.max_pain,
        _ => None,
    };

    let aggregate = DailyAggregate {
        symbol: symbol.to_string(),
        date,
        quote_count: quotes.len(),
        total_volume,
        total_open_interest,
        anomaly_count: events.len(),
        avg_volume_oi_ratio,
        max_pain,
    };

    store.insert_aggregate(&aggregate).await?;
    Ok(aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OptionContract, OptionSide};
    use crate::store::{ChainSummary, MemoryStore, StoredQuote};
    use chrono::Utc;

    fn quote(symbol: &str, volume: u64, open_interest: u64) -> StoredQuote {
        StoredQuote {
            contract: OptionContract {
                symbol: symbol.to_string(),
                side: OptionSide::Call,
                strike: 645.0,
                expiration: "2026-08-06".to_string(),
                bid: 1.0,
                ask: 1.1,
                last: 1.05,
                mark: 1.05,
                volume,
                open_interest,
                delta: None,
                gamma: None,
                theta: None,
                vega: None,
                implied_volatility: None,
                days_to_expiration: 0,
                in_the_money: false,
            },
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_recompute_folds_quotes() {
        let store = MemoryStore::new();
        store.insert_quote(&quote("SPY", 200, 100)).await.unwrap();
        store.insert_quote(&quote("SPY", 50, 100)).await.unwrap();
        store.insert_quote(&quote("SPY", 30, 0)).await.unwrap(); // undefined ratio

        store
            .insert_summary(&ChainSummary {
                symbol: "SPY".to_string(),
                underlying_price: 645.0,
                contract_count: 3,
                max_pain: Some(645.0),
                fetched_at: Utc::now(),
            })
            .await
            .unwrap();

        let today = Utc::now().date_naive();
        let aggregate = recompute(&store, "SPY", today).await.unwrap();

        assert_eq!(aggregate.quote_count, 3);
        assert_eq!(aggregate.total_volume, 280);
        assert_eq!(aggregate.total_open_interest, 200);
        // (2.0 + 0.5) / 2, the zero-OI quote is excluded
        assert!((aggregate.avg_volume_oi_ratio - 1.25).abs() < 1e-9);
        assert_eq!(aggregate.max_pain, Some(645.0));
    }

    #[tokio::test]
    async fn test_recompute_empty_day() {
        let store = MemoryStore::new();
        let today = Utc::now().date_naive();
        let aggregate = recompute(&store, "SPY", today).await.unwrap();

        assert_eq!(aggregate.quote_count, 0);
        assert_eq!(aggregate.avg_volume_oi_ratio, 0.0);
        assert_eq!(aggregate.max_pain, None);
    }
}
