use crate::aggregates;
use crate::atm::{self, AtmConfig};
use crate::broker_client::ChainSource;
use crate::collector::{Collector, CollectorStatus};
use crate::detector::NakedPositionEvent;
use crate::models::OptionSide;
use crate::scorer::{score_candidates, Candidate, ScoredCandidate, Scorer};
use crate::spreads::{self, SpreadConfig};
use crate::store::{ChainSummary, Store};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::error;

// -----------------------------------------------
// API REQUEST/RESPONSE MODELS
// -----------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SpreadsQuery {
    pub symbol: String,
    pub side: String,
}

#[derive(Debug, Deserialize)]
pub struct AtmQuery {
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct AnomaliesQuery {
    pub minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct RecomputeQuery {
    pub symbol: String,
    /// ISO date, defaults to today
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub processing_time_ms: Option<u64>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, start: Instant) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            processing_time_ms: Some(start.elapsed().as_millis() as u64),
        }
    }

    fn err(message: impl Into<String>, start: Instant) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            processing_time_ms: Some(start.elapsed().as_millis() as u64),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SpreadsResponse {
    pub symbol: String,
    pub side: OptionSide,
    pub underlying_price: f64,
    pub candidates_found: usize,
    pub scored: Vec<ScoredCandidate>,
}

#[derive(Debug, Serialize)]
pub struct AtmResponse {
    pub symbol: String,
    pub underlying_price: f64,
    pub scored: Vec<ScoredCandidate>,
}

// -----------------------------------------------
// APPLICATION STATE
// -----------------------------------------------

/// Handles are constructed once at startup and injected; nothing here is
/// a process-wide global.
#[derive(Clone)]
pub struct AppState {
    pub collector: Collector,
    pub source: Arc<dyn ChainSource>,
    pub store: Arc<dyn Store>,
    pub scorer: Arc<dyn Scorer>,
    pub top_spreads: usize,
}

// -----------------------------------------------
// API HANDLERS
// -----------------------------------------------

/// POST /api/collector/start
async fn start_collector(State(state): State<AppState>) -> Json<ApiResponse<CollectorStatus>> {
    let start = Instant::now();
    state.collector.start().await;
    Json(ApiResponse::ok(state.collector.status().await, start))
}

/// POST /api/collector/stop
async fn stop_collector(State(state): State<AppState>) -> Json<ApiResponse<CollectorStatus>> {
    let start = Instant::now();
    state.collector.stop().await;
    Json(ApiResponse::ok(state.collector.status().await, start))
}

/// GET /api/collector/status
async fn collector_status(State(state): State<AppState>) -> Json<ApiResponse<CollectorStatus>> {
    let start = Instant::now();
    Json(ApiResponse::ok(state.collector.status().await, start))
}

/// GET /api/spreads?symbol=SPY&side=call
async fn find_spreads(
    Query(query): Query<SpreadsQuery>,
    State(state): State<AppState>,
) -> Json<ApiResponse<SpreadsResponse>> {
    let start = Instant::now();

    let side = match query.side.to_lowercase().as_str() {
        "call" => OptionSide::Call,
        "put" => OptionSide::Put,
        other => {
            return Json(ApiResponse::err(
                format!("invalid side '{}', expected call or put", other),
                start,
            ))
        }
    };

    let chain = match state.source.fetch(&query.symbol).await {
        Ok(chain) => chain,
        Err(e) => return Json(ApiResponse::err(e.to_string(), start)),
    };

    let contracts: Vec<_> = chain.contracts.iter().collect();
    let mut candidates =
        spreads::enumerate(&contracts, side, chain.underlying_price, &SpreadConfig::from_env());
    let candidates_found = candidates.len();
    candidates.truncate(state.top_spreads);

    let wrapped: Vec<Candidate> = candidates.into_iter().map(Candidate::Spread).collect();
    let context = format!("0DTE {} chain, spot {:.2}", chain.symbol, chain.underlying_price);
    let scored =
        score_candidates(state.scorer.as_ref(), wrapped, chain.underlying_price, &context).await;

    persist_scored(state.store.as_ref(), &scored).await;

    Json(ApiResponse::ok(
        SpreadsResponse {
            symbol: chain.symbol,
            side,
            underlying_price: chain.underlying_price,
            candidates_found,
            scored,
        },
        start,
    ))
}

/// GET /api/atm-signals?symbol=SPY
async fn find_atm_signals(
    Query(query): Query<AtmQuery>,
    State(state): State<AppState>,
) -> Json<ApiResponse<AtmResponse>> {
    let start = Instant::now();

    let chain = match state.source.fetch(&query.symbol).await {
        Ok(chain) => chain,
        Err(e) => return Json(ApiResponse::err(e.to_string(), start)),
    };

    let selection = atm::select(
        &chain.calls(),
        &chain.puts(),
        chain.underlying_price,
        &AtmConfig::from_env(),
    );

    let wrapped: Vec<Candidate> = selection
        .calls
        .into_iter()
        .chain(selection.puts)
        .map(Candidate::Atm)
        .collect();

    let context = format!("0DTE {} at-the-money, spot {:.2}", chain.symbol, chain.underlying_price);
    let scored =
        score_candidates(state.scorer.as_ref(), wrapped, chain.underlying_price, &context).await;

    persist_scored(state.store.as_ref(), &scored).await;

    Json(ApiResponse::ok(
        AtmResponse {
            symbol: chain.symbol,
            underlying_price: chain.underlying_price,
            scored,
        },
        start,
    ))
}

/// GET /api/anomalies?minutes=60
async fn recent_anomalies(
    Query(query): Query<AnomaliesQuery>,
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<NakedPositionEvent>>> {
    let start = Instant::now();
    let minutes = query.minutes.unwrap_or(60).max(1);

    match state
        .store
        .recent_events(chrono::Duration::minutes(minutes))
        .await
    {
        Ok(events) => Json(ApiResponse::ok(events, start)),
        Err(e) => Json(ApiResponse::err(e.to_string(), start)),
    }
}

/// GET /api/candidates?minutes=60
async fn recent_candidates(
    Query(query): Query<AnomaliesQuery>,
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<ScoredCandidate>>> {
    let start = Instant::now();
    let minutes = query.minutes.unwrap_or(60).max(1);

    match state
        .store
        .recent_scored(chrono::Duration::minutes(minutes))
        .await
    {
        Ok(scored) => Json(ApiResponse::ok(scored, start)),
        Err(e) => Json(ApiResponse::err(e.to_string(), start)),
    }
}

/// GET /api/summary?symbol=SPY
async fn latest_summary(
    Query(query): Query<SummaryQuery>,
    State(state): State<AppState>,
) -> Json<ApiResponse<ChainSummary>> {
    let start = Instant::now();

    match state.store.latest_summary(&query.symbol).await {
        Ok(Some(summary)) => Json(ApiResponse::ok(summary, start)),
        Ok(None) => Json(ApiResponse::err(
            format!("no chain summary recorded for {}", query.symbol),
            start,
        )),
        Err(e) => Json(ApiResponse::err(e.to_string(), start)),
    }
}

/// POST /api/aggregates/recompute?symbol=SPY&date=2026-08-06
async fn recompute_aggregates(
    Query(query): Query<RecomputeQuery>,
    State(state): State<AppState>,
) -> Json<ApiResponse<aggregates::DailyAggregate>> {
    let start = Instant::now();

    let date = match &query.date {
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => date,
            Err(e) => {
                return Json(ApiResponse::err(
                    format!("invalid date '{}': {}", raw, e),
                    start,
                ))
            }
        },
        None => Utc::now().date_naive(),
    };

    match aggregates::recompute(state.store.as_ref(), &query.symbol, date).await {
        Ok(aggregate) => Json(ApiResponse::ok(aggregate, start)),
        Err(e) => Json(ApiResponse::err(e.to_string(), start)),
    }
}

// -----------------------------------------------
// HELPER FUNCTIONS
// -----------------------------------------------

/// Persist scored candidates; a write failure loses that record only.
async fn persist_scored(store: &dyn Store, scored: &[ScoredCandidate]) {
    for candidate in scored {
        if let Err(e) = store.insert_scored(candidate).await {
            error!(symbol = candidate.candidate.symbol(), error = %e,
                "failed to persist scored candidate");
        }
    }
}

// -----------------------------------------------
// SERVER SETUP
// -----------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/collector/start", post(start_collector))
        .route("/api/collector/stop", post(stop_collector))
        .route("/api/collector/status", get(collector_status))
        .route("/api/spreads", get(find_spreads))
        .route("/api/atm-signals", get(find_atm_signals))
        .route("/api/anomalies", get(recent_anomalies))
        .route("/api/candidates", get(recent_candidates))
        .route("/api/summary", get(latest_summary))
        .route("/api/aggregates/recompute", post(recompute_aggregates))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(port: u16, state: AppState) -> Result<()> {
    let app = build_router(state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("0DTE analyzer API running on http://{}", addr);
    println!("Available endpoints:");
    println!("   POST /api/collector/start");
    println!("   POST /api/collector/stop");
    println!("   GET  /api/collector/status");
    println!("   GET  /api/spreads?symbol=SPY&side=call");
    println!("   GET  /api/atm-signals?symbol=SPY");
    println!("   GET  /api/anomalies?minutes=60");
    println!("   GET  /api/candidates?minutes=60");
    println!("   GET  /api/summary?symbol=SPY");
    println!("   POST /api/aggregates/recompute?symbol=SPY&date=2026-08-06");
    println!();

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_envelope() {
        let start = Instant::now();
        let ok: ApiResponse<u32> = ApiResponse::ok(7, start);
        assert!(ok.success);
        assert_eq!(ok.data, Some(7));
        assert!(ok.error.is_none());

        let err: ApiResponse<u32> = ApiResponse::err("boom", start);
        assert!(!err.success);
        assert!(err.data.is_none());
        assert_eq!(err.error.as_deref(), Some("boom"));
    }
}
