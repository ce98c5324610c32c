use std::time::Duration;

// -----------------------------------------------
// BROKER API ENDPOINTS
// -----------------------------------------------
pub const BROKER_BASE_URL: &str = "https://api.brokerage.com/marketdata/v1";

pub fn option_chain_url(symbol: &str) -> String {
    // daysToExpiration=0 restricts the response to contracts expiring today
    format!(
        "{}/chains?symbol={}&contractType=ALL&daysToExpiration=0",
        BROKER_BASE_URL,
        urlencoding::encode(symbol)
    )
}

// -----------------------------------------------
// TRACKED SYMBOLS
// -----------------------------------------------
pub const DEFAULT_SYMBOLS: &[&str] = &["SPY", "QQQ", "SPX"];

// -----------------------------------------------
// HTTP CLIENT CONFIG
// -----------------------------------------------
pub const USER_AGENT: &str = concat!("zdte-analyzer/", env!("CARGO_PKG_VERSION"));
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

// -----------------------------------------------
// COLLECTION DEFAULTS
// -----------------------------------------------
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_NAKED_THRESHOLD: f64 = 1.5;

// -----------------------------------------------
// SPREAD ENUMERATION BOUNDS
// -----------------------------------------------
pub const MIN_SPREAD_WIDTH: f64 = 5.0;
pub const MAX_SPREAD_WIDTH: f64 = 50.0;
pub const MIN_CREDIT: f64 = 0.50;
pub const DEFAULT_TOP_SPREADS: usize = 20;

// -----------------------------------------------
// ATM SELECTION
// -----------------------------------------------
pub const ATM_THRESHOLD: f64 = 0.02;
pub const ATM_TOP_N: usize = 3;
pub const UNUSUAL_VOLUME_RATIO: f64 = 0.5;
pub const TIGHT_SPREAD_RATIO: f64 = 0.9;

// -----------------------------------------------
// RUNTIME CONFIGURATION
// -----------------------------------------------

/// Get the execution mode from environment or default to server
pub fn get_execution_mode() -> String {
    std::env::var("ZDTE_MODE").unwrap_or_else(|_| "server".to_string())
}

/// Get symbol for single mode execution
pub fn get_single_symbol() -> String {
    std::env::var("ZDTE_SYMBOL").unwrap_or_else(|_| "SPY".to_string())
}

/// Get the tracked symbol list (comma separated) or defaults
pub fn get_symbols() -> Vec<String> {
    match std::env::var("ZDTE_SYMBOLS") {
        Ok(raw) => {
            let symbols: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            if symbols.is_empty() {
                default_symbols()
            } else {
                symbols
            }
        }
        Err(_) => default_symbols(),
    }
}

fn default_symbols() -> Vec<String> {
    DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

pub fn get_poll_interval_ms() -> u64 {
    std::env::var("ZDTE_POLL_INTERVAL_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(|v| v.max(1_000)) // sub-second polling would hammer the API
        .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
}

pub fn get_naked_threshold() -> f64 {
    std::env::var("ZDTE_NAKED_THRESHOLD")
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| *v > 0.0)
        .unwrap_or(DEFAULT_NAKED_THRESHOLD)
}

pub fn get_top_spreads() -> usize {
    std::env::var("ZDTE_TOP_SPREADS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_TOP_SPREADS)
}

pub fn get_port() -> u16 {
    std::env::var("ZDTE_PORT")
        .unwrap_or_else(|_| "3001".to_string())
        .parse::<u16>()
        .unwrap_or(3001)
}

/// Runtime settings for the collection loop, built once at startup and
/// passed into the collector rather than read ambiently.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub symbols: Vec<String>,
    pub poll_interval: Duration,
    pub naked_threshold: f64,
}

impl CollectorConfig {
    pub fn from_env() -> Self {
        Self {
            symbols: get_symbols(),
            poll_interval: Duration::from_millis(get_poll_interval_ms()),
            naked_threshold: get_naked_threshold(),
        }
    }
}
