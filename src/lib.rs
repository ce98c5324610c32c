pub mod aggregates;
pub mod api_server;
pub mod atm;
pub mod auth;
pub mod broker_client;
pub mod collector;
pub mod config;
pub mod detector;
pub mod error;
pub mod logging;
pub mod max_pain;
pub mod models;
pub mod scorer;
pub mod spreads;
pub mod store;

// Re-exports (public API)
pub use auth::{EnvTokenProvider, StaticTokenProvider, TokenProvider};
pub use broker_client::{BrokerClient, ChainSource};
pub use collector::{Collector, CollectorStatus};
pub use config::CollectorConfig;
pub use detector::{check_contract, NakedPositionEvent};
pub use error::FetchError;
pub use models::{OptionChain, OptionContract, OptionSide};
pub use scorer::{Candidate, ScoredCandidate, Scorer};
pub use spreads::SpreadCandidate;
pub use store::{ChainSummary, MemoryStore, Store, StoredQuote};
