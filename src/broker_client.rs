use crate::auth::TokenProvider;
use crate::config;
use crate::error::FetchError;
use crate::models::{ChainResponse, OptionChain};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client};
use std::sync::Arc;
use tracing::debug;

/// Anything that can produce a parsed 0DTE chain for a symbol.
///
/// The collector depends on this seam rather than the concrete client so
/// cycles can be exercised without a network.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn fetch(&self, symbol: &str) -> Result<OptionChain, FetchError>;
}

// -----------------------------------------------
// CLIENT WRAPPER
// -----------------------------------------------
pub struct BrokerClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl BrokerClient {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: config::BROKER_BASE_URL.to_string(),
            tokens,
        })
    }

    /// Point the client at a different host (used by tests)
    pub fn with_base_url(tokens: Arc<dyn TokenProvider>, base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.into(),
            tokens,
        })
    }

    fn chain_url(&self, symbol: &str) -> String {
        format!(
            "{}/chains?symbol={}&contractType=ALL&daysToExpiration=0",
            self.base_url,
            urlencoding::encode(symbol)
        )
    }
}

#[async_trait]
impl ChainSource for BrokerClient {
    /// One attempt per call. The polling cadence is the retry policy:
    /// a failed symbol is simply picked up again next cycle.
    async fn fetch(&self, symbol: &str) -> Result<OptionChain, FetchError> {
        let token = self.tokens.token().await?;
        let url = self.chain_url(symbol);

        let res = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let body_preview: String = body.chars().take(200).collect();
            return Err(FetchError::Status {
                status,
                body_preview,
            });
        }

        let text = res.text().await?;
        let response: ChainResponse = serde_json::from_str(&text)?;
        let chain = response.flatten(Utc::now());

        debug!(
            symbol = %chain.symbol,
            contracts = chain.contract_count(),
            spot = chain.underlying_price,
            "chain fetched"
        );

        Ok(chain)
    }
}

// -----------------------------------------------
// HTTP CLIENT BUILDER
// -----------------------------------------------
fn build_client() -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

    Client::builder()
        .default_headers(headers)
        .user_agent(config::USER_AGENT)
        .timeout(config::HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;

    #[test]
    fn test_chain_url_shape() {
        let client = BrokerClient::with_base_url(
            Arc::new(StaticTokenProvider::new("t")),
            "http://localhost:9999",
        )
        .unwrap();

        let url = client.chain_url("SPX");
        assert_eq!(
            url,
            "http://localhost:9999/chains?symbol=SPX&contractType=ALL&daysToExpiration=0"
        );
    }
}
