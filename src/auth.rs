use crate::error::FetchError;
use async_trait::async_trait;

/// Source of a currently valid bearer credential.
///
/// Refresh and the OAuth dance live behind this boundary; the pipeline only
/// needs one valid token per request. A failure here is a fetch failure for
/// the symbol being processed, never a crash.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, FetchError>;
}

/// Reads the token from the environment once per request.
///
/// Suits deployments where a sidecar keeps ZDTE_ACCESS_TOKEN fresh.
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new() -> Self {
        Self {
            var: "ZDTE_ACCESS_TOKEN".to_string(),
        }
    }

    pub fn with_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn token(&self) -> Result<String, FetchError> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(FetchError::Credential(format!(
                "{} is not set or empty",
                self.var
            ))),
        }
    }
}

/// Fixed token, used in tests and one-shot runs.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String, FetchError> {
        Ok(self.token.clone())
    }
}
