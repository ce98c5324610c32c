use thiserror::Error;

/// Failure modes when talking to the market-data API.
///
/// Every variant is recoverable at the cycle level: the collector logs it,
/// skips the symbol, and the next scheduled cycle is the retry.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No valid bearer credential was available for the request.
    #[error("credential unavailable: {0}")]
    Credential(String),

    /// The request never produced a response (DNS, connect, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("upstream returned {status}: {body_preview}")]
    Status {
        status: reqwest::StatusCode,
        body_preview: String,
    },

    /// The response body could not be decoded into the chain model.
    #[error("malformed chain payload: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FetchError {
    /// True when the failure came from the auth boundary rather than the
    /// market-data API itself.
    pub fn is_credential(&self) -> bool {
        matches!(self, FetchError::Credential(_))
    }
}
