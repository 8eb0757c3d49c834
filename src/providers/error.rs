// src/providers/error.rs
use thiserror::Error;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Non-2xx response. `message` is the provider's body as received.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode provider response: {0}")]
    Decode(String),

    #[error("Provider run ended with status {0}")]
    RunFailed(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0} is not configured")]
    MissingCredentials(&'static str),
}

impl ProviderError {
    pub fn api(status: reqwest::StatusCode, body: String) -> Self {
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
        } else {
            body
        };
        Self::Api {
            status: status.as_u16(),
            message,
        }
    }
}
