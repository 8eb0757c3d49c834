// src/providers/mod.rs
//! Network collaborators consumed by the pipeline. Each trait is one batched call.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod apify;
pub mod email_verifier;
pub mod email_writer;
pub mod error;
pub mod profile_scraper;

pub use apify::ApifyJobScraper;
pub use email_verifier::HttpEmailVerifier;
pub use email_writer::OpenAiEmailWriter;
pub use error::{ProviderError, ProviderResult};
pub use profile_scraper::HttpProfileScraper;

/// Runs a LinkedIn job search and returns the raw dataset items.
#[async_trait]
pub trait JobScraper: Send + Sync {
    async fn scrape_jobs(&self, source_urls: &[String], count: u32) -> ProviderResult<Vec<Value>>;
}

/// Resolves poster profile URLs. Results are positionally aligned with `profile_urls`.
#[async_trait]
pub trait ProfileScraper: Send + Sync {
    async fn lookup_profiles(&self, profile_urls: &[String]) -> ProviderResult<Vec<Value>>;
}

/// Checks deliverability of a batch of addresses.
#[async_trait]
pub trait EmailVerifier: Send + Sync {
    async fn verify_emails(&self, emails: &[String]) -> ProviderResult<Vec<Value>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDraftRequest {
    pub job_title: String,
    pub company_name: String,
    pub job_description: Option<String>,
    pub resume: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub email: String,
}

/// Text generation for application emails.
#[async_trait]
pub trait EmailWriter: Send + Sync {
    async fn write_application(&self, request: &EmailDraftRequest) -> ProviderResult<EmailDraft>;
}

/// Pull the result array out of a provider body.
///
/// Accepts a bare array or an object wrapping it under a common key.
pub(crate) fn into_result_array(body: Value) -> ProviderResult<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => ["results", "data", "items"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| ProviderError::Decode("expected a result array".to_string())),
        other => Err(ProviderError::Decode(format!(
            "expected a result array, got {}",
            other
        ))),
    }
}
