// src/providers/profile_scraper.rs
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{into_result_array, ProfileScraper, ProviderError, ProviderResult};
use crate::core::ServiceClient;
use crate::environment::EndpointSettings;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileLookupRequest<'a> {
    profile_urls: &'a [String],
}

/// Batched profile lookup over a single POST.
pub struct HttpProfileScraper {
    client: Option<ServiceClient>,
}

impl HttpProfileScraper {
    pub fn new(settings: &EndpointSettings, token: Option<String>) -> Result<Self> {
        let client = settings
            .url
            .as_deref()
            .map(|url| ServiceClient::new(url, token, settings.timeout_seconds))
            .transpose()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ProfileScraper for HttpProfileScraper {
    async fn lookup_profiles(&self, profile_urls: &[String]) -> ProviderResult<Vec<Value>> {
        let client = self
            .client
            .as_ref()
            .ok_or(ProviderError::MissingCredentials("profile scraper url"))?;

        info!(profiles = profile_urls.len(), "Resolving poster profiles");
        let body: Value = client
            .post_json("", &ProfileLookupRequest { profile_urls })
            .await?;
        into_result_array(body)
    }
}
