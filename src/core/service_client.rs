// src/core/service_client.rs
//! Shared HTTP client for provider adapters - JSON in, JSON out, bearer auth

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, error};

use crate::providers::{ProviderError, ProviderResult};

pub struct ServiceClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ServiceClient {
    /// Create a client whose every call is bounded by `timeout_seconds`
    pub fn new(base_url: &str, token: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// POST a JSON payload and decode the JSON response
    pub async fn post_json<T, R>(&self, endpoint: &str, payload: &T) -> ProviderResult<R>
    where
        T: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let url = self.url(endpoint);
        debug!(url = %url, "POST");

        let response = self
            .authorize(self.client.post(&url))
            .json(payload)
            .send()
            .await?;

        Self::decode(&url, response).await
    }

    /// GET and decode the JSON response
    pub async fn get_json<R>(&self, endpoint: &str) -> ProviderResult<R>
    where
        R: serde::de::DeserializeOwned,
    {
        let url = self.url(endpoint);
        debug!(url = %url, "GET");

        let response = self.authorize(self.client.get(&url)).send().await?;

        Self::decode(&url, response).await
    }

    async fn decode<R>(url: &str, response: reqwest::Response) -> ProviderResult<R>
    where
        R: serde::de::DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str::<R>(&body)
                .map_err(|e| ProviderError::Decode(format!("{} ({})", e, url)))
        } else {
            let error_text = response.text().await.unwrap_or_default();
            error!(url = %url, status = %status, "Provider returned error: {}", error_text);
            Err(ProviderError::api(status, error_text))
        }
    }
}
