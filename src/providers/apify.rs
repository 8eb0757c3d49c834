// src/providers/apify.rs
//! LinkedIn job search through an Apify actor: start a run, poll it, read the dataset.
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{JobScraper, ProviderError, ProviderResult};
use crate::core::ServiceClient;
use crate::environment::JobScraperSettings;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScraperInput {
    start_urls: Vec<StartUrl>,
    scrape_company: bool,
    count: u32,
}

#[derive(Debug, Clone, Serialize)]
struct StartUrl {
    url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunData {
    id: String,
    status: String,
    default_dataset_id: String,
}

pub struct ApifyJobScraper {
    client: ServiceClient,
    actor_id: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl ApifyJobScraper {
    pub fn new(settings: &JobScraperSettings, token: Option<String>) -> Result<Self> {
        Ok(Self {
            client: ServiceClient::new(&settings.base_url, token, settings.timeout_seconds)?,
            actor_id: settings.actor_id.clone(),
            poll_interval: Duration::from_secs(settings.poll_interval_seconds),
            max_poll_attempts: settings.max_poll_attempts,
        })
    }

    async fn start_run(&self, source_urls: &[String], count: u32) -> ProviderResult<RunData> {
        let input = ScraperInput {
            start_urls: source_urls
                .iter()
                .map(|url| StartUrl { url: url.clone() })
                .collect(),
            scrape_company: true,
            count,
        };

        let endpoint = format!("/acts/{}/runs", self.actor_id);
        let response: ApiResponse<RunData> = self.client.post_json(&endpoint, &input).await?;
        Ok(response.data)
    }

    async fn wait_for_run(&self, run_id: &str) -> ProviderResult<RunData> {
        let endpoint = format!("/actor-runs/{}", run_id);

        for attempt in 1..=self.max_poll_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let run = match self.client.get_json::<ApiResponse<RunData>>(&endpoint).await {
                Ok(response) => response.data,
                Err(e) => {
                    warn!(run_id, attempt, "Failed to poll Apify run: {}", e);
                    continue;
                }
            };

            match run.status.as_str() {
                "SUCCEEDED" => return Ok(run),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(ProviderError::RunFailed(run.status));
                }
                _ => debug!(run_id, attempt, status = %run.status, "Run still in progress"),
            }
        }

        Err(ProviderError::Timeout("Scraping timed out".to_string()))
    }

    async fn dataset_items(&self, dataset_id: &str) -> ProviderResult<Vec<Value>> {
        let endpoint = format!("/datasets/{}/items?format=json", dataset_id);
        self.client.get_json(&endpoint).await
    }
}

#[async_trait]
impl JobScraper for ApifyJobScraper {
    async fn scrape_jobs(&self, source_urls: &[String], count: u32) -> ProviderResult<Vec<Value>> {
        if !self.client.has_token() {
            return Err(ProviderError::MissingCredentials("APIFY_API_KEY"));
        }

        info!(urls = source_urls.len(), count, actor = %self.actor_id, "Starting LinkedIn job scrape");
        let run = self.start_run(source_urls, count).await?;
        info!(run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        let items = self.dataset_items(&completed.default_dataset_id).await?;
        info!(count = items.len(), "Fetched scraped jobs");
        Ok(items)
    }
}
