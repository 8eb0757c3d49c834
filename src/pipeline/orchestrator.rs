// src/pipeline/orchestrator.rs
//! Drives one scrape request through every stage and persists each transition.
use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::dedup::dedupe_by_company;
use super::enrichment::enrich_jobs;
use super::normalizer::JobNormalizer;
use super::verification::verify_jobs;
use crate::core::ConfigManager;
use crate::providers::{
    ApifyJobScraper, EmailVerifier, HttpEmailVerifier, HttpProfileScraper, JobScraper,
    ProfileScraper,
};
use crate::store::{self, RequestStore};
use crate::types::{
    EnrichedResults, FilteredResults, RawResults, RequestStatus, RequestUpdate, ScrapeRequest,
};

const DEFAULT_RESULT_COUNT: u32 = 100;

/// The three providers a pipeline run calls.
#[derive(Clone)]
pub struct PipelineProviders {
    pub scraper: Arc<dyn JobScraper>,
    pub profiles: Arc<dyn ProfileScraper>,
    pub verifier: Arc<dyn EmailVerifier>,
}

impl PipelineProviders {
    pub fn from_config(config: &ConfigManager) -> Result<Self> {
        let settings = &config.environment.providers;
        let secrets = &config.secrets;
        Ok(Self {
            scraper: Arc::new(ApifyJobScraper::new(
                &settings.job_scraper,
                secrets.apify_token.clone(),
            )?),
            profiles: Arc::new(HttpProfileScraper::new(
                &settings.profile_scraper,
                secrets.profile_scraper_key.clone(),
            )?),
            verifier: Arc::new(HttpEmailVerifier::new(
                &settings.email_verifier,
                secrets.email_verifier_key.clone(),
            )?),
        })
    }
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    Completed,
    /// Cancelled, or the stored request went terminal underneath us.
    Stopped,
}

type RunningTokens = Arc<Mutex<HashMap<String, CancellationToken>>>;

fn lock(running: &RunningTokens) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
    running.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A run's cancellation token, unregistered when the run ends or its future is dropped.
struct Registration {
    id: String,
    token: CancellationToken,
    running: RunningTokens,
}

impl Drop for Registration {
    fn drop(&mut self) {
        lock(&self.running).remove(&self.id);
    }
}

#[derive(Clone)]
pub struct PipelineOrchestrator {
    store: Arc<dyn RequestStore>,
    providers: PipelineProviders,
    normalizer: Arc<JobNormalizer>,
    result_count: u32,
    running: RunningTokens,
}

impl PipelineOrchestrator {
    pub fn new(store: Arc<dyn RequestStore>, providers: PipelineProviders) -> Self {
        Self {
            store,
            providers,
            normalizer: Arc::new(JobNormalizer::default()),
            result_count: DEFAULT_RESULT_COUNT,
            running: Arc::default(),
        }
    }

    /// Orchestrator wired to real providers from configuration.
    pub fn from_config(config: &ConfigManager, store: Arc<dyn RequestStore>) -> Result<Self> {
        let env = &config.environment;
        Ok(Self::new(store, PipelineProviders::from_config(config)?)
            .with_normalizer(JobNormalizer::new(env.field_aliases.clone()))
            .with_result_count(env.providers.job_scraper.result_count))
    }

    pub fn with_normalizer(mut self, normalizer: JobNormalizer) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    pub fn with_result_count(mut self, count: u32) -> Self {
        self.result_count = count;
        self
    }

    pub fn store(&self) -> &Arc<dyn RequestStore> {
        &self.store
    }

    fn tokens(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        lock(&self.running)
    }

    fn register(&self, id: &str) -> Registration {
        let token = CancellationToken::new();
        self.tokens().insert(id.to_string(), token.clone());
        Registration {
            id: id.to_string(),
            token,
            running: self.running.clone(),
        }
    }

    /// Number of runs currently in flight.
    pub fn running_count(&self) -> usize {
        self.tokens().len()
    }

    /// Create a request and start its pipeline in the background.
    /// Returns as soon as the `pending` request is stored.
    pub async fn submit(&self, source_url: &str, resume_text: Option<String>) -> Result<ScrapeRequest> {
        let request = self.store.create(source_url, resume_text).await?;
        info!(request_id = %request.id, source_url, "Scrape request submitted");
        self.spawn(request.clone());
        Ok(request)
    }

    pub fn spawn(&self, request: ScrapeRequest) -> JoinHandle<()> {
        let registration = self.register(&request.id);
        let this = self.clone();
        tokio::spawn(async move { this.drive(request, registration).await })
    }

    /// Run the pipeline in the foreground and return the final snapshot.
    pub async fn run(&self, request: ScrapeRequest) -> Result<ScrapeRequest> {
        let registration = self.register(&request.id);
        let id = request.id.clone();
        self.drive(request, registration).await;
        self.store
            .get(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Scrape request not found: {}", id))
    }

    /// Cancel a non-terminal request and stop its run. `false` when the request
    /// is unknown or already terminal.
    pub async fn cancel(&self, id: &str) -> Result<bool> {
        let cancelled = self.store.cancel(id).await?;
        if cancelled {
            if let Some(token) = self.tokens().get(id) {
                token.cancel();
            }
            info!(request_id = %id, "Scrape request cancelled");
        }
        Ok(cancelled)
    }

    pub async fn recover_interrupted(&self) -> Result<usize> {
        store::recover_interrupted(self.store.as_ref()).await
    }

    async fn drive(&self, request: ScrapeRequest, registration: Registration) {
        let id = request.id.clone();
        let outcome = self.execute(&request, &registration.token).await;
        drop(registration);

        match outcome {
            Ok(RunOutcome::Completed) => info!(request_id = %id, "Pipeline completed"),
            Ok(RunOutcome::Stopped) => info!(request_id = %id, "Pipeline stopped"),
            Err(e) => {
                error!(request_id = %id, error = %e, "Pipeline failed");
                match self.store.update(&id, RequestUpdate::failed(e.to_string())).await {
                    Ok(true) => {}
                    Ok(false) => warn!(request_id = %id, "Request already terminal, failure not recorded"),
                    Err(e) => error!(request_id = %id, error = %e, "Could not record pipeline failure"),
                }
            }
        }
    }

    async fn execute(&self, request: &ScrapeRequest, token: &CancellationToken) -> Result<RunOutcome> {
        let id = request.id.as_str();

        if !self
            .store
            .update(id, RequestUpdate::status(RequestStatus::Processing))
            .await?
        {
            return Ok(RunOutcome::Stopped);
        }

        let source_urls = vec![request.source_url.clone()];
        let items = tokio::select! {
            _ = token.cancelled() => return Ok(RunOutcome::Stopped),
            items = self.providers.scraper.scrape_jobs(&source_urls, self.result_count) => items?,
        };

        let jobs = self.normalizer.normalize(&items, &request.source_url);
        let raw = RawResults {
            total_count: jobs.len(),
            jobs,
            scraped_at: Utc::now(),
        };
        info!(request_id = %id, raw = items.len(), jobs = raw.total_count, "Jobs scraped");
        if !self
            .store
            .update(
                id,
                RequestUpdate::status(RequestStatus::Filtering).with_raw_results(raw.clone()),
            )
            .await?
        {
            return Ok(RunOutcome::Stopped);
        }

        let outcome = dedupe_by_company(&raw.jobs);
        let filtered = FilteredResults {
            total_count: outcome.jobs.len(),
            original_count: raw.total_count,
            dropped_incomplete: outcome.dropped_incomplete,
            dropped_duplicates: outcome.dropped_duplicates,
            jobs: outcome.jobs,
            filtered_at: Utc::now(),
        };
        info!(
            request_id = %id,
            kept = filtered.total_count,
            dropped_incomplete = filtered.dropped_incomplete,
            dropped_duplicates = filtered.dropped_duplicates,
            "Jobs filtered"
        );
        if !self
            .store
            .update(
                id,
                RequestUpdate::status(RequestStatus::Enriching)
                    .with_filtered_results(filtered.clone()),
            )
            .await?
        {
            return Ok(RunOutcome::Stopped);
        }

        let providers = &self.providers;
        let jobs = tokio::select! {
            _ = token.cancelled() => return Ok(RunOutcome::Stopped),
            jobs = async {
                let jobs = enrich_jobs(filtered.jobs, providers.profiles.as_ref()).await;
                verify_jobs(jobs, providers.verifier.as_ref()).await
            } => jobs,
        };

        let enriched = EnrichedResults::from_jobs(jobs);
        info!(
            request_id = %id,
            jobs = enriched.total_count,
            can_apply = enriched.can_apply_count,
            "Jobs enriched"
        );
        let completed = self
            .store
            .update(
                id,
                RequestUpdate::status(RequestStatus::Completed)
                    .with_enriched_results(enriched)
                    .with_completed_at(Utc::now()),
            )
            .await?;

        Ok(if completed {
            RunOutcome::Completed
        } else {
            RunOutcome::Stopped
        })
    }
}
