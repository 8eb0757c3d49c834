// src/types/request.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::job::{CanonicalJob, FilteredJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Processing,
    Filtering,
    Enriching,
    Completed,
    Failed,
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 7] = [
        Self::Pending,
        Self::Processing,
        Self::Filtering,
        Self::Enriching,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    pub const ACTIVE: [RequestStatus; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Filtering,
        Self::Enriching,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Filtering => "filtering",
            Self::Enriching => "enriching",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Filtering => 2,
            Self::Enriching => 3,
            Self::Completed | Self::Failed | Self::Cancelled => 4,
        }
    }

    /// Whether a stored request may move from `self` to `next`.
    ///
    /// Terminal states accept nothing. `failed` and `cancelled` are reachable
    /// from every active state; otherwise status only moves forward.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Failed | Self::Cancelled => true,
            _ => next.rank() >= self.rank(),
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("Unknown request status: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResults {
    pub jobs: Vec<CanonicalJob>,
    pub total_count: usize,
    pub scraped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredResults {
    pub jobs: Vec<FilteredJob>,
    pub total_count: usize,
    pub original_count: usize,
    pub dropped_incomplete: usize,
    pub dropped_duplicates: usize,
    pub filtered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedResults {
    pub jobs: Vec<FilteredJob>,
    pub total_count: usize,
    pub can_apply_count: usize,
    pub verified_count: usize,
    pub enriched_at: DateTime<Utc>,
}

impl EnrichedResults {
    pub fn from_jobs(jobs: Vec<FilteredJob>) -> Self {
        let can_apply_count = jobs.iter().filter(|job| job.can_apply).count();
        let verified_count = jobs
            .iter()
            .filter(|job| job.email_verification_status.is_some())
            .count();
        Self {
            total_count: jobs.len(),
            can_apply_count,
            verified_count,
            jobs,
            enriched_at: Utc::now(),
        }
    }
}

/// Aggregate root polled by clients while the pipeline runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub id: String,
    pub source_url: String,
    pub resume_text: Option<String>,
    pub status: RequestStatus,
    pub raw_results: Option<RawResults>,
    pub filtered_results: Option<FilteredResults>,
    pub enriched_results: Option<EnrichedResults>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScrapeRequest {
    pub fn new(source_url: &str, resume_text: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_url: source_url.to_string(),
            resume_text,
            status: RequestStatus::Pending,
            raw_results: None,
            filtered_results: None,
            enriched_results: None,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Partial snapshot written by one pipeline transition.
///
/// Only `Some` fields are written; result fields are never cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestUpdate {
    pub status: Option<RequestStatus>,
    pub raw_results: Option<RawResults>,
    pub filtered_results: Option<FilteredResults>,
    pub enriched_results: Option<EnrichedResults>,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RequestUpdate {
    pub fn status(status: RequestStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(RequestStatus::Failed),
            error_message: Some(message.into()),
            completed_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: Some(RequestStatus::Cancelled),
            completed_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn with_raw_results(mut self, results: RawResults) -> Self {
        self.raw_results = Some(results);
        self
    }

    pub fn with_filtered_results(mut self, results: FilteredResults) -> Self {
        self.filtered_results = Some(results);
        self
    }

    pub fn with_enriched_results(mut self, results: EnrichedResults) -> Self {
        self.enriched_results = Some(results);
        self
    }

    pub fn with_completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    /// Check the transition against `request` without writing anything.
    ///
    /// `Ok(false)` means the request is terminal and the update must be
    /// skipped. Errors: a status regression, a result written twice, or a
    /// status or result ahead of the results stored so far
    /// (raw, then filtered, then enriched).
    pub fn check_against(&self, request: &ScrapeRequest) -> Result<bool> {
        if request.status.is_terminal() {
            return Ok(false);
        }
        if let Some(next) = self.status {
            if !request.status.can_transition_to(next) {
                anyhow::bail!(
                    "Invalid status transition for {}: {} -> {}",
                    request.id,
                    request.status,
                    next
                );
            }
        }

        let stages = [
            ("raw", request.raw_results.is_some(), self.raw_results.is_some()),
            ("filtered", request.filtered_results.is_some(), self.filtered_results.is_some()),
            ("enriched", request.enriched_results.is_some(), self.enriched_results.is_some()),
        ];
        for (index, (name, stored, carried)) in stages.into_iter().enumerate() {
            if stored && carried {
                anyhow::bail!("{} results already stored for {}", name, request.id);
            }
            if carried && index > 0 {
                let (previous, stored_before, carried_before) = stages[index - 1];
                if !stored_before && !carried_before {
                    anyhow::bail!(
                        "Cannot store {} results for {} before {} results",
                        name,
                        request.id,
                        previous
                    );
                }
            }
        }

        if let Some(next) = self.status {
            let required = match next {
                RequestStatus::Filtering => Some(0),
                RequestStatus::Enriching => Some(1),
                RequestStatus::Completed => Some(2),
                _ => None,
            };
            if let Some((name, stored, carried)) = required.map(|index| stages[index]) {
                if !stored && !carried {
                    anyhow::bail!(
                        "Cannot move {} to {} without {} results",
                        request.id,
                        next,
                        name
                    );
                }
            }
        }
        Ok(true)
    }

    pub fn apply_to(self, request: &mut ScrapeRequest) {
        if let Some(status) = self.status {
            request.status = status;
        }
        if let Some(results) = self.raw_results {
            request.raw_results = Some(results);
        }
        if let Some(results) = self.filtered_results {
            request.filtered_results = Some(results);
        }
        if let Some(results) = self.enriched_results {
            request.enriched_results = Some(results);
        }
        if let Some(message) = self.error_message {
            request.error_message = Some(message);
        }
        if let Some(at) = self.completed_at {
            request.completed_at = Some(at);
        }
    }
}
