// src/pipeline/dedup.rs
//! Stage 2: one outreach candidate per company.
use std::collections::HashSet;
use tracing::debug;

use crate::types::{CanonicalJob, FilteredJob, NOT_AVAILABLE};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    pub jobs: Vec<FilteredJob>,
    pub dropped_incomplete: usize,
    pub dropped_duplicates: usize,
}

fn present(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != NOT_AVAILABLE)
}

/// Grouping key: company name trimmed and lowercased.
pub fn company_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Keep the first job per company among jobs with a complete company identity
/// (name, website and LinkedIn URL). Input order decides which job is first.
pub fn dedupe_by_company(jobs: &[CanonicalJob]) -> DedupOutcome {
    let mut seen = HashSet::new();
    let mut outcome = DedupOutcome::default();

    for job in jobs {
        let identity = (
            present(Some(job.company_name.as_str())),
            present(job.company_website.as_deref()),
            present(job.company_linkedin_url.as_deref()),
        );
        let (Some(name), Some(website), Some(linkedin)) = identity else {
            outcome.dropped_incomplete += 1;
            continue;
        };

        if !seen.insert(company_key(name)) {
            outcome.dropped_duplicates += 1;
            continue;
        }

        outcome.jobs.push(FilteredJob {
            title: job.title.clone(),
            company_name: name.to_string(),
            company_logo: job.company_logo.clone(),
            company_website: website.to_string(),
            company_linkedin_url: linkedin.to_string(),
            location: job.location.clone(),
            job_poster_name: job.job_poster_name.clone(),
            job_poster_linkedin_url: job.job_poster_linkedin_url.clone(),
            original_url: job.original_url.clone(),
            job_poster_email: None,
            email_verification_status: None,
            can_apply: false,
        });
    }

    debug!(
        kept = outcome.jobs.len(),
        dropped_incomplete = outcome.dropped_incomplete,
        dropped_duplicates = outcome.dropped_duplicates,
        "Company dedup finished"
    );
    outcome
}
