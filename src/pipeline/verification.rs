// src/pipeline/verification.rs
//! Stage 4: tier poster emails by deliverability.
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use super::fields::first_text;
use crate::providers::EmailVerifier;
use crate::types::{FilteredJob, VerificationStatus};

const EMAIL_KEYS: &[&str] = &["email", "Email", "address"];
const STATUS_KEYS: &[&str] = &["status", "email_status", "result"];

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Email to tier map built from the verifier's result array.
pub fn status_map(results: &[Value]) -> HashMap<String, VerificationStatus> {
    let mut map = HashMap::new();
    for result in results {
        let Some(email) = first_text(result, EMAIL_KEYS) else {
            continue;
        };
        let status = first_text(result, STATUS_KEYS)
            .map(|raw| VerificationStatus::from_provider_status(&raw))
            .unwrap_or(VerificationStatus::Unknown);
        map.entry(email_key(&email)).or_insert(status);
    }
    map
}

/// Set `email_verification_status` on every job that can apply.
///
/// `can_apply` is never changed. Provider failure tiers everything as unknown.
pub async fn verify_jobs(mut jobs: Vec<FilteredJob>, verifier: &dyn EmailVerifier) -> Vec<FilteredJob> {
    let mut seen = HashSet::new();
    let emails: Vec<String> = jobs
        .iter()
        .filter(|job| job.can_apply)
        .filter_map(|job| job.job_poster_email.as_deref())
        .filter(|email| seen.insert(email_key(email)))
        .map(str::to_string)
        .collect();

    if emails.is_empty() {
        debug!("No emails to verify");
        return jobs;
    }

    let statuses = match verifier.verify_emails(&emails).await {
        Ok(results) => status_map(&results),
        Err(e) => {
            warn!(emails = emails.len(), error = %e, "Email verification failed, marking unknown");
            HashMap::new()
        }
    };

    for job in jobs.iter_mut().filter(|job| job.can_apply) {
        let status = job
            .job_poster_email
            .as_deref()
            .and_then(|email| statuses.get(&email_key(email)).copied())
            .unwrap_or(VerificationStatus::Unknown);
        job.email_verification_status = Some(status);
    }

    let valid = jobs
        .iter()
        .filter(|job| job.email_verification_status == Some(VerificationStatus::Valid))
        .count();
    info!(emails = emails.len(), valid, "Email verification finished");
    jobs
}
