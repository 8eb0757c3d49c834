// src/pipeline/enrichment.rs
//! Stage 3: resolve poster emails through one batched profile lookup.
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::fields::text_at;
use crate::providers::ProfileScraper;
use crate::types::FilteredJob;
use crate::utils::{bare_profile_url, strip_trailing_slash};

const EMAIL_PATHS: &[&str] = &[
    "email",
    "Email",
    "emailAddress",
    "email_address",
    "contactInfo.email",
    "contact_info.email",
    "contactInfo.emails",
    "contact.email",
    "emails",
];

/// First usable email in a profile result. The literal `"null"` is absent.
pub fn extract_email(profile: &Value) -> Option<String> {
    EMAIL_PATHS.iter().find_map(|path| {
        text_at(profile, path).filter(|email| !email.eq_ignore_ascii_case("null"))
    })
}

/// Email lookup by requested profile URL, with three match levels.
#[derive(Debug, Default)]
pub struct EmailIndex {
    exact: HashMap<String, String>,
    slashless: HashMap<String, String>,
    bare: HashMap<String, String>,
}

impl EmailIndex {
    /// Pair `results[i]` with `requested[i]`. Only the overlapping prefix is
    /// correlated; URLs beyond the shorter side stay unresolved.
    pub fn correlate(requested: &[String], results: &[Value]) -> Self {
        let mut index = Self::default();
        for (url, profile) in requested.iter().zip(results) {
            if let Some(email) = extract_email(profile) {
                index.insert(url, email);
            }
        }
        index
    }

    fn insert(&mut self, url: &str, email: String) {
        self.slashless
            .entry(strip_trailing_slash(url).to_string())
            .or_insert_with(|| email.clone());
        self.bare
            .entry(bare_profile_url(url).to_lowercase())
            .or_insert_with(|| email.clone());
        self.exact.entry(url.to_string()).or_insert(email);
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    pub fn resolve(&self, url: &str) -> Option<&str> {
        self.exact
            .get(url)
            .or_else(|| self.slashless.get(strip_trailing_slash(url)))
            .or_else(|| self.bare.get(&bare_profile_url(url).to_lowercase()))
            .map(String::as_str)
    }
}

fn without_contacts(mut jobs: Vec<FilteredJob>) -> Vec<FilteredJob> {
    for job in &mut jobs {
        job.job_poster_email = None;
        job.can_apply = false;
    }
    jobs
}

/// Attach poster emails and set `can_apply`.
///
/// Never fails: a provider error leaves every job with `can_apply = false`.
pub async fn enrich_jobs(jobs: Vec<FilteredJob>, profiles: &dyn ProfileScraper) -> Vec<FilteredJob> {
    let requested: Vec<String> = jobs
        .iter()
        .filter_map(|job| job.poster_url().map(str::to_string))
        .collect();

    if requested.is_empty() {
        debug!(jobs = jobs.len(), "No poster profiles to enrich");
        return without_contacts(jobs);
    }

    let results = match profiles.lookup_profiles(&requested).await {
        Ok(results) => results,
        Err(e) => {
            warn!(profiles = requested.len(), error = %e, "Profile lookup failed, continuing without contacts");
            return without_contacts(jobs);
        }
    };

    if results.len() != requested.len() {
        warn!(
            requested = requested.len(),
            returned = results.len(),
            "Profile results not aligned with request, unmatched profiles stay unresolved"
        );
    }

    let index = EmailIndex::correlate(&requested, &results);
    let mut jobs = without_contacts(jobs);
    for job in &mut jobs {
        let email = job
            .poster_url()
            .and_then(|url| index.resolve(url))
            .map(str::to_string);
        job.can_apply = email.is_some();
        job.job_poster_email = email;
    }

    info!(
        requested = requested.len(),
        emails = index.len(),
        can_apply = jobs.iter().filter(|job| job.can_apply).count(),
        "Profile enrichment finished"
    );
    jobs
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::providers::{ProviderError, ProviderResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    pub(crate) fn filtered(company: &str, poster: Option<&str>) -> FilteredJob {
        let slug = company.to_lowercase();
        FilteredJob {
            title: format!("Engineer at {}", company),
            company_name: company.to_string(),
            company_logo: None,
            company_website: format!("https://{}.com", slug),
            company_linkedin_url: format!("https://www.linkedin.com/company/{}", slug),
            location: "Remote".to_string(),
            job_poster_name: None,
            job_poster_linkedin_url: poster.map(str::to_string),
            original_url: format!("https://www.linkedin.com/jobs/view/{}", slug),
            job_poster_email: None,
            email_verification_status: None,
            can_apply: false,
        }
    }

    /// Returns canned results (or a 500 when `None`) and records each batch.
    /// A hanging instance records the batch and never answers.
    #[derive(Default)]
    pub(crate) struct RecordingProfiles {
        pub results: Option<Vec<Value>>,
        pub calls: Mutex<Vec<Vec<String>>>,
        pub hang: bool,
    }

    impl RecordingProfiles {
        pub(crate) fn returning(results: Vec<Value>) -> Self {
            Self {
                results: Some(results),
                calls: Mutex::default(),
                hang: false,
            }
        }

        pub(crate) fn failing() -> Self {
            Self::default()
        }

        pub(crate) fn hanging() -> Self {
            Self {
                hang: true,
                ..Self::default()
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ProfileScraper for RecordingProfiles {
        async fn lookup_profiles(&self, profile_urls: &[String]) -> ProviderResult<Vec<Value>> {
            self.calls.lock().unwrap().push(profile_urls.to_vec());
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.results.clone().ok_or(ProviderError::Api {
                status: 500,
                message: "profile service unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_exact_match_sets_email() {
        let profiles = RecordingProfiles::returning(vec![json!({"email": "jane@co.com"})]);
        let jobs = vec![filtered("Acme", Some("https://linkedin.com/in/jane"))];

        let out = enrich_jobs(jobs, &profiles).await;
        assert_eq!(out[0].job_poster_email.as_deref(), Some("jane@co.com"));
        assert!(out[0].can_apply);
        assert_eq!(
            profiles.calls.lock().unwrap()[0],
            vec!["https://linkedin.com/in/jane".to_string()]
        );
    }

    #[test]
    fn test_www_and_trailing_slash_still_match() {
        let index = EmailIndex::correlate(
            &["https://linkedin.com/in/jane".to_string()],
            &[json!({"email": "jane@co.com"})],
        );
        assert_eq!(index.resolve("https://www.linkedin.com/in/jane/"), Some("jane@co.com"));
        assert_eq!(index.resolve("https://linkedin.com/in/jane/"), Some("jane@co.com"));
        assert_eq!(index.resolve("https://linkedin.com/in/john"), None);
    }

    #[tokio::test]
    async fn test_no_poster_urls_skips_provider() {
        let profiles = RecordingProfiles::returning(vec![]);
        let jobs = vec![
            filtered("Acme", None),
            filtered("Globex", Some("N/A")),
            filtered("Hooli", Some("  ")),
        ];

        let out = enrich_jobs(jobs, &profiles).await;
        assert_eq!(profiles.call_count(), 0);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|job| !job.can_apply));
    }

    #[tokio::test]
    async fn test_provider_failure_is_fail_safe() {
        let profiles = RecordingProfiles::failing();
        let jobs = vec![
            filtered("Acme", Some("https://linkedin.com/in/jane")),
            filtered("Globex", None),
        ];

        let out = enrich_jobs(jobs, &profiles).await;
        assert_eq!(profiles.call_count(), 1);
        assert!(out.iter().all(|job| !job.can_apply && job.job_poster_email.is_none()));
    }

    #[tokio::test]
    async fn test_positional_correlation_with_short_response() {
        let profiles = RecordingProfiles::returning(vec![
            json!({"contactInfo": {"email": "ann@acme.com"}}),
            json!({"email": "null"}),
        ]);
        let jobs = vec![
            filtered("Acme", Some("https://linkedin.com/in/ann")),
            filtered("Nobody", None),
            filtered("Globex", Some("https://linkedin.com/in/bob")),
            filtered("Hooli", Some("https://linkedin.com/in/cat")),
        ];

        let out = enrich_jobs(jobs, &profiles).await;
        assert_eq!(profiles.calls.lock().unwrap()[0].len(), 3);
        assert_eq!(out[0].job_poster_email.as_deref(), Some("ann@acme.com"));
        assert!(out[0].can_apply);
        assert!(!out[1].can_apply);
        assert!(!out[2].can_apply, "literal null is not an email");
        assert!(!out[3].can_apply, "beyond the returned prefix stays unresolved");
    }

    #[tokio::test]
    async fn test_exact_key_always_applies() {
        let urls = [
            "https://linkedin.com/in/a",
            "https://www.linkedin.com/in/b/",
            "http://linkedin.com/in/c",
        ];
        let results: Vec<Value> = urls
            .iter()
            .enumerate()
            .map(|(i, _)| json!({"Email": format!("p{}@x.io", i)}))
            .collect();
        let profiles = RecordingProfiles::returning(results);
        let jobs: Vec<_> = urls
            .iter()
            .enumerate()
            .map(|(i, url)| filtered(&format!("Co{}", i), Some(url)))
            .collect();

        let out = enrich_jobs(jobs, &profiles).await;
        for (i, job) in out.iter().enumerate() {
            assert!(job.can_apply);
            assert_eq!(job.job_poster_email, Some(format!("p{}@x.io", i)));
        }
    }

    #[test]
    fn test_extract_email_candidates() {
        assert_eq!(
            extract_email(&json!({"emails": ["", "a@b.co"]})).as_deref(),
            Some("a@b.co")
        );
        assert_eq!(
            extract_email(&json!({"email": null, "emailAddress": "c@d.co"})).as_deref(),
            Some("c@d.co")
        );
        assert_eq!(extract_email(&json!({"email": "NULL"})), None);
        assert_eq!(extract_email(&json!({})), None);
    }
}
