// src/types/job.rs
use serde::{Deserialize, Serialize};

/// Placeholder written by the normalizer when a display field is missing.
pub const NOT_AVAILABLE: &str = "N/A";

/// One scraped posting, independent of the scraper's field naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalJob {
    pub title: String,
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_linkedin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_founded: Option<String>,
    pub location: String,
    pub work_type: String,
    pub posted_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicants: Option<String>,
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_poster_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_poster_linkedin_url: Option<String>,
    pub original_url: String,
}

/// Outreach-ready projection of a [`CanonicalJob`].
///
/// Only built for jobs with a complete company identity. The enrichment and
/// verification stages fill in `job_poster_email`, `can_apply` and
/// `email_verification_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredJob {
    pub title: String,
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_logo: Option<String>,
    pub company_website: String,
    pub company_linkedin_url: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_poster_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_poster_linkedin_url: Option<String>,
    pub original_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_poster_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verification_status: Option<VerificationStatus>,
    #[serde(default)]
    pub can_apply: bool,
}

impl FilteredJob {
    /// Poster profile URL usable for enrichment, if any.
    pub fn poster_url(&self) -> Option<&str> {
        self.job_poster_linkedin_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty() && *url != NOT_AVAILABLE)
    }
}

/// Deliverability tier assigned by the email verification stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationStatus {
    Valid,
    CatchAll,
    Error,
    Unknown,
}

impl VerificationStatus {
    /// Bucket a verifier's free-text status.
    ///
    /// Checked in order: "valid", "catch", "error"/"invalid", otherwise unknown.
    /// Matching is case-insensitive and "invalid" never lands in the valid bucket.
    pub fn from_provider_status(raw: &str) -> Self {
        let status = raw.to_lowercase();
        if status.contains("valid") && !status.contains("invalid") {
            Self::Valid
        } else if status.contains("catch") {
            Self::CatchAll
        } else if status.contains("error") || status.contains("invalid") {
            Self::Error
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::CatchAll => "catch-all",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
