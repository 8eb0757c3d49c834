// src/pipeline/normalizer.rs
//! Stage 1: map raw scraper items onto [`CanonicalJob`].
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::fields::{first_text, lookup, text_at};
use crate::types::{CanonicalJob, NOT_AVAILABLE};

const NO_DESCRIPTION: &str = "No description available";

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Ordered alternate key names per canonical field. The first non-empty hit wins.
///
/// Scraper schemas drift between actor versions, so every list can be
/// overridden from config.yaml. Dotted paths reach into nested objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldAliases {
    pub title: Vec<String>,
    pub company_name: Vec<String>,
    pub company_logo: Vec<String>,
    pub company_website: Vec<String>,
    pub company_linkedin_url: Vec<String>,
    pub company_industry: Vec<String>,
    pub company_size: Vec<String>,
    pub company_founded: Vec<String>,
    pub location: Vec<String>,
    pub work_type: Vec<String>,
    pub posted_date: Vec<String>,
    pub applicants: Vec<String>,
    pub description: Vec<String>,
    pub skills: Vec<String>,
    pub salary_info: Vec<String>,
    pub job_poster_name: Vec<String>,
    pub job_poster_linkedin_url: Vec<String>,
    pub original_url: Vec<String>,
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self {
            title: keys(&["title", "jobTitle", "positionName", "position"]),
            company_name: keys(&["companyName", "company.name", "company"]),
            company_logo: keys(&["companyLogo", "companyLogoUrl", "company.logo"]),
            company_website: keys(&[
                "companyWebsite",
                "companyUrl",
                "company.website",
                "companyDetails.website",
                "website",
            ]),
            company_linkedin_url: keys(&[
                "companyLinkedinUrl",
                "companyLinkedInUrl",
                "companyLink",
                "company.linkedinUrl",
                "company.url",
            ]),
            company_industry: keys(&["industry", "industries", "companyIndustry", "company.industry"]),
            company_size: keys(&["companySize", "companyEmployeesCount", "company.size"]),
            company_founded: keys(&["founded", "companyFounded", "company.founded"]),
            location: keys(&["location", "jobLocation", "place"]),
            work_type: keys(&["employmentType", "workType", "contractType", "workplaceType"]),
            posted_date: keys(&["postedDate", "postedAt", "publishedAt", "postedTime"]),
            applicants: keys(&["applicants", "applicantsCount", "numApplicants"]),
            description: keys(&["description", "descriptionText", "jobDescription"]),
            skills: keys(&["skills", "jobSkills"]),
            salary_info: keys(&["salaryInfo", "salary", "salaryRange", "compensation"]),
            job_poster_name: keys(&[
                "jobPosterName",
                "posterName",
                "recruiterName",
                "hiringManagerName",
                "poster.name",
            ]),
            job_poster_linkedin_url: keys(&[
                "jobPosterProfileUrl",
                "jobPosterUrl",
                "posterUrl",
                "posterProfileUrl",
                "recruiterUrl",
                "recruiterProfileUrl",
                "hiringManagerUrl",
                "hiringManagerProfileUrl",
                "poster.url",
            ]),
            original_url: keys(&["url", "jobUrl", "link", "applyUrl"]),
        }
    }
}

pub struct JobNormalizer {
    aliases: FieldAliases,
}

impl Default for JobNormalizer {
    fn default() -> Self {
        Self::new(FieldAliases::default())
    }
}

impl JobNormalizer {
    pub fn new(aliases: FieldAliases) -> Self {
        Self { aliases }
    }

    /// Normalize every item. Never fails; missing fields degrade to defaults.
    /// `source_url` stands in for a missing posting link.
    pub fn normalize(&self, items: &[Value], source_url: &str) -> Vec<CanonicalJob> {
        let jobs: Vec<CanonicalJob> = items
            .iter()
            .map(|item| self.normalize_item(item, source_url))
            .collect();

        let with_poster = jobs
            .iter()
            .filter(|job| job.job_poster_linkedin_url.is_some())
            .count();
        debug!(jobs = jobs.len(), with_poster, "Normalized scraped jobs");
        jobs
    }

    fn normalize_item(&self, item: &Value, source_url: &str) -> CanonicalJob {
        let a = &self.aliases;
        let display = |paths: &[String]| {
            first_text(item, paths).unwrap_or_else(|| NOT_AVAILABLE.to_string())
        };
        let optional = |paths: &[String]| first_text(item, paths);

        CanonicalJob {
            title: display(&a.title),
            company_name: display(&a.company_name),
            company_logo: optional(&a.company_logo),
            company_website: optional(&a.company_website),
            company_linkedin_url: optional(&a.company_linkedin_url),
            company_industry: optional(&a.company_industry),
            company_size: optional(&a.company_size),
            company_founded: optional(&a.company_founded),
            location: display(&a.location),
            work_type: display(&a.work_type),
            posted_date: display(&a.posted_date),
            applicants: optional(&a.applicants),
            description: optional(&a.description).unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            skills: self.skills(item),
            salary_info: self.salary(item),
            job_poster_name: optional(&a.job_poster_name),
            job_poster_linkedin_url: optional(&a.job_poster_linkedin_url),
            original_url: optional(&a.original_url).unwrap_or_else(|| source_url.to_string()),
        }
    }

    fn skills(&self, item: &Value) -> Vec<String> {
        let found = self
            .aliases
            .skills
            .iter()
            .find_map(|path| lookup(item, path).filter(|v| !v.is_null()));

        match found {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| match entry {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Object(_) => first_text(entry, &["name", "skill"]),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn salary(&self, item: &Value) -> Option<String> {
        self.aliases.salary_info.iter().find_map(|path| {
            let value = lookup(item, path)?;
            match value {
                Value::Object(map) if map.is_empty() => None,
                Value::Object(_) => first_text(value, &["text", "formatted", "range"])
                    .or_else(|| Some(value.to_string())),
                _ => text_at(item, path),
            }
        })
    }
}
