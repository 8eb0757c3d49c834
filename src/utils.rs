// src/utils.rs
use anyhow::Result;

const LINKEDIN_JOBS_SEARCH: &str = "https://www.linkedin.com/jobs/search/";

/// Accept only LinkedIn job URLs (search or posting)
pub fn validate_linkedin_jobs_url(url: &str) -> Result<()> {
    let url = url.trim();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        anyhow::bail!("Please enter a valid URL");
    }
    if !url.contains("linkedin.com") {
        anyhow::bail!("Please enter a LinkedIn URL");
    }
    if !url.contains("/jobs/") {
        anyhow::bail!("Please enter a LinkedIn job URL");
    }
    Ok(())
}

/// Build a LinkedIn jobs search URL from keywords and an optional location
pub fn linkedin_search_url(keywords: &str, location: Option<&str>) -> String {
    format!(
        "{}?keywords={}&location={}",
        LINKEDIN_JOBS_SEARCH,
        urlencoding::encode(keywords.trim()),
        urlencoding::encode(location.unwrap_or("").trim())
    )
}

/// Profile URL without trailing slashes
pub fn strip_trailing_slash(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}

/// Profile URL without scheme, `www.` prefix or trailing slashes
pub fn bare_profile_url(url: &str) -> &str {
    let url = strip_trailing_slash(url);
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    url.strip_prefix("www.").unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_linkedin_jobs_url() {
        assert!(validate_linkedin_jobs_url(
            "https://www.linkedin.com/jobs/search/?keywords=rust"
        )
        .is_ok());
        assert!(validate_linkedin_jobs_url("https://www.linkedin.com/in/jane").is_err());
        assert!(validate_linkedin_jobs_url("https://indeed.com/jobs/123").is_err());
        assert!(validate_linkedin_jobs_url("linkedin.com/jobs/").is_err());
    }

    #[test]
    fn test_linkedin_search_url() {
        assert_eq!(
            linkedin_search_url("rust engineer", Some("Berlin, Germany")),
            "https://www.linkedin.com/jobs/search/?keywords=rust%20engineer&location=Berlin%2C%20Germany"
        );
        assert_eq!(
            linkedin_search_url("sre", None),
            "https://www.linkedin.com/jobs/search/?keywords=sre&location="
        );
    }

    #[test]
    fn test_profile_url_normalization() {
        assert_eq!(
            strip_trailing_slash("https://linkedin.com/in/jane//"),
            "https://linkedin.com/in/jane"
        );
        assert_eq!(
            bare_profile_url("https://www.linkedin.com/in/jane/"),
            "linkedin.com/in/jane"
        );
        assert_eq!(
            bare_profile_url("http://linkedin.com/in/jane"),
            "linkedin.com/in/jane"
        );
    }
}
