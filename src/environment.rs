// src/environment.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::pipeline::normalizer::FieldAliases;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default)]
    pub providers: ProviderSettings,
    #[serde(default)]
    pub field_aliases: FieldAliases,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub job_scraper: JobScraperSettings,
    pub profile_scraper: EndpointSettings,
    pub email_verifier: EndpointSettings,
    pub email_writer: EmailWriterSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobScraperSettings {
    pub base_url: String,
    pub actor_id: String,
    pub result_count: u32,
    pub timeout_seconds: u64,
    pub poll_interval_seconds: u64,
    pub max_poll_attempts: u32,
}

impl Default for JobScraperSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.apify.com/v2".to_string(),
            actor_id: "trudax~linkedin-job-scraper".to_string(),
            result_count: 100,
            timeout_seconds: 120,
            poll_interval_seconds: 5,
            max_poll_attempts: 60,
        }
    }
}

/// A batched provider reached with a single POST.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    pub url: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout_seconds: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailWriterSettings {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for EmailWriterSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            timeout_seconds: 60,
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/jobscout.db")
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            providers: ProviderSettings::default(),
            field_aliases: FieldAliases::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    local: EnvironmentConfig,
    #[serde(default)]
    production: EnvironmentConfig,
}

impl EnvironmentConfig {
    /// Load configuration based on environment
    pub fn load() -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        let config_path = PathBuf::from("config.yaml");
        let config = if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).context("Failed to read config.yaml")?;
            Self::from_yaml(&content, &environment)?
        } else {
            warn!("config.yaml not found in current directory, using built-in defaults");
            Self::default()
        };

        Ok(Self {
            database_path: Self::resolve_path(&config.database_path)?,
            ..config
        })
    }

    pub fn get_environment() -> String {
        std::env::var("JOBSCOUT_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .or_else(|_| std::env::var("ENV"))
            .unwrap_or_else(|_| "local".to_string())
    }

    /// Pick the section for `environment` out of a config.yaml document
    pub fn from_yaml(content: &str, environment: &str) -> Result<Self> {
        let config_file: ConfigFile =
            serde_yaml::from_str(content).context("Failed to parse config.yaml")?;

        Ok(match environment {
            "production" => config_file.production,
            _ => config_file.local,
        })
    }

    fn resolve_path(path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            let current_dir = std::env::current_dir().context("Failed to get current directory")?;
            Ok(current_dir.join(path))
        }
    }
}
