// src/core/config_manager.rs
//! Unified configuration management - file settings plus secrets from the environment

use anyhow::{Context, Result};
use tracing::info;

use crate::environment::EnvironmentConfig;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment: EnvironmentConfig,
    pub secrets: ProviderSecrets,
    pub port: u16,
}

/// Provider credentials. Never read from config.yaml.
#[derive(Clone, Default)]
pub struct ProviderSecrets {
    pub apify_token: Option<String>,
    pub profile_scraper_key: Option<String>,
    pub email_verifier_key: Option<String>,
    pub openai_key: Option<String>,
}

impl std::fmt::Debug for ProviderSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSecrets")
            .field("apify_token", &self.apify_token.is_some())
            .field("profile_scraper_key", &self.profile_scraper_key.is_some())
            .field("email_verifier_key", &self.email_verifier_key.is_some())
            .field("openai_key", &self.openai_key.is_some())
            .finish()
    }
}

impl ConfigManager {
    /// Load all configurations
    pub fn load() -> Result<Self> {
        let environment = EnvironmentConfig::load()?;
        let secrets = Self::load_secrets();
        let port = Self::load_port()?;

        info!(
            "Configuration loaded (database: {}, secrets: {:?})",
            environment.database_path.display(),
            secrets
        );

        Ok(Self {
            environment,
            secrets,
            port,
        })
    }

    fn load_secrets() -> ProviderSecrets {
        ProviderSecrets {
            apify_token: non_empty_env("APIFY_API_KEY").or_else(|| non_empty_env("APIFY_TOKEN")),
            profile_scraper_key: non_empty_env("PROFILE_SCRAPER_API_KEY"),
            email_verifier_key: non_empty_env("EMAIL_VERIFIER_API_KEY"),
            openai_key: non_empty_env("OPENAI_API_KEY"),
        }
    }

    fn load_port() -> Result<u16> {
        match std::env::var("ROCKET_PORT") {
            Ok(port) => port
                .parse::<u16>()
                .context("ROCKET_PORT must be a valid port number"),
            Err(_) => Ok(DEFAULT_PORT),
        }
    }

    /// Ensure the database directory exists
    pub async fn ensure_directories(&self) -> Result<()> {
        if let Some(db_parent) = self.environment.database_path.parent() {
            tokio::fs::create_dir_all(db_parent)
                .await
                .with_context(|| {
                    format!(
                        "Failed to create database directory: {}",
                        db_parent.display()
                    )
                })?;
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
