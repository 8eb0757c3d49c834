// src/providers/email_verifier.rs
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{into_result_array, EmailVerifier, ProviderError, ProviderResult};
use crate::core::ServiceClient;
use crate::environment::EndpointSettings;

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    emails: &'a [String],
}

pub struct HttpEmailVerifier {
    client: Option<ServiceClient>,
}

impl HttpEmailVerifier {
    pub fn new(settings: &EndpointSettings, token: Option<String>) -> Result<Self> {
        let client = settings
            .url
            .as_deref()
            .map(|url| ServiceClient::new(url, token, settings.timeout_seconds))
            .transpose()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EmailVerifier for HttpEmailVerifier {
    async fn verify_emails(&self, emails: &[String]) -> ProviderResult<Vec<Value>> {
        let client = self
            .client
            .as_ref()
            .ok_or(ProviderError::MissingCredentials("email verifier url"))?;

        info!(emails = emails.len(), "Verifying emails");
        let body: Value = client.post_json("", &VerifyRequest { emails }).await?;
        into_result_array(body)
    }
}
