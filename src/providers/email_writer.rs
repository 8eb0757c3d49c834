// src/providers/email_writer.rs
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{EmailDraft, EmailDraftRequest, EmailWriter, ProviderError, ProviderResult};
use crate::core::ServiceClient;
use crate::environment::EmailWriterSettings;

const SYSTEM_PROMPT: &str =
    "You are a professional career coach helping job seekers write compelling application emails.";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Application email drafts from an OpenAI-compatible chat completion endpoint.
pub struct OpenAiEmailWriter {
    client: ServiceClient,
    model: String,
}

impl OpenAiEmailWriter {
    pub fn new(settings: &EmailWriterSettings, api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            client: ServiceClient::new(&settings.base_url, api_key, settings.timeout_seconds)?,
            model: settings.model.clone(),
        })
    }

    fn build_prompt(request: &EmailDraftRequest) -> String {
        format!(
            r#"Generate a professional email applying for the {} position at {}.

Job Description:
{}

Resume:
{}

Create a compelling, personalized email that:
1. Shows genuine interest in the specific role and company
2. Highlights relevant experience and skills from the resume
3. Is concise (under 250 words)
4. Has a professional tone

Format the email with proper greeting and sign-off."#,
            request.job_title,
            request.company_name,
            request
                .job_description
                .as_deref()
                .unwrap_or("Not provided"),
            request.resume
        )
    }

    pub fn subject_for(request: &EmailDraftRequest) -> String {
        format!(
            "Application for {} position at {}",
            request.job_title, request.company_name
        )
    }
}

#[async_trait]
impl EmailWriter for OpenAiEmailWriter {
    async fn write_application(&self, request: &EmailDraftRequest) -> ProviderResult<EmailDraft> {
        if !self.client.has_token() {
            return Err(ProviderError::MissingCredentials("OPENAI_API_KEY"));
        }

        let chat = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Self::build_prompt(request),
                },
            ],
            temperature: 0.7,
            max_tokens: 500,
        };

        info!(
            "Generating application email for {} at {}",
            request.job_title, request.company_name
        );
        let response: ChatResponse = self.client.post_json("/chat/completions", &chat).await?;

        let email = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(EmailDraft {
            subject: Self::subject_for(request),
            email,
        })
    }
}
