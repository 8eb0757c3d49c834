// src/web/handlers/email_handlers.rs
use crate::providers::{EmailDraft, EmailDraftRequest, ProviderError};
use crate::web::types::*;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info};

/// Resume from the body, else the one stored with the scrape request.
async fn resolve_resume(
    request: &GenerateEmailRequest,
    state: &ServerState,
) -> anyhow::Result<Option<String>> {
    let inline = request
        .resume
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    if let Some(resume) = inline {
        return Ok(Some(resume.to_string()));
    }

    let Some(id) = request.request_id.as_deref() else {
        return Ok(None);
    };
    Ok(state
        .orchestrator
        .store()
        .get(id)
        .await?
        .and_then(|stored| stored.resume_text)
        .filter(|r| !r.trim().is_empty()))
}

pub async fn generate_email_handler(
    request: Json<StandardRequest<GenerateEmailRequest>>,
    state: &State<ServerState>,
) -> Result<Json<DataResponse<EmailDraft>>, ApiError> {
    let conversation_id = request.conversation_id();
    let body = &request.data;

    if body.job_title.trim().is_empty() || body.company_name.trim().is_empty() {
        return Err(StandardErrorResponse::new(
            "Job title and company name are required".to_string(),
            "MISSING_JOB_DETAILS".to_string(),
            vec!["Send `jobTitle` and `companyName`".to_string()],
            conversation_id,
        )
        .with_status(Status::BadRequest));
    }

    let resume = match resolve_resume(body, state).await {
        Ok(Some(resume)) => resume,
        Ok(None) => {
            return Err(StandardErrorResponse::new(
                "No resume available for this application".to_string(),
                "MISSING_RESUME".to_string(),
                vec![
                    "Send `resume` in the request body".to_string(),
                    "Or reference a scrape request submitted with `resumeText`".to_string(),
                ],
                conversation_id,
            )
            .with_status(Status::BadRequest));
        }
        Err(e) => {
            error!("Failed to load stored resume: {}", e);
            return Err(StandardErrorResponse::new(
                "Failed to load the stored resume".to_string(),
                "STORAGE_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                conversation_id,
            )
            .with_status(Status::InternalServerError));
        }
    };

    let draft_request = EmailDraftRequest {
        job_title: body.job_title.trim().to_string(),
        company_name: body.company_name.trim().to_string(),
        job_description: body.job_description.clone(),
        resume,
    };

    match state.email_writer.write_application(&draft_request).await {
        Ok(draft) => {
            info!(
                "Generated application email for {} at {}",
                draft_request.job_title, draft_request.company_name
            );
            Ok(Json(DataResponse::success(
                "Application email generated".to_string(),
                draft,
                conversation_id,
            )))
        }
        Err(ProviderError::MissingCredentials(name)) => Err(StandardErrorResponse::new(
            format!("Email generation is not configured ({} missing)", name),
            "SERVICE_CONFIG_ERROR".to_string(),
            vec!["Contact system administrator".to_string()],
            conversation_id,
        )
        .with_status(Status::ServiceUnavailable)),
        Err(e) => {
            error!("Email generation failed: {}", e);
            Err(StandardErrorResponse::new(
                "Failed to generate email".to_string(),
                "EMAIL_GENERATION_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                conversation_id,
            )
            .with_status(Status::BadGateway))
        }
    }
}
