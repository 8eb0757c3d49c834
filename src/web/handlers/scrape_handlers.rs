// src/web/handlers/scrape_handlers.rs
use crate::types::{RequestStatus, ScrapeRequest};
use crate::utils::{linkedin_search_url, validate_linkedin_jobs_url};
use crate::web::types::*;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info};

const DEFAULT_LIST_LIMIT: usize = 20;
const MAX_LIST_LIMIT: usize = 100;

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn storage_error(e: anyhow::Error, conversation_id: Option<String>) -> ApiError {
    error!("Request store failure: {}", e);
    StandardErrorResponse::new(
        "Failed to access scrape requests".to_string(),
        "STORAGE_ERROR".to_string(),
        vec!["Try again in a few moments".to_string()],
        conversation_id,
    )
    .with_status(Status::InternalServerError)
}

fn not_found(id: &str) -> ApiError {
    StandardErrorResponse::new(
        format!("Scrape request not found: {}", id),
        "REQUEST_NOT_FOUND".to_string(),
        vec!["Check the request id returned when the search was submitted".to_string()],
        None,
    )
    .with_status(Status::NotFound)
}

/// Resolve the LinkedIn URL to scrape from a URL or a keyword search.
fn source_url(request: &ScrapeJobRequest) -> Result<String, (String, &'static str)> {
    if let Some(url) = non_empty(&request.linkedin_url) {
        validate_linkedin_jobs_url(url).map_err(|e| (e.to_string(), "INVALID_LINKEDIN_URL"))?;
        return Ok(url.to_string());
    }
    if let Some(search) = non_empty(&request.search) {
        return Ok(linkedin_search_url(search, non_empty(&request.location)));
    }
    Err((
        "Provide a LinkedIn jobs URL or search keywords".to_string(),
        "MISSING_SOURCE",
    ))
}

pub async fn submit_scrape_handler(
    request: Json<StandardRequest<ScrapeJobRequest>>,
    state: &State<ServerState>,
) -> Result<Json<DataResponse<ScrapeJobCreated>>, ApiError> {
    let conversation_id = request.conversation_id();

    let url = source_url(&request.data).map_err(|(message, code)| {
        StandardErrorResponse::new(
            message,
            code.to_string(),
            vec![
                "Use a URL like https://www.linkedin.com/jobs/search/?keywords=rust".to_string(),
                "Or send `search` with optional `location`".to_string(),
            ],
            conversation_id.clone(),
        )
        .with_status(Status::BadRequest)
    })?;

    let resume_text = non_empty(&request.data.resume_text).map(str::to_string);
    let created = state
        .orchestrator
        .submit(&url, resume_text)
        .await
        .map_err(|e| storage_error(e, conversation_id.clone()))?;

    info!("Scrape request {} accepted for {}", created.id, url);

    Ok(Json(DataResponse::success(
        "Job scraping request submitted".to_string(),
        ScrapeJobCreated {
            request_id: created.id,
            status: created.status,
            source_url: created.source_url,
        },
        conversation_id,
    )))
}

pub async fn get_scrape_handler(
    id: &str,
    state: &State<ServerState>,
) -> Result<Json<DataResponse<ScrapeRequest>>, ApiError> {
    let request = state
        .orchestrator
        .store()
        .get(id)
        .await
        .map_err(|e| storage_error(e, None))?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(DataResponse::success(
        format!("Request is {}", request.status),
        request,
        None,
    )))
}

pub async fn cancel_scrape_handler(
    id: &str,
    state: &State<ServerState>,
) -> Result<Json<ActionResponse>, ApiError> {
    let cancelled = state
        .orchestrator
        .cancel(id)
        .await
        .map_err(|e| storage_error(e, None))?;

    if cancelled {
        return Ok(Json(
            ActionResponse::success(
                format!("Scrape request {} cancelled", id),
                "cancel".to_string(),
                None,
            )
            .with_next_actions(vec!["submit_search".to_string()]),
        ));
    }

    let current = state
        .orchestrator
        .store()
        .get(id)
        .await
        .map_err(|e| storage_error(e, None))?
        .ok_or_else(|| not_found(id))?;

    Err(StandardErrorResponse::new(
        format!("Scrape request already {}", current.status),
        "REQUEST_FINISHED".to_string(),
        vec!["Submit a new search to retry".to_string()],
        None,
    )
    .with_status(Status::Conflict))
}

pub async fn list_scrapes_handler(
    status: Option<&str>,
    limit: Option<usize>,
    state: &State<ServerState>,
) -> Result<Json<DataResponse<Vec<ScrapeRequest>>>, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    let store = state.orchestrator.store();

    let requests = match status {
        Some(status) => {
            let status: RequestStatus = status.parse().map_err(|e: anyhow::Error| {
                StandardErrorResponse::new(
                    e.to_string(),
                    "INVALID_STATUS".to_string(),
                    vec![format!(
                        "Use one of: {}",
                        RequestStatus::ALL.map(|s| s.as_str()).join(", ")
                    )],
                    None,
                )
                .with_status(Status::BadRequest)
            })?;
            store
                .list_by_status(status)
                .await
                .map_err(|e| storage_error(e, None))?
                .into_iter()
                .take(limit)
                .collect()
        }
        None => store
            .list_recent(limit)
            .await
            .map_err(|e| storage_error(e, None))?,
    };

    Ok(Json(DataResponse::success(
        format!("{} scrape requests", requests.len()),
        requests,
        None,
    )))
}

pub async fn stats_handler(
    state: &State<ServerState>,
) -> Result<Json<DataResponse<StatsData>>, ApiError> {
    let by_status = state
        .orchestrator
        .store()
        .count_by_status()
        .await
        .map_err(|e| storage_error(e, None))?;

    Ok(Json(DataResponse::success(
        "Scrape request statistics".to_string(),
        StatsData {
            total_requests: by_status.values().sum(),
            running_pipelines: state.orchestrator.running_count(),
            by_status,
        },
        None,
    )))
}
