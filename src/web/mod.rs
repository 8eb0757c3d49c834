// src/web/mod.rs

pub mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;

use crate::core::{ConfigManager, Database};
use crate::pipeline::PipelineOrchestrator;
use crate::providers::{EmailDraft, OpenAiEmailWriter};
use crate::store::SqliteRequestStore;
use crate::types::ScrapeRequest;
use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};
use std::sync::Arc;
use tracing::{error, info, warn};

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

#[post("/scrape-job", data = "<request>")]
pub async fn submit_scrape(
    request: Json<StandardRequest<ScrapeJobRequest>>,
    state: &State<ServerState>,
) -> Result<Json<DataResponse<ScrapeJobCreated>>, ApiError> {
    handlers::submit_scrape_handler(request, state).await
}

#[get("/scrape-job/<id>")]
pub async fn get_scrape(
    id: &str,
    state: &State<ServerState>,
) -> Result<Json<DataResponse<ScrapeRequest>>, ApiError> {
    handlers::get_scrape_handler(id, state).await
}

#[post("/scrape-job/<id>/cancel")]
pub async fn cancel_scrape(
    id: &str,
    state: &State<ServerState>,
) -> Result<Json<ActionResponse>, ApiError> {
    handlers::cancel_scrape_handler(id, state).await
}

#[get("/scrape-jobs?<status>&<limit>")]
pub async fn list_scrapes(
    status: Option<&str>,
    limit: Option<usize>,
    state: &State<ServerState>,
) -> Result<Json<DataResponse<Vec<ScrapeRequest>>>, ApiError> {
    handlers::list_scrapes_handler(status, limit, state).await
}

#[get("/stats")]
pub async fn stats(state: &State<ServerState>) -> Result<Json<DataResponse<StatsData>>, ApiError> {
    handlers::stats_handler(state).await
}

#[post("/email/generate", data = "<request>")]
pub async fn generate_email(
    request: Json<StandardRequest<GenerateEmailRequest>>,
    state: &State<ServerState>,
) -> Result<Json<DataResponse<EmailDraft>>, ApiError> {
    handlers::generate_email_handler(request, state).await
}

#[get("/health")]
pub async fn health(state: &State<ServerState>) -> Json<TextResponse> {
    handlers::health_handler(state).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format".to_string(),
        "BAD_REQUEST".to_string(),
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
        None,
    ))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Resource not found".to_string(),
        "NOT_FOUND".to_string(),
        vec!["Check the endpoint path".to_string()],
        None,
    ))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Request body does not match the expected shape".to_string(),
        "INVALID_BODY".to_string(),
        vec!["Verify field names and types".to_string()],
        None,
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
        None,
    ))
}

/// Rocket instance with every route, catcher and fairing, before configuration.
pub fn build_rocket(state: ServerState) -> Rocket<Build> {
    rocket::build()
        .attach(Cors)
        .manage(state)
        .register(
            "/api",
            catchers![bad_request, not_found, unprocessable, internal_error],
        )
        .mount(
            "/api",
            routes![
                submit_scrape,
                get_scrape,
                cancel_scrape,
                list_scrapes,
                stats,
                generate_email,
                health,
                options,
            ],
        )
}

// Main server start function
pub async fn start_web_server(config: ConfigManager) -> Result<()> {
    let database = match Database::new(&config.environment.database_path).await {
        Ok(database) => database,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e);
        }
    };

    let store = Arc::new(SqliteRequestStore::new(&database));
    let orchestrator = PipelineOrchestrator::from_config(&config, store)?;

    let recovered = orchestrator.recover_interrupted().await?;
    if recovered > 0 {
        warn!("{} interrupted scrape requests marked as failed", recovered);
    }

    let email_writer = Arc::new(OpenAiEmailWriter::new(
        &config.environment.providers.email_writer,
        config.secrets.openai_key.clone(),
    )?);

    info!("Starting job pipeline API server");
    info!("Database: {}", config.environment.database_path.display());
    info!("Server: http://0.0.0.0:{}", config.port);

    let figment = rocket::Config::figment()
        .merge(("port", config.port))
        .merge(("address", "0.0.0.0"));

    let state = ServerState {
        orchestrator,
        email_writer,
        database: Some(database),
    };

    if let Err(e) = build_rocket(state).configure(figment).launch().await {
        error!("Server failed: {}", e);
        anyhow::bail!("Server failed: {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::enrichment::tests::RecordingProfiles;
    use crate::pipeline::verification::tests::RecordingVerifier;
    use crate::pipeline::PipelineProviders;
    use crate::providers::{
        EmailDraftRequest, EmailWriter, JobScraper, ProviderError, ProviderResult,
    };
    use crate::store::{MemoryRequestStore, RequestStore};
    use crate::types::RequestStatus;
    use async_trait::async_trait;
    use rocket::http::ContentType;
    use rocket::local::asynchronous::Client;
    use serde_json::{json, Value};

    struct NeverScraper;

    #[async_trait]
    impl JobScraper for NeverScraper {
        async fn scrape_jobs(&self, _: &[String], _: u32) -> ProviderResult<Vec<Value>> {
            std::future::pending().await
        }
    }

    struct EchoWriter;

    #[async_trait]
    impl EmailWriter for EchoWriter {
        async fn write_application(&self, request: &EmailDraftRequest) -> ProviderResult<EmailDraft> {
            if request.company_name == "Unconfigured" {
                return Err(ProviderError::MissingCredentials("OPENAI_API_KEY"));
            }
            Ok(EmailDraft {
                subject: OpenAiEmailWriter::subject_for(request),
                email: format!("Dear {}, {}", request.company_name, request.resume),
            })
        }
    }

    async fn client() -> (Client, Arc<MemoryRequestStore>) {
        let store = Arc::new(MemoryRequestStore::new());
        let orchestrator = PipelineOrchestrator::new(
            store.clone(),
            PipelineProviders {
                scraper: Arc::new(NeverScraper),
                profiles: Arc::new(RecordingProfiles::returning(vec![])),
                verifier: Arc::new(RecordingVerifier::returning(vec![])),
            },
        );
        let state = ServerState {
            orchestrator,
            email_writer: Arc::new(EchoWriter),
            database: None,
        };
        let client = Client::tracked(build_rocket(state)).await.unwrap();
        (client, store)
    }

    async fn json_body(response: rocket::local::asynchronous::LocalResponse<'_>) -> Value {
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    #[rocket::async_test]
    async fn test_submit_from_search_then_poll() {
        let (client, _) = client().await;
        let response = client
            .post("/api/scrape-job")
            .header(ContentType::JSON)
            .body(json!({"search": "rust", "location": "Remote"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body = json_body(response).await;
        assert_eq!(body["type"], "data");
        assert_eq!(
            body["data"]["sourceUrl"],
            "https://www.linkedin.com/jobs/search/?keywords=rust&location=Remote"
        );

        let id = body["data"]["requestId"].as_str().unwrap().to_string();
        let response = client.get(format!("/api/scrape-job/{}", id)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body = json_body(response).await;
        assert_eq!(body["data"]["id"], id.as_str());
        assert!(body["data"]["rawResults"].is_null());
    }

    #[rocket::async_test]
    async fn test_submit_rejects_non_job_url() {
        let (client, _) = client().await;
        let response = client
            .post("/api/scrape-job")
            .header(ContentType::JSON)
            .body(json!({"linkedinUrl": "https://www.linkedin.com/in/jane"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error_code"], "INVALID_LINKEDIN_URL");
    }

    #[rocket::async_test]
    async fn test_unknown_request_is_404() {
        let (client, _) = client().await;
        let response = client.get("/api/scrape-job/nope").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        assert_eq!(json_body(response).await["error_code"], "REQUEST_NOT_FOUND");
    }

    #[rocket::async_test]
    async fn test_cancel_then_conflict() {
        let (client, store) = client().await;
        let request = store
            .create("https://www.linkedin.com/jobs/view/1", None)
            .await
            .unwrap();

        let uri = format!("/api/scrape-job/{}/cancel", request.id);
        let first = client.post(uri.clone()).dispatch().await;
        assert_eq!(first.status(), Status::Ok);
        let second = client.post(uri).dispatch().await;
        assert_eq!(second.status(), Status::Conflict);

        let stored = store.get(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Cancelled);
    }

    #[rocket::async_test]
    async fn test_list_and_stats() {
        let (client, store) = client().await;
        store
            .create("https://www.linkedin.com/jobs/view/1", None)
            .await
            .unwrap();

        let response = client.get("/api/scrape-jobs?status=pending").dispatch().await;
        assert_eq!(json_body(response).await["data"].as_array().unwrap().len(), 1);

        let response = client.get("/api/scrape-jobs?status=bogus").dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);

        let body = json_body(client.get("/api/stats").dispatch().await).await;
        assert_eq!(body["data"]["totalRequests"], 1);
        assert_eq!(body["data"]["byStatus"]["pending"], 1);
    }

    #[rocket::async_test]
    async fn test_generate_email_uses_stored_resume() {
        let (client, store) = client().await;
        let request = store
            .create(
                "https://www.linkedin.com/jobs/view/1",
                Some("Rust for ten years".to_string()),
            )
            .await
            .unwrap();

        let response = client
            .post("/api/email/generate")
            .header(ContentType::JSON)
            .body(
                json!({"requestId": request.id, "jobTitle": "SRE", "companyName": "Acme"})
                    .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body = json_body(response).await;
        assert_eq!(body["data"]["subject"], "Application for SRE position at Acme");
        assert_eq!(body["data"]["email"], "Dear Acme, Rust for ten years");

        let response = client
            .post("/api/email/generate")
            .header(ContentType::JSON)
            .body(json!({"jobTitle": "SRE", "companyName": "Acme"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        assert_eq!(json_body(response).await["error_code"], "MISSING_RESUME");
    }

    #[rocket::async_test]
    async fn test_generate_email_without_credentials() {
        let (client, _) = client().await;
        let response = client
            .post("/api/email/generate")
            .header(ContentType::JSON)
            .body(
                json!({"jobTitle": "SRE", "companyName": "Unconfigured", "resume": "cv"})
                    .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::ServiceUnavailable);
    }

    #[rocket::async_test]
    async fn test_health() {
        let (client, _) = client().await;
        let response = client.get("/api/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(json_body(response).await["message"], "OK");
    }
}
