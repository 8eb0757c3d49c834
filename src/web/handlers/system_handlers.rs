// src/web/handlers/system_handlers.rs
use crate::web::types::*;

use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info};

pub async fn health_handler(state: &State<ServerState>) -> Json<TextResponse> {
    let message = match &state.database {
        Some(database) => match database.health_check().await {
            Ok(()) => "OK".to_string(),
            Err(e) => {
                error!("Health check failed: {}", e);
                "DEGRADED: database unavailable".to_string()
            }
        },
        None => "OK".to_string(),
    };
    info!("Health check: {}", message);
    Json(TextResponse::success(message, None))
}
