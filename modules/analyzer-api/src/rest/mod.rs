use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::{info, warn};

use abacus_client::AbacusError;

use crate::AppState;

#[derive(Deserialize)]
pub struct ClassifyRequest {
    text: String,
}

const PREVIEW_CHARS: usize = 50;

/// First `PREVIEW_CHARS` characters of the input, for logging. Walks chars
/// so multibyte text cannot be split mid-character.
fn text_preview(text: &str) -> String {
    let mut chars = text.chars();
    let preview: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}

pub async fn api_classify(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ClassifyRequest>,
) -> impl IntoResponse {
    info!(preview = %text_preview(&body.text), "Received text for classification");

    match state.abacus.classify_page_content(&body.text).await {
        Ok(labels) if labels.is_empty() => {
            warn!("No taxonomy labels found in the response");
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "No taxonomy labels found in the response"})),
            )
                .into_response()
        }
        Ok(labels) => {
            info!(count = labels.len(), labels = ?labels, "Returning taxonomy labels");
            Json(labels).into_response()
        }
        Err(AbacusError::DeploymentTimeout(_)) => {
            warn!("Deployment never became ready");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "error": "Service temporarily unavailable. Please try again later."
                })),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "Error classifying text");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
