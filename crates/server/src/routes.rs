//! Request handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use vta_forum::IngestReport;
use vta_knowledge::{Answer, ContentRecord, Query};
use vta_llm::split_data_url;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of `POST /api/`.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,

    /// Base64 image, optionally as a `data:` URL
    #[serde(default)]
    pub image: Option<String>,

    /// Extra free-text context from the student
    #[serde(default, alias = "attachment")]
    pub context: Option<String>,
}

/// POST /api/ - answer a question
pub async fn ask(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> ApiResult<Json<Answer>> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let mut query = Query::new(request.question);
    if let Some(context) = request.context {
        query = query.with_attachment(context);
    }
    if let Some(image) = request.image.as_deref().filter(|i| !i.trim().is_empty()) {
        query = query.with_image(validate_image(image)?);
    }

    let answer = state.answerer.answer(&query).await?;

    tracing::info!(
        "Answered with {} links (top score: {})",
        answer.links.len(),
        answer.max_score
    );
    Ok(Json(answer))
}

/// Check the base64 payload decodes. A `data:<mime>;base64,` prefix is
/// kept so the LLM sees the real media type.
fn validate_image(image: &str) -> ApiResult<String> {
    let (mime, payload) = split_data_url(image.trim());
    let payload: String = payload.split_whitespace().collect();

    STANDARD
        .decode(&payload)
        .map_err(|e| ApiError::bad_request(format!("Invalid base64 image: {}", e)))?;

    Ok(match mime {
        Some(mime) => format!("data:{};base64,{}", mime, payload),
        None => payload,
    })
}

/// GET /api/records/:id - a stored record
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ContentRecord>> {
    Ok(Json(state.store.get(&id)?))
}

/// POST /api/update - re-run forum ingestion for the configured range
pub async fn update(State(state): State<AppState>) -> ApiResult<Json<IngestReport>> {
    let Some(handle) = state.update.clone() else {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "forbidden",
            "Forum updates are disabled on this server",
        ));
    };

    let Ok(_running) = handle.running.try_lock() else {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "update_in_progress",
            "A forum update is already running",
        ));
    };

    tracing::info!("Forum update requested");
    let report = handle
        .ingestor
        .ingest(state.store.as_ref(), handle.range)
        .await?;

    Ok(Json(report))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
