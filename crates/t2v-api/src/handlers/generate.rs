//! Script and video generation handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Extension;
use axum::Json;
use tracing::info;
use validator::Validate;

use t2v_models::{GenerateScriptRequest, GenerateVideoRequest, ScriptResponse, VideoResponse};

use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestId;
use crate::state::AppState;

/// Generate a narration script for a topic.
pub async fn generate_script(
    State(state): State<AppState>,
    payload: Result<Json<GenerateScriptRequest>, JsonRejection>,
) -> ApiResult<Json<ScriptResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let response = state.pipeline.generate_script(&request.topic).await?;
    Ok(Json(response))
}

/// Run the full pipeline and return the public path of the rendered video.
///
/// Holds the request open until the render finishes.
pub async fn generate_video(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    payload: Result<Json<GenerateVideoRequest>, JsonRejection>,
) -> ApiResult<Json<VideoResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let request_id = request_id.map(|Extension(RequestId(id))| id).unwrap_or_default();
    info!(
        project = %request.project_name,
        topic = %request.topic,
        request_id = %request_id,
        "Video generation requested"
    );

    let response = state
        .pipeline
        .generate_video(&request.topic, &request.script, &request.project_name)
        .await?;

    Ok(Json(response))
}
