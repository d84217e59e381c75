//! HTTP request and response bodies.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request body for `POST /generate-script`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateScriptRequest {
    #[validate(length(min = 1, max = 500, message = "topic must be 1-500 characters"))]
    pub topic: String,
}

/// Response body for `POST /generate-script`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptResponse {
    pub script: String,
    pub topic: String,
}

/// Request body for `POST /generate-video`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoRequest {
    #[validate(length(min = 1, max = 500, message = "topic must be 1-500 characters"))]
    pub topic: String,

    #[validate(length(min = 1, max = 20000, message = "script must be 1-20000 characters"))]
    pub script: String,

    #[validate(length(min = 1, max = 64, message = "projectName must be 1-64 characters"))]
    pub project_name: String,
}

/// Response body for `POST /generate-video`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoResponse {
    pub video_path: String,
}

/// Response body for `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub msg: String,
}
