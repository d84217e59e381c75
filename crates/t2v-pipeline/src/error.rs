//! Pipeline error types.

use thiserror::Error;

use t2v_media::MediaError;
use t2v_ml_client::MlError;
use t2v_models::ProjectError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Malformed timecode: {0}")]
    MalformedTimecode(String),

    #[error("Upstream service failed: {0}")]
    Upstream(String),

    #[error("Invalid timeline: {0}")]
    InvalidTimeline(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn invalid_timeline(msg: impl Into<String>) -> Self {
        Self::InvalidTimeline(msg.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::MalformedInput(_) => "malformed_input",
            Self::MalformedTimecode(_) => "malformed_timecode",
            Self::Upstream(_) => "upstream_error",
            Self::InvalidTimeline(_) => "invalid_timeline",
            Self::InvalidInput(_) => "invalid_input",
            Self::Render(_) => "render_failed",
            Self::Io(_) => "io_error",
        }
    }
}

impl From<MediaError> for PipelineError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::NotFound(path) => Self::NotFound(path.display().to_string()),
            MediaError::MalformedInput(msg) => Self::MalformedInput(msg),
            MediaError::MalformedTimecode(e) => Self::MalformedTimecode(e.to_string()),
            MediaError::InvalidTimeline(msg) => Self::InvalidTimeline(msg),
            MediaError::Io(e) => Self::Io(e),
            // Only model output is ever decoded as an image
            MediaError::Image(e) => Self::Upstream(format!("undecodable image: {}", e)),
            MediaError::FfmpegFailed {
                message,
                stderr: Some(stderr),
                ..
            } => Self::Render(format!("{}: {}", message, stderr)),
            other => Self::Render(other.to_string()),
        }
    }
}

impl From<MlError> for PipelineError {
    fn from(err: MlError) -> Self {
        match err {
            MlError::Io(e) => Self::Io(e),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl From<ProjectError> for PipelineError {
    fn from(err: ProjectError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_media_error_mapping() {
        let err: PipelineError =
            MediaError::NotFound(PathBuf::from("videos/demo/output1.srt")).into();
        assert!(matches!(err, PipelineError::NotFound(ref p) if p.contains("output1.srt")));

        let err: PipelineError = MediaError::invalid_timeline("no images").into();
        assert_eq!(err.code(), "invalid_timeline");

        let err: PipelineError = MediaError::FfmpegNotFound.into();
        assert!(matches!(err, PipelineError::Render(_)));
    }

    #[test]
    fn test_ml_error_is_upstream() {
        let err: PipelineError = MlError::empty_response("nothing").into();
        assert!(matches!(err, PipelineError::Upstream(_)));
        assert_eq!(err.code(), "upstream_error");
    }

    #[test]
    fn test_project_error_is_invalid_input() {
        let err: PipelineError = ProjectError::Empty.into();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }
}
