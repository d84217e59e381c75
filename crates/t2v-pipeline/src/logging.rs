//! Structured project logging utilities.
//!
//! Every pipeline event carries the project name and the stage it belongs
//! to, so one run can be followed through the logs.

use std::fmt;

use tracing::{error, info, warn, Span};

/// Stage of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Script,
    Speech,
    Transcription,
    Prompts,
    Images,
    Timeline,
    Render,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Script => "script",
            Stage::Speech => "speech",
            Stage::Transcription => "transcription",
            Stage::Prompts => "prompts",
            Stage::Images => "images",
            Stage::Timeline => "timeline",
            Stage::Render => "render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Project logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct ProjectLogger {
    project: String,
    operation: String,
}

impl ProjectLogger {
    /// Create a new logger for a project and operation
    /// (e.g. "generate_video", "generate_script").
    pub fn new(project: &str, operation: &str) -> Self {
        Self {
            project: project.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, stage: Stage, message: &str) {
        info!(
            project = %self.project,
            operation = %self.operation,
            stage = %stage,
            "Stage started: {}", message
        );
    }

    pub fn log_progress(&self, stage: Stage, message: &str) {
        info!(
            project = %self.project,
            operation = %self.operation,
            stage = %stage,
            "Stage progress: {}", message
        );
    }

    pub fn log_warning(&self, stage: Stage, message: &str) {
        warn!(
            project = %self.project,
            operation = %self.operation,
            stage = %stage,
            "Stage warning: {}", message
        );
    }

    pub fn log_error(&self, stage: Stage, message: &str) {
        error!(
            project = %self.project,
            operation = %self.operation,
            stage = %stage,
            "Stage failed: {}", message
        );
    }

    pub fn log_completion(&self, stage: Stage, message: &str) {
        info!(
            project = %self.project,
            operation = %self.operation,
            stage = %stage,
            "Stage completed: {}", message
        );
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span covering a whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "project",
            project = %self.project,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_logger_creation() {
        let logger = ProjectLogger::new("demo", "generate_video");
        assert_eq!(logger.project(), "demo");
        assert_eq!(logger.operation(), "generate_video");
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(Stage::Transcription.to_string(), "transcription");
        assert_eq!(Stage::Render.as_str(), "render");
    }
}
