//! Shared data models for the Text2Video backend.
//!
//! This crate provides Serde-serializable types for:
//! - Subtitle cues and timecodes
//! - Scene prompts, generated images and timeline segments
//! - Project names and the per-project filesystem layout
//! - HTTP request/response bodies

pub mod api;
pub mod cue;
pub mod project;
pub mod scene;
pub mod timecode;

// Re-export common types
pub use api::{
    GenerateScriptRequest, GenerateVideoRequest, ScriptResponse, VideoResponse, WelcomeResponse,
};
pub use cue::{covered_span, Cue};
pub use project::{ProjectError, ProjectLayout, ProjectName};
pub use scene::{total_duration, ImageRef, ScenePrompt, SceneImage, TimelineSegment};
pub use timecode::{format_timecode, parse_timecode, TimecodeError};
