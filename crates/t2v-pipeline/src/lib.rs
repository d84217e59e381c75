//! Topic-to-video generation pipeline.
//!
//! This crate provides:
//! - [`VideoPipeline`], orchestrating script, narration, subtitles, images
//!   and the final render
//! - Injected collaborators so every external model can be replaced
//! - Per-project structured logging and stage metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::{ProjectLogger, Stage};
pub use pipeline::{Collaborators, VideoPipeline};
