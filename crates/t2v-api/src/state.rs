//! Application state.

use std::sync::Arc;

use t2v_pipeline::VideoPipeline;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<VideoPipeline>,
}

impl AppState {
    pub fn new(config: ApiConfig, pipeline: Arc<VideoPipeline>) -> Self {
        Self { config, pipeline }
    }
}
