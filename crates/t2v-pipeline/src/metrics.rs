//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder that exports them.

use metrics::{counter, histogram};

use crate::logging::Stage;

/// Metric names as constants for consistency.
pub mod names {
    pub const STAGE_DURATION_SECONDS: &str = "t2v_pipeline_stage_duration_seconds";
    pub const PIPELINE_FAILURES_TOTAL: &str = "t2v_pipeline_failures_total";
    pub const SCRIPTS_GENERATED_TOTAL: &str = "t2v_scripts_generated_total";
    pub const IMAGES_GENERATED_TOTAL: &str = "t2v_images_generated_total";
    pub const IMAGES_SKIPPED_TOTAL: &str = "t2v_images_skipped_total";
    pub const VIDEOS_GENERATED_TOTAL: &str = "t2v_videos_generated_total";
}

/// Record how long a stage took.
pub fn record_stage_duration(stage: Stage, duration_secs: f64) {
    let labels = [("stage", stage.as_str().to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a failed run, labelled by the stage that failed.
pub fn record_pipeline_failure(stage: Stage, code: &str) {
    let labels = [
        ("stage", stage.as_str().to_string()),
        ("code", code.to_string()),
    ];
    counter!(names::PIPELINE_FAILURES_TOTAL, &labels).increment(1);
}

pub fn record_script_generated() {
    counter!(names::SCRIPTS_GENERATED_TOTAL).increment(1);
}

pub fn record_image_generated() {
    counter!(names::IMAGES_GENERATED_TOTAL).increment(1);
}

/// Record an image call that returned text only.
pub fn record_image_skipped() {
    counter!(names::IMAGES_SKIPPED_TOTAL).increment(1);
}

pub fn record_video_generated() {
    counter!(names::VIDEOS_GENERATED_TOTAL).increment(1);
}
