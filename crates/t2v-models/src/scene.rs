//! Scene images, prompts and timeline segments.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Handle to a generated image on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(PathBuf);

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for ImageRef {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&str> for ImageRef {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

/// Image-generation prompt extracted from the model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenePrompt {
    /// Subtitle number the model attached to this prompt, if any
    pub cue_index: Option<u32>,
    pub prompt: String,
}

/// Generated image together with the cue it illustrates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneImage {
    /// Cue index this image belongs to, when known
    pub cue_index: Option<u32>,
    pub image: ImageRef,
}

/// One entry of the visual timeline: an image shown for a duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSegment {
    pub image: ImageRef,
    pub duration_secs: f64,
}

impl TimelineSegment {
    pub fn new(image: ImageRef, duration_secs: f64) -> Self {
        Self { image, duration_secs }
    }
}

/// Sum of all segment durations.
pub fn total_duration(segments: &[TimelineSegment]) -> f64 {
    segments.iter().map(|s| s.duration_secs).sum()
}
