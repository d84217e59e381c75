//! Subtitle cue model.

use serde::{Deserialize, Serialize};

/// One caption unit of the narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// 1-based position in the subtitle document
    pub index: u32,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Narration text, whitespace collapsed
    pub text: String,
}

impl Cue {
    pub fn new(index: u32, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    /// Displayed duration in seconds. Negative when the cue is inverted.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Seconds between the start of the first cue and the end of the last.
pub fn covered_span(cues: &[Cue]) -> f64 {
    match (cues.first(), cues.last()) {
        (Some(first), Some(last)) => last.end - first.start,
        _ => 0.0,
    }
}
