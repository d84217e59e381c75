//! Collaborator traits for the external models.
//!
//! The pipeline only sees these traits, so tests can swap in fakes and
//! deployments can point at any compatible backend.

use std::path::Path;

use async_trait::async_trait;
use t2v_models::Cue;

use crate::error::MlResult;

/// Completes a text prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> MlResult<String>;
}

/// Turns narration text into a WAV file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and write the audio to `output`.
    async fn synthesize(&self, text: &str, output: &Path) -> MlResult<()>;
}

/// Produces timed subtitle cues from an audio file.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> MlResult<Vec<Cue>>;
}

/// Renders a prompt to an image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> MlResult<ImageReply>;
}

/// Raw image bytes as returned by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Reply of an image model: any number of text and image parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageReply {
    pub texts: Vec<String>,
    pub images: Vec<GeneratedImage>,
}

impl ImageReply {
    /// First image part, if the model produced one.
    pub fn first_image(&self) -> Option<&GeneratedImage> {
        self.images.first()
    }

    pub fn into_first_image(self) -> Option<GeneratedImage> {
        self.images.into_iter().next()
    }
}
