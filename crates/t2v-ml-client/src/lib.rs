//! Clients for the external generative models.
//!
//! Each backend sits behind a small async trait so the pipeline can be
//! driven by fakes in tests:
//! - [`GeminiClient`] for script, prompt and image generation
//! - [`SpeechClient`] for narration audio
//! - [`TranscriptionClient`] for timed subtitles

pub mod error;
pub mod gemini;
pub mod prompts;
pub mod speech;
pub mod traits;
pub mod transcribe;

pub use error::{MlError, MlResult};
pub use gemini::{GeminiClient, GeminiConfig};
pub use prompts::{extract_prompts, extract_scene_prompts, image_prompts_prompt, script_prompt};
pub use speech::{SpeechClient, SpeechConfig};
pub use traits::{
    GeneratedImage, ImageGenerator, ImageReply, SpeechSynthesizer, TextGenerator, Transcriber,
};
pub use transcribe::{group_words, TranscriptionClient, TranscriptionConfig, Word};
