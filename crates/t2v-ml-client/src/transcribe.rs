//! Speech-to-text over an OpenAI-compatible `/v1/audio/transcriptions`
//! endpoint, with word timestamps grouped into subtitle cues.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use t2v_models::Cue;

use crate::error::{MlError, MlResult};
use crate::traits::Transcriber;

/// Default cue length; matches the script's sentence limit.
pub const DEFAULT_MAX_WORDS_PER_CUE: usize = 8;

/// Configuration for the transcription client.
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub language: String,
    pub max_words_per_cue: usize,
    pub timeout: Duration,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            api_key: None,
            model: "whisper-1".to_string(),
            language: "en".to_string(),
            max_words_per_cue: DEFAULT_MAX_WORDS_PER_CUE,
            timeout: Duration::from_secs(300),
        }
    }
}

impl TranscriptionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("STT_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("STT_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("STT_MODEL").unwrap_or(defaults.model),
            language: std::env::var("STT_LANGUAGE").unwrap_or(defaults.language),
            max_words_per_cue: defaults.max_words_per_cue,
            timeout: std::env::var("STT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

/// `verbose_json` transcription body.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    words: Vec<Word>,
    #[serde(default)]
    segments: Vec<Segment>,
}

/// A single timed word.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Word {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Deserialize)]
struct Segment {
    start: f64,
    end: f64,
    text: String,
}

/// Transcription client.
pub struct TranscriptionClient {
    http: Client,
    config: TranscriptionConfig,
}

impl TranscriptionClient {
    pub fn new(config: TranscriptionConfig) -> MlResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlResult<Self> {
        Self::new(TranscriptionConfig::from_env())
    }
}

#[async_trait]
impl Transcriber for TranscriptionClient {
    async fn transcribe(&self, audio: &Path) -> MlResult<Vec<Cue>> {
        let url = format!(
            "{}/v1/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        );

        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.wav".to_string());
        let file = Part::bytes(bytes).file_name(file_name).mime_str("audio/wav")?;

        let form = Form::new()
            .part("file", file)
            .text("model", self.config.model.clone())
            .text("language", self.config.language.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word")
            .text("timestamp_granularities[]", "segment");

        let mut builder = self.http.post(&url).multipart(form);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(MlError::from_response("Transcription service", response).await);
        }

        let body: TranscriptionResponse = response.json().await.map_err(|e| {
            MlError::invalid_response(format!("Failed to parse transcription: {}", e))
        })?;

        let cues = if body.words.is_empty() {
            warn!("Transcription has no word timestamps, using segments");
            body.segments
                .into_iter()
                .filter(|s| !s.text.trim().is_empty())
                .zip(1u32..)
                .map(|(s, index)| Cue::new(index, s.start, s.end.max(s.start), s.text.trim()))
                .collect()
        } else {
            group_words(&body.words, self.config.max_words_per_cue)
        };

        if cues.is_empty() {
            return Err(MlError::empty_response("Transcription contains no speech"));
        }

        info!(cues = cues.len(), audio = %audio.display(), "Transcribed narration");
        Ok(cues)
    }
}

/// Group timed words into single-line cues.
///
/// A cue closes after `max_words` words or after a word ending a sentence.
/// Indices start at 1.
pub fn group_words(words: &[Word], max_words: usize) -> Vec<Cue> {
    let max_words = max_words.max(1);
    let mut cues = Vec::new();
    let mut current: Vec<&Word> = Vec::new();

    fn flush(current: &mut Vec<&Word>, cues: &mut Vec<Cue>) {
        if let (Some(first), Some(last)) = (current.first(), current.last()) {
            let text = current
                .iter()
                .map(|w| w.word.trim())
                .filter(|w| !w.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            let index = cues.len() as u32 + 1;
            cues.push(Cue::new(index, first.start, last.end.max(first.start), text));
        }
        current.clear();
    }

    for word in words.iter().filter(|w| !w.word.trim().is_empty()) {
        current.push(word);
        if current.len() >= max_words || ends_sentence(&word.word) {
            flush(&mut current, &mut cues);
        }
    }
    flush(&mut current, &mut cues);

    cues
}

fn ends_sentence(word: &str) -> bool {
    matches!(
        word.trim().trim_end_matches(['"', '\'', ')']).chars().last(),
        Some('.' | '!' | '?')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn word(w: &str, start: f64, end: f64) -> Word {
        Word {
            word: w.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_group_words_splits_on_sentences() {
        let words = vec![
            word(" A", 0.0, 0.2),
            word(" cat", 0.2, 0.6),
            word(" walks.", 0.6, 1.4),
            word(" Rain", 1.6, 2.0),
            word(" falls.", 2.0, 2.5),
        ];
        let cues = group_words(&words, 8);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0], Cue::new(1, 0.0, 1.4, "A cat walks."));
        assert_eq!(cues[1], Cue::new(2, 1.6, 2.5, "Rain falls."));
    }

    #[test]
    fn test_group_words_respects_limit() {
        let words: Vec<Word> = (0..10)
            .map(|i| word("w", i as f64 * 0.5, i as f64 * 0.5 + 0.4))
            .collect();
        let cues = group_words(&words, 8);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text.split(' ').count(), 8);
        assert_eq!(cues[1].index, 2);
        assert!((cues[1].start - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_group_words_empty() {
        assert!(group_words(&[], 8).is_empty());
    }

    #[test]
    fn test_ends_sentence() {
        assert!(ends_sentence("walks."));
        assert!(ends_sentence("\"Stop!\""));
        assert!(!ends_sentence("and"));
    }

    #[tokio::test]
    async fn test_transcribe() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "text": "A cat walks.",
                "words": [
                    {"word": "A", "start": 0.0, "end": 0.3},
                    {"word": "cat", "start": 0.3, "end": 0.7},
                    {"word": "walks.", "start": 0.7, "end": 1.5}
                ]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("output1.wav");
        std::fs::write(&audio, b"RIFF").unwrap();

        let client = TranscriptionClient::new(TranscriptionConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap();
        let cues = client.transcribe(&audio).await.unwrap();
        assert_eq!(cues, vec![Cue::new(1, 0.0, 1.5, "A cat walks.")]);
    }

    #[tokio::test]
    async fn test_transcribe_falls_back_to_segments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "text": "Hello there.",
                "segments": [{"start": 0.5, "end": 2.0, "text": " Hello there."}]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("output1.wav");
        std::fs::write(&audio, b"RIFF").unwrap();

        let client = TranscriptionClient::new(TranscriptionConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap();
        let cues = client.transcribe(&audio).await.unwrap();
        assert_eq!(cues, vec![Cue::new(1, 0.5, 2.0, "Hello there.")]);
    }

    #[tokio::test]
    async fn test_transcribe_missing_audio() {
        let client = TranscriptionClient::new(TranscriptionConfig::default()).unwrap();
        let err = client
            .transcribe(Path::new("/nonexistent/output1.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, MlError::Io(_)));
    }
}
