//! Speech synthesis over an OpenAI-compatible `/v1/audio/speech` endpoint.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::error::{MlError, MlResult};
use crate::traits::SpeechSynthesizer;

/// Configuration for the speech client.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub voice: String,
    pub timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8880".to_string(),
            api_key: None,
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl SpeechConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("TTS_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("TTS_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("TTS_MODEL").unwrap_or(defaults.model),
            voice: std::env::var("TTS_VOICE").unwrap_or(defaults.voice),
            timeout: std::env::var("TTS_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

/// Text-to-speech client.
pub struct SpeechClient {
    http: Client,
    config: SpeechConfig,
}

impl SpeechClient {
    pub fn new(config: SpeechConfig) -> MlResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlResult<Self> {
        Self::new(SpeechConfig::from_env())
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechClient {
    async fn synthesize(&self, text: &str, output: &Path) -> MlResult<()> {
        let url = format!("{}/v1/audio/speech", self.config.base_url.trim_end_matches('/'));

        let request = SpeechRequest {
            model: &self.config.model,
            input: text,
            voice: &self.config.voice,
            response_format: "wav",
        };

        let mut builder = self.http.post(&url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(MlError::from_response("Speech service", response).await);
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(MlError::empty_response("Speech service returned no audio"));
        }

        tokio::fs::write(output, &audio).await?;
        info!(
            bytes = audio.len(),
            path = %output.display(),
            voice = %self.config.voice,
            "Synthesized narration"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, api_key: Option<&str>) -> SpeechClient {
        SpeechClient::new(SpeechConfig {
            base_url: server.uri(),
            api_key: api_key.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_synthesize_writes_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFF....WAVE".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output1.wav");
        client(&server, Some("secret"))
            .synthesize("A cat walks.", &output)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"RIFF....WAVE".to_vec());
    }

    #[tokio::test]
    async fn test_synthesize_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output1.wav");
        let err = client(&server, None).synthesize("x", &output).await.unwrap_err();
        assert!(matches!(err, MlError::RequestFailed(_)));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_synthesize_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = client(&server, None)
            .synthesize("x", &dir.path().join("output1.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, MlError::EmptyResponse(_)));
    }
}
