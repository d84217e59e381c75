//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use t2v_media::RenderSettings;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory holding one sub-directory per project
    pub videos_dir: PathBuf,
    /// Pause before and after each image generation call
    pub image_pacing: Duration,
    /// Words per subtitle cue when grouping transcribed words
    pub max_words_per_cue: usize,
    /// Final encode settings
    pub render: RenderSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            videos_dir: PathBuf::from("./videos"),
            image_pacing: Duration::from_millis(1000),
            max_words_per_cue: 8,
            render: RenderSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let render = RenderSettings {
            fps: env_parse("RENDER_FPS").unwrap_or(defaults.render.fps),
            width: env_parse("RENDER_WIDTH").unwrap_or(defaults.render.width),
            height: env_parse("RENDER_HEIGHT").unwrap_or(defaults.render.height),
            font_size: env_parse("SUBTITLE_FONT_SIZE").unwrap_or(defaults.render.font_size),
            timeout_secs: env_parse("RENDER_TIMEOUT_SECS").unwrap_or(defaults.render.timeout_secs),
            ..defaults.render
        };

        Self {
            videos_dir: std::env::var("VIDEOS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.videos_dir),
            image_pacing: env_parse("IMAGE_PACING_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.image_pacing),
            max_words_per_cue: env_parse("MAX_WORDS_PER_CUE")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_words_per_cue),
            render,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.videos_dir, PathBuf::from("./videos"));
        assert_eq!(config.image_pacing, Duration::from_secs(1));
        assert_eq!(config.max_words_per_cue, 8);
        assert_eq!(config.render.fps, 30);
        assert_eq!((config.render.width, config.render.height), (1280, 720));
        assert_eq!(config.render.font_size, 24);
    }
}
