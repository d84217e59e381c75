//! Topic-to-video pipeline.
//!
//! A run is strictly sequential: narration, subtitles, image prompts,
//! images, timeline, render. Every stage must finish before the next one
//! starts and the first failure aborts the run, leaving whatever artifacts
//! were already written in the project directory.

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, Instrument};

use t2v_media::{
    build_timeline, build_timeline_mapped, read_cues, save_png, write_srt, FfmpegRenderer,
    RenderRequest, TimelineBuilder, VideoRenderer,
};
use t2v_ml_client::{
    extract_scene_prompts, image_prompts_prompt, script_prompt, GeminiClient, ImageGenerator,
    MlResult, SpeechClient, SpeechConfig, SpeechSynthesizer, TextGenerator, Transcriber,
    TranscriptionClient, TranscriptionConfig,
};
use t2v_models::{
    Cue, ImageRef, ProjectLayout, ProjectName, ScenePrompt, SceneImage, ScriptResponse,
    TimelineSegment, VideoResponse,
};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::{ProjectLogger, Stage};
use crate::metrics;

/// External services a run depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub text: Arc<dyn TextGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub transcriber: Arc<dyn Transcriber>,
    pub images: Arc<dyn ImageGenerator>,
    pub renderer: Arc<dyn VideoRenderer>,
}

impl Collaborators {
    /// Build the production clients from environment variables.
    pub fn from_env(config: &PipelineConfig) -> MlResult<Self> {
        let gemini = Arc::new(GeminiClient::from_env()?);
        let speech = SpeechClient::new(SpeechConfig::from_env())?;
        let transcriber = TranscriptionClient::new(TranscriptionConfig {
            max_words_per_cue: config.max_words_per_cue,
            ..TranscriptionConfig::from_env()
        })?;

        Ok(Self {
            text: gemini.clone(),
            speech: Arc::new(speech),
            transcriber: Arc::new(transcriber),
            images: gemini,
            renderer: Arc::new(FfmpegRenderer::new(config.render.clone())),
        })
    }
}

/// Orchestrates script and video generation.
pub struct VideoPipeline {
    config: PipelineConfig,
    services: Collaborators,
}

impl VideoPipeline {
    pub fn new(config: PipelineConfig, services: Collaborators) -> Self {
        Self { config, services }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Root directory the project folders live in.
    pub fn videos_dir(&self) -> &Path {
        &self.config.videos_dir
    }

    /// Write a short narration script about `topic`.
    pub async fn generate_script(&self, topic: &str) -> PipelineResult<ScriptResponse> {
        let topic = require_non_empty("topic", topic)?;

        info!(topic, "Generating script");
        let started = Instant::now();
        let reply = self.services.text.generate_text(&script_prompt(topic)).await;
        metrics::record_stage_duration(Stage::Script, started.elapsed().as_secs_f64());

        let script = flatten_script(&reply?);
        if script.is_empty() {
            metrics::record_pipeline_failure(Stage::Script, "upstream_error");
            return Err(PipelineError::upstream("model returned an empty script"));
        }

        metrics::record_script_generated();
        info!(topic, chars = script.len(), "Script generated");
        Ok(ScriptResponse {
            script,
            topic: topic.to_string(),
        })
    }

    /// Produce the narrated video for `script` under `project_name`.
    ///
    /// Returns the public path the video is served under.
    pub async fn generate_video(
        &self,
        topic: &str,
        script: &str,
        project_name: &str,
    ) -> PipelineResult<VideoResponse> {
        let name = ProjectName::parse(project_name)?;
        let topic = require_non_empty("topic", topic)?;
        let script = require_non_empty("script", script)?;

        let layout = ProjectLayout::new(&self.config.videos_dir, name);
        let logger = ProjectLogger::new(layout.name().as_str(), "generate_video");
        let span = logger.create_span();

        self.run_video(&layout, &logger, topic, script)
            .instrument(span)
            .await
    }

    async fn run_video(
        &self,
        layout: &ProjectLayout,
        logger: &ProjectLogger,
        topic: &str,
        script: &str,
    ) -> PipelineResult<VideoResponse> {
        let started = Instant::now();
        tokio::fs::create_dir_all(layout.dir()).await?;

        let audio = layout.audio_path();
        let subtitles = layout.subtitles_path();

        run_stage(logger, Stage::Speech, "synthesizing narration", async {
            self.services.speech.synthesize(script, &audio).await?;
            if !audio.exists() {
                return Err(PipelineError::not_found(audio.display().to_string()));
            }
            Ok(())
        })
        .await?;

        run_stage(logger, Stage::Transcription, "transcribing narration", async {
            let cues = self.services.transcriber.transcribe(&audio).await?;
            write_srt(&subtitles, &cues).await?;
            logger.log_progress(
                Stage::Transcription,
                &format!("{} cues written to {}", cues.len(), subtitles.display()),
            );
            Ok::<_, PipelineError>(())
        })
        .await?;

        let (cues, prompts) = run_stage(logger, Stage::Prompts, "requesting image prompts", async {
            let cues = read_cues(&subtitles).await?;
            if cues.is_empty() {
                return Err(PipelineError::MalformedInput(format!(
                    "{} contains no cues",
                    subtitles.display()
                )));
            }
            let prompts = self.request_prompts(topic, &cues).await?;
            logger.log_progress(Stage::Prompts, &format!("{} prompts extracted", prompts.len()));
            Ok((cues, prompts))
        })
        .await?;

        let scenes = run_stage(
            logger,
            Stage::Images,
            "generating images",
            self.generate_images(layout, logger, &prompts),
        )
        .await?;

        let segments = run_stage(logger, Stage::Timeline, "building timeline", async {
            let segments = assemble_timeline(&cues, &scenes)?;
            logger.log_progress(Stage::Timeline, &format!("{} segments", segments.len()));
            Ok::<_, PipelineError>(segments)
        })
        .await?;

        let request = RenderRequest {
            segments,
            lead_in_secs: cues.first().map(|c| c.start).unwrap_or(0.0),
            audio,
            subtitles,
            work_dir: layout.dir().to_path_buf(),
            concat_list: layout.concat_list_path(),
            output: layout.video_path(),
        };
        run_stage(logger, Stage::Render, "rendering video", async {
            self.services.renderer.render(&request).await?;
            Ok::<_, PipelineError>(())
        })
        .await?;

        metrics::record_video_generated();
        info!(
            project = %layout.name(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Video generated"
        );

        Ok(VideoResponse {
            video_path: layout.public_video_path(),
        })
    }

    async fn request_prompts(&self, topic: &str, cues: &[Cue]) -> PipelineResult<Vec<ScenePrompt>> {
        let reply = self
            .services
            .text
            .generate_text(&image_prompts_prompt(topic, cues))
            .await?;
        let lines: Vec<&str> = reply.trim().lines().collect();
        let prompts = extract_scene_prompts(&lines);
        if prompts.is_empty() {
            return Err(PipelineError::upstream("model reply contained no image prompts"));
        }
        Ok(prompts)
    }

    /// One image call per prompt, paced before and after. Image `n` is
    /// written as `image{n}.png` with `n` the 1-based prompt number, so a
    /// text-only reply leaves a hole in the numbering.
    async fn generate_images(
        &self,
        layout: &ProjectLayout,
        logger: &ProjectLogger,
        prompts: &[ScenePrompt],
    ) -> PipelineResult<Vec<SceneImage>> {
        let pacing = self.config.image_pacing;
        let mut scenes = Vec::with_capacity(prompts.len());

        for (i, scene) in prompts.iter().enumerate() {
            let n = i + 1;
            tokio::time::sleep(pacing).await;

            let reply = self.services.images.generate_image(&scene.prompt).await?;
            for text in &reply.texts {
                logger.log_progress(Stage::Images, &format!("prompt {}: {}", n, text.trim()));
            }

            match reply.into_first_image() {
                Some(image) => {
                    let path = layout.image_path(n);
                    let (width, height) = save_png(image.bytes, &path).await?;
                    logger.log_progress(
                        Stage::Images,
                        &format!("image {} saved ({}x{})", n, width, height),
                    );
                    metrics::record_image_generated();
                    scenes.push(SceneImage {
                        cue_index: scene.cue_index,
                        image: ImageRef::new(path),
                    });
                }
                None => {
                    logger.log_warning(Stage::Images, &format!("prompt {} produced no image", n));
                    metrics::record_image_skipped();
                }
            }

            tokio::time::sleep(pacing).await;
        }

        Ok(scenes)
    }
}

/// Build the timeline, preferring the explicit cue mapping when it is usable.
fn assemble_timeline(cues: &[Cue], scenes: &[SceneImage]) -> PipelineResult<Vec<TimelineSegment>> {
    let segments = if has_explicit_mapping(cues, scenes) {
        build_timeline_mapped(cues, scenes)?
    } else {
        let images: Vec<ImageRef> = scenes.iter().map(|s| s.image.clone()).collect();
        build_timeline(cues, &images)?
    };

    if segments.is_empty() {
        return Err(PipelineError::invalid_timeline("timeline has no segments"));
    }
    Ok(segments)
}

/// Every image names a distinct, known cue, the first cue is one of them,
/// and the numbering does not look like a running count.
fn has_explicit_mapping(cues: &[Cue], scenes: &[SceneImage]) -> bool {
    let Some(first) = cues.first() else {
        return false;
    };
    let known: HashSet<u32> = cues.iter().map(|c| c.index).collect();
    let mut seen = HashSet::with_capacity(scenes.len());

    !scenes.is_empty()
        && scenes
            .iter()
            .all(|s| matches!(s.cue_index, Some(i) if known.contains(&i) && seen.insert(i)))
        && seen.contains(&first.index)
        && !looks_renumbered(cues, &seen)
}

/// A reply that numbers its sections 1, 2, ... after skipping short cues
/// lands images on short cues while the long cue they describe stays
/// unmapped. Detects a mapped short cue followed by an unmapped long one
/// with no mapped cue in between.
fn looks_renumbered(cues: &[Cue], mapped: &HashSet<u32>) -> bool {
    let builder = TimelineBuilder::new();
    let mut short_mapped = false;

    for cue in cues {
        let long = builder.is_long(cue);
        if mapped.contains(&cue.index) {
            short_mapped = !long;
        } else if long && short_mapped {
            return true;
        }
    }
    false
}

/// Model output as one line of narration.
fn flatten_script(reply: &str) -> String {
    reply
        .trim()
        .replace("\r\n", " ")
        .replace('\n', " ")
}

fn require_non_empty<'a>(field: &str, value: &'a str) -> PipelineResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PipelineError::invalid_input(format!("{} must not be empty", field)));
    }
    Ok(value)
}

/// Run one stage with start/completion logging and a duration metric.
async fn run_stage<T, F>(
    logger: &ProjectLogger,
    stage: Stage,
    description: &str,
    fut: F,
) -> PipelineResult<T>
where
    F: Future<Output = PipelineResult<T>>,
{
    logger.log_start(stage, description);
    let started = Instant::now();
    let result = fut.await;
    let elapsed = started.elapsed().as_secs_f64();
    metrics::record_stage_duration(stage, elapsed);

    match &result {
        Ok(_) => logger.log_completion(stage, &format!("{} in {:.2}s", description, elapsed)),
        Err(e) => {
            logger.log_error(stage, &e.to_string());
            metrics::record_pipeline_failure(stage, e.code());
        }
    }
    result
}
