//! Final video rendering.
//!
//! The timeline is handed to FFmpeg's concat demuxer as a list of still
//! images with display durations. Narration audio is muxed in and the
//! subtitle document is burned into the frames.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use t2v_models::{total_duration, TimelineSegment};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::media_duration;

/// Differences below this are not worth padding (one frame at 30 fps).
const PAD_EPSILON_SECS: f64 = 1.0 / 30.0;

/// Encoding settings for the final render.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub font_size: u32,
    pub crf: u8,
    pub preset: String,
    /// FFmpeg timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            width: 1280,
            height: 720,
            font_size: 24,
            crf: 20,
            preset: "veryfast".to_string(),
            timeout_secs: 1800,
        }
    }
}

/// Everything needed to render one project.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub segments: Vec<TimelineSegment>,
    /// Start of the first cue; the opening image is held this long extra
    pub lead_in_secs: f64,
    pub audio: PathBuf,
    pub subtitles: PathBuf,
    /// Directory for the concat list; FFmpeg runs from here
    pub work_dir: PathBuf,
    pub concat_list: PathBuf,
    pub output: PathBuf,
}

/// Produces the final muxed video.
#[async_trait]
pub trait VideoRenderer: Send + Sync {
    /// Render the request and return the path of the written file.
    async fn render(&self, request: &RenderRequest) -> MediaResult<PathBuf>;
}

/// FFmpeg-backed renderer.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRenderer {
    settings: RenderSettings,
}

impl FfmpegRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }
}

#[async_trait]
impl VideoRenderer for FfmpegRenderer {
    async fn render(&self, request: &RenderRequest) -> MediaResult<PathBuf> {
        if request.segments.is_empty() {
            return Err(MediaError::invalid_timeline("timeline has no segments to render"));
        }
        for path in [&request.audio, &request.subtitles] {
            if !path.exists() {
                return Err(MediaError::NotFound(path.clone()));
            }
        }

        let audio_secs = media_duration(&request.audio).await?;
        let segments = fit_to_audio(&request.segments, request.lead_in_secs, audio_secs);

        let work_dir = &request.work_dir;
        let mut entries = Vec::with_capacity(segments.len());
        for segment in &segments {
            let path = relative_to(work_dir, segment.image.path()).await?;
            entries.push((path, segment.duration_secs));
        }
        tokio::fs::write(&request.concat_list, concat_list(&entries)).await?;

        let list = relative_to(work_dir, &request.concat_list).await?;
        let audio = relative_to(work_dir, &request.audio).await?;
        let subtitles = relative_to(work_dir, &request.subtitles).await?;
        let output = output_relative_to(work_dir, &request.output);

        let cmd = FfmpegCommand::new(&output)
            .current_dir(work_dir)
            .input_with_args(&list, ["-f", "concat", "-safe", "0"])
            .input(&audio)
            .video_filter(video_filter(&self.settings, &subtitles))
            .map("0:v:0")
            .map("1:a:0")
            .video_codec("libx264")
            .preset(self.settings.preset.clone())
            .crf(self.settings.crf)
            .pixel_format("yuv420p")
            .frame_rate(self.settings.fps)
            .audio_codec("aac")
            .audio_bitrate("192k")
            .shortest();

        info!(
            segments = segments.len(),
            video_secs = total_duration(&segments),
            audio_secs,
            output = %request.output.display(),
            "Rendering video"
        );

        let total_ms = (audio_secs * 1000.0) as i64;
        FfmpegRunner::new()
            .with_timeout(self.settings.timeout_secs)
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    percent = %format!("{:.1}", progress.percentage(total_ms)),
                    speed = progress.speed,
                    "Render progress"
                );
            })
            .await?;

        if !request.output.exists() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg finished but produced no output",
                None,
                None,
            ));
        }

        Ok(request.output.clone())
    }
}

/// Stretch the timeline over the whole narration track.
///
/// The timeline covers first-cue-start to last-cue-end. The opening segment
/// additionally holds through the lead-in, and the closing segment through
/// any audio that follows the last cue.
pub fn fit_to_audio(
    segments: &[TimelineSegment],
    lead_in_secs: f64,
    audio_secs: f64,
) -> Vec<TimelineSegment> {
    let mut fitted = segments.to_vec();
    let lead_in = lead_in_secs.max(0.0);

    if let Some(first) = fitted.first_mut() {
        first.duration_secs += lead_in;
    }

    let tail = audio_secs - total_duration(&fitted);
    if tail > PAD_EPSILON_SECS {
        if let Some(last) = fitted.last_mut() {
            last.duration_secs += tail;
        }
    }

    fitted
}

/// Concat demuxer script. The last file is listed again without a duration
/// so its display time is honoured.
pub fn concat_list(entries: &[(String, f64)]) -> String {
    let mut out = String::from("ffconcat version 1.0\n");
    for (path, duration) in entries {
        out.push_str(&format!("file '{}'\nduration {:.3}\n", escape_concat_path(path), duration));
    }
    if let Some((path, _)) = entries.last() {
        out.push_str(&format!("file '{}'\n", escape_concat_path(path)));
    }
    out
}

/// Letterbox every image into the frame, then burn in bottom-centred
/// subtitles.
pub fn video_filter(settings: &RenderSettings, subtitles: &str) -> String {
    let (w, h) = (settings.width, settings.height);
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,format=yuv420p,\
         subtitles={subs}:force_style='Alignment=2,Fontsize={fs},PrimaryColour=&H00FFFFFF,OutlineColour=&H00000000,BorderStyle=1,Outline=2,MarginV=30'",
        subs = escape_filter_path(subtitles),
        fs = settings.font_size,
    )
}

fn escape_concat_path(path: &str) -> String {
    path.replace('\'', "'\\''")
}

fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
        .replace(',', "\\,")
}

/// Path usable from inside `dir`: stripped of the `dir` prefix when nested,
/// otherwise absolute.
async fn relative_to(dir: &Path, path: &Path) -> MediaResult<String> {
    if let Ok(rel) = path.strip_prefix(dir) {
        return Ok(rel.to_string_lossy().to_string());
    }
    if !path.exists() {
        return Err(MediaError::NotFound(path.to_path_buf()));
    }
    let absolute = tokio::fs::canonicalize(path).await?;
    Ok(absolute.to_string_lossy().to_string())
}

fn output_relative_to(dir: &Path, path: &Path) -> String {
    match path.strip_prefix(dir) {
        Ok(rel) => rel.to_string_lossy().to_string(),
        Err(_) => std::path::absolute(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use t2v_models::ImageRef;

    fn seg(path: &str, secs: f64) -> TimelineSegment {
        TimelineSegment::new(ImageRef::from(path), secs)
    }

    #[test]
    fn test_fit_to_audio_pads_both_ends() {
        let segments = vec![seg("image1.png", 3.0), seg("image2.png", 2.0)];
        let fitted = fit_to_audio(&segments, 0.5, 6.5);
        assert!((fitted[0].duration_secs - 3.5).abs() < 1e-9);
        assert!((fitted[1].duration_secs - 3.0).abs() < 1e-9);
        assert!((total_duration(&fitted) - 6.5).abs() < 1e-9);
    }

    #[test]
    fn test_fit_to_audio_ignores_tiny_tail() {
        let segments = vec![seg("image1.png", 3.0)];
        let fitted = fit_to_audio(&segments, 0.0, 3.01);
        assert!((fitted[0].duration_secs - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_to_audio_never_shrinks() {
        let segments = vec![seg("image1.png", 3.0)];
        let fitted = fit_to_audio(&segments, 0.0, 2.0);
        assert!((fitted[0].duration_secs - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_concat_list_repeats_last_file() {
        let list = concat_list(&[("image1.png".to_string(), 2.3), ("image2.png".to_string(), 1.5)]);
        assert_eq!(
            list,
            "ffconcat version 1.0\nfile 'image1.png'\nduration 2.300\nfile 'image2.png'\nduration 1.500\nfile 'image2.png'\n"
        );
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[("it's.png".to_string(), 1.0)]);
        assert!(list.contains("file 'it'\\''s.png'"));
    }

    #[test]
    fn test_video_filter() {
        let filter = video_filter(&RenderSettings::default(), "output1.srt");
        assert!(filter.starts_with("scale=1280:720"));
        assert!(filter.contains("subtitles=output1.srt"));
        assert!(filter.contains("Fontsize=24"));
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(escape_filter_path("C:\\subs\\a.srt"), "C\\:/subs/a.srt");
    }

    #[tokio::test]
    async fn test_relative_to_nested_path() {
        let rel = relative_to(Path::new("./videos/demo"), Path::new("./videos/demo/image1.png"))
            .await
            .unwrap();
        assert_eq!(rel, "image1.png");
    }

    #[tokio::test]
    async fn test_render_rejects_empty_timeline() {
        let dir = tempfile::tempdir().unwrap();
        let request = RenderRequest {
            segments: Vec::new(),
            lead_in_secs: 0.0,
            audio: dir.path().join("output1.wav"),
            subtitles: dir.path().join("output1.srt"),
            work_dir: dir.path().to_path_buf(),
            concat_list: dir.path().join("images.txt"),
            output: dir.path().join("final_video1.mp4"),
        };
        let err = FfmpegRenderer::default().render(&request).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidTimeline(_)));
    }

    #[tokio::test]
    async fn test_render_requires_audio() {
        let dir = tempfile::tempdir().unwrap();
        let request = RenderRequest {
            segments: vec![seg("image1.png", 2.0)],
            lead_in_secs: 0.0,
            audio: dir.path().join("output1.wav"),
            subtitles: dir.path().join("output1.srt"),
            work_dir: dir.path().to_path_buf(),
            concat_list: dir.path().join("images.txt"),
            output: dir.path().join("final_video1.mp4"),
        };
        let err = FfmpegRenderer::default().render(&request).await.unwrap_err();
        assert!(matches!(err, MediaError::NotFound(_)));
    }
}
