#![deny(unreachable_patterns)]
//! Media processing for narrated slideshow videos.
//!
//! This crate provides:
//! - SubRip subtitle parsing and writing
//! - Timeline construction from cues and scene images
//! - Type-safe FFmpeg command building with progress parsing
//! - Final rendering through the concat demuxer

pub mod command;
pub mod error;
pub mod probe;
pub mod progress;
pub mod render;
pub mod still;
pub mod subtitles;
pub mod timeline;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::media_duration;
pub use progress::FfmpegProgress;
pub use render::{fit_to_audio, FfmpegRenderer, RenderRequest, RenderSettings, VideoRenderer};
pub use still::save_png;
pub use subtitles::{format_srt, parse_cues, read_cues, write_srt};
pub use timeline::{
    build_timeline, build_timeline_mapped, TimelineBuilder, GAP_EPSILON_SECS,
    SHORT_CUE_THRESHOLD_SECS,
};
