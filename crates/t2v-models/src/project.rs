//! Project naming and the per-project working directory layout.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Narration audio file name.
pub const AUDIO_FILE: &str = "output1.wav";
/// Subtitle document file name.
pub const SUBTITLE_FILE: &str = "output1.srt";
/// Final render file name.
pub const VIDEO_FILE: &str = "final_video1.mp4";
/// Concat list handed to FFmpeg by the renderer.
pub const CONCAT_LIST_FILE: &str = "images.txt";

/// Maximum project name length.
pub const MAX_PROJECT_NAME_LEN: usize = 64;

/// Project name validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectError {
    #[error("Project name cannot be empty")]
    Empty,

    #[error("Project name exceeds {MAX_PROJECT_NAME_LEN} characters")]
    TooLong,

    #[error("Project name contains invalid character '{0}'")]
    InvalidCharacter(char),

    #[error("Project name '{0}' is reserved")]
    Reserved(String),
}

/// Validated project name, safe to use as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    /// Validate and wrap a project name.
    ///
    /// Allowed: ASCII letters, digits, space, `_`, `-`, `.`. Surrounding
    /// whitespace is trimmed.
    pub fn parse(name: &str) -> Result<Self, ProjectError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProjectError::Empty);
        }
        if name.chars().count() > MAX_PROJECT_NAME_LEN {
            return Err(ProjectError::TooLong);
        }
        if name == "." || name == ".." {
            return Err(ProjectError::Reserved(name.to_string()));
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.')))
        {
            return Err(ProjectError::InvalidCharacter(c));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ProjectName {
    type Error = ProjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProjectName> for String {
    fn from(name: ProjectName) -> Self {
        name.0
    }
}

/// Filesystem layout of one project under the videos root.
///
/// ```text
/// {root}/{project}/output1.wav
/// {root}/{project}/output1.srt
/// {root}/{project}/image{n}.png
/// {root}/{project}/final_video1.mp4
/// ```
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    name: ProjectName,
    dir: PathBuf,
}

impl ProjectLayout {
    pub fn new(videos_root: impl AsRef<Path>, name: ProjectName) -> Self {
        let dir = videos_root.as_ref().join(name.as_str());
        Self { name, dir }
    }

    pub fn name(&self) -> &ProjectName {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn audio_path(&self) -> PathBuf {
        self.dir.join(AUDIO_FILE)
    }

    pub fn subtitles_path(&self) -> PathBuf {
        self.dir.join(SUBTITLE_FILE)
    }

    /// Path of the `n`-th generated image (1-based).
    pub fn image_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("image{}.png", n))
    }

    pub fn video_path(&self) -> PathBuf {
        self.dir.join(VIDEO_FILE)
    }

    pub fn concat_list_path(&self) -> PathBuf {
        self.dir.join(CONCAT_LIST_FILE)
    }

    /// URL path under which the final render is served.
    pub fn public_video_path(&self) -> String {
        format!("/videos/{}/{}", self.name, VIDEO_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_name_valid() {
        assert_eq!(ProjectName::parse("water-cycle").unwrap().as_str(), "water-cycle");
        assert_eq!(ProjectName::parse("  My Project 2 ").unwrap().as_str(), "My Project 2");
        assert_eq!(ProjectName::parse("v1.0_final").unwrap().as_str(), "v1.0_final");
    }

    #[test]
    fn test_project_name_invalid() {
        assert_eq!(ProjectName::parse(""), Err(ProjectError::Empty));
        assert_eq!(ProjectName::parse("   "), Err(ProjectError::Empty));
        assert_eq!(ProjectName::parse(".."), Err(ProjectError::Reserved("..".to_string())));
        assert_eq!(ProjectName::parse("a/b"), Err(ProjectError::InvalidCharacter('/')));
        assert_eq!(ProjectName::parse("a\\b"), Err(ProjectError::InvalidCharacter('\\')));
        assert_eq!(ProjectName::parse(&"x".repeat(65)), Err(ProjectError::TooLong));
    }

    #[test]
    fn test_project_name_deserialize_validates() {
        let ok: ProjectName = serde_json::from_str("\"demo\"").unwrap();
        assert_eq!(ok.as_str(), "demo");
        assert!(serde_json::from_str::<ProjectName>("\"../etc\"").is_err());
    }

    #[test]
    fn test_layout_paths() {
        let layout = ProjectLayout::new("./videos", ProjectName::parse("demo").unwrap());
        assert_eq!(layout.dir(), Path::new("./videos/demo"));
        assert_eq!(layout.audio_path(), Path::new("./videos/demo/output1.wav"));
        assert_eq!(layout.subtitles_path(), Path::new("./videos/demo/output1.srt"));
        assert_eq!(layout.image_path(3), Path::new("./videos/demo/image3.png"));
        assert_eq!(layout.video_path(), Path::new("./videos/demo/final_video1.mp4"));
        assert_eq!(layout.public_video_path(), "/videos/demo/final_video1.mp4");
    }
}
