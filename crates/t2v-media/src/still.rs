//! Persisting generated still images.

use std::path::Path;

use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Decode image bytes of any supported format and write them as PNG.
///
/// Returns the decoded `(width, height)`.
pub async fn save_png(bytes: Vec<u8>, path: impl AsRef<Path>) -> MediaResult<(u32, u32)> {
    let path = path.as_ref().to_path_buf();

    tokio::task::spawn_blocking(move || -> MediaResult<(u32, u32)> {
        let img = image::load_from_memory(&bytes)?;
        img.save_with_format(&path, image::ImageFormat::Png)?;
        debug!(path = %path.display(), width = img.width(), height = img.height(), "Saved image");
        Ok((img.width(), img.height()))
    })
    .await
    .map_err(|e| MediaError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 3, image::Rgb([200, 40, 40]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut bytes, image::ImageOutputFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[tokio::test]
    async fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image1.png");
        let (w, h) = save_png(tiny_png(), &path).await.unwrap();
        assert_eq!((w, h), (4, 3));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_save_png_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_png(b"not an image".to_vec(), dir.path().join("x.png")).await.unwrap_err();
        assert!(matches!(err, MediaError::Image(_)));
    }
}
