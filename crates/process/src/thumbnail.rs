use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Frame tried first for video thumbnails; early frames are often black.
pub(crate) const VIDEO_FRAME: u32 = 10;
/// Fallback for clips too short to have [`VIDEO_FRAME`].
pub(crate) const VIDEO_FALLBACK_FRAME: u32 = 1;

/// Rotate to match an EXIF orientation tag. Mirrored orientations are left
/// as they are.
pub(crate) fn orient(image: DynamicImage, orientation: Option<u32>) -> DynamicImage {
    match orientation {
        Some(3) => image.rotate180(),
        Some(6) => image.rotate90(),
        Some(8) => image.rotate270(),
        _ => image,
    }
}

/// Decode `source`, fit it within `size`×`size` and write a PNG to `target`.
pub(crate) fn picture(source: &Path, orientation: Option<u32>, size: u32, target: &Path) -> Result<()> {
    let image = ImageReader::open(source)
        .or_raise(|| ErrorKind::Io)?
        .with_guessed_format()
        .or_raise(|| ErrorKind::Io)?
        .decode()
        .or_raise(|| ErrorKind::Decode(source.to_path_buf()))?;
    let thumbnail = orient(image.resize(size, size, FilterType::Lanczos3), orientation);
    thumbnail
        .to_rgba8()
        .save_with_format(target, ImageFormat::Png)
        .or_raise(|| ErrorKind::Encode(target.to_path_buf()))
}

/// An ffmpeg executable used to grab video frames.
#[derive(Debug, Clone)]
pub(crate) struct Ffmpeg {
    path: PathBuf,
}

impl Ffmpeg {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn discover() -> Option<Self> {
        match which::which("ffmpeg") {
            Ok(path) => {
                tracing::debug!(ffmpeg = %path.display(), "Discovered ffmpeg");
                Some(Self::new(path))
            },
            Err(_) => {
                tracing::info!("ffmpeg not found in PATH; video thumbnails disabled");
                None
            },
        }
    }

    /// Write frame `frame` of `source`, scaled to fit `size`×`size`, as a PNG.
    pub(crate) fn frame(&self, source: &Path, frame: u32, size: u32, target: &Path) -> Result<()> {
        // A stale thumbnail would make a missing frame look like success.
        _ = std::fs::remove_file(target);
        let filter = format!("select=eq(n\\,{frame}),scale=w={size}:h={size}:force_original_aspect_ratio=decrease");
        let output = Command::new(&self.path)
            .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(source)
            .args(["-vf", &filter, "-frames:v", "1", "-update", "1", "-f", "image2", "-c:v", "png"])
            .arg(target)
            .output()
            .or_raise(|| ErrorKind::Io)?;
        if !output.status.success() {
            tracing::debug!(stderr = %String::from_utf8_lossy(&output.stderr), "ffmpeg failed");
            exn::bail!(ErrorKind::FfmpegFailed(output.status.code()));
        }
        if !target.is_file() {
            exn::bail!(ErrorKind::NoFrame(frame));
        }
        Ok(())
    }

    /// Frame [`VIDEO_FRAME`], retried at [`VIDEO_FALLBACK_FRAME`].
    pub(crate) fn thumbnail(&self, source: &Path, size: u32, target: &Path) -> Result<()> {
        match self.frame(source, VIDEO_FRAME, size, target) {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::debug!(path = %source.display(), error = ?err, "Retrying video thumbnail at an earlier frame");
                self.frame(source, VIDEO_FALLBACK_FRAME, size, target)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};
    use rstest::rstest;

    fn landscape(path: &Path, width: u32, height: u32) {
        RgbImage::from_fn(width, height, |x, _| Rgb([(x % 256) as u8, 0, 0])).save(path).unwrap();
    }

    #[rstest]
    #[case(None, (4, 2))]
    #[case(Some(1), (4, 2))]
    #[case(Some(3), (4, 2))]
    #[case(Some(6), (2, 4))]
    #[case(Some(8), (2, 4))]
    fn test_orientation(#[case] orientation: Option<u32>, #[case] dimensions: (u32, u32)) {
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 2));
        assert_eq!(orient(image, orientation).dimensions(), dimensions);
    }

    #[test]
    fn test_picture_fits_within_size() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("wide.png");
        let target = dir.path().join("thumb.png");
        landscape(&source, 400, 200);
        picture(&source, None, 256, &target).unwrap();
        let thumbnail = image::open(&target).unwrap();
        assert_eq!(thumbnail.dimensions(), (256, 128));
    }

    #[test]
    fn test_picture_with_bad_data() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.jpg");
        std::fs::write(&source, b"definitely not a jpeg").unwrap();
        let err = picture(&source, None, 256, &dir.path().join("thumb.png")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Decode(_)));
    }

    #[test]
    fn test_missing_ffmpeg_binary() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = Ffmpeg::new(dir.path().join("no-such-ffmpeg"));
        let target = dir.path().join("thumb.png");
        let err = ffmpeg.thumbnail(&dir.path().join("clip.mp4"), 256, &target).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io));
        assert!(!target.exists());
    }
}
