use derive_more::{Display, Error};
use std::path::Path;
use std::str::FromStr;

/// Image extensions recognised when none are configured.
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff", "heic"];
/// Video extensions recognised when none are configured.
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "avi", "mkv", "webm", "3gp", "mts"];

/// The kind of media a cataloged file holds.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MediaType {
    #[display("picture")]
    Picture,
    #[display("video")]
    Video,
}

#[derive(Debug, Display, Error)]
#[display("unknown media type: {_0:?}")]
pub struct UnknownMediaType(#[error(not(source))] pub String);

impl FromStr for MediaType {
    type Err = UnknownMediaType;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "picture" => Ok(Self::Picture),
            "video" => Ok(Self::Video),
            _ => Err(UnknownMediaType(s.to_string())),
        }
    }
}

/// Extension sets used to decide whether a file is media, and which kind.
///
/// Extensions are stored lowercase without the leading dot; matching against
/// a path is case-insensitive and only considers the final extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extensions {
    images: Vec<String>,
    videos: Vec<String>,
}
impl Extensions {
    pub fn new(
        images: impl IntoIterator<Item = impl AsRef<str>>,
        videos: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        fn normalize(ext: impl AsRef<str>) -> String {
            ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase()
        }
        Self {
            images: images.into_iter().map(normalize).filter(|e| !e.is_empty()).collect(),
            videos: videos.into_iter().map(normalize).filter(|e| !e.is_empty()).collect(),
        }
    }

    /// Classify a path by its extension, or `None` if it isn't media.
    ///
    /// ```
    /// use shoebox_storage::{Extensions, MediaType};
    /// let extensions = Extensions::default();
    /// assert_eq!(extensions.classify("2024/IMG_0001.JPG"), Some(MediaType::Picture));
    /// assert_eq!(extensions.classify("clip.mp4"), Some(MediaType::Video));
    /// assert_eq!(extensions.classify("notes.txt"), None);
    /// ```
    pub fn classify(&self, path: impl AsRef<Path>) -> Option<MediaType> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        if self.images.contains(&ext) {
            Some(MediaType::Picture)
        } else if self.videos.contains(&ext) {
            Some(MediaType::Video)
        } else {
            None
        }
    }
}
impl Default for Extensions {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_EXTENSIONS, DEFAULT_VIDEO_EXTENSIONS)
    }
}
