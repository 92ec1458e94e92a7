use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use shoebox_process::{DEFAULT_THUMBNAIL_SIZE, FilenameDate};
use shoebox_storage::{DEFAULT_IMAGE_EXTENSIONS, DEFAULT_VIDEO_EXTENSIONS, Extensions};
use std::path::{Path, PathBuf};

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "shoebox")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub scanner: ScannerConfig,
    pub processing: ProcessingConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Roots scanned for media.
    pub media_dirs: Vec<PathBuf>,
    /// Where uploaded files are written before they are confirmed.
    pub uploads_dir: PathBuf,
    /// Holds the catalog database and thumbnails; never scanned.
    pub meta_dir: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        let data_dir = project_dirs().map(|dirs| dirs.data_dir().to_path_buf()).unwrap_or_default();
        Self {
            media_dirs: Vec::new(),
            uploads_dir: data_dir.join("uploads"),
            meta_dir: data_dir.join("meta"),
        }
    }
}

impl LibraryConfig {
    pub fn catalog_path(&self) -> PathBuf {
        self.meta_dir.join("catalog.db")
    }

    pub fn thumbs_dir(&self) -> PathBuf {
        self.meta_dir.join("thumbs")
    }

    /// Every root a scan has to cover: the media dirs, then the staging dir.
    ///
    /// A directory inside another root is left out, so nothing is walked
    /// twice.
    pub fn scan_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = Vec::new();
        for root in self.media_dirs.iter().chain([&self.uploads_dir]) {
            if roots.iter().any(|kept| root.starts_with(kept)) {
                continue;
            }
            roots.retain(|kept| !kept.starts_with(root));
            roots.push(root.clone());
        }
        roots
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.media_dirs.is_empty() {
            exn::bail!(ErrorKind::NoMediaDirs);
        }
        for dir in &self.media_dirs {
            check_dir("library.media_dirs", dir)?;
        }
        check_dir("library.uploads_dir", &self.uploads_dir)?;
        check_dir("library.meta_dir", &self.meta_dir)
    }
}

fn check_dir(key: &'static str, dir: &Path) -> Result<()> {
    if !dir.is_absolute() {
        exn::bail!(ErrorKind::NotAbsolute(key, dir.to_path_buf()));
    }
    if !dir.is_dir() {
        exn::bail!(ErrorKind::MissingDirectory(key, dir.to_path_buf()));
    }
    Ok(())
}

/// Extensions, lowercase and without the dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub image_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            image_extensions: DEFAULT_IMAGE_EXTENSIONS.iter().map(ToString::to_string).collect(),
            video_extensions: DEFAULT_VIDEO_EXTENSIONS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ScannerConfig {
    pub fn extensions(&self) -> Extensions {
        Extensions::new(&self.image_extensions, &self.video_extensions)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Finds the date in a file name, e.g. `\d{8}_\d{6}`.
    pub filename_date_regex: Option<String>,
    /// How to read the match, as a `time` format description.
    pub filename_date_format: Option<String>,
    pub thumbnail_size: u32,
    /// Looked up on `PATH` when unset.
    pub ffmpeg: Option<PathBuf>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            filename_date_regex: None,
            filename_date_format: None,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            ffmpeg: None,
        }
    }
}

impl ProcessingConfig {
    /// The filename date parser, if one is configured.
    pub fn filename_date(&self) -> Result<Option<FilenameDate>> {
        match (&self.filename_date_regex, &self.filename_date_format) {
            (Some(regex), Some(format)) => {
                let date = FilenameDate::new(regex, format).or_raise(|| ErrorKind::InvalidFilenameDate)?;
                Ok(Some(date))
            },
            (None, None) => Ok(None),
            _ => exn::bail!(ErrorKind::IncompleteFilenameDate),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.thumbnail_size == 0 {
            exn::bail!(ErrorKind::ThumbnailSize);
        }
        self.filename_date().map(|_| ())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directives; `RUST_LOG` takes precedence.
    pub filter: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn library(dir: &Path) -> LibraryConfig {
        for name in ["media", "uploads", "meta"] {
            std::fs::create_dir_all(dir.join(name)).unwrap();
        }
        LibraryConfig {
            media_dirs: vec![dir.join("media")],
            uploads_dir: dir.join("uploads"),
            meta_dir: dir.join("meta"),
        }
    }

    #[test]
    fn test_valid_library() {
        let dir = tempfile::tempdir().unwrap();
        let library = library(dir.path());
        library.validate().unwrap();
        assert_eq!(library.scan_roots(), [dir.path().join("media"), dir.path().join("uploads")]);
        assert_eq!(library.catalog_path(), dir.path().join("meta/catalog.db"));
        assert_eq!(library.thumbs_dir(), dir.path().join("meta/thumbs"));
    }

    #[test]
    fn test_uploads_inside_media_dirs_is_scanned_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = library(dir.path());
        library.media_dirs.push(library.uploads_dir.clone());
        assert_eq!(library.scan_roots().len(), 2);

        library.uploads_dir = dir.path().join("media/incoming");
        library.media_dirs = vec![dir.path().join("media")];
        assert_eq!(library.scan_roots(), [dir.path().join("media")]);
    }

    #[test]
    fn test_nested_media_dirs_collapse_to_outermost() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = library(dir.path());
        library.media_dirs = vec![dir.path().join("media/2024"), dir.path().join("media")];
        assert_eq!(library.scan_roots(), [dir.path().join("media"), dir.path().join("uploads")]);
    }

    #[test]
    fn test_library_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let valid = library(dir.path());

        let err = LibraryConfig { media_dirs: vec![], ..valid.clone() }.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoMediaDirs));

        let err = LibraryConfig { media_dirs: vec!["relative".into()], ..valid.clone() }.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotAbsolute("library.media_dirs", _)));

        let err = LibraryConfig { uploads_dir: dir.path().join("absent"), ..valid.clone() }.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingDirectory("library.uploads_dir", _)));

        std::fs::write(dir.path().join("file"), b"").unwrap();
        let err = LibraryConfig { meta_dir: dir.path().join("file"), ..valid }.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingDirectory("library.meta_dir", _)));
    }

    #[rstest]
    #[case::regex_only(Some(r"\d{8}"), None)]
    #[case::format_only(None, Some("[year][month][day]"))]
    fn test_filename_date_needs_both(#[case] regex: Option<&str>, #[case] format: Option<&str>) {
        let processing = ProcessingConfig {
            filename_date_regex: regex.map(String::from),
            filename_date_format: format.map(String::from),
            ..ProcessingConfig::default()
        };
        let err = processing.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::IncompleteFilenameDate));
    }

    #[rstest]
    #[case::bad_regex(r"\d{8", "[year][month][day]")]
    #[case::bad_format(r"\d{8}", "[year][month")]
    fn test_filename_date_must_parse(#[case] regex: &str, #[case] format: &str) {
        let processing = ProcessingConfig {
            filename_date_regex: Some(regex.to_string()),
            filename_date_format: Some(format.to_string()),
            ..ProcessingConfig::default()
        };
        let err = processing.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidFilenameDate));
    }

    #[test]
    fn test_processing_defaults() {
        let processing = ProcessingConfig::default();
        processing.validate().unwrap();
        assert!(processing.filename_date().unwrap().is_none());
        let err = ProcessingConfig { thumbnail_size: 0, ..processing }.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::ThumbnailSize));
    }

    #[test]
    fn test_scanner_extensions() {
        let scanner = ScannerConfig {
            image_extensions: vec![".JPG".to_string()],
            video_extensions: vec!["mp4".to_string()],
        };
        let extensions = scanner.extensions();
        assert_eq!(extensions.classify("a.jpg"), Some(shoebox_storage::MediaType::Picture));
        assert_eq!(extensions.classify("a.png"), None);
    }
}
