use crate::capture::{self, FilenameDate};
use crate::error::ErrorKind;
use crate::thumbnail::{self, Ffmpeg};
use crate::MediaProcessor;
use async_trait::async_trait;
use shoebox_catalog::{MediaRecord, MediaStatus};
use shoebox_storage::MediaType;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Thumbnail edge length when none is configured.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;

/// The processing pipeline: resolve a capture time, render a thumbnail,
/// mark the record ready.
///
/// Every stage is best-effort. A file that can't be decoded still becomes
/// [`Ready`](MediaStatus::Ready), just without a thumbnail or with an unknown
/// capture time. Thumbnails are written to `<thumbs dir>/<id>.png` and
/// overwritten on every run.
///
/// # Examples
///
/// ```no_run
/// use shoebox_process::{FilenameDate, MediaProcessor, Pipeline};
/// # async fn example(record: shoebox_catalog::MediaRecord) -> shoebox_process::error::Result<()> {
/// let pipeline = Pipeline::new("/var/lib/shoebox/thumbs")
///     .with_thumbnail_size(320)
///     .with_filename_date(FilenameDate::new(r"\d{8}_\d{6}", "[year][month][day]_[hour][minute][second]")?);
/// let ready = pipeline.process(record).await;
/// println!("{:?} {:?}", ready.capture_timestamp, pipeline.thumbnail_path(&ready));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    thumbs_dir: PathBuf,
    thumbnail_size: u32,
    filename_date: Option<FilenameDate>,
    ffmpeg: Option<Ffmpeg>,
}

impl Pipeline {
    /// Pipeline writing thumbnails into `thumbs_dir`, using ffmpeg from
    /// `PATH` when there is one.
    pub fn new(thumbs_dir: impl Into<PathBuf>) -> Self {
        Self {
            thumbs_dir: thumbs_dir.into(),
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            filename_date: None,
            ffmpeg: Ffmpeg::discover(),
        }
    }

    pub fn with_thumbnail_size(self, thumbnail_size: u32) -> Self {
        Self { thumbnail_size, ..self }
    }

    pub fn with_filename_date(self, filename_date: FilenameDate) -> Self {
        Self {
            filename_date: Some(filename_date),
            ..self
        }
    }

    /// Use this ffmpeg binary instead of the one on `PATH`.
    pub fn with_ffmpeg(self, path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: Some(Ffmpeg::new(path)),
            ..self
        }
    }

    pub fn thumbs_dir(&self) -> &Path {
        &self.thumbs_dir
    }

    fn read_exif(path: &Path) -> Option<exif::Exif> {
        let file = File::open(path).ok()?;
        match exif::Reader::new().read_from_container(&mut BufReader::new(file)) {
            Ok(exif) => Some(exif),
            Err(err) => {
                tracing::trace!(path = %path.display(), error = %err, "No readable EXIF data");
                None
            },
        }
    }

    fn render_thumbnail(&self, record: &MediaRecord, exif: Option<&exif::Exif>, target: &Path) {
        if let Err(err) = std::fs::create_dir_all(&self.thumbs_dir) {
            tracing::warn!(dir = %self.thumbs_dir.display(), error = %err, "Cannot create thumbnail directory");
            return;
        }
        let source = record.path();
        let result = match record.media_type {
            MediaType::Picture => {
                let orientation = exif
                    .and_then(|exif| exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY))
                    .and_then(|field| field.value.get_uint(0));
                thumbnail::picture(&source, orientation, self.thumbnail_size, target)
            },
            MediaType::Video => match &self.ffmpeg {
                Some(ffmpeg) => ffmpeg.thumbnail(&source, self.thumbnail_size, target),
                None => Err(exn::Exn::from(ErrorKind::FfmpegNotFound)),
            },
        };
        match result {
            Ok(()) => tracing::debug!(path = %source.display(), thumbnail = %target.display(), "Thumbnail written"),
            Err(err) => tracing::warn!(path = %source.display(), error = ?err, "No thumbnail generated"),
        }
    }

    fn process_blocking(&self, record: MediaRecord) -> MediaRecord {
        let path = record.path();
        let exif = match record.media_type {
            MediaType::Picture => Self::read_exif(&path),
            MediaType::Video => None,
        };
        let metadata = std::fs::metadata(&path).ok();
        let capture_timestamp =
            capture::resolve(exif.as_ref(), &record.file_name, self.filename_date.as_ref(), metadata.as_ref());
        match self.thumbnail_path(&record) {
            Some(target) => self.render_thumbnail(&record, exif.as_ref(), &target),
            None => tracing::warn!(path = %path.display(), "Record has no id; skipping thumbnail"),
        }
        record.with_capture_timestamp(capture_timestamp).with_status(MediaStatus::Ready)
    }
}

#[async_trait]
impl MediaProcessor for Pipeline {
    #[instrument(skip_all, fields(id = ?record.id, path = %record.path().display()))]
    async fn process(&self, record: MediaRecord) -> MediaRecord {
        let pipeline = self.clone();
        let fallback = record.clone();
        match tokio::task::spawn_blocking(move || pipeline.process_blocking(record)).await {
            Ok(processed) => processed,
            Err(err) => {
                tracing::error!(error = %err, "Processing task failed");
                fallback.with_status(MediaStatus::Ready)
            },
        }
    }

    fn thumbnail_path(&self, record: &MediaRecord) -> Option<PathBuf> {
        record.id.map(|id| self.thumbs_dir.join(format!("{id}.png")))
    }
}
