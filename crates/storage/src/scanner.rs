//! Filesystem scanner.
//!
//! Walks the configured roots looking for media files and yields one
//! [`MediaFile`] per match, complete with its content digest. The scanner
//! knows nothing about the catalog: what happens to each descriptor is the
//! consumer's business.

use crate::digest::hash_file;
use crate::media::{Extensions, MediaType};
use async_stream::stream;
use futures::Stream;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs::{self, DirEntry};

pub type MediaFileStream<'a> = Pin<Box<dyn Stream<Item = MediaFile> + Send + 'a>>;

/// A recognised media file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub media_type: MediaType,
    pub file_name: String,
    /// Parent directory, as reached from the configured root.
    pub dir_path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// BLAKE3 digest of the file content (see [`hash_file`](crate::hash_file))
    pub hash: String,
}
impl MediaFile {
    pub fn path(&self) -> PathBuf {
        self.dir_path.join(&self.file_name)
    }
}

enum WalkEntry {
    Media(PathBuf, MediaType, Metadata),
    Descend(PathBuf),
    Skip,
}

/// Recursive media scanner over a set of root directories.
///
/// # Examples
///
/// ```no_run
/// use futures::StreamExt;
/// use shoebox_storage::{Extensions, Scanner};
///
/// # async fn example() {
/// let scanner = Scanner::new(["/srv/photos", "/srv/uploads"], Extensions::default())
///     .excluding("/srv/photos/.shoebox");
/// let mut files = scanner.scan();
/// while let Some(file) = files.next().await {
///     println!("{} {} bytes {}", file.path().display(), file.size, file.hash);
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Scanner {
    roots: Vec<PathBuf>,
    excluded: Vec<PathBuf>,
    extensions: Extensions,
}
impl Scanner {
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>, extensions: Extensions) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            excluded: Vec::new(),
            extensions,
        }
    }

    /// Never descend into `path` (or yield anything beneath it).
    pub fn excluding(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded.push(path.into());
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded.iter().any(|excluded| path.starts_with(excluded))
    }

    async fn process_entry(&self, entry: DirEntry) -> std::io::Result<WalkEntry> {
        let path = entry.path();
        // Does not follow symlinks; a linked directory is never descended
        // into, so cycles can't happen.
        let metadata = entry.metadata().await?;
        if self.is_excluded(&path) {
            return Ok(WalkEntry::Skip);
        }
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if metadata.is_file()
            && let Some(media_type) = self.extensions.classify(&path)
        {
            return Ok(WalkEntry::Media(path, media_type, metadata));
        }
        Ok(WalkEntry::Skip)
    }

    async fn describe(path: PathBuf, media_type: MediaType, metadata: Metadata) -> Option<MediaFile> {
        let (Some(file_name), Some(dir_path)) = (path.file_name().and_then(|n| n.to_str()), path.parent()) else {
            tracing::warn!(path = %path.display(), "Skipping media file with a non UTF-8 name");
            return None;
        };
        // The catalog stores paths as text.
        if dir_path.to_str().is_none() {
            tracing::warn!(path = %path.display(), "Skipping media file in a directory with a non UTF-8 name");
            return None;
        }
        match hash_file(&path).await {
            Ok(hash) => {
                tracing::debug!(path = %path.display(), %media_type, size = metadata.len(), %hash, "Media file found");
                Some(MediaFile {
                    media_type,
                    file_name: file_name.to_string(),
                    dir_path: dir_path.to_path_buf(),
                    size: metadata.len(),
                    hash,
                })
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = ?err, "Skipping media file that could not be hashed");
                None
            },
        }
    }

    /// Depth-first walk over every root, in order.
    ///
    /// The stream is lazy and finite; each file is hashed when the stream is
    /// polled for it. Unreadable directories and unhashable files are logged
    /// and left out, they never end the walk. Ordering between siblings is
    /// whatever the filesystem returns.
    pub fn scan(&self) -> MediaFileStream<'_> {
        Box::pin(stream! {
            for root in &self.roots {
                match fs::metadata(root).await {
                    Ok(meta) if meta.is_dir() => {},
                    Ok(_) => {
                        tracing::warn!(root = %root.display(), "Media root is not a directory; skipping");
                        continue;
                    },
                    Err(err) => {
                        tracing::warn!(root = %root.display(), error = %err, "Media root is not accessible; skipping");
                        continue;
                    },
                }
                let mut stack = vec![root.clone()];
                'dirs: while let Some(current) = stack.pop() {
                    let mut entries = match fs::read_dir(&current).await {
                        Ok(entries) => entries,
                        Err(err) => {
                            tracing::warn!(dir = %current.display(), error = %err, "Skipping unreadable directory");
                            continue 'dirs;
                        },
                    };
                    'entries: loop {
                        let entry = match entries.next_entry().await {
                            Ok(Some(entry)) => entry,
                            Ok(None) => break 'entries,
                            Err(err) => {
                                tracing::warn!(dir = %current.display(), error = %err, "Directory listing aborted");
                                break 'entries;
                            },
                        };
                        match self.process_entry(entry).await {
                            Ok(WalkEntry::Media(path, media_type, metadata)) => {
                                if let Some(file) = Self::describe(path, media_type, metadata).await {
                                    yield file;
                                }
                            },
                            Ok(WalkEntry::Descend(dir)) => stack.push(dir),
                            Ok(WalkEntry::Skip) => {},
                            Err(err) => {
                                tracing::warn!(dir = %current.display(), error = %err, "Skipping unreadable entry");
                            },
                        }
                    }
                }
            }
        })
    }
}
