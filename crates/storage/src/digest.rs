//! Content digests.
//!
//! The content hash is the catalog's identity key, so the scanner and the
//! upload path must compute it the same way. Both go through this module.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::Read;
use std::path::PathBuf;
use tracing::instrument;

/// Read buffer size; files are never buffered whole.
const BUFFER_SIZE: usize = 64 * 1024;

/// BLAKE3 digest of everything readable from `reader`, as lowercase hex.
///
/// ```
/// use shoebox_storage::hash_reader;
/// let hash = hash_reader(&b"hello"[..]).unwrap();
/// assert_eq!(hash, blake3::hash(b"hello").to_hex().to_string());
/// ```
pub fn hash_reader(mut reader: impl Read) -> std::io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0; BUFFER_SIZE];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
            },
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Digest of the file at `path`, computed on the blocking thread pool.
#[instrument(level = "trace", skip_all, fields(path = %path.as_ref().display()))]
pub async fn hash_file(path: impl AsRef<std::path::Path>) -> Result<String> {
    let path: PathBuf = path.as_ref().to_path_buf();
    let task_path = path.clone();
    let task = tokio::task::spawn_blocking(move || -> Result<String> {
        let file = std::fs::File::open(&task_path).map_err(|e| ErrorKind::from_io(e, &task_path))?;
        Ok(hash_reader(file).map_err(|e| ErrorKind::from_io(e, &task_path))?)
    });
    task.await.or_raise(|| ErrorKind::Digest(path))?
}
