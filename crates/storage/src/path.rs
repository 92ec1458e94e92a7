//! File name validation.
//!
//! Uploaded files are written into the staging directory under a name chosen
//! by the client, so that name must never be able to point anywhere else.

use std::path::{Component, Path};

use crate::error::{ErrorKind, Result};

/// Validates a client-supplied file name.
///
/// A valid name is exactly one normal path component: no separators, no `.`
/// or `..`, no null bytes, not empty.
///
/// # Examples
///
/// ```
/// use shoebox_storage::validate_file_name;
/// assert!(validate_file_name("IMG_0001.jpg").is_ok());
/// assert!(validate_file_name("holiday photo.png").is_ok());
/// assert!(validate_file_name("../etc/passwd").is_err());
/// assert!(validate_file_name("nested/name.jpg").is_err());
/// assert!(validate_file_name("a\0b.jpg").is_err());
/// ```
pub fn validate_file_name(name: impl AsRef<str>) -> Result<String> {
    let name = name.as_ref();
    let invalid = || ErrorKind::InvalidFileName(name.to_string());
    // Null bytes pass through Path::components() on Unix but cause
    // truncation in C-based syscalls, reject them explicitly.
    if name.is_empty() || name.contains('\0') || name.contains('/') || name.contains('\\') {
        exn::bail!(invalid());
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(s)), None) if s == name => Ok(name.to_string()),
        _ => exn::bail!(invalid()),
    }
}
