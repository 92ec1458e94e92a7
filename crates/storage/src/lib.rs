//! Filesystem side of the media library.
//!
//! - [`Scanner`] walks media roots and streams [`MediaFile`] descriptors.
//! - [`hash_file`] / [`hash_reader`] compute the content digest used as the
//!   catalog's identity key.
//! - [`Extensions`] decides what counts as a picture or a video.

mod digest;
pub mod error;
mod media;
mod path;
mod scanner;

pub use crate::digest::{hash_file, hash_reader};
pub use crate::media::{DEFAULT_IMAGE_EXTENSIONS, DEFAULT_VIDEO_EXTENSIONS, Extensions, MediaType, UnknownMediaType};
pub use crate::path::validate_file_name;
pub use crate::scanner::{MediaFile, MediaFileStream, Scanner};
