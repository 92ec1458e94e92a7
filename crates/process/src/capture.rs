//! Capture time resolution.
//!
//! Sources are tried in a fixed order and the first one that yields a time
//! wins: embedded EXIF, the configured file name pattern, file modification
//! time, file creation time. Everything is reported in the EXIF layout.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use regex::Regex;
use std::fs::Metadata;
use std::path::Path;
use time::format_description::{BorrowedFormatItem, OwnedFormatItem};
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// `YYYY:MM:DD HH:MM:SS`, as written by cameras.
pub const EXIF_DATETIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]:[month]:[day] [hour]:[minute]:[second]");

/// Capture time taken from a pattern in the file name, e.g.
/// `IMG_20200815_204402.jpg`.
///
/// The regex picks the date out of the file stem (the first match wins) and
/// the [`time` format description](https://time-rs.github.io/book/api/format-description.html)
/// parses it. A format without a time of day yields midnight.
///
/// ```
/// use shoebox_process::FilenameDate;
///
/// let date = FilenameDate::new(r"\d{8}_\d{6}", "[year][month][day]_[hour][minute][second]").unwrap();
/// assert_eq!(date.capture_time("PXL_20200815_204402456.jpg").as_deref(), Some("2020:08:15 20:44:02"));
/// assert_eq!(date.capture_time("holiday.jpg"), None);
/// ```
#[derive(Debug, Clone)]
pub struct FilenameDate {
    pattern: Regex,
    format: OwnedFormatItem,
}

impl FilenameDate {
    pub fn new(pattern: impl AsRef<str>, format: impl AsRef<str>) -> Result<Self> {
        let (pattern, format) = (pattern.as_ref(), format.as_ref());
        Ok(Self {
            pattern: Regex::new(pattern).or_raise(|| ErrorKind::InvalidPattern(pattern.to_string()))?,
            format: time::format_description::parse_owned::<1>(format)
                .or_raise(|| ErrorKind::InvalidFormat(format.to_string()))?,
        })
    }

    fn parse(&self, file_name: &str) -> Option<PrimitiveDateTime> {
        let stem = Path::new(file_name).file_stem()?.to_str()?;
        let found = self.pattern.find(stem)?.as_str();
        PrimitiveDateTime::parse(found, &self.format)
            .ok()
            .or_else(|| Date::parse(found, &self.format).ok().map(Date::midnight))
    }

    /// Capture time in the EXIF layout, if the file name carries one.
    pub fn capture_time(&self, file_name: &str) -> Option<String> {
        self.parse(file_name).and_then(format_exif)
    }
}

pub(crate) fn format_exif(datetime: PrimitiveDateTime) -> Option<String> {
    datetime.format(EXIF_DATETIME).ok()
}

/// `DateTimeOriginal` from the primary image, if present and well formed.
pub(crate) fn exif_datetime(exif: &exif::Exif) -> Option<PrimitiveDateTime> {
    let field = exif.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;
    let exif::Value::Ascii(ref values) = field.value else {
        return None;
    };
    let parsed = exif::DateTime::from_ascii(values.first()?).ok()?;
    from_exif(&parsed)
}

fn from_exif(datetime: &exif::DateTime) -> Option<PrimitiveDateTime> {
    let month = Month::try_from(datetime.month).ok()?;
    let date = Date::from_calendar_date(i32::from(datetime.year), month, datetime.day).ok()?;
    let time = Time::from_hms(datetime.hour, datetime.minute, datetime.second).ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

/// Modification time, falling back to creation time, in UTC.
pub(crate) fn file_time(metadata: &Metadata) -> Option<PrimitiveDateTime> {
    let system_time = metadata.modified().or_else(|_| metadata.created()).ok()?;
    let utc = OffsetDateTime::from(system_time).to_offset(UtcOffset::UTC);
    Some(PrimitiveDateTime::new(utc.date(), utc.time()))
}

/// Walk the sources in order. `None` means the capture time is unknown.
pub(crate) fn resolve(
    exif: Option<&exif::Exif>,
    file_name: &str,
    filename_date: Option<&FilenameDate>,
    metadata: Option<&Metadata>,
) -> Option<String> {
    if let Some(datetime) = exif.and_then(exif_datetime) {
        return format_exif(datetime);
    }
    tracing::trace!(file_name, "No EXIF capture time");
    if let Some(timestamp) = filename_date.and_then(|pattern| pattern.capture_time(file_name)) {
        return Some(timestamp);
    }
    tracing::trace!(file_name, "No capture time in file name");
    if let Some(datetime) = metadata.and_then(file_time) {
        return format_exif(datetime);
    }
    tracing::debug!(file_name, "Capture time unknown");
    None
}
