use crate::error::{Error, ErrorKind};
use crate::record::{MediaRecord, MediaStatus};
use exn::{OptionExt, ResultExt};
use shoebox_storage::MediaType;
use std::path::PathBuf;

#[derive(sqlx::FromRow)]
pub(crate) struct MediaRow {
    pub(crate) id: Option<i64>,
    pub(crate) media_type: String,
    pub(crate) file_name: String,
    pub(crate) dir_path: String,
    pub(crate) file_size: i64,
    pub(crate) content_hash: String,
    pub(crate) capture_timestamp: Option<String>,
    pub(crate) status: String,
}
impl TryFrom<&MediaRecord> for MediaRow {
    type Error = Error;
    fn try_from(record: &MediaRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record
                .id
                .map(i64::try_from)
                .transpose()
                .or_raise(|| ErrorKind::InvalidData("media id"))?,
            media_type: record.media_type.to_string(),
            file_name: record.file_name.clone(),
            // sqlx has no encoding for paths.
            dir_path: record
                .dir_path
                .to_str()
                .ok_or_raise(|| ErrorKind::InvalidData("directory path"))?
                .to_string(),
            file_size: i64::try_from(record.file_size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            content_hash: record.content_hash.clone(),
            capture_timestamp: record.capture_timestamp.clone(),
            status: record.status.to_string(),
        })
    }
}
impl TryFrom<MediaRow> for MediaRecord {
    type Error = Error;
    fn try_from(row: MediaRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row
                .id
                .map(u64::try_from)
                .transpose()
                .or_raise(|| ErrorKind::InvalidData("media id"))?,
            media_type: row
                .media_type
                .parse::<MediaType>()
                .or_raise(|| ErrorKind::InvalidData("media type"))?,
            file_name: row.file_name,
            dir_path: PathBuf::from(row.dir_path),
            file_size: u64::try_from(row.file_size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            content_hash: row.content_hash,
            capture_timestamp: row.capture_timestamp,
            status: row.status.parse::<MediaStatus>().or_raise(|| ErrorKind::InvalidData("media status"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> MediaRow {
        MediaRow {
            id: Some(3),
            media_type: "video".to_string(),
            file_name: "clip.mp4".to_string(),
            dir_path: "/srv/media/2024".to_string(),
            file_size: 1024,
            content_hash: "692ed948ccd76c2230efe90175a519a3092b1862ab049704b7221738e56028ca".to_string(),
            capture_timestamp: Some("2024:06:01 12:00:00".to_string()),
            status: "READY".to_string(),
        }
    }

    #[test]
    fn test_row_to_model() {
        let record = MediaRecord::try_from(row()).unwrap();
        assert_eq!(record.id, Some(3));
        assert_eq!(record.media_type, MediaType::Video);
        assert_eq!(record.status, MediaStatus::Ready);
        assert_eq!(record.path(), PathBuf::from("/srv/media/2024/clip.mp4"));
    }

    #[test]
    fn test_corrupt_rows_are_rejected() {
        let negative = MediaRow { file_size: -1, ..row() };
        let err = MediaRecord::try_from(negative).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("file size")));

        let unknown = MediaRow { status: "TRASHED".to_string(), ..row() };
        let err = MediaRecord::try_from(unknown).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("media status")));
    }

    #[test]
    fn test_model_to_row() {
        let record = MediaRecord::new(MediaType::Picture, "a.jpg", "/srv/uploads", 100, "abc");
        let row = MediaRow::try_from(&record).unwrap();
        assert_eq!(row.id, None);
        assert_eq!(row.media_type, "picture");
        assert_eq!(row.status, "UPLOAD_PENDING");
        assert_eq!(row.dir_path, "/srv/uploads");
    }
}
