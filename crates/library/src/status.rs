use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Phase of a library scan.
///
/// The serialized names are part of the client protocol and must not change.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanState {
    #[display("SCANNING_FOR_FILES")]
    ScanningForFiles,
    #[display("PROCESSING_FILES")]
    ProcessingFiles,
    #[display("DONE")]
    Done,
}

/// Progress report of the current (or last) scan.
///
/// Counters only ever grow within one scan. Each published snapshot is a
/// whole new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryScanStatus {
    pub state: ScanState,
    /// Every media file seen by the walk: new, moved or unchanged.
    pub media_files_detected: u64,
    pub files_moved: u64,
    pub files_removed: u64,
    pub new_files: u64,
    pub files_to_process: u64,
    pub files_processed: u64,
}

impl LibraryScanStatus {
    pub(crate) fn started() -> Self {
        Self {
            state: ScanState::ScanningForFiles,
            media_files_detected: 0,
            files_moved: 0,
            files_removed: 0,
            new_files: 0,
            files_to_process: 0,
            files_processed: 0,
        }
    }

    pub(crate) fn with_state(self, state: ScanState) -> Self {
        Self { state, ..self }
    }

    pub fn is_done(&self) -> bool {
        self.state == ScanState::Done
    }
}
