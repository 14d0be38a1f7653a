//! Error taxonomy for the debug-record pipeline.
//!
//! Every variant carries enough context (file path, 1-based line number, or
//! record index) to locate the offending input. None of these are retried.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DebugRecordError {
    #[error("failed to read debug log {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON on line {line} of {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("first record of {} has no usable image_file entry", path.display())]
    MissingImageReference { path: PathBuf },

    #[error("reference image {} could not be read: {source}", path.display())]
    ImageNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reference image {} is not a decodable raster image: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error(
        "record {record} (line {line}) has {bboxes} boxes but only {labels} labels and {confs} confidences"
    )]
    IndexMismatch {
        record: usize,
        line: usize,
        bboxes: usize,
        labels: usize,
        confs: usize,
    },

    #[error("record {record} (line {line}) has an invalid `{field}` field: {reason}")]
    Schema {
        record: usize,
        line: usize,
        field: &'static str,
        reason: String,
    },
}

impl DebugRecordError {
    /// Index of the record that caused the failure, for per-record errors.
    pub fn record_index(&self) -> Option<usize> {
        match self {
            DebugRecordError::IndexMismatch { record, .. }
            | DebugRecordError::Schema { record, .. } => Some(*record),
            _ => None,
        }
    }

    /// Whether the error concerns a single record rather than the whole log.
    pub fn is_per_record(&self) -> bool {
        self.record_index().is_some()
    }
}

pub type Result<T> = std::result::Result<T, DebugRecordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_mismatch_message_names_record() {
        let err = DebugRecordError::IndexMismatch {
            record: 3,
            line: 4,
            bboxes: 2,
            labels: 1,
            confs: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("record 3"));
        assert!(msg.contains("line 4"));
        assert_eq!(err.record_index(), Some(3));
        assert!(err.is_per_record());
    }

    #[test]
    fn test_whole_log_errors_have_no_record_index() {
        let err = DebugRecordError::MissingImageReference {
            path: PathBuf::from("/tmp/log.json"),
        };
        assert_eq!(err.record_index(), None);
        assert!(!err.is_per_record());
    }
}
