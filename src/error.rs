//! Typed errors raised by the JSON source.
//!
//! Structural I/O failures travel as [`anyhow::Error`] with path context, the
//! same way the rest of the I/O layer reports them. The conditions below are
//! the ones a caller may want to match on; they are wrapped into
//! `anyhow::Error` at public boundaries and can be recovered with
//! [`anyhow::Error::downcast_ref`].

use std::path::PathBuf;
use thiserror::Error;

/// Maximum number of characters of a bad record quoted in error messages.
const RECORD_PREVIEW_CHARS: usize = 256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JsonSourceError {
    /// A record failed to parse while the parse mode was `FAILFAST`.
    #[error("malformed record in FAILFAST mode ({reason}): {record}")]
    MalformedRecord { record: String, reason: String },

    /// A whole-file source was asked to read only part of a file.
    #[error(
        "cannot read {path} from byte {start} for {length} bytes: multi-line JSON files are not splittable"
    )]
    UnsplittablePartition {
        path: PathBuf,
        start: u64,
        length: u64,
    },

    /// An option value could not be interpreted.
    #[error("invalid value for option `{key}`: {message}")]
    InvalidOption { key: String, message: String },

    /// The corrupt-record column of a user-supplied schema is unusable.
    #[error("the field for corrupt records `{column}` must be a nullable string")]
    InvalidCorruptColumn { column: String },

    /// An explicitly named input path does not exist.
    #[error("input path does not exist: {0}")]
    InputNotFound(PathBuf),
}

impl JsonSourceError {
    /// Build a [`JsonSourceError::MalformedRecord`], truncating long record text.
    pub fn malformed(record: &str, reason: impl Into<String>) -> Self {
        let record = if record.chars().count() > RECORD_PREVIEW_CHARS {
            let head: String = record.chars().take(RECORD_PREVIEW_CHARS).collect();
            format!("{head}...")
        } else {
            record.to_string()
        };
        Self::MalformedRecord {
            record,
            reason: reason.into(),
        }
    }

    pub fn invalid_option(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            key: key.to_string(),
            message: message.into(),
        }
    }
}
