// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for bddf.
//!
//! Every failure raised by the writer, the readers and the typed series
//! adapters is a [`BddfError`]. Errors are raised synchronously at the point
//! of violation; nothing inside the format retries or recovers silently.

use std::fmt;
use std::sync::Arc;

/// Errors that can occur while writing or reading a BDDF file.
#[derive(Debug, Clone)]
pub enum BddfError {
    /// Bad magic bytes, unsupported version or inconsistent descriptors
    MalformedFile {
        /// What was wrong
        reason: String,
    },

    /// The footer or a block is missing or cut short
    TruncatedFile {
        /// What was missing
        reason: String,
    },

    /// A series with the same type and spec is already registered
    DuplicateSeries {
        /// Series type of the colliding series
        series_type: String,
        /// Rendered spec of the colliding series
        spec: String,
    },

    /// No series matches the requested identity
    UnknownSeries {
        /// Description of the lookup that failed
        series: String,
    },

    /// A write or typed read disagrees with the series schema
    SchemaMismatch {
        /// Index of the series involved
        series_index: u32,
        /// Mismatch details
        reason: String,
    },

    /// Block index past the end of a series
    IndexOutOfRange {
        /// Index of the series involved
        series_index: u32,
        /// Requested block index
        block_index: usize,
        /// Number of blocks in the series
        len: usize,
    },

    /// The stream reader has consumed the final index record
    EndOfStream,

    /// The writer was already closed
    Closed,

    /// Payload encode/decode failure in a typed adapter
    DecodeError {
        /// Codec context (e.g., "protobuf", "pod")
        codec: String,
        /// Error message
        message: String,
    },

    /// Pass-through error from the underlying sink or source
    Io(Arc<std::io::Error>),

    /// Other error
    Other(String),
}

impl BddfError {
    /// Create a malformed file error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        BddfError::MalformedFile {
            reason: reason.into(),
        }
    }

    /// Create a truncated file error.
    pub fn truncated(reason: impl Into<String>) -> Self {
        BddfError::TruncatedFile {
            reason: reason.into(),
        }
    }

    /// Create an unknown series error.
    pub fn unknown_series(series: impl Into<String>) -> Self {
        BddfError::UnknownSeries {
            series: series.into(),
        }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(series_index: u32, reason: impl Into<String>) -> Self {
        BddfError::SchemaMismatch {
            series_index,
            reason: reason.into(),
        }
    }

    /// Create an index out of range error.
    pub fn index_out_of_range(series_index: u32, block_index: usize, len: usize) -> Self {
        BddfError::IndexOutOfRange {
            series_index,
            block_index,
            len,
        }
    }

    /// Create a decode error.
    pub fn decode(codec: impl Into<String>, message: impl Into<String>) -> Self {
        BddfError::DecodeError {
            codec: codec.into(),
            message: message.into(),
        }
    }

    /// Create a lock poisoned error.
    pub(crate) fn poisoned(what: &str, err: impl fmt::Display) -> Self {
        BddfError::Other(format!("{what} lock poisoned: {err}"))
    }

    /// True for [`BddfError::EndOfStream`].
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, BddfError::EndOfStream)
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            BddfError::MalformedFile { reason } | BddfError::TruncatedFile { reason } => {
                vec![("reason", reason.clone())]
            }
            BddfError::DuplicateSeries { series_type, spec } => {
                vec![("series_type", series_type.clone()), ("spec", spec.clone())]
            }
            BddfError::UnknownSeries { series } => vec![("series", series.clone())],
            BddfError::SchemaMismatch {
                series_index,
                reason,
            } => vec![
                ("series_index", series_index.to_string()),
                ("reason", reason.clone()),
            ],
            BddfError::IndexOutOfRange {
                series_index,
                block_index,
                len,
            } => vec![
                ("series_index", series_index.to_string()),
                ("block_index", block_index.to_string()),
                ("len", len.to_string()),
            ],
            BddfError::EndOfStream | BddfError::Closed => Vec::new(),
            BddfError::DecodeError { codec, message } => {
                vec![("codec", codec.clone()), ("message", message.clone())]
            }
            BddfError::Io(err) => vec![
                ("kind", format!("{:?}", err.kind())),
                ("message", err.to_string()),
            ],
            BddfError::Other(msg) => vec![("message", msg.clone())],
        }
    }
}

impl fmt::Display for BddfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BddfError::MalformedFile { reason } => write!(f, "Malformed BDDF file: {reason}"),
            BddfError::TruncatedFile { reason } => write!(f, "Truncated BDDF file: {reason}"),
            BddfError::DuplicateSeries { series_type, spec } => {
                write!(f, "Series already registered: '{series_type}' {spec}")
            }
            BddfError::UnknownSeries { series } => write!(f, "Unknown series: {series}"),
            BddfError::SchemaMismatch {
                series_index,
                reason,
            } => write!(f, "Schema mismatch on series {series_index}: {reason}"),
            BddfError::IndexOutOfRange {
                series_index,
                block_index,
                len,
            } => write!(
                f,
                "Block index {block_index} out of range for series {series_index} ({len} blocks)"
            ),
            BddfError::EndOfStream => write!(f, "End of stream"),
            BddfError::Closed => write!(f, "Writer already closed"),
            BddfError::DecodeError { codec, message } => {
                write!(f, "{codec} decode error: {message}")
            }
            BddfError::Io(err) => write!(f, "I/O error: {err}"),
            BddfError::Other(msg) => write!(f, "Other error: {msg}"),
        }
    }
}

impl std::error::Error for BddfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BddfError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BddfError {
    fn from(err: std::io::Error) -> Self {
        BddfError::Io(Arc::new(err))
    }
}

impl From<prost::DecodeError> for BddfError {
    fn from(err: prost::DecodeError) -> Self {
        BddfError::malformed(format!("invalid descriptor: {err}"))
    }
}

/// Result type for bddf operations.
pub type Result<T> = std::result::Result<T, BddfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_error() {
        let err = BddfError::malformed("bad magic");
        assert!(matches!(err, BddfError::MalformedFile { .. }));
        assert_eq!(err.to_string(), "Malformed BDDF file: bad magic");
    }

    #[test]
    fn test_truncated_error() {
        let err = BddfError::truncated("no footer");
        assert_eq!(err.to_string(), "Truncated BDDF file: no footer");
    }

    #[test]
    fn test_schema_mismatch_error() {
        let err = BddfError::schema_mismatch(3, "expected 2 additional indexes, got 1");
        assert_eq!(
            err.to_string(),
            "Schema mismatch on series 3: expected 2 additional indexes, got 1"
        );
    }

    #[test]
    fn test_index_out_of_range_error() {
        let err = BddfError::index_out_of_range(1, 5, 5);
        assert_eq!(
            err.to_string(),
            "Block index 5 out of range for series 1 (5 blocks)"
        );
    }

    #[test]
    fn test_end_of_stream() {
        assert!(BddfError::EndOfStream.is_end_of_stream());
        assert!(!BddfError::Closed.is_end_of_stream());
    }

    #[test]
    fn test_log_fields_index_out_of_range() {
        let fields = BddfError::index_out_of_range(2, 10, 4).log_fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], ("series_index", "2".to_string()));
        assert_eq!(fields[1], ("block_index", "10".to_string()));
        assert_eq!(fields[2], ("len", "4".to_string()));
    }

    #[test]
    fn test_log_fields_duplicate_series() {
        let err = BddfError::DuplicateSeries {
            series_type: "camera".to_string(),
            spec: "{channel=left}".to_string(),
        };
        let fields = err.log_fields();
        assert_eq!(fields[0].1, "camera");
        assert_eq!(fields[1].1, "{channel=left}");
    }

    #[test]
    fn test_from_io_error_keeps_kind() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: BddfError = io_err.into();
        match &err {
            BddfError::Io(inner) => assert_eq!(inner.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "I/O error: short read");
    }

    #[test]
    fn test_error_clone() {
        let err1 = BddfError::unknown_series("camera {}");
        let err2 = err1.clone();
        assert_eq!(err1.to_string(), err2.to_string());
    }
}
