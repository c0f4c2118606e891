// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Data model shared by the writer and both readers.
//!
//! A file holds an ordered list of series. Each series is identified by a
//! [`SeriesIdentifier`], described by a [`SeriesDescriptor`] and indexed by a
//! [`SeriesBlockIndex`] of [`BlockDescriptor`]s. The complete snapshot is the
//! [`FileIndex`].

use std::collections::BTreeMap;
use std::fmt;

use prost_types::Timestamp;

use crate::core::{nsec_to_timestamp, PodType};

/// Flat string-to-string annotation map.
pub type Annotations = BTreeMap<String, String>;

/// Three-part format version of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion {
    /// Incompatible layout changes; readers reject other majors.
    pub major: u32,
    /// Backwards-compatible additions.
    pub minor: u32,
    /// Fixes that do not change the layout.
    pub patch: u32,
}

impl FormatVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Identity of a series: schema family plus the spec disambiguating instances.
///
/// The spec is kept sorted so the identifier can be hashed and compared
/// directly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesIdentifier {
    /// Schema family (e.g., a sensor kind)
    pub series_type: String,
    /// Instance key within the family (e.g., which channel)
    pub spec: BTreeMap<String, String>,
}

impl SeriesIdentifier {
    /// Create a new identifier.
    pub fn new(series_type: impl Into<String>, spec: BTreeMap<String, String>) -> Self {
        Self {
            series_type: series_type.into(),
            spec,
        }
    }

    /// Create an identifier from key/value pairs.
    pub fn from_pairs<K, V, I>(series_type: impl Into<String>, spec: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::new(
            series_type,
            spec.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Render the spec as `{k=v, ...}` for logs and errors.
    pub fn spec_string(&self) -> String {
        let pairs: Vec<String> = self.spec.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{{{}}}", pairs.join(", "))
    }
}

impl fmt::Display for SeriesIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' {}", self.series_type, self.spec_string())
    }
}

/// Opaque byte-blob series schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKind {
    /// MIME-style content type (e.g., "application/protobuf")
    pub content_type: String,
    /// Message type name (e.g., a protobuf full name)
    pub type_name: String,
}

/// Fixed-width scalar/array series schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PodKind {
    /// Scalar element type
    pub pod_type: PodType,
    /// Shape of one sample; empty means a scalar sample
    pub dimensions: Vec<u32>,
}

impl PodKind {
    /// Scalar pod kind.
    pub fn scalar(pod_type: PodType) -> Self {
        Self {
            pod_type,
            dimensions: Vec::new(),
        }
    }

    /// Number of scalars in one sample.
    pub fn sample_len(&self) -> usize {
        self.dimensions.iter().map(|&d| d as usize).product()
    }
}

/// Schema of a series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    Message(MessageKind),
    Pod(PodKind),
}

impl SeriesKind {
    /// Message kind from content type and type name.
    pub fn message(content_type: impl Into<String>, type_name: impl Into<String>) -> Self {
        SeriesKind::Message(MessageKind {
            content_type: content_type.into(),
            type_name: type_name.into(),
        })
    }

    /// Scalar pod kind.
    pub fn pod(pod_type: PodType) -> Self {
        SeriesKind::Pod(PodKind::scalar(pod_type))
    }

    /// Message encoding of a message series, `None` for pod series.
    pub fn as_message(&self) -> Option<&MessageKind> {
        match self {
            SeriesKind::Message(kind) => Some(kind),
            SeriesKind::Pod(_) => None,
        }
    }

    /// Pod layout of a pod series, `None` for message series.
    pub fn as_pod(&self) -> Option<&PodKind> {
        match self {
            SeriesKind::Pod(kind) => Some(kind),
            SeriesKind::Message(_) => None,
        }
    }
}

/// Everything known about one series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesDescriptor {
    /// 0-based position in the file's series list
    pub series_index: u32,
    /// Series identity
    pub identifier: SeriesIdentifier,
    /// Series schema
    pub kind: SeriesKind,
    /// Series-level annotations
    pub annotations: Annotations,
    /// Names of the auxiliary sort keys attached to every block
    pub additional_index_names: Vec<String>,
}

/// Location and keys of one data block.
///
/// `offset` and `length` address the payload bytes within the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockDescriptor {
    /// Series the block belongs to
    pub series_index: u32,
    /// Nanoseconds since the Unix epoch
    pub timestamp_nsec: i64,
    /// One value per additional index name of the series
    pub additional_indexes: Vec<i64>,
    /// Absolute file offset of the payload
    pub offset: u64,
    /// Payload length in bytes
    pub length: u64,
}

impl BlockDescriptor {
    /// Timestamp as seconds + nanoseconds.
    pub fn timestamp(&self) -> Timestamp {
        nsec_to_timestamp(self.timestamp_nsec)
    }
}

/// Ordered block descriptors of one series.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeriesBlockIndex {
    pub series_index: u32,
    pub blocks: Vec<BlockDescriptor>,
}

impl SeriesBlockIndex {
    pub fn new(series_index: u32) -> Self {
        Self {
            series_index,
            blocks: Vec::new(),
        }
    }

    /// Number of data blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Sum of payload lengths.
    pub fn total_bytes(&self) -> u64 {
        self.blocks.iter().map(|b| b.length).sum()
    }

    pub fn get(&self, block_index: usize) -> Option<&BlockDescriptor> {
        self.blocks.get(block_index)
    }
}

/// Complete snapshot of all series and their blocks.
///
/// `series[i]` and `block_indexes[i]` both describe series `i`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileIndex {
    pub series: Vec<SeriesDescriptor>,
    pub block_indexes: Vec<SeriesBlockIndex>,
}

impl FileIndex {
    pub fn num_series(&self) -> usize {
        self.series.len()
    }

    /// Total number of data blocks across all series.
    pub fn num_blocks(&self) -> usize {
        self.block_indexes.iter().map(SeriesBlockIndex::len).sum()
    }

    pub fn series_identifiers(&self) -> impl Iterator<Item = &SeriesIdentifier> {
        self.series.iter().map(|s| &s.identifier)
    }
}
