// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Append-only BDDF writer.
//!
//! [`DataWriter`] owns a byte sink and writes, in order:
//! 1. the file magic and a `FileFormatDescriptor` block (version + annotations)
//! 2. one `SeriesDescriptor` block per series, emitted when it is added
//! 3. data blocks, in call order
//! 4. on close, the `FileIndex` block and the fixed footer
//!
//! Series declarations precede their data so a forward-only reader can
//! decode a file without the trailing index.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bddf::io::{DataWriter, SeriesIdentifier, SeriesKind, SeriesOptions};
//!
//! let writer = DataWriter::create("run.bddf", Default::default())?;
//! let series = writer.add_series(
//!     SeriesIdentifier::from_pairs("log-line", [("source", "planner")]),
//!     SeriesKind::message("text/plain", "LogLine"),
//!     SeriesOptions::default(),
//! )?;
//! writer.write_block(series, 1_700_000_000_000_000_000, b"started", &[])?;
//! writer.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! A writer dropped without [`close`](DataWriter::close) is finalized by its
//! `Drop` impl. If the process dies first the file has no footer and only
//! [`StreamDataReader`](crate::io::StreamDataReader) can recover it.

pub mod builder;

pub use builder::{WriterBuilder, WriterConfig, DEFAULT_BUFFER_CAPACITY};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::core::{BddfError, Result};

use super::block::{encode_data_prefix, encode_descriptor_block};
use super::constants::{END_MAGIC, FILE_MAGIC, FORMAT_VERSION};
use super::index::{file_index_to_proto, series_descriptor_to_proto, IndexBuilder};
use super::metadata::{
    Annotations, BlockDescriptor, FileIndex, FormatVersion, SeriesDescriptor, SeriesIdentifier,
    SeriesKind,
};
use super::proto;
use super::registry::SeriesRegistry;

/// Optional per-series settings for [`DataWriter::add_series`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesOptions {
    /// Series-level annotations
    pub annotations: Annotations,
    /// Names of the auxiliary indexes every block of the series carries
    pub additional_index_names: Vec<String>,
}

impl SeriesOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one series annotation.
    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Replace all series annotations.
    pub fn annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    /// Append an additional index name.
    pub fn additional_index(mut self, name: impl Into<String>) -> Self {
        self.additional_index_names.push(name.into());
        self
    }
}

/// Single-writer, append-only BDDF writer.
///
/// Methods take `&self`; state lives behind a mutex so several typed series
/// writers can share one file writer.
pub struct DataWriter<W: Write> {
    state: Mutex<WriterState<W>>,
}

struct WriterState<W: Write> {
    /// `None` once the sink has been handed back by `close`
    sink: Option<W>,
    /// Bytes written so far (the sink may not be seekable)
    position: u64,
    /// CRC-32 of every byte before the footer
    hasher: crc32fast::Hasher,
    annotations: Annotations,
    registry: SeriesRegistry,
    index: IndexBuilder,
    closed: bool,
    /// First sink error; the byte count no longer matches the sink after it
    failed: Option<BddfError>,
}

impl DataWriter<BufWriter<File>> {
    /// Create (or replace) a file and write the header.
    pub fn create<P: AsRef<Path>>(path: P, annotations: Annotations) -> Result<Self> {
        WriterBuilder::new()
            .path(path)
            .annotations(annotations)
            .build()
    }
}

impl<W: Write> DataWriter<W> {
    /// Start a file on `sink`, writing magic, version and annotations.
    ///
    /// A generic `Write` cannot be inspected, so the sink must be empty and
    /// positioned at its start; block offsets are counted from the first byte
    /// written here. Use [`WriterBuilder`] with `overwrite(false)` to have a
    /// file checked for that.
    pub fn new(sink: W, annotations: Annotations) -> Result<Self> {
        let mut state = WriterState {
            sink: Some(sink),
            position: 0,
            hasher: crc32fast::Hasher::new(),
            annotations,
            registry: SeriesRegistry::new(),
            index: IndexBuilder::new(),
            closed: false,
            failed: None,
        };
        state.write_header()?;
        Ok(Self {
            state: Mutex::new(state),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, WriterState<W>>> {
        self.state
            .lock()
            .map_err(|e| BddfError::poisoned("DataWriter", e))
    }

    /// Read-only access for accessors; a poisoned lock still holds valid data.
    fn peek(&self) -> MutexGuard<'_, WriterState<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a series and emit its declaration block.
    ///
    /// Fails with `DuplicateSeries` if the identifier is already registered.
    pub fn add_series(
        &self,
        identifier: SeriesIdentifier,
        kind: SeriesKind,
        options: SeriesOptions,
    ) -> Result<u32> {
        self.lock()?.add_series(identifier, kind, options)
    }

    /// Append one data block.
    ///
    /// Fails with `UnknownSeries` for an unregistered index and with
    /// `SchemaMismatch` when `additional_indexes` does not match the series'
    /// additional index names. Nothing is written when validation fails.
    pub fn write_block(
        &self,
        series_index: u32,
        timestamp_nsec: i64,
        payload: &[u8],
        additional_indexes: &[i64],
    ) -> Result<BlockDescriptor> {
        self.lock()?
            .write_block(series_index, timestamp_nsec, payload, additional_indexes)
    }

    /// Look up the index of a registered series.
    pub fn series_index(&self, identifier: &SeriesIdentifier) -> Option<u32> {
        self.peek().registry.lookup(identifier)
    }

    /// Descriptor of a registered series.
    pub fn series_descriptor(&self, series_index: u32) -> Option<SeriesDescriptor> {
        self.peek().registry.get(series_index).cloned()
    }

    /// Number of registered series.
    pub fn num_series(&self) -> usize {
        self.peek().registry.len()
    }

    /// Number of data blocks written.
    pub fn num_blocks(&self) -> usize {
        self.peek().index.num_blocks()
    }

    /// Bytes written to the sink so far.
    pub fn bytes_written(&self) -> u64 {
        self.peek().position
    }

    /// Format version being written.
    pub fn version(&self) -> FormatVersion {
        let (major, minor, patch) = FORMAT_VERSION;
        FormatVersion::new(major, minor, patch)
    }

    /// File-level annotations.
    pub fn annotations(&self) -> Annotations {
        self.peek().annotations.clone()
    }

    /// Snapshot of the index as it would be written now.
    pub fn file_index(&self) -> FileIndex {
        let state = self.peek();
        state.index.snapshot(&state.registry)
    }

    /// Write the index and footer, flush, and return the sink.
    pub fn close(mut self) -> Result<W> {
        let state = self
            .state
            .get_mut()
            .map_err(|e| BddfError::poisoned("DataWriter", e))?;
        state.finish()?;
        state.sink.take().ok_or(BddfError::Closed)
    }
}

impl<W: Write> WriterState<W> {
    /// Write bytes that count towards the checksum.
    ///
    /// A sink error may leave part of `data` behind, so it fails the writer:
    /// every later call returns the same error.
    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let sink = self.sink.as_mut().ok_or(BddfError::Closed)?;
        if let Err(e) = sink.write_all(data) {
            let err = BddfError::from(e);
            tracing::warn!(position = self.position, error = %err, "BDDF sink write failed");
            self.failed = Some(err.clone());
            return Err(err);
        }
        self.hasher.update(data);
        self.position += data.len() as u64;
        Ok(())
    }

    fn write_header(&mut self) -> Result<()> {
        self.write_bytes(&FILE_MAGIC)?;
        let (major_version, minor_version, patch_level) = FORMAT_VERSION;
        let block = encode_descriptor_block(proto::descriptor_block::Descriptor::FileDescriptor(
            proto::FileFormatDescriptor {
                version: Some(proto::FileFormatVersion {
                    major_version,
                    minor_version,
                    patch_level,
                }),
                annotations: self.annotations.clone(),
            },
        ))?;
        self.write_bytes(&block)
    }

    fn ensure_open(&self) -> Result<()> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        if self.closed {
            Err(BddfError::Closed)
        } else {
            Ok(())
        }
    }

    fn add_series(
        &mut self,
        identifier: SeriesIdentifier,
        kind: SeriesKind,
        options: SeriesOptions,
    ) -> Result<u32> {
        self.ensure_open()?;
        let descriptor = self
            .registry
            .register(
                identifier,
                kind,
                options.annotations,
                options.additional_index_names,
            )?
            .clone();
        let block = encode_descriptor_block(
            proto::descriptor_block::Descriptor::SeriesDescriptor(series_descriptor_to_proto(
                &descriptor,
            )),
        )?;
        self.write_bytes(&block)?;
        self.index.add_series(descriptor.series_index);

        tracing::debug!(
            series_index = descriptor.series_index,
            series = %descriptor.identifier,
            "registered series"
        );
        Ok(descriptor.series_index)
    }

    fn write_block(
        &mut self,
        series_index: u32,
        timestamp_nsec: i64,
        payload: &[u8],
        additional_indexes: &[i64],
    ) -> Result<BlockDescriptor> {
        self.ensure_open()?;
        let descriptor = self.registry.require(series_index)?;
        let expected = descriptor.additional_index_names.len();
        if additional_indexes.len() != expected {
            return Err(BddfError::schema_mismatch(
                series_index,
                format!(
                    "expected {expected} additional indexes {:?}, got {}",
                    descriptor.additional_index_names,
                    additional_indexes.len()
                ),
            ));
        }

        let prefix =
            encode_data_prefix(series_index, timestamp_nsec, additional_indexes, payload.len())?;
        let record_start = self.position;
        self.write_bytes(&prefix)?;
        self.write_bytes(payload)?;

        let block = BlockDescriptor {
            series_index,
            timestamp_nsec,
            additional_indexes: additional_indexes.to_vec(),
            offset: record_start + prefix.len() as u64,
            length: payload.len() as u64,
        };
        self.index.push(block.clone())?;
        Ok(block)
    }

    /// Write the file index block and the footer, then flush.
    ///
    /// Runs at most once; a failed attempt is not retried on drop.
    fn finish(&mut self) -> Result<()> {
        let open = self.ensure_open();
        self.closed = true;
        open?;
        let index_offset = self.position;
        let index = self.index.snapshot(&self.registry);
        let block = encode_descriptor_block(proto::descriptor_block::Descriptor::FileIndex(
            file_index_to_proto(&index),
        ))?;
        self.write_bytes(&block)?;

        let checksum = self.hasher.clone().finalize();
        let sink = self.sink.as_mut().ok_or(BddfError::Closed)?;
        sink.write_u64::<LittleEndian>(index_offset)?;
        sink.write_u32::<LittleEndian>(checksum)?;
        sink.write_all(&END_MAGIC)?;
        sink.flush()?;

        tracing::debug!(
            series = index.num_series(),
            blocks = index.num_blocks(),
            index_offset,
            checksum = format_args!("{checksum:08x}"),
            "BDDF file closed"
        );
        Ok(())
    }
}

impl<W: Write> Drop for DataWriter<W> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.closed || state.sink.is_none() {
            return;
        }
        match state.finish() {
            Ok(()) => tracing::debug!("DataWriter finalized on drop"),
            Err(e) => tracing::warn!(error = %e, "DataWriter dropped without close and could not be finalized"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PodType;
    use crate::io::constants::FOOTER_LEN;
    use std::io::Cursor;

    fn new_writer() -> DataWriter<Cursor<Vec<u8>>> {
        DataWriter::new(Cursor::new(Vec::new()), Annotations::new()).unwrap()
    }

    fn ident(name: &str) -> SeriesIdentifier {
        SeriesIdentifier::from_pairs("test", [("name", name)])
    }

    #[test]
    fn test_header_starts_with_magic() {
        let writer = new_writer();
        assert!(writer.bytes_written() > FILE_MAGIC.len() as u64);
        let bytes = writer.close().unwrap().into_inner();
        assert_eq!(&bytes[..8], &FILE_MAGIC);
        assert_eq!(&bytes[bytes.len() - 8..], &END_MAGIC);
    }

    #[test]
    fn test_block_offsets_point_at_payload() {
        let writer = new_writer();
        let series = writer
            .add_series(ident("a"), SeriesKind::message("text/plain", "t"), SeriesOptions::new())
            .unwrap();
        let block = writer.write_block(series, 5, b"payload", &[]).unwrap();
        let bytes = writer.close().unwrap().into_inner();
        let start = block.offset as usize;
        assert_eq!(&bytes[start..start + block.length as usize], b"payload");
    }

    #[test]
    fn test_wrong_index_arity_writes_nothing() {
        let writer = new_writer();
        let series = writer
            .add_series(
                ident("a"),
                SeriesKind::pod(PodType::Int32),
                SeriesOptions::new().additional_index("seq"),
            )
            .unwrap();
        let before = writer.bytes_written();
        let err = writer.write_block(series, 0, &[0; 4], &[]).unwrap_err();
        assert!(matches!(err, BddfError::SchemaMismatch { .. }));
        assert_eq!(writer.bytes_written(), before);
        assert_eq!(writer.num_blocks(), 0);
    }

    #[test]
    fn test_unknown_series_index() {
        let writer = new_writer();
        assert!(matches!(
            writer.write_block(7, 0, b"", &[]),
            Err(BddfError::UnknownSeries { .. })
        ));
    }

    #[test]
    fn test_duplicate_series() {
        let writer = new_writer();
        writer
            .add_series(ident("a"), SeriesKind::pod(PodType::Int8), SeriesOptions::new())
            .unwrap();
        let err = writer
            .add_series(ident("a"), SeriesKind::pod(PodType::Int8), SeriesOptions::new())
            .unwrap_err();
        assert!(matches!(err, BddfError::DuplicateSeries { .. }));
        assert_eq!(writer.num_series(), 1);
        assert_eq!(writer.series_index(&ident("a")), Some(0));
    }

    #[test]
    fn test_footer_records_index_offset() {
        let writer = new_writer();
        let index_offset = writer.bytes_written();
        let bytes = writer.close().unwrap().into_inner();
        let footer_start = bytes.len() - FOOTER_LEN as usize;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[footer_start..footer_start + 8]);
        assert_eq!(u64::from_le_bytes(raw), index_offset);
    }

    #[test]
    fn test_checksum_covers_bytes_before_footer() {
        let writer = new_writer();
        let series = writer
            .add_series(ident("a"), SeriesKind::pod(PodType::Uint8), SeriesOptions::new())
            .unwrap();
        writer.write_block(series, 1, &[1, 2, 3], &[]).unwrap();
        let bytes = writer.close().unwrap().into_inner();
        let footer_start = bytes.len() - FOOTER_LEN as usize;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[footer_start + 8..footer_start + 12]);
        assert_eq!(
            u32::from_le_bytes(raw),
            crc32fast::hash(&bytes[..footer_start])
        );
    }

    /// Sink that accepts `budget` bytes and then reports a full disk.
    struct LimitedSink {
        data: Vec<u8>,
        budget: usize,
    }

    impl Write for LimitedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let room = self.budget.saturating_sub(self.data.len());
            if room == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            let n = room.min(buf.len());
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_error_fails_writer() {
        let sink = LimitedSink {
            data: Vec::new(),
            budget: usize::MAX,
        };
        let writer = DataWriter::new(sink, Annotations::new()).unwrap();
        let series = writer
            .add_series(ident("a"), SeriesKind::pod(PodType::Uint8), SeriesOptions::new())
            .unwrap();
        writer.write_block(series, 1, &[1; 16], &[]).unwrap();

        // Leave room for part of the next record only
        {
            let mut state = writer.state.lock().unwrap();
            let sink = state.sink.as_mut().unwrap();
            sink.budget = sink.data.len() + 10;
        }
        assert!(matches!(
            writer.write_block(series, 2, &[2; 16], &[]),
            Err(BddfError::Io(_))
        ));

        // More room does not revive the writer
        writer.state.lock().unwrap().sink.as_mut().unwrap().budget = usize::MAX;
        assert!(matches!(
            writer.write_block(series, 3, &[3; 16], &[]),
            Err(BddfError::Io(_))
        ));
        assert!(matches!(
            writer.add_series(ident("b"), SeriesKind::pod(PodType::Uint8), SeriesOptions::new()),
            Err(BddfError::Io(_))
        ));
        assert_eq!(writer.num_blocks(), 1);
        assert!(matches!(writer.close(), Err(BddfError::Io(_))));
    }

    #[test]
    fn test_series_options_builder() {
        let options = SeriesOptions::new()
            .annotation("unit", "m")
            .additional_index("seq")
            .additional_index("frame");
        assert_eq!(options.additional_index_names, vec!["seq", "frame"]);
        assert_eq!(options.annotations.get("unit").map(String::as_str), Some("m"));
    }
}
