// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Readers for BDDF files.
//!
//! Two reading modes are provided:
//! - [`DataReader`]: random access over a complete, seekable file. Opening
//!   reads the header, then the footer, then parses the trailing file index;
//!   every block is afterwards one seek and one read away.
//! - [`StreamDataReader`]: forward-only decode that rebuilds the index while
//!   scanning, for pipes and files that were never closed.
//!
//! # Example
//!
//! ```rust,no_run
//! use bddf::io::DataReader;
//!
//! let reader = DataReader::open("run.bddf")?;
//! for series in &reader.file_index().series {
//!     let blocks = reader.num_data_blocks(series.series_index)?;
//!     println!("{} -> {blocks} blocks", series.identifier);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod header;
pub mod stream;

pub use header::{FileHeader, Footer, SUPPORTED_MAJOR_VERSION};
pub use stream::{StreamBlock, StreamDataReader};

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use memmap2::Mmap;

use crate::core::{BddfError, Result};

use super::block::{read_descriptor_body, read_exact_vec, BlockHeader, BlockType};
use super::constants::{BLOCK_HEADER_LEN, FOOTER_LEN};
use super::index::file_index_from_proto;
use super::metadata::{
    Annotations, BlockDescriptor, FileIndex, FormatVersion, SeriesBlockIndex, SeriesDescriptor,
    SeriesIdentifier,
};
use super::proto::descriptor_block::Descriptor;
use super::registry::SeriesRegistry;

/// Chunk size used when hashing a file for checksum verification.
const CHECKSUM_CHUNK: usize = 64 * 1024;

/// One data block read back from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    pub descriptor: BlockDescriptor,
    pub payload: Vec<u8>,
}

impl DataBlock {
    pub fn timestamp_nsec(&self) -> i64 {
        self.descriptor.timestamp_nsec
    }
}

/// Random-access reader over a complete BDDF file.
///
/// The source sits behind a mutex so reads take `&self` and several typed
/// series readers can borrow one reader.
pub struct DataReader<R: Read + Seek> {
    source: Mutex<R>,
    header: FileHeader,
    footer: Footer,
    /// Offset of the first footer byte; the checksum covers everything before it
    footer_start: u64,
    index: FileIndex,
    registry: SeriesRegistry,
}

impl DataReader<BufReader<File>> {
    /// Open a file through a buffered file handle.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        tracing::debug!(path = %path.display(), "opening BDDF file");
        Self::new(BufReader::new(file))
    }
}

impl DataReader<Cursor<Mmap>> {
    /// Open a file through a read-only memory map.
    pub fn open_mmap<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: the map is read-only and owned by the reader; the file must
        // not be truncated by another process while it is open.
        let mmap = unsafe { Mmap::map(&file) }?;
        tracing::debug!(path = %path.display(), len = mmap.len(), "mapped BDDF file");
        Self::new(Cursor::new(mmap))
    }
}

impl<R: Read + Seek> DataReader<R> {
    /// Parse the header, footer and file index of `source`.
    ///
    /// Fails with `MalformedFile` on bad magic, an unsupported version or an
    /// inconsistent index, and with `TruncatedFile` when no footer is found.
    pub fn new(mut source: R) -> Result<Self> {
        source.seek(SeekFrom::Start(0))?;
        let header = FileHeader::read(&mut source)?;

        let file_len = source.seek(SeekFrom::End(0))?;
        if file_len < header.len + FOOTER_LEN {
            return Err(BddfError::truncated(format!(
                "{file_len}-byte file has no room for a footer"
            )));
        }
        let footer_start = file_len - FOOTER_LEN;
        source.seek(SeekFrom::Start(footer_start))?;
        let footer = Footer::decode(&read_exact_vec(&mut source, FOOTER_LEN, "footer")?)?;

        let index_offset = footer.index_offset;
        if index_offset < header.len || index_offset >= footer_start {
            return Err(BddfError::malformed(format!(
                "file index offset {index_offset} lies outside the record area"
            )));
        }
        source.seek(SeekFrom::Start(index_offset))?;
        let block = BlockHeader::read(&mut source)?
            .ok_or_else(|| BddfError::truncated("file index block missing"))?;
        if block.block_type != BlockType::Descriptor
            || index_offset + BLOCK_HEADER_LEN + block.body_len != footer_start
        {
            return Err(BddfError::malformed(format!(
                "no file index block at offset {index_offset}"
            )));
        }
        let raw_index = match read_descriptor_body(&mut source, block.body_len)? {
            Some(Descriptor::FileIndex(index)) => index,
            _ => {
                return Err(BddfError::malformed(format!(
                    "block at offset {index_offset} is not a file index"
                )))
            }
        };
        let index = file_index_from_proto(raw_index)?;
        check_block_bounds(&index, header.len, index_offset)?;
        let registry = SeriesRegistry::from_descriptors(&index.series)?;

        tracing::debug!(
            version = %header.version,
            series = index.num_series(),
            blocks = index.num_blocks(),
            "opened BDDF file"
        );

        Ok(Self {
            source: Mutex::new(source),
            header,
            footer,
            footer_start,
            index,
            registry,
        })
    }

    /// Format version recorded in the file.
    pub fn version(&self) -> FormatVersion {
        self.header.version
    }

    /// File-level annotations.
    pub fn annotations(&self) -> &Annotations {
        &self.header.annotations
    }

    /// The parsed file index.
    pub fn file_index(&self) -> &FileIndex {
        &self.index
    }

    /// All series descriptors in index order.
    pub fn series_descriptors(&self) -> &[SeriesDescriptor] {
        &self.index.series
    }

    pub fn num_series(&self) -> usize {
        self.index.num_series()
    }

    /// Descriptor of series `series_index`.
    pub fn series_descriptor(&self, series_index: u32) -> Result<&SeriesDescriptor> {
        self.registry.require(series_index)
    }

    /// Look up a series by identifier, if present.
    pub fn series_index(&self, identifier: &SeriesIdentifier) -> Option<u32> {
        self.registry.lookup(identifier)
    }

    /// Look up a series by type and spec, failing with `UnknownSeries`.
    pub fn series_spec_to_index(
        &self,
        series_type: &str,
        spec: &BTreeMap<String, String>,
    ) -> Result<u32> {
        let identifier = SeriesIdentifier::new(series_type, spec.clone());
        self.series_index(&identifier)
            .ok_or_else(|| BddfError::unknown_series(identifier.to_string()))
    }

    /// Block index of series `series_index`.
    pub fn series_block_index(&self, series_index: u32) -> Result<&SeriesBlockIndex> {
        self.index
            .block_indexes
            .get(series_index as usize)
            .ok_or_else(|| BddfError::unknown_series(format!("series index {series_index}")))
    }

    /// Number of data blocks in series `series_index`.
    pub fn num_data_blocks(&self, series_index: u32) -> Result<usize> {
        self.series_block_index(series_index).map(SeriesBlockIndex::len)
    }

    /// Total payload bytes of series `series_index`.
    pub fn total_bytes(&self, series_index: u32) -> Result<u64> {
        self.series_block_index(series_index)
            .map(SeriesBlockIndex::total_bytes)
    }

    /// Descriptor of one block without reading its payload.
    pub fn block_descriptor(
        &self,
        series_index: u32,
        block_index: usize,
    ) -> Result<&BlockDescriptor> {
        let blocks = self.series_block_index(series_index)?;
        blocks
            .get(block_index)
            .ok_or_else(|| BddfError::index_out_of_range(series_index, block_index, blocks.len()))
    }

    /// Read block `block_index` of series `series_index`.
    pub fn read(&self, series_index: u32, block_index: usize) -> Result<DataBlock> {
        let descriptor = self.block_descriptor(series_index, block_index)?.clone();
        let mut source = self
            .source
            .lock()
            .map_err(|e| BddfError::poisoned("DataReader", e))?;
        source.seek(SeekFrom::Start(descriptor.offset))?;
        let payload = read_exact_vec(&mut *source, descriptor.length, "data payload")?;
        Ok(DataBlock {
            descriptor,
            payload,
        })
    }

    /// Recompute the CRC-32 over the records and compare it with the footer.
    pub fn verify_checksum(&self) -> Result<()> {
        let mut source = self
            .source
            .lock()
            .map_err(|e| BddfError::poisoned("DataReader", e))?;
        source.seek(SeekFrom::Start(0))?;

        let mut hasher = crc32fast::Hasher::new();
        let mut remaining = self.footer_start;
        let mut buf = vec![0u8; CHECKSUM_CHUNK];
        while remaining > 0 {
            let want = remaining.min(CHECKSUM_CHUNK as u64) as usize;
            source.read_exact(&mut buf[..want])?;
            hasher.update(&buf[..want]);
            remaining -= want as u64;
        }

        let actual = hasher.finalize();
        if actual != self.footer.checksum {
            return Err(BddfError::malformed(format!(
                "checksum mismatch: footer records {:08x}, contents hash to {actual:08x}",
                self.footer.checksum
            )));
        }
        Ok(())
    }

    /// Give back the underlying source.
    pub fn into_inner(self) -> R {
        self.source
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Every payload must lie between the header and the file index.
fn check_block_bounds(index: &FileIndex, records_start: u64, records_end: u64) -> Result<()> {
    for block in index.block_indexes.iter().flat_map(|s| s.blocks.iter()) {
        let end = block.offset.checked_add(block.length);
        if block.offset < records_start || end.map_or(true, |end| end > records_end) {
            return Err(BddfError::malformed(format!(
                "block of series {} at offset {} (+{}) lies outside the record area",
                block.series_index, block.offset, block.length
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::metadata::SeriesKind;
    use crate::io::writer::{DataWriter, SeriesOptions};

    fn sample_file() -> Vec<u8> {
        let writer = DataWriter::new(
            Cursor::new(Vec::new()),
            [("robot".to_string(), "spot".to_string())].into(),
        )
        .unwrap();
        let series = writer
            .add_series(
                SeriesIdentifier::from_pairs("log", [("channel", "main")]),
                SeriesKind::message("text/plain", "LogLine"),
                SeriesOptions::new(),
            )
            .unwrap();
        writer.write_block(series, 10, b"first", &[]).unwrap();
        writer.write_block(series, 20, b"second", &[]).unwrap();
        writer.close().unwrap().into_inner()
    }

    #[test]
    fn test_open_and_read() {
        let reader = DataReader::new(Cursor::new(sample_file())).unwrap();
        assert_eq!(reader.version(), FormatVersion::new(1, 0, 0));
        assert_eq!(reader.num_data_blocks(0).unwrap(), 2);
        assert_eq!(reader.total_bytes(0).unwrap(), 11);

        let block = reader.read(0, 1).unwrap();
        assert_eq!(block.timestamp_nsec(), 20);
        assert_eq!(block.payload, b"second");
    }

    #[test]
    fn test_block_index_out_of_range() {
        let reader = DataReader::new(Cursor::new(sample_file())).unwrap();
        let err = reader.read(0, 2).unwrap_err();
        assert!(matches!(
            err,
            BddfError::IndexOutOfRange {
                series_index: 0,
                block_index: 2,
                len: 2
            }
        ));
    }

    #[test]
    fn test_unknown_series_index() {
        let reader = DataReader::new(Cursor::new(sample_file())).unwrap();
        assert!(matches!(
            reader.num_data_blocks(5),
            Err(BddfError::UnknownSeries { .. })
        ));
        assert!(matches!(
            reader.series_spec_to_index("log", &BTreeMap::new()),
            Err(BddfError::UnknownSeries { .. })
        ));
    }

    #[test]
    fn test_missing_footer_is_truncated() {
        let mut bytes = sample_file();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            DataReader::new(Cursor::new(bytes)),
            Err(BddfError::TruncatedFile { .. })
        ));
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let bytes = sample_file();
        let reader = DataReader::new(Cursor::new(bytes.clone())).unwrap();
        reader.verify_checksum().unwrap();

        let offset = reader.block_descriptor(0, 0).unwrap().offset as usize;
        let mut corrupted = bytes;
        corrupted[offset] ^= 0xFF;
        let reader = DataReader::new(Cursor::new(corrupted)).unwrap();
        assert!(matches!(
            reader.verify_checksum(),
            Err(BddfError::MalformedFile { .. })
        ));
    }

    #[test]
    fn test_into_inner_returns_source() {
        let bytes = sample_file();
        let reader = DataReader::new(Cursor::new(bytes.clone())).unwrap();
        assert_eq!(reader.into_inner().into_inner(), bytes);
    }
}
