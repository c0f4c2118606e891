// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Forward-only BDDF reader.
//!
//! [`StreamDataReader`] never seeks. It validates the header, then decodes
//! records in file order: series declarations are merged into an index under
//! construction and data blocks are returned to the caller. When the trailing
//! file index is reached it is checked against the reconstruction and the
//! reader reports [`BddfError::EndOfStream`] from then on.
//!
//! A source that ends before the footer (a crashed writer, a file still being
//! written) yields [`BddfError::TruncatedFile`]; every block decoded up to that
//! point remains available through [`StreamDataReader::file_index`]. Bytes of
//! an incomplete record are kept, so reading again after the source has grown
//! picks up where it stopped. A record that cannot be decoded fails the
//! reader permanently.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};

use crate::core::{BddfError, Result};
use crate::io::block::{read_data_body, read_descriptor_body, BlockHeader, BlockType};
use crate::io::constants::{BLOCK_HEADER_LEN, FOOTER_LEN};
use crate::io::index::{file_index_from_proto, series_descriptor_from_proto, IndexBuilder};
use crate::io::metadata::{Annotations, BlockDescriptor, FileIndex, FormatVersion, SeriesDescriptor};
use crate::io::proto::descriptor_block::Descriptor;
use crate::io::registry::SeriesRegistry;

use super::header::{FileHeader, Footer};

/// A data block together with the descriptor of its series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamBlock {
    pub descriptor: BlockDescriptor,
    pub series: Arc<SeriesDescriptor>,
    pub payload: Vec<u8>,
}

impl StreamBlock {
    pub fn timestamp_nsec(&self) -> i64 {
        self.descriptor.timestamp_nsec
    }
}

#[derive(Debug, Clone)]
enum StreamState {
    Reading,
    /// The file index at `index_offset` matched the scan; the footer follows
    Footer { index_offset: u64 },
    /// The footer has been read and checked
    Eof,
    /// A record could not be decoded; the stream cannot be resynchronized
    Failed(BddfError),
}

/// Forward-only reader that rebuilds the file index while scanning.
pub struct StreamDataReader<R: Read> {
    source: R,
    header: FileHeader,
    position: u64,
    /// Bytes of the record starting at `position` read so far
    pending: Vec<u8>,
    registry: SeriesRegistry,
    index: IndexBuilder,
    series: Vec<Arc<SeriesDescriptor>>,
    state: StreamState,
    /// Set once the iterator has yielded a terminal result
    exhausted: bool,
}

impl StreamDataReader<BufReader<File>> {
    /// Open a file for forward-only reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read> StreamDataReader<R> {
    /// Validate the header; no seeking is performed.
    pub fn new(mut source: R) -> Result<Self> {
        let header = FileHeader::read(&mut source)?;
        Ok(Self {
            source,
            position: header.len,
            header,
            pending: Vec::new(),
            registry: SeriesRegistry::new(),
            index: IndexBuilder::new(),
            series: Vec::new(),
            state: StreamState::Reading,
            exhausted: false,
        })
    }

    pub fn version(&self) -> FormatVersion {
        self.header.version
    }

    pub fn annotations(&self) -> &Annotations {
        &self.header.annotations
    }

    /// Bytes of complete records consumed so far.
    ///
    /// A record that is only partly available is not counted until it
    /// completes.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// True once the trailing file index and footer have been read.
    pub fn is_eof(&self) -> bool {
        matches!(self.state, StreamState::Eof)
    }

    /// Series discovered so far.
    pub fn num_series(&self) -> usize {
        self.series.len()
    }

    pub fn series_descriptor(&self, series_index: u32) -> Option<&SeriesDescriptor> {
        self.series.get(series_index as usize).map(Arc::as_ref)
    }

    /// Index reconstructed from everything read so far.
    ///
    /// After [`is_eof`](Self::is_eof) this equals the index a
    /// [`DataReader`](super::DataReader) parses from the same file.
    pub fn file_index(&self) -> FileIndex {
        self.index.snapshot(&self.registry)
    }

    /// Decode records until the next data block.
    ///
    /// When the source runs dry before the file index this fails with
    /// `TruncatedFile`, keeping any partial record. Calling again once more
    /// bytes are available resumes where decoding stopped, so a file that is
    /// still being written can be tailed. A malformed record fails the
    /// reader for good.
    pub fn read_next_block(&mut self) -> Result<StreamBlock> {
        match &self.state {
            StreamState::Eof => return Err(BddfError::EndOfStream),
            StreamState::Failed(err) => return Err(err.clone()),
            StreamState::Reading | StreamState::Footer { .. } => {}
        }

        match self.next_data_block() {
            Ok(Some(block)) => Ok(block),
            Ok(None) => {
                let err = self.starved();
                tracing::debug!(
                    position = self.position,
                    buffered = self.pending.len(),
                    blocks = self.index.num_blocks(),
                    "BDDF stream waiting for more data"
                );
                Err(err)
            }
            Err(BddfError::EndOfStream) => Err(BddfError::EndOfStream),
            // Partial bytes stay buffered, so the read can be retried
            Err(err @ BddfError::Io(_)) => Err(err),
            Err(err) => {
                tracing::warn!(
                    position = self.position,
                    series = self.series.len(),
                    blocks = self.index.num_blocks(),
                    error = %err,
                    "BDDF stream failed"
                );
                self.state = StreamState::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Error reported when the source has no more bytes for now.
    fn starved(&self) -> BddfError {
        if matches!(self.state, StreamState::Footer { .. }) {
            BddfError::truncated(format!(
                "stream ended at byte {} inside the footer",
                self.position
            ))
        } else if self.pending.is_empty() {
            BddfError::truncated(format!(
                "stream ended at byte {} without a file index",
                self.position
            ))
        } else {
            BddfError::truncated(format!(
                "stream ended inside the block at byte {} after {} bytes",
                self.position,
                self.pending.len()
            ))
        }
    }

    /// Next data block, or `None` when the source runs dry.
    fn next_data_block(&mut self) -> Result<Option<StreamBlock>> {
        loop {
            if let StreamState::Footer { index_offset } = self.state {
                if !self.fill_pending(FOOTER_LEN)? {
                    return Ok(None);
                }
                let footer = Footer::decode(&std::mem::take(&mut self.pending))?;
                self.position += FOOTER_LEN;
                if footer.index_offset != index_offset {
                    return Err(BddfError::malformed(format!(
                        "footer points at offset {} but the file index is at {index_offset}",
                        footer.index_offset
                    )));
                }
                self.state = StreamState::Eof;
                tracing::debug!(
                    series = self.series.len(),
                    blocks = self.index.num_blocks(),
                    "BDDF stream complete"
                );
                return Err(BddfError::EndOfStream);
            }

            let block_start = self.position;
            let Some((header, record)) = self.next_record()? else {
                return Ok(None);
            };
            self.position += record.len() as u64;
            let mut body = &record[BLOCK_HEADER_LEN as usize..];

            match header.block_type {
                BlockType::Descriptor => match read_descriptor_body(&mut body, header.body_len)? {
                    Some(Descriptor::SeriesDescriptor(raw)) => {
                        self.declare_series(series_descriptor_from_proto(raw)?)?;
                    }
                    Some(Descriptor::FileIndex(raw)) => {
                        if file_index_from_proto(raw)? != self.file_index() {
                            return Err(BddfError::malformed(
                                "file index disagrees with the blocks in the stream",
                            ));
                        }
                        self.state = StreamState::Footer {
                            index_offset: block_start,
                        };
                    }
                    Some(Descriptor::FileDescriptor(_)) => {
                        return Err(BddfError::malformed(format!(
                            "second format descriptor at offset {block_start}"
                        )));
                    }
                    None => {
                        tracing::debug!(offset = block_start, "skipping empty descriptor block");
                    }
                },
                BlockType::Data => {
                    let body = read_data_body(&mut body, header.body_len)?;
                    let series = self
                        .series
                        .get(body.series_index as usize)
                        .cloned()
                        .ok_or_else(|| {
                            BddfError::malformed(format!(
                                "data block at offset {block_start} references undeclared series {}",
                                body.series_index
                            ))
                        })?;
                    if body.additional_indexes.len() != series.additional_index_names.len() {
                        return Err(BddfError::malformed(format!(
                            "data block at offset {block_start} has {} additional indexes, series {} expects {}",
                            body.additional_indexes.len(),
                            series.series_index,
                            series.additional_index_names.len()
                        )));
                    }

                    let descriptor = BlockDescriptor {
                        series_index: body.series_index,
                        timestamp_nsec: body.timestamp_nsec,
                        additional_indexes: body.additional_indexes,
                        offset: block_start + body.payload_offset,
                        length: body.payload.len() as u64,
                    };
                    self.index.push(descriptor.clone())?;
                    return Ok(Some(StreamBlock {
                        descriptor,
                        series,
                        payload: body.payload,
                    }));
                }
            }
        }
    }

    /// Buffer the next complete record (header + body).
    ///
    /// Returns `None` when the source runs dry first; the bytes read so far
    /// stay in `pending` for the next call.
    fn next_record(&mut self) -> Result<Option<(BlockHeader, Vec<u8>)>> {
        if !self.fill_pending(BLOCK_HEADER_LEN)? {
            return Ok(None);
        }
        let header = BlockHeader::decode(LittleEndian::read_u64(
            &self.pending[..BLOCK_HEADER_LEN as usize],
        ))?;
        if !self.fill_pending(BLOCK_HEADER_LEN + header.body_len)? {
            return Ok(None);
        }
        Ok(Some((header, std::mem::take(&mut self.pending))))
    }

    /// Read until `pending` holds `len` bytes; false if the source runs dry.
    fn fill_pending(&mut self, len: u64) -> Result<bool> {
        let missing = len.saturating_sub(self.pending.len() as u64);
        if missing > 0 {
            self.source
                .by_ref()
                .take(missing)
                .read_to_end(&mut self.pending)?;
        }
        Ok(self.pending.len() as u64 >= len)
    }

    fn declare_series(&mut self, descriptor: SeriesDescriptor) -> Result<()> {
        self.registry.insert(descriptor.clone())?;
        self.index.add_series(descriptor.series_index);
        tracing::debug!(
            series_index = descriptor.series_index,
            series = %descriptor.identifier,
            "discovered series"
        );
        self.series.push(Arc::new(descriptor));
        Ok(())
    }
}

impl<R: Read> Iterator for StreamDataReader<R> {
    type Item = Result<StreamBlock>;

    /// Yields blocks until the end of the stream; a terminal error is yielded
    /// once and then iteration stops.
    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.read_next_block() {
            Ok(block) => Some(Ok(block)),
            Err(BddfError::EndOfStream) => {
                self.exhausted = true;
                None
            }
            Err(err) => {
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::metadata::{SeriesIdentifier, SeriesKind};
    use crate::io::writer::{DataWriter, SeriesOptions};
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    /// Reader over bytes that can grow after it has run dry.
    struct Growing {
        data: Rc<RefCell<Vec<u8>>>,
        pos: usize,
    }

    impl Read for Growing {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let data = self.data.borrow();
            let n = buf.len().min(data.len() - self.pos);
            buf[..n].copy_from_slice(&data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn sample_file(blocks: i64) -> Vec<u8> {
        let writer = DataWriter::new(Cursor::new(Vec::new()), Annotations::new()).unwrap();
        let series = writer
            .add_series(
                SeriesIdentifier::from_pairs("counter", [("name", "ticks")]),
                SeriesKind::message("text/plain", "Tick"),
                SeriesOptions::new().additional_index("seq"),
            )
            .unwrap();
        for i in 0..blocks {
            writer
                .write_block(series, i * 10, format!("tick {i}").as_bytes(), &[blocks - i])
                .unwrap();
        }
        writer.close().unwrap().into_inner()
    }

    #[test]
    fn test_reads_exactly_num_blocks() {
        let mut reader = StreamDataReader::new(Cursor::new(sample_file(3))).unwrap();
        for i in 0..3 {
            let block = reader.read_next_block().unwrap();
            assert_eq!(block.timestamp_nsec(), i * 10);
            assert_eq!(block.descriptor.additional_indexes, vec![3 - i]);
        }
        assert!(!reader.is_eof());
        assert!(reader.read_next_block().unwrap_err().is_end_of_stream());
        assert!(reader.is_eof());
        assert!(reader.read_next_block().unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_position_reaches_end() {
        let bytes = sample_file(2);
        let len = bytes.len() as u64;
        let mut reader = StreamDataReader::new(Cursor::new(bytes)).unwrap();
        while reader.read_next_block().is_ok() {}
        assert_eq!(reader.position(), len);
    }

    #[test]
    fn test_truncated_stream_keeps_blocks() {
        let mut bytes = sample_file(2);
        let reader = StreamDataReader::new(Cursor::new(bytes.clone())).unwrap();
        let complete: Vec<_> = reader.collect::<Result<_>>().unwrap();
        let cut = complete[1].descriptor.offset as usize + 2;
        bytes.truncate(cut);

        let mut reader = StreamDataReader::new(Cursor::new(bytes)).unwrap();
        assert!(reader.read_next_block().is_ok());
        assert!(matches!(
            reader.read_next_block(),
            Err(BddfError::TruncatedFile { .. })
        ));
        assert!(matches!(
            reader.read_next_block(),
            Err(BddfError::TruncatedFile { .. })
        ));
        assert_eq!(reader.file_index().num_blocks(), 1);
        assert!(!reader.is_eof());
    }

    #[test]
    fn test_iterator_stops_after_truncation() {
        let mut bytes = sample_file(1);
        bytes.truncate(bytes.len() - 1);
        let reader = StreamDataReader::new(Cursor::new(bytes)).unwrap();
        let results: Vec<_> = reader.collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(BddfError::TruncatedFile { .. })));
    }

    #[test]
    fn test_tail_resumes_when_bytes_arrive() {
        let bytes = sample_file(2);
        let reader = StreamDataReader::new(Cursor::new(bytes.clone())).unwrap();
        let complete: Vec<_> = reader.collect::<Result<_>>().unwrap();
        let mid_block = complete[1].descriptor.offset as usize + 2;

        let data = Rc::new(RefCell::new(bytes[..mid_block].to_vec()));
        let mut reader = StreamDataReader::new(Growing {
            data: Rc::clone(&data),
            pos: 0,
        })
        .unwrap();
        assert_eq!(reader.read_next_block().unwrap(), complete[0]);
        let position = reader.position();
        assert!(matches!(
            reader.read_next_block(),
            Err(BddfError::TruncatedFile { .. })
        ));
        assert_eq!(reader.position(), position);

        // Everything but the end of the footer
        data.borrow_mut()
            .extend_from_slice(&bytes[mid_block..bytes.len() - 5]);
        assert_eq!(reader.read_next_block().unwrap(), complete[1]);
        assert!(matches!(
            reader.read_next_block(),
            Err(BddfError::TruncatedFile { .. })
        ));
        assert!(!reader.is_eof());

        data.borrow_mut()
            .extend_from_slice(&bytes[bytes.len() - 5..]);
        assert!(reader.read_next_block().unwrap_err().is_end_of_stream());
        assert!(reader.is_eof());
        assert_eq!(reader.position(), bytes.len() as u64);
    }

    #[test]
    fn test_malformed_footer_is_terminal() {
        let mut bytes = sample_file(2);
        let footer_start = bytes.len() - FOOTER_LEN as usize;
        bytes[footer_start] ^= 0x01;

        let mut reader = StreamDataReader::new(Cursor::new(bytes)).unwrap();
        assert!(reader.read_next_block().is_ok());
        assert!(reader.read_next_block().is_ok());
        for _ in 0..2 {
            assert!(matches!(
                reader.read_next_block(),
                Err(BddfError::MalformedFile { .. })
            ));
        }
        assert!(!reader.is_eof());
        assert_eq!(reader.file_index().num_blocks(), 2);
    }
}
