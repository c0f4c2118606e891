// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema-agnostic per-series reading.
//!
//! Block I/O never looks at payload contents. Typed readers plug a
//! [`BlockDecoder`] into a [`SeriesReader`], which handles lookup, bounds
//! checks and payload reads for one series of a [`DataReader`].
//!
//! # Example
//!
//! ```rust,no_run
//! use bddf::io::{DataReader, SeriesDescriptor, SeriesReader};
//!
//! let reader = DataReader::open("run.bddf")?;
//! let lines = SeriesReader::new(
//!     &reader,
//!     0,
//!     |_: &SeriesDescriptor, payload: &[u8]| -> bddf::Result<String> {
//!         Ok(String::from_utf8_lossy(payload).into_owned())
//!     },
//! )?;
//! for entry in lines.iter() {
//!     let (timestamp_nsec, line) = entry?;
//!     println!("{timestamp_nsec}: {line}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::{Read, Seek};

use crate::core::Result;

use super::metadata::{BlockDescriptor, SeriesDescriptor};
use super::reader::DataReader;

/// Turns a block payload into a typed value.
pub trait BlockDecoder {
    /// Decoded value type.
    type Output;

    /// Reject series this decoder cannot handle.
    ///
    /// Called once when a [`SeriesReader`] is created.
    fn check(&self, _series: &SeriesDescriptor) -> Result<()> {
        Ok(())
    }

    /// Decode one payload of `series`.
    fn decode(&self, series: &SeriesDescriptor, payload: &[u8]) -> Result<Self::Output>;
}

impl<F, T> BlockDecoder for F
where
    F: Fn(&SeriesDescriptor, &[u8]) -> Result<T>,
{
    type Output = T;

    fn decode(&self, series: &SeriesDescriptor, payload: &[u8]) -> Result<T> {
        self(series, payload)
    }
}

/// Decoder that returns payloads unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBlockDecoder;

impl BlockDecoder for RawBlockDecoder {
    type Output = Vec<u8>;

    fn decode(&self, _series: &SeriesDescriptor, payload: &[u8]) -> Result<Vec<u8>> {
        Ok(payload.to_vec())
    }
}

/// Reader for one series of a [`DataReader`] with a pluggable decoder.
pub struct SeriesReader<'a, R: Read + Seek, D: BlockDecoder> {
    reader: &'a DataReader<R>,
    series: &'a SeriesDescriptor,
    decoder: D,
}

impl<'a, R: Read + Seek, D: BlockDecoder> SeriesReader<'a, R, D> {
    /// Bind `decoder` to series `series_index`.
    ///
    /// Fails with `UnknownSeries` if the series does not exist, or with
    /// whatever [`BlockDecoder::check`] reports.
    pub fn new(reader: &'a DataReader<R>, series_index: u32, decoder: D) -> Result<Self> {
        let series = reader.series_descriptor(series_index)?;
        decoder.check(series)?;
        Ok(Self {
            reader,
            series,
            decoder,
        })
    }

    pub fn series_index(&self) -> u32 {
        self.series.series_index
    }

    pub fn descriptor(&self) -> &'a SeriesDescriptor {
        self.series
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Number of blocks in the series.
    pub fn num_blocks(&self) -> usize {
        self.reader
            .num_data_blocks(self.series.series_index)
            .unwrap_or_default()
    }

    pub fn block_descriptor(&self, block_index: usize) -> Result<&'a BlockDescriptor> {
        self.reader
            .block_descriptor(self.series.series_index, block_index)
    }

    /// Read and decode one block, returning its timestamp and value.
    pub fn read(&self, block_index: usize) -> Result<(i64, D::Output)> {
        let block = self.reader.read(self.series.series_index, block_index)?;
        let value = self.decoder.decode(self.series, &block.payload)?;
        Ok((block.timestamp_nsec(), value))
    }

    /// Read every block in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<(i64, D::Output)>> + '_ {
        (0..self.num_blocks()).map(move |i| self.read(i))
    }
}
