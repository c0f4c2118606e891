// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Opaque message series.
//!
//! A message series stores byte blobs tagged with a content type and a type
//! name; the format never interprets them. These adapters are the untyped
//! base the protobuf and gRPC adapters specialize.

use std::io::{Read, Seek, Write};

use crate::core::{BddfError, Result};
use crate::io::metadata::{BlockDescriptor, MessageKind, SeriesDescriptor, SeriesIdentifier, SeriesKind};
use crate::io::traits::{BlockDecoder, SeriesReader};
use crate::io::{DataReader, DataWriter, SeriesOptions};

/// Decoder accepting only message series; payloads are returned as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageDecoder;

impl BlockDecoder for MessageDecoder {
    type Output = Vec<u8>;

    fn check(&self, series: &SeriesDescriptor) -> Result<()> {
        message_kind(series).map(|_| ())
    }

    fn decode(&self, _series: &SeriesDescriptor, payload: &[u8]) -> Result<Vec<u8>> {
        Ok(payload.to_vec())
    }
}

/// The message kind of `series`, or `SchemaMismatch` for a pod series.
pub(crate) fn message_kind(series: &SeriesDescriptor) -> Result<&MessageKind> {
    series.kind.as_message().ok_or_else(|| {
        BddfError::schema_mismatch(
            series.series_index,
            format!("{} is not a message series", series.identifier),
        )
    })
}

/// Writer for one opaque message series.
pub struct MessageSeriesWriter<'a, W: Write> {
    writer: &'a DataWriter<W>,
    series_index: u32,
}

impl<'a, W: Write> MessageSeriesWriter<'a, W> {
    /// Register a message series on `writer`.
    pub fn new(
        writer: &'a DataWriter<W>,
        identifier: SeriesIdentifier,
        content_type: &str,
        type_name: &str,
        options: SeriesOptions,
    ) -> Result<Self> {
        let series_index = writer.add_series(
            identifier,
            SeriesKind::message(content_type, type_name),
            options,
        )?;
        Ok(Self {
            writer,
            series_index,
        })
    }

    pub fn series_index(&self) -> u32 {
        self.series_index
    }

    /// Append one message.
    pub fn write(
        &self,
        timestamp_nsec: i64,
        payload: &[u8],
        additional_indexes: &[i64],
    ) -> Result<BlockDescriptor> {
        self.writer
            .write_block(self.series_index, timestamp_nsec, payload, additional_indexes)
    }
}

/// Reader for one opaque message series.
pub struct MessageSeriesReader<'a, R: Read + Seek> {
    inner: SeriesReader<'a, R, MessageDecoder>,
    kind: &'a MessageKind,
}

impl<'a, R: Read + Seek> MessageSeriesReader<'a, R> {
    /// Bind to series `series_index`, which must be a message series.
    pub fn new(reader: &'a DataReader<R>, series_index: u32) -> Result<Self> {
        let inner = SeriesReader::new(reader, series_index, MessageDecoder)?;
        let kind = message_kind(inner.descriptor())?;
        Ok(Self { inner, kind })
    }

    /// Bind to the series registered under `identifier`.
    pub fn open(reader: &'a DataReader<R>, identifier: &SeriesIdentifier) -> Result<Self> {
        let series_index = reader
            .series_index(identifier)
            .ok_or_else(|| BddfError::unknown_series(identifier.to_string()))?;
        Self::new(reader, series_index)
    }

    pub fn series_descriptor(&self) -> &'a SeriesDescriptor {
        self.inner.descriptor()
    }

    /// Content type and type name of the series.
    pub fn message_kind(&self) -> &'a MessageKind {
        self.kind
    }

    pub fn num_messages(&self) -> usize {
        self.inner.num_blocks()
    }

    /// Block descriptor of message `index`, including its additional indexes.
    pub fn block_descriptor(&self, index: usize) -> Result<&'a BlockDescriptor> {
        self.inner.block_descriptor(index)
    }

    /// Read message `index` as `(timestamp_nsec, payload)`.
    pub fn get_message(&self, index: usize) -> Result<(i64, Vec<u8>)> {
        self.inner.read(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<(i64, Vec<u8>)>> + '_ {
        self.inner.iter()
    }
}
