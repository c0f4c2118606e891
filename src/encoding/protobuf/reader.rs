// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Typed protobuf series reader.

use std::io::{Read, Seek};
use std::marker::PhantomData;

use prost::{Message, Name};

use crate::core::{BddfError, Result};
use crate::io::metadata::SeriesDescriptor;
use crate::io::traits::{BlockDecoder, SeriesReader};
use crate::io::DataReader;

use super::{check_protobuf_series, find_protobuf_series};

/// Decodes payloads into the generated type `M`.
pub struct ProtobufDecoder<M> {
    _message: PhantomData<fn() -> M>,
}

impl<M> ProtobufDecoder<M> {
    pub fn new() -> Self {
        Self {
            _message: PhantomData,
        }
    }
}

impl<M> Default for ProtobufDecoder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message + Name + Default> BlockDecoder for ProtobufDecoder<M> {
    type Output = M;

    fn check(&self, series: &SeriesDescriptor) -> Result<()> {
        check_protobuf_series(series, &M::full_name())
    }

    fn decode(&self, _series: &SeriesDescriptor, payload: &[u8]) -> Result<M> {
        M::decode(payload).map_err(|e| {
            BddfError::decode("protobuf", format!("failed to decode {}: {e}", M::full_name()))
        })
    }
}

/// Reads the messages of one protobuf series as `M`.
pub struct ProtobufChannelReader<'a, R: Read + Seek, M: Message + Name + Default> {
    inner: SeriesReader<'a, R, ProtobufDecoder<M>>,
}

impl<'a, R: Read + Seek, M: Message + Name + Default> ProtobufChannelReader<'a, R, M> {
    /// Resolve the series of `M` on `channel`, or the best match when no
    /// channel is given. Fails with `UnknownSeries` when nothing matches.
    pub fn new(reader: &'a DataReader<R>, channel: Option<&str>) -> Result<Self> {
        let series_index = find_protobuf_series(reader, &M::full_name(), channel)?;
        Self::from_series_index(reader, series_index)
    }

    /// Bind to a specific series, which must hold `M`.
    pub fn from_series_index(reader: &'a DataReader<R>, series_index: u32) -> Result<Self> {
        Ok(Self {
            inner: SeriesReader::new(reader, series_index, ProtobufDecoder::new())?,
        })
    }

    pub fn series_descriptor(&self) -> &'a SeriesDescriptor {
        self.inner.descriptor()
    }

    pub fn num_messages(&self) -> usize {
        self.inner.num_blocks()
    }

    /// Read message `index` as `(timestamp_nsec, message)`.
    pub fn get_message(&self, index: usize) -> Result<(i64, M)> {
        self.inner.read(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<(i64, M)>> + '_ {
        self.inner.iter()
    }
}
