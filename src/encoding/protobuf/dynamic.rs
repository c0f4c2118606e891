// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Protobuf series decoding with prost-reflect for runtime schemas.
//!
//! No generated types are needed: a [`MessageDescriptor`] (built from a
//! `FileDescriptorSet` at runtime) drives decoding into [`DynamicMessage`]s.

use std::io::{Read, Seek};

use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};
use prost_types::FileDescriptorSet;

use crate::core::{BddfError, Result};
use crate::io::metadata::SeriesDescriptor;
use crate::io::traits::{BlockDecoder, SeriesReader};
use crate::io::DataReader;

use super::{check_protobuf_series, find_protobuf_series};

/// Decodes payloads into dynamic messages of one descriptor.
#[derive(Debug, Clone)]
pub struct DynamicProtobufDecoder {
    descriptor: MessageDescriptor,
}

impl DynamicProtobufDecoder {
    pub fn new(descriptor: MessageDescriptor) -> Self {
        Self { descriptor }
    }

    /// Build a decoder from serialized `FileDescriptorSet` bytes.
    ///
    /// # Arguments
    ///
    /// * `fds_bytes` - FileDescriptorSet binary data
    /// * `type_name` - Full message name (e.g., "bosdyn.api.RobotState")
    pub fn from_file_descriptor_set(fds_bytes: &[u8], type_name: &str) -> Result<Self> {
        let fds = FileDescriptorSet::decode(fds_bytes).map_err(|e| {
            BddfError::decode(
                "protobuf",
                format!("failed to decode FileDescriptorSet: {e}"),
            )
        })?;
        let pool = DescriptorPool::from_file_descriptor_set(fds).map_err(|e| {
            BddfError::decode("protobuf", format!("failed to build descriptor pool: {e}"))
        })?;
        let descriptor = pool.get_message_by_name(type_name).ok_or_else(|| {
            BddfError::decode(
                "protobuf",
                format!("message type {type_name} not found in descriptor set"),
            )
        })?;
        Ok(Self::new(descriptor))
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }
}

impl BlockDecoder for DynamicProtobufDecoder {
    type Output = DynamicMessage;

    fn check(&self, series: &SeriesDescriptor) -> Result<()> {
        check_protobuf_series(series, self.descriptor.full_name())
    }

    fn decode(&self, _series: &SeriesDescriptor, payload: &[u8]) -> Result<DynamicMessage> {
        DynamicMessage::decode(self.descriptor.clone(), payload).map_err(|e| {
            BddfError::decode(
                "protobuf",
                format!("failed to decode {}: {e}", self.descriptor.full_name()),
            )
        })
    }
}

/// Reads one protobuf series as dynamic messages.
pub struct DynamicProtobufReader<'a, R: Read + Seek> {
    inner: SeriesReader<'a, R, DynamicProtobufDecoder>,
}

impl<'a, R: Read + Seek> DynamicProtobufReader<'a, R> {
    /// Resolve the series of `descriptor`'s type the same way
    /// [`ProtobufChannelReader`](super::ProtobufChannelReader) does.
    pub fn new(
        reader: &'a DataReader<R>,
        descriptor: MessageDescriptor,
        channel: Option<&str>,
    ) -> Result<Self> {
        let series_index = find_protobuf_series(reader, descriptor.full_name(), channel)?;
        Self::from_series_index(reader, series_index, descriptor)
    }

    /// Bind to a specific series, which must hold `descriptor`'s type.
    pub fn from_series_index(
        reader: &'a DataReader<R>,
        series_index: u32,
        descriptor: MessageDescriptor,
    ) -> Result<Self> {
        Ok(Self {
            inner: SeriesReader::new(
                reader,
                series_index,
                DynamicProtobufDecoder::new(descriptor),
            )?,
        })
    }

    pub fn series_descriptor(&self) -> &'a SeriesDescriptor {
        self.inner.descriptor()
    }

    pub fn message_descriptor(&self) -> &MessageDescriptor {
        self.inner.decoder().descriptor()
    }

    pub fn num_messages(&self) -> usize {
        self.inner.num_blocks()
    }

    /// Read message `index` as `(timestamp_nsec, message)`.
    pub fn get_message(&self, index: usize) -> Result<(i64, DynamicMessage)> {
        self.inner.read(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<(i64, DynamicMessage)>> + '_ {
        self.inner.iter()
    }
}
