// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Typed protobuf series writer.

use std::io::Write;
use std::marker::PhantomData;

use prost::{Message, Name};

use crate::core::{BddfError, Result};
use crate::io::metadata::{BlockDescriptor, SeriesIdentifier};
use crate::io::{DataWriter, SeriesOptions};

use super::{channel_identifier, check_protobuf_series, protobuf_kind};

/// Writes prost messages of type `M` into one series.
pub struct ProtobufSeriesWriter<'a, W: Write, M> {
    writer: &'a DataWriter<W>,
    series_index: u32,
    _message: PhantomData<fn(&M)>,
}

impl<'a, W: Write, M: Message + Name> ProtobufSeriesWriter<'a, W, M> {
    /// Register `M` on its default channel (the message's full name).
    pub fn new(writer: &'a DataWriter<W>) -> Result<Self> {
        Self::with_channel(writer, &M::full_name())
    }

    /// Register `M` on a named channel.
    pub fn with_channel(writer: &'a DataWriter<W>, channel: &str) -> Result<Self> {
        Self::with_identifier(writer, channel_identifier(channel), SeriesOptions::default())
    }

    /// Register `M` under an arbitrary identifier.
    pub fn with_identifier(
        writer: &'a DataWriter<W>,
        identifier: SeriesIdentifier,
        options: SeriesOptions,
    ) -> Result<Self> {
        let series_index =
            writer.add_series(identifier, protobuf_kind(&M::full_name()), options)?;
        Ok(Self {
            writer,
            series_index,
            _message: PhantomData,
        })
    }

    /// Write into a series that is already registered.
    ///
    /// Fails with `SchemaMismatch` unless the series holds `M`.
    pub fn attach(writer: &'a DataWriter<W>, series_index: u32) -> Result<Self> {
        let series = writer
            .series_descriptor(series_index)
            .ok_or_else(|| BddfError::unknown_series(format!("series index {series_index}")))?;
        check_protobuf_series(&series, &M::full_name())?;
        Ok(Self {
            writer,
            series_index,
            _message: PhantomData,
        })
    }

    pub fn series_index(&self) -> u32 {
        self.series_index
    }

    /// Encode and append one message.
    pub fn write(&self, timestamp_nsec: i64, message: &M) -> Result<BlockDescriptor> {
        self.write_with_indexes(timestamp_nsec, message, &[])
    }

    /// Encode and append one message with additional index values.
    pub fn write_with_indexes(
        &self,
        timestamp_nsec: i64,
        message: &M,
        additional_indexes: &[i64],
    ) -> Result<BlockDescriptor> {
        let payload = message.encode_to_vec();
        self.writer
            .write_block(self.series_index, timestamp_nsec, &payload, additional_indexes)
    }
}
