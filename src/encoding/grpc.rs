// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Captured gRPC traffic.
//!
//! Every distinct (service, message type, direction) triple becomes one
//! protobuf series of type `bddf:grpc-message`. Writers create the series on
//! first use; readers merge all series carrying one message type into a
//! single timestamp-ordered view.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Seek, Write};
use std::str::FromStr;

use prost::{Message, Name};

use crate::core::{now_nsec, BddfError, Result};
use crate::io::metadata::{BlockDescriptor, SeriesDescriptor, SeriesIdentifier};
use crate::io::traits::BlockDecoder;
use crate::io::{DataReader, DataWriter, SeriesOptions};

use super::protobuf::{is_protobuf_series, ProtobufDecoder, ProtobufSeriesWriter};

/// Series type of captured gRPC messages.
pub const GRPC_SERIES_TYPE: &str = "bddf:grpc-message";
/// Spec key holding the service name.
pub const GRPC_SERVICE_KEY: &str = "bddf:grpc:service";
/// Spec key holding the message full name.
pub const GRPC_MESSAGE_TYPE_KEY: &str = "bddf:grpc:message-type";
/// Spec key holding `request` or `response`.
pub const GRPC_DIRECTION_KEY: &str = "bddf:grpc:direction";

/// Which side of an RPC a message travelled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = BddfError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "request" => Ok(Direction::Request),
            "response" => Ok(Direction::Response),
            other => Err(BddfError::Other(format!("unknown gRPC direction '{other}'"))),
        }
    }
}

/// A protobuf message that may carry its own capture timestamp.
pub trait GrpcMessage: Message + Name + Default {
    /// Timestamp from the message header, if it has one.
    fn header_timestamp_nsec(&self) -> Option<i64> {
        None
    }
}

/// Identifier of the series holding `message_type` messages of `service`.
pub fn grpc_identifier(service: &str, message_type: &str, direction: Direction) -> SeriesIdentifier {
    SeriesIdentifier::from_pairs(
        GRPC_SERIES_TYPE,
        [
            (GRPC_SERVICE_KEY, service),
            (GRPC_MESSAGE_TYPE_KEY, message_type),
            (GRPC_DIRECTION_KEY, direction.as_str()),
        ],
    )
}

/// Logs the requests and responses of one service.
pub struct GrpcServiceWriter<'a, W: Write> {
    writer: &'a DataWriter<W>,
    service_name: String,
}

impl<'a, W: Write> GrpcServiceWriter<'a, W> {
    pub fn new(writer: &'a DataWriter<W>, service_name: impl Into<String>) -> Self {
        Self {
            writer,
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Log a request, timestamped from its header or the current time.
    pub fn log_request<M: GrpcMessage>(&self, message: &M) -> Result<BlockDescriptor> {
        self.log_message(Direction::Request, message)
    }

    /// Log a response, timestamped from its header or the current time.
    pub fn log_response<M: GrpcMessage>(&self, message: &M) -> Result<BlockDescriptor> {
        self.log_message(Direction::Response, message)
    }

    pub fn log_message<M: GrpcMessage>(
        &self,
        direction: Direction,
        message: &M,
    ) -> Result<BlockDescriptor> {
        let timestamp_nsec = message.header_timestamp_nsec().unwrap_or_else(now_nsec);
        self.log_message_at(direction, timestamp_nsec, message)
    }

    /// Log a message with an explicit timestamp.
    pub fn log_message_at<M: GrpcMessage>(
        &self,
        direction: Direction,
        timestamp_nsec: i64,
        message: &M,
    ) -> Result<BlockDescriptor> {
        self.series_writer::<M>(direction)?
            .write(timestamp_nsec, message)
    }

    /// Look up the series for `M`, creating it on first use.
    fn series_writer<M: GrpcMessage>(
        &self,
        direction: Direction,
    ) -> Result<ProtobufSeriesWriter<'a, W, M>> {
        let identifier = grpc_identifier(&self.service_name, &M::full_name(), direction);
        match self.writer.series_index(&identifier) {
            Some(series_index) => ProtobufSeriesWriter::attach(self.writer, series_index),
            None => {
                tracing::debug!(
                    service = %self.service_name,
                    message_type = %M::full_name(),
                    %direction,
                    "creating gRPC series"
                );
                ProtobufSeriesWriter::with_identifier(
                    self.writer,
                    identifier,
                    SeriesOptions::default(),
                )
            }
        }
    }
}

/// Indexes captured gRPC series by message type.
pub struct GrpcReader<'a, R: Read + Seek> {
    reader: &'a DataReader<R>,
    series_by_type: HashMap<String, Vec<&'a SeriesDescriptor>>,
}

impl<'a, R: Read + Seek> GrpcReader<'a, R> {
    /// Collect every gRPC series carrying one of `message_types`, across
    /// services and directions.
    pub fn new(reader: &'a DataReader<R>, message_types: &[&str]) -> Self {
        let mut series_by_type: HashMap<String, Vec<&'a SeriesDescriptor>> = message_types
            .iter()
            .map(|name| (name.to_string(), Vec::new()))
            .collect();
        for series in reader.series_descriptors() {
            if series.identifier.series_type != GRPC_SERIES_TYPE {
                continue;
            }
            let Some(type_name) = series.kind.as_message().map(|kind| kind.type_name.as_str()) else {
                continue;
            };
            if let Some(matching) = series_by_type.get_mut(type_name) {
                if is_protobuf_series(series, type_name) {
                    matching.push(series);
                }
            }
        }
        Self {
            reader,
            series_by_type,
        }
    }

    /// Series found for `type_name`, in index order.
    pub fn series(&self, type_name: &str) -> &[&'a SeriesDescriptor] {
        self.series_by_type
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Merged, timestamp-ordered reader over every series of `M`.
    ///
    /// Fails with `UnknownSeries` if `M` was not requested or has no series.
    pub fn get_proto_reader<M: Message + Name + Default>(&self) -> Result<GrpcProtoReader<'a, R, M>> {
        let type_name = M::full_name();
        let series = self.series(&type_name);
        if series.is_empty() {
            return Err(BddfError::unknown_series(format!(
                "gRPC series of type {type_name}"
            )));
        }
        GrpcProtoReader::new(self.reader, series)
    }
}

struct MergedEntry<'a> {
    timestamp_nsec: i64,
    series: &'a SeriesDescriptor,
    block_index: usize,
}

/// Messages of one type from several series, ordered by timestamp.
///
/// Entries with equal timestamps keep series-index then block order.
pub struct GrpcProtoReader<'a, R: Read + Seek, M> {
    reader: &'a DataReader<R>,
    decoder: ProtobufDecoder<M>,
    entries: Vec<MergedEntry<'a>>,
}

impl<'a, R: Read + Seek, M: Message + Name + Default> GrpcProtoReader<'a, R, M> {
    fn new(reader: &'a DataReader<R>, series: &[&'a SeriesDescriptor]) -> Result<Self> {
        let decoder = ProtobufDecoder::new();
        let mut entries = Vec::new();
        for &descriptor in series {
            decoder.check(descriptor)?;
            let blocks = reader.series_block_index(descriptor.series_index)?;
            entries.extend(blocks.blocks.iter().enumerate().map(|(block_index, block)| {
                MergedEntry {
                    timestamp_nsec: block.timestamp_nsec,
                    series: descriptor,
                    block_index,
                }
            }));
        }
        entries.sort_by_key(|entry| entry.timestamp_nsec);
        Ok(Self {
            reader,
            decoder,
            entries,
        })
    }

    pub fn num_messages(&self) -> usize {
        self.entries.len()
    }

    fn entry(&self, index: usize) -> Result<&MergedEntry<'a>> {
        self.entries.get(index).ok_or_else(|| {
            let series_index = self
                .entries
                .first()
                .map(|entry| entry.series.series_index)
                .unwrap_or_default();
            BddfError::index_out_of_range(series_index, index, self.entries.len())
        })
    }

    /// Read message `index` as `(timestamp_nsec, message)`.
    pub fn get_message(&self, index: usize) -> Result<(i64, M)> {
        let entry = self.entry(index)?;
        let block = self
            .reader
            .read(entry.series.series_index, entry.block_index)?;
        let message = self.decoder.decode(entry.series, &block.payload)?;
        Ok((block.timestamp_nsec(), message))
    }

    /// Direction of message `index`.
    pub fn direction(&self, index: usize) -> Result<Direction> {
        let entry = self.entry(index)?;
        entry
            .series
            .identifier
            .spec
            .get(GRPC_DIRECTION_KEY)
            .ok_or_else(|| {
                BddfError::malformed(format!(
                    "gRPC series {} has no direction",
                    entry.series.identifier
                ))
            })?
            .parse()
    }

    /// Service that produced message `index`.
    pub fn service(&self, index: usize) -> Result<&'a str> {
        let series: &'a SeriesDescriptor = self.entry(index)?.series;
        Ok(series
            .identifier
            .spec
            .get(GRPC_SERVICE_KEY)
            .map(String::as_str)
            .unwrap_or_default())
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<(i64, M)>> + '_ {
        (0..self.num_messages()).map(move |i| self.get_message(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_strings() {
        assert_eq!(Direction::Request.to_string(), "request");
        assert_eq!("response".parse::<Direction>().unwrap(), Direction::Response);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_grpc_identifier_spec() {
        let identifier = grpc_identifier(
            "RobotState",
            "bosdyn.api.GetRobotStateRequest",
            Direction::Request,
        );
        assert_eq!(identifier.series_type, GRPC_SERIES_TYPE);
        assert_eq!(
            identifier.spec.get(GRPC_DIRECTION_KEY).map(String::as_str),
            Some("request")
        );
        assert_eq!(
            identifier.spec.get(GRPC_SERVICE_KEY).map(String::as_str),
            Some("RobotState")
        );
        assert_eq!(identifier.spec.len(), 3);
    }
}
