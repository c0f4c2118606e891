// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Typed series adapters.
//!
//! Each adapter is a thin, schema-specific wrapper over the generic block
//! API of [`DataWriter`](crate::io::DataWriter) and
//! [`DataReader`](crate::io::DataReader):
//! - [`message`] - Opaque byte-blob series
//! - [`protobuf`] - Protobuf series, typed or dynamic
//! - [`pod`] - Fixed-width scalar and array samples
//! - [`grpc`] - Captured gRPC requests and responses

pub mod grpc;
pub mod message;
pub mod pod;
pub mod protobuf;

pub use grpc::{Direction, GrpcMessage, GrpcProtoReader, GrpcReader, GrpcServiceWriter};
pub use message::{MessageDecoder, MessageSeriesReader, MessageSeriesWriter};
pub use pod::{PodDecoder, PodSeriesReader, PodSeriesWriter};
pub use protobuf::{
    DynamicProtobufDecoder, DynamicProtobufReader, ProtobufChannelReader, ProtobufDecoder,
    ProtobufSeriesWriter,
};
