// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Protobuf message series.
//!
//! A protobuf series is a message series with content type
//! `application/protobuf` whose type name is the message's full name.
//! Series are keyed by channel: type `bddf:message-channel`, spec
//! `{"bddf:channel": <channel>}`, where the default channel is the message's
//! full name.
//!
//! - [`ProtobufSeriesWriter`] registers a series and encodes prost messages
//! - [`ProtobufChannelReader`] decodes a series into generated types
//! - [`DynamicProtobufReader`] decodes a series into `prost_reflect`
//!   dynamic messages from a runtime descriptor

pub mod dynamic;
pub mod reader;
pub mod writer;

pub use dynamic::{DynamicProtobufDecoder, DynamicProtobufReader};
pub use reader::{ProtobufChannelReader, ProtobufDecoder};
pub use writer::ProtobufSeriesWriter;

use std::io::{Read, Seek};

use crate::core::{BddfError, Result};
use crate::io::constants::PROTOBUF_CONTENT_TYPE;
use crate::io::metadata::{SeriesDescriptor, SeriesIdentifier, SeriesKind};
use crate::io::DataReader;

/// Series type of protobuf channel series.
pub const CHANNEL_SERIES_TYPE: &str = "bddf:message-channel";

/// Spec key holding the channel name.
pub const CHANNEL_SPEC_KEY: &str = "bddf:channel";

/// Identifier of the protobuf series on `channel`.
pub fn channel_identifier(channel: &str) -> SeriesIdentifier {
    SeriesIdentifier::from_pairs(CHANNEL_SERIES_TYPE, [(CHANNEL_SPEC_KEY, channel)])
}

/// Message kind of a protobuf series carrying `type_name`.
pub fn protobuf_kind(type_name: &str) -> SeriesKind {
    SeriesKind::message(PROTOBUF_CONTENT_TYPE, type_name)
}

/// True if `series` holds protobuf messages of `type_name`.
pub fn is_protobuf_series(series: &SeriesDescriptor, type_name: &str) -> bool {
    series.kind.as_message().is_some_and(|kind| {
        kind.content_type == PROTOBUF_CONTENT_TYPE && kind.type_name == type_name
    })
}

/// Ensure `series` holds protobuf messages of `type_name`.
pub(crate) fn check_protobuf_series(series: &SeriesDescriptor, type_name: &str) -> Result<()> {
    if is_protobuf_series(series, type_name) {
        Ok(())
    } else {
        Err(BddfError::schema_mismatch(
            series.series_index,
            format!(
                "{} does not hold {PROTOBUF_CONTENT_TYPE} messages of type {type_name}",
                series.identifier
            ),
        ))
    }
}

/// Resolve the series index holding `type_name` messages.
///
/// With an explicit channel only that channel matches. Without one the
/// default channel (the type name itself) is preferred, then the first
/// series of that type in index order.
pub fn find_protobuf_series<R: Read + Seek>(
    reader: &DataReader<R>,
    type_name: &str,
    channel: Option<&str>,
) -> Result<u32> {
    let mut candidates = reader
        .series_descriptors()
        .iter()
        .filter(|series| is_protobuf_series(series, type_name));

    let found = match channel {
        Some(channel) => candidates.find(|series| series_channel(series) == Some(channel)),
        None => {
            let candidates: Vec<_> = candidates.collect();
            candidates
                .iter()
                .find(|series| series_channel(series) == Some(type_name))
                .or_else(|| candidates.first())
                .copied()
        }
    };

    found.map(|series| series.series_index).ok_or_else(|| {
        BddfError::unknown_series(match channel {
            Some(channel) => format!("protobuf series of type {type_name} on channel {channel}"),
            None => format!("protobuf series of type {type_name}"),
        })
    })
}

/// Channel name of a protobuf channel series.
fn series_channel(series: &SeriesDescriptor) -> Option<&str> {
    if series.identifier.series_type != CHANNEL_SERIES_TYPE {
        return None;
    }
    series
        .identifier
        .spec
        .get(CHANNEL_SPEC_KEY)
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{Annotations, DataWriter, SeriesOptions};
    use std::io::Cursor;

    fn reader_with(series: &[(SeriesIdentifier, &str)]) -> DataReader<Cursor<Vec<u8>>> {
        let writer = DataWriter::new(Cursor::new(Vec::new()), Annotations::new()).unwrap();
        for (identifier, type_name) in series {
            writer
                .add_series(identifier.clone(), protobuf_kind(type_name), SeriesOptions::new())
                .unwrap();
        }
        DataReader::new(Cursor::new(writer.close().unwrap().into_inner())).unwrap()
    }

    #[test]
    fn test_prefers_default_channel() {
        let reader = reader_with(&[
            (channel_identifier("left"), "demo.Pose"),
            (channel_identifier("demo.Pose"), "demo.Pose"),
        ]);
        assert_eq!(find_protobuf_series(&reader, "demo.Pose", None).unwrap(), 1);
        assert_eq!(
            find_protobuf_series(&reader, "demo.Pose", Some("left")).unwrap(),
            0
        );
    }

    #[test]
    fn test_falls_back_to_first_match() {
        let reader = reader_with(&[
            (channel_identifier("other"), "demo.Other"),
            (SeriesIdentifier::from_pairs("custom", [("id", "1")]), "demo.Pose"),
            (channel_identifier("right"), "demo.Pose"),
        ]);
        assert_eq!(find_protobuf_series(&reader, "demo.Pose", None).unwrap(), 1);
    }

    #[test]
    fn test_no_match_is_unknown_series() {
        let reader = reader_with(&[(channel_identifier("left"), "demo.Pose")]);
        assert!(matches!(
            find_protobuf_series(&reader, "demo.Pose", Some("right")),
            Err(BddfError::UnknownSeries { .. })
        ));
        assert!(matches!(
            find_protobuf_series(&reader, "demo.Twist", None),
            Err(BddfError::UnknownSeries { .. })
        ));
    }
}
