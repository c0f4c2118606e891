// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! File index builder and parser.
//!
//! [`IndexBuilder`] accumulates block descriptors per series while a file is
//! written (or while a stream is scanned). The finished [`FileIndex`] is
//! serialized as the last descriptor block; this module also converts between
//! the domain types and their protobuf wire form, validating everything read
//! back from disk.

use crate::core::{nsec_to_timestamp, timestamp_to_nsec, BddfError, PodType, Result};

use super::metadata::{
    BlockDescriptor, FileIndex, MessageKind, PodKind, SeriesBlockIndex, SeriesDescriptor,
    SeriesIdentifier, SeriesKind,
};
use super::proto;
use super::registry::SeriesRegistry;

/// Per-series block descriptors under construction.
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    block_indexes: Vec<SeriesBlockIndex>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an empty block index for the next series.
    pub fn add_series(&mut self, series_index: u32) {
        debug_assert_eq!(series_index as usize, self.block_indexes.len());
        self.block_indexes.push(SeriesBlockIndex::new(series_index));
    }

    /// Append a block descriptor to its series.
    pub fn push(&mut self, block: BlockDescriptor) -> Result<()> {
        let series_index = block.series_index;
        let index = self
            .block_indexes
            .get_mut(series_index as usize)
            .ok_or_else(|| BddfError::unknown_series(format!("series index {series_index}")))?;
        index.blocks.push(block);
        Ok(())
    }

    pub fn series_block_index(&self, series_index: u32) -> Option<&SeriesBlockIndex> {
        self.block_indexes.get(series_index as usize)
    }

    pub fn block_indexes(&self) -> &[SeriesBlockIndex] {
        &self.block_indexes
    }

    pub fn num_blocks(&self) -> usize {
        self.block_indexes.iter().map(SeriesBlockIndex::len).sum()
    }

    /// Snapshot the index together with the registered series.
    pub fn snapshot(&self, registry: &SeriesRegistry) -> FileIndex {
        FileIndex {
            series: registry.descriptors().to_vec(),
            block_indexes: self.block_indexes.clone(),
        }
    }
}

// =============================================================================
// Domain -> wire
// =============================================================================

/// Encode a series descriptor.
pub fn series_descriptor_to_proto(descriptor: &SeriesDescriptor) -> proto::SeriesDescriptor {
    let data_type = match &descriptor.kind {
        SeriesKind::Message(kind) => {
            proto::series_descriptor::DataType::MessageType(proto::MessageTypeDescriptor {
                content_type: kind.content_type.clone(),
                type_name: kind.type_name.clone(),
            })
        }
        SeriesKind::Pod(kind) => {
            proto::series_descriptor::DataType::PodType(proto::PodTypeDescriptor {
                pod_type: kind.pod_type.into(),
                dimension: kind.dimensions.clone(),
            })
        }
    };
    proto::SeriesDescriptor {
        series_index: descriptor.series_index,
        series_identifier: Some(proto::SeriesIdentifier {
            series_type: descriptor.identifier.series_type.clone(),
            spec: descriptor.identifier.spec.clone(),
        }),
        data_type: Some(data_type),
        annotations: descriptor.annotations.clone(),
        additional_index_names: descriptor.additional_index_names.clone(),
    }
}

/// Encode the complete file index.
pub fn file_index_to_proto(index: &FileIndex) -> proto::FileIndex {
    proto::FileIndex {
        series_descriptors: index.series.iter().map(series_descriptor_to_proto).collect(),
        series_block_indexes: index
            .block_indexes
            .iter()
            .map(|series| proto::SeriesBlockIndex {
                series_index: series.series_index,
                block_entries: series
                    .blocks
                    .iter()
                    .map(|block| proto::BlockEntry {
                        timestamp: Some(nsec_to_timestamp(block.timestamp_nsec)),
                        file_offset: block.offset,
                        length: block.length,
                        additional_indexes: block.additional_indexes.clone(),
                    })
                    .collect(),
                total_bytes: series.total_bytes(),
            })
            .collect(),
    }
}

// =============================================================================
// Wire -> domain
// =============================================================================

/// Decode and validate a series descriptor.
pub fn series_descriptor_from_proto(raw: proto::SeriesDescriptor) -> Result<SeriesDescriptor> {
    let series_index = raw.series_index;
    let identifier = raw.series_identifier.ok_or_else(|| {
        BddfError::malformed(format!("series {series_index} has no identifier"))
    })?;
    let kind = match raw.data_type {
        Some(proto::series_descriptor::DataType::MessageType(message)) => {
            SeriesKind::Message(MessageKind {
                content_type: message.content_type,
                type_name: message.type_name,
            })
        }
        Some(proto::series_descriptor::DataType::PodType(pod)) => {
            let pod_type = PodType::try_from(pod.pod_type)
                .ok()
                .filter(|t| *t != PodType::Unspecified)
                .ok_or_else(|| {
                    BddfError::malformed(format!(
                        "series {series_index} has invalid pod type {}",
                        pod.pod_type
                    ))
                })?;
            SeriesKind::Pod(PodKind {
                pod_type,
                dimensions: pod.dimension,
            })
        }
        None => {
            return Err(BddfError::malformed(format!(
                "series {series_index} has neither a message nor a pod type"
            )))
        }
    };
    Ok(SeriesDescriptor {
        series_index,
        identifier: SeriesIdentifier::new(identifier.series_type, identifier.spec),
        kind,
        annotations: raw.annotations,
        additional_index_names: raw.additional_index_names,
    })
}

/// Decode and validate the file index.
///
/// Series must be listed in index order with one block index each, and every
/// block must carry one value per additional index name of its series.
pub fn file_index_from_proto(raw: proto::FileIndex) -> Result<FileIndex> {
    let series = raw
        .series_descriptors
        .into_iter()
        .map(series_descriptor_from_proto)
        .collect::<Result<Vec<_>>>()?;
    // Validates index order and identifier uniqueness.
    SeriesRegistry::from_descriptors(&series)?;

    if raw.series_block_indexes.len() != series.len() {
        return Err(BddfError::malformed(format!(
            "file index lists {} series but {} block indexes",
            series.len(),
            raw.series_block_indexes.len()
        )));
    }

    let mut block_indexes = Vec::with_capacity(series.len());
    for (descriptor, raw_index) in series.iter().zip(raw.series_block_indexes) {
        let series_index = descriptor.series_index;
        if raw_index.series_index != series_index {
            return Err(BddfError::malformed(format!(
                "block index for series {} found where series {series_index} was expected",
                raw_index.series_index
            )));
        }
        let arity = descriptor.additional_index_names.len();
        let mut blocks = Vec::with_capacity(raw_index.block_entries.len());
        for entry in raw_index.block_entries {
            if entry.additional_indexes.len() != arity {
                return Err(BddfError::malformed(format!(
                    "block in series {series_index} has {} additional indexes, expected {arity}",
                    entry.additional_indexes.len()
                )));
            }
            blocks.push(BlockDescriptor {
                series_index,
                timestamp_nsec: entry
                    .timestamp
                    .as_ref()
                    .map(timestamp_to_nsec)
                    .unwrap_or_default(),
                additional_indexes: entry.additional_indexes,
                offset: entry.file_offset,
                length: entry.length,
            });
        }
        let index = SeriesBlockIndex {
            series_index,
            blocks,
        };
        if index.total_bytes() != raw_index.total_bytes {
            return Err(BddfError::malformed(format!(
                "series {series_index} records {} total bytes but its blocks sum to {}",
                raw_index.total_bytes,
                index.total_bytes()
            )));
        }
        block_indexes.push(index);
    }

    Ok(FileIndex {
        series,
        block_indexes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::metadata::Annotations;

    fn sample_index() -> FileIndex {
        let mut registry = SeriesRegistry::new();
        let mut builder = IndexBuilder::new();
        let message = registry
            .register(
                SeriesIdentifier::from_pairs("log", [("channel", "text")]),
                SeriesKind::message("text/plain", "LogLine"),
                Annotations::new(),
                vec!["seq".to_string()],
            )
            .unwrap()
            .series_index;
        builder.add_series(message);
        let pod = registry
            .register(
                SeriesIdentifier::from_pairs("imu", [("axis", "z")]),
                SeriesKind::Pod(PodKind {
                    pod_type: PodType::Float32,
                    dimensions: vec![3],
                }),
                [("unit".to_string(), "m/s^2".to_string())].into(),
                vec![],
            )
            .unwrap()
            .series_index;
        builder.add_series(pod);

        builder
            .push(BlockDescriptor {
                series_index: message,
                timestamp_nsec: 10,
                additional_indexes: vec![4],
                offset: 100,
                length: 5,
            })
            .unwrap();
        builder
            .push(BlockDescriptor {
                series_index: pod,
                timestamp_nsec: -20,
                additional_indexes: vec![],
                offset: 200,
                length: 12,
            })
            .unwrap();
        builder.snapshot(&registry)
    }

    #[test]
    fn test_builder_counts() {
        let index = sample_index();
        assert_eq!(index.num_series(), 2);
        assert_eq!(index.num_blocks(), 2);
        assert_eq!(index.block_indexes[1].total_bytes(), 12);
    }

    #[test]
    fn test_builder_rejects_unknown_series() {
        let mut builder = IndexBuilder::new();
        let err = builder
            .push(BlockDescriptor {
                series_index: 0,
                timestamp_nsec: 0,
                additional_indexes: vec![],
                offset: 0,
                length: 0,
            })
            .unwrap_err();
        assert!(matches!(err, BddfError::UnknownSeries { .. }));
    }

    #[test]
    fn test_file_index_wire_round_trip() {
        let index = sample_index();
        let decoded = file_index_from_proto(file_index_to_proto(&index)).unwrap();
        assert_eq!(decoded, index);
    }

    #[test]
    fn test_rejects_wrong_index_arity() {
        let mut raw = file_index_to_proto(&sample_index());
        raw.series_block_indexes[0].block_entries[0]
            .additional_indexes
            .push(99);
        assert!(matches!(
            file_index_from_proto(raw),
            Err(BddfError::MalformedFile { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_block_index() {
        let mut raw = file_index_to_proto(&sample_index());
        raw.series_block_indexes.pop();
        assert!(file_index_from_proto(raw).is_err());
    }

    #[test]
    fn test_rejects_unspecified_pod_type() {
        let mut raw = series_descriptor_to_proto(&sample_index().series[1]);
        raw.data_type = Some(proto::series_descriptor::DataType::PodType(
            proto::PodTypeDescriptor {
                pod_type: 0,
                dimension: vec![],
            },
        ));
        assert!(matches!(
            series_descriptor_from_proto(raw),
            Err(BddfError::MalformedFile { .. })
        ));
    }

    #[test]
    fn test_rejects_descriptor_without_kind() {
        let mut raw = series_descriptor_to_proto(&sample_index().series[0]);
        raw.data_type = None;
        assert!(series_descriptor_from_proto(raw).is_err());
    }
}
