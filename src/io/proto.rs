// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Protobuf wire descriptors.
//!
//! Descriptor blocks and the descriptor prefix of data blocks are protobuf
//! messages. They are declared here with prost derives so the crate needs no
//! build script. These types are the on-disk schema only; the rest of the
//! crate works with the domain types in [`crate::io::metadata`].

use std::collections::BTreeMap;

use prost_types::Timestamp;

use crate::core::PodType;

/// Three-part format version.
#[derive(Clone, PartialEq, prost::Message)]
pub struct FileFormatVersion {
    #[prost(uint32, tag = "1")]
    pub major_version: u32,
    #[prost(uint32, tag = "2")]
    pub minor_version: u32,
    #[prost(uint32, tag = "3")]
    pub patch_level: u32,
}

/// First descriptor of every file.
#[derive(Clone, PartialEq, prost::Message)]
pub struct FileFormatDescriptor {
    #[prost(message, optional, tag = "1")]
    pub version: Option<FileFormatVersion>,
    #[prost(btree_map = "string, string", tag = "2")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SeriesIdentifier {
    #[prost(string, tag = "1")]
    pub series_type: String,
    #[prost(btree_map = "string, string", tag = "2")]
    pub spec: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MessageTypeDescriptor {
    #[prost(string, tag = "1")]
    pub content_type: String,
    #[prost(string, tag = "2")]
    pub type_name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PodTypeDescriptor {
    #[prost(enumeration = "PodType", tag = "1")]
    pub pod_type: i32,
    #[prost(uint32, repeated, tag = "2")]
    pub dimension: Vec<u32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SeriesDescriptor {
    #[prost(uint32, tag = "1")]
    pub series_index: u32,
    #[prost(message, optional, tag = "2")]
    pub series_identifier: Option<SeriesIdentifier>,
    #[prost(oneof = "series_descriptor::DataType", tags = "3, 4")]
    pub data_type: Option<series_descriptor::DataType>,
    #[prost(btree_map = "string, string", tag = "5")]
    pub annotations: BTreeMap<String, String>,
    #[prost(string, repeated, tag = "6")]
    pub additional_index_names: Vec<String>,
}

pub mod series_descriptor {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum DataType {
        #[prost(message, tag = "3")]
        MessageType(super::MessageTypeDescriptor),
        #[prost(message, tag = "4")]
        PodType(super::PodTypeDescriptor),
    }
}

/// One data block as recorded in the file index.
#[derive(Clone, PartialEq, prost::Message)]
pub struct BlockEntry {
    #[prost(message, optional, tag = "1")]
    pub timestamp: Option<Timestamp>,
    #[prost(uint64, tag = "2")]
    pub file_offset: u64,
    #[prost(uint64, tag = "3")]
    pub length: u64,
    #[prost(int64, repeated, tag = "4")]
    pub additional_indexes: Vec<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SeriesBlockIndex {
    #[prost(uint32, tag = "1")]
    pub series_index: u32,
    #[prost(message, repeated, tag = "2")]
    pub block_entries: Vec<BlockEntry>,
    #[prost(uint64, tag = "3")]
    pub total_bytes: u64,
}

/// Final descriptor: every series and every block.
#[derive(Clone, PartialEq, prost::Message)]
pub struct FileIndex {
    #[prost(message, repeated, tag = "1")]
    pub series_descriptors: Vec<SeriesDescriptor>,
    #[prost(message, repeated, tag = "2")]
    pub series_block_indexes: Vec<SeriesBlockIndex>,
}

/// Body of a descriptor block.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DescriptorBlock {
    #[prost(oneof = "descriptor_block::Descriptor", tags = "1, 2, 3")]
    pub descriptor: Option<descriptor_block::Descriptor>,
}

pub mod descriptor_block {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Descriptor {
        #[prost(message, tag = "1")]
        FileDescriptor(super::FileFormatDescriptor),
        #[prost(message, tag = "2")]
        SeriesDescriptor(super::SeriesDescriptor),
        #[prost(message, tag = "3")]
        FileIndex(super::FileIndex),
    }
}

/// Prefix of every data block, followed by the payload.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DataDescriptor {
    #[prost(uint32, tag = "1")]
    pub series_index: u32,
    #[prost(message, optional, tag = "2")]
    pub timestamp: Option<Timestamp>,
    #[prost(int64, repeated, tag = "3")]
    pub additional_indexes: Vec<i64>,
}
