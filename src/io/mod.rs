// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer for BDDF files.
//!
//! This module provides the format engine: the block codec, the series
//! registry, the file index, and the writer and readers built on them.

pub mod block;
pub mod constants;
pub mod detection;
pub mod index;
pub mod metadata;
pub mod proto;
pub mod registry;

// Re-exports
pub use detection::{has_bddf_magic, is_bddf_file};
pub use metadata::{
    Annotations, BlockDescriptor, FileIndex, FormatVersion, MessageKind, PodKind,
    SeriesBlockIndex, SeriesDescriptor, SeriesIdentifier, SeriesKind,
};
pub use registry::SeriesRegistry;

// Schema-agnostic series reading
pub mod traits;
pub use traits::{BlockDecoder, RawBlockDecoder, SeriesReader};

// Writer and readers
pub mod reader;
pub mod writer;
pub use reader::{DataBlock, DataReader, StreamBlock, StreamDataReader};
pub use writer::{DataWriter, SeriesOptions, WriterBuilder, WriterConfig};
