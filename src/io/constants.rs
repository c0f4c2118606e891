// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! BDDF format constants.
//!
//! Single source of truth for magic bytes, block type tags and footer
//! geometry shared by the writer and both readers.
//!
//! ```text
//! FILE_MAGIC
//! [descriptor: FileFormatDescriptor]
//! ([descriptor: SeriesDescriptor] | [data block])*
//! [descriptor: FileIndex]
//! footer: file_index_offset(u64) checksum(u32) END_MAGIC
//! ```

/// Magic bytes at the start of every BDDF file.
pub const FILE_MAGIC: [u8; 8] = [0x89, b'B', b'D', b'D', b'F', 0x0D, 0x0A, 0x1A];

/// Magic bytes closing the footer.
pub const END_MAGIC: [u8; 8] = [0x89, b'B', b'D', b'D', b'F', b'E', b'N', b'D'];

/// Format version written by this library.
pub const FORMAT_VERSION: (u32, u32, u32) = (1, 0, 0);

/// Block type tag for protobuf-encoded descriptor blocks.
pub const BLOCK_TYPE_DESCRIPTOR: u8 = 0x01;
/// Block type tag for data blocks.
pub const BLOCK_TYPE_DATA: u8 = 0x02;

/// Size of the u64 block header.
pub const BLOCK_HEADER_LEN: u64 = 8;
/// Size of the u32 descriptor-length prefix inside a data block body.
pub const DATA_DESCRIPTOR_PREFIX_LEN: u64 = 4;
/// Largest representable block body (56-bit length field).
pub const MAX_BLOCK_BODY_LEN: u64 = (1 << 56) - 1;

/// Footer: file index offset (8) + checksum (4) + end magic (8).
pub const FOOTER_LEN: u64 = 8 + 4 + END_MAGIC.len() as u64;

/// Content type of protobuf message series.
pub const PROTOBUF_CONTENT_TYPE: &str = "application/protobuf";
