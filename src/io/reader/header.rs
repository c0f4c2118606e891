// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Header and footer parsing shared by both readers.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{BddfError, Result};
use crate::io::block::{read_descriptor_body, read_exact_vec, BlockHeader, BlockType};
use crate::io::constants::{BLOCK_HEADER_LEN, END_MAGIC, FILE_MAGIC, FOOTER_LEN};
use crate::io::metadata::{Annotations, FormatVersion};
use crate::io::proto::descriptor_block::Descriptor;

/// Only files with this major version are readable.
pub const SUPPORTED_MAJOR_VERSION: u32 = 1;

/// Parsed file header: magic plus the `FileFormatDescriptor` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub version: FormatVersion,
    pub annotations: Annotations,
    /// Bytes occupied by the header (magic + first block)
    pub len: u64,
}

impl FileHeader {
    /// Parse the header from the current position of `reader`.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let magic = read_exact_vec(reader, FILE_MAGIC.len() as u64, "file magic")?;
        if magic != FILE_MAGIC {
            return Err(BddfError::malformed(format!(
                "bad file magic {} (expected {})",
                hex::encode(&magic),
                hex::encode(FILE_MAGIC)
            )));
        }

        let header = BlockHeader::read(reader)?
            .ok_or_else(|| BddfError::truncated("file ends before the format descriptor"))?;
        if header.block_type != BlockType::Descriptor {
            return Err(BddfError::malformed(
                "first block is not a format descriptor",
            ));
        }
        let descriptor = match read_descriptor_body(reader, header.body_len)? {
            Some(Descriptor::FileDescriptor(descriptor)) => descriptor,
            _ => {
                return Err(BddfError::malformed(
                    "first block is not a format descriptor",
                ))
            }
        };

        let version = descriptor
            .version
            .map(|v| FormatVersion::new(v.major_version, v.minor_version, v.patch_level))
            .ok_or_else(|| BddfError::malformed("format descriptor has no version"))?;
        if version.major != SUPPORTED_MAJOR_VERSION {
            return Err(BddfError::malformed(format!(
                "unsupported format version {version}"
            )));
        }

        Ok(Self {
            version,
            annotations: descriptor.annotations,
            len: FILE_MAGIC.len() as u64 + BLOCK_HEADER_LEN + header.body_len,
        })
    }
}

/// Fixed-size trailer pointing at the file index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub index_offset: u64,
    pub checksum: u32,
}

impl Footer {
    /// Decode the footer bytes.
    ///
    /// A missing end magic means the writer never closed the file, so it is
    /// reported as `TruncatedFile`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() as u64 != FOOTER_LEN {
            return Err(BddfError::truncated(format!(
                "footer must be {FOOTER_LEN} bytes, found {}",
                bytes.len()
            )));
        }
        let mut cursor = bytes;
        let index_offset = cursor.read_u64::<LittleEndian>()?;
        let checksum = cursor.read_u32::<LittleEndian>()?;
        if cursor != END_MAGIC {
            return Err(BddfError::truncated(format!(
                "no end magic (found {}); the file was not closed",
                hex::encode(cursor)
            )));
        }
        Ok(Self {
            index_offset,
            checksum,
        })
    }
}
