// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Block codec.
//!
//! Every record after the file magic is a self-delimiting block:
//!
//! ```text
//! header: u64 LE = (block_type << 56) | body_len
//! descriptor body: DescriptorBlock (protobuf)
//! data body:       desc_len (u32 LE) | DataDescriptor (protobuf) | payload
//! ```
//!
//! Encoding helpers return owned byte buffers; decoding helpers read from any
//! [`Read`] so the random-access and streaming readers share them.

use std::io::{ErrorKind, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use prost::Message;

use crate::core::{nsec_to_timestamp, timestamp_to_nsec, BddfError, Result};

use super::constants::{
    BLOCK_HEADER_LEN, BLOCK_TYPE_DATA, BLOCK_TYPE_DESCRIPTOR, DATA_DESCRIPTOR_PREFIX_LEN,
    MAX_BLOCK_BODY_LEN,
};
use super::proto;

/// Kind of block announced by a block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Descriptor,
    Data,
}

impl BlockType {
    fn tag(self) -> u8 {
        match self {
            BlockType::Descriptor => BLOCK_TYPE_DESCRIPTOR,
            BlockType::Data => BLOCK_TYPE_DATA,
        }
    }
}

/// Decoded block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub block_type: BlockType,
    pub body_len: u64,
}

impl BlockHeader {
    pub fn new(block_type: BlockType, body_len: u64) -> Result<Self> {
        if body_len > MAX_BLOCK_BODY_LEN {
            return Err(BddfError::Other(format!(
                "block body of {body_len} bytes exceeds the 56-bit length field"
            )));
        }
        Ok(Self {
            block_type,
            body_len,
        })
    }

    pub fn encode(&self) -> [u8; 8] {
        let raw = ((self.block_type.tag() as u64) << 56) | self.body_len;
        raw.to_le_bytes()
    }

    pub fn decode(raw: u64) -> Result<Self> {
        let body_len = raw & MAX_BLOCK_BODY_LEN;
        let block_type = match (raw >> 56) as u8 {
            BLOCK_TYPE_DESCRIPTOR => BlockType::Descriptor,
            BLOCK_TYPE_DATA => BlockType::Data,
            other => {
                return Err(BddfError::malformed(format!(
                    "unknown block type 0x{other:02x}"
                )))
            }
        };
        Ok(Self {
            block_type,
            body_len,
        })
    }

    /// Read the next header.
    ///
    /// Returns `Ok(None)` when the source ends exactly on a block boundary and
    /// `TruncatedFile` when it ends inside the header.
    pub fn read<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let mut raw = [0u8; BLOCK_HEADER_LEN as usize];
        let filled = read_full(reader, &mut raw)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < raw.len() {
            return Err(BddfError::truncated(format!(
                "block header cut short after {filled} bytes"
            )));
        }
        Self::decode(u64::from_le_bytes(raw)).map(Some)
    }
}

/// Decoded data block.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBlockBody {
    pub series_index: u32,
    pub timestamp_nsec: i64,
    pub additional_indexes: Vec<i64>,
    /// Offset of the payload relative to the start of the block header
    pub payload_offset: u64,
    pub payload: Vec<u8>,
}

/// Encode a complete descriptor block (header + body).
pub fn encode_descriptor_block(descriptor: proto::descriptor_block::Descriptor) -> Result<Vec<u8>> {
    let body = proto::DescriptorBlock {
        descriptor: Some(descriptor),
    }
    .encode_to_vec();
    let header = BlockHeader::new(BlockType::Descriptor, body.len() as u64)?;
    let mut out = Vec::with_capacity(BLOCK_HEADER_LEN as usize + body.len());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Encode everything of a data block that precedes the payload.
///
/// The caller appends the payload bytes directly after the returned prefix,
/// so payloads are never copied into an intermediate buffer.
pub fn encode_data_prefix(
    series_index: u32,
    timestamp_nsec: i64,
    additional_indexes: &[i64],
    payload_len: usize,
) -> Result<Vec<u8>> {
    let descriptor = proto::DataDescriptor {
        series_index,
        timestamp: Some(nsec_to_timestamp(timestamp_nsec)),
        additional_indexes: additional_indexes.to_vec(),
    }
    .encode_to_vec();
    let desc_len = u32::try_from(descriptor.len())
        .map_err(|_| BddfError::Other("data descriptor too large".to_string()))?;
    let body_len = DATA_DESCRIPTOR_PREFIX_LEN + descriptor.len() as u64 + payload_len as u64;
    let header = BlockHeader::new(BlockType::Data, body_len)?;

    let mut out = Vec::with_capacity(
        (BLOCK_HEADER_LEN + DATA_DESCRIPTOR_PREFIX_LEN) as usize + descriptor.len(),
    );
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(&desc_len.to_le_bytes());
    out.extend_from_slice(&descriptor);
    Ok(out)
}

/// Read and decode a descriptor block body.
pub fn read_descriptor_body<R: Read>(
    reader: &mut R,
    body_len: u64,
) -> Result<Option<proto::descriptor_block::Descriptor>> {
    let body = read_exact_vec(reader, body_len, "descriptor block")?;
    let block = proto::DescriptorBlock::decode(body.as_slice())?;
    Ok(block.descriptor)
}

/// Read and decode a data block body.
pub fn read_data_body<R: Read>(reader: &mut R, body_len: u64) -> Result<DataBlockBody> {
    if body_len < DATA_DESCRIPTOR_PREFIX_LEN {
        return Err(BddfError::malformed(format!(
            "data block body of {body_len} bytes has no descriptor prefix"
        )));
    }
    let desc_len = reader
        .read_u32::<LittleEndian>()
        .map_err(|e| truncated_on_eof(e, "data descriptor length"))? as u64;
    let payload_len = body_len
        .checked_sub(DATA_DESCRIPTOR_PREFIX_LEN + desc_len)
        .ok_or_else(|| {
            BddfError::malformed(format!(
                "data descriptor of {desc_len} bytes overruns a {body_len}-byte block"
            ))
        })?;

    let raw_descriptor = read_exact_vec(reader, desc_len, "data descriptor")?;
    let descriptor = proto::DataDescriptor::decode(raw_descriptor.as_slice())?;
    let payload = read_exact_vec(reader, payload_len, "data payload")?;

    Ok(DataBlockBody {
        series_index: descriptor.series_index,
        timestamp_nsec: descriptor
            .timestamp
            .as_ref()
            .map(timestamp_to_nsec)
            .unwrap_or_default(),
        additional_indexes: descriptor.additional_indexes,
        payload_offset: BLOCK_HEADER_LEN + DATA_DESCRIPTOR_PREFIX_LEN + desc_len,
        payload,
    })
}

/// Read exactly `len` bytes without trusting `len` for the allocation size.
pub fn read_exact_vec<R: Read>(reader: &mut R, len: u64, what: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        return Err(BddfError::truncated(format!(
            "{what}: expected {len} bytes, found {}",
            buf.len()
        )));
    }
    Ok(buf)
}

/// Map an unexpected EOF to `TruncatedFile`; pass other I/O errors through.
pub fn truncated_on_eof(err: std::io::Error, what: &str) -> BddfError {
    if err.kind() == ErrorKind::UnexpectedEof {
        BddfError::truncated(format!("{what} cut short"))
    } else {
        err.into()
    }
}

/// Fill `buf` as far as the source allows and return the byte count.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
