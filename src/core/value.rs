// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Plain-old-data sample model.
//!
//! Pod series store fixed-width little-endian scalars. [`PodType`] names the
//! scalar kind recorded in the series descriptor, [`PodScalar`] ties a Rust
//! primitive to its `PodType`, and [`PodValue`] is the dynamically typed form
//! used when the element type is only known at runtime.

use super::error::{BddfError, Result};

/// Scalar element type of a pod series.
///
/// Discriminants are the on-disk values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum PodType {
    /// Not set; never valid in a written file
    Unspecified = 0,
    /// 8-bit signed integer
    Int8 = 1,
    /// 16-bit signed integer
    Int16 = 2,
    /// 32-bit signed integer
    Int32 = 3,
    /// 64-bit signed integer
    Int64 = 4,
    /// 8-bit unsigned integer
    Uint8 = 5,
    /// 16-bit unsigned integer
    Uint16 = 6,
    /// 32-bit unsigned integer
    Uint32 = 7,
    /// 64-bit unsigned integer
    Uint64 = 8,
    /// 32-bit float
    Float32 = 9,
    /// 64-bit float
    Float64 = 10,
}

impl PodType {
    /// Get the encoded size in bytes of one scalar, if the type is set.
    pub const fn size(self) -> Option<usize> {
        match self {
            PodType::Unspecified => None,
            PodType::Int8 | PodType::Uint8 => Some(1),
            PodType::Int16 | PodType::Uint16 => Some(2),
            PodType::Int32 | PodType::Uint32 | PodType::Float32 => Some(4),
            PodType::Int64 | PodType::Uint64 | PodType::Float64 => Some(8),
        }
    }

    /// Lower-case name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            PodType::Unspecified => "unspecified",
            PodType::Int8 => "int8",
            PodType::Int16 => "int16",
            PodType::Int32 => "int32",
            PodType::Int64 => "int64",
            PodType::Uint8 => "uint8",
            PodType::Uint16 => "uint16",
            PodType::Uint32 => "uint32",
            PodType::Uint64 => "uint64",
            PodType::Float32 => "float32",
            PodType::Float64 => "float64",
        }
    }

    /// Decode a packed little-endian buffer into dynamically typed values.
    pub fn decode_values(self, bytes: &[u8]) -> Result<Vec<PodValue>> {
        match self {
            PodType::Unspecified => Err(BddfError::decode("pod", "pod type is unspecified")),
            PodType::Int8 => decode_as::<i8>(bytes),
            PodType::Int16 => decode_as::<i16>(bytes),
            PodType::Int32 => decode_as::<i32>(bytes),
            PodType::Int64 => decode_as::<i64>(bytes),
            PodType::Uint8 => decode_as::<u8>(bytes),
            PodType::Uint16 => decode_as::<u16>(bytes),
            PodType::Uint32 => decode_as::<u32>(bytes),
            PodType::Uint64 => decode_as::<u64>(bytes),
            PodType::Float32 => decode_as::<f32>(bytes),
            PodType::Float64 => decode_as::<f64>(bytes),
        }
    }
}

fn decode_as<T: PodScalar>(bytes: &[u8]) -> Result<Vec<PodValue>> {
    Ok(decode_scalars::<T>(bytes)?
        .into_iter()
        .map(PodScalar::into_value)
        .collect())
}

/// A single pod scalar of any supported type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PodValue {
    /// Signed 8-bit integer.
    Int8(i8),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 8-bit integer.
    Uint8(u8),
    /// Unsigned 16-bit integer.
    Uint16(u16),
    /// Unsigned 32-bit integer.
    Uint32(u32),
    /// Unsigned 64-bit integer.
    Uint64(u64),
    /// IEEE 754 single-precision float.
    Float32(f32),
    /// IEEE 754 double-precision float.
    Float64(f64),
}

impl PodValue {
    /// The pod type of this value.
    pub fn pod_type(&self) -> PodType {
        match self {
            PodValue::Int8(_) => PodType::Int8,
            PodValue::Int16(_) => PodType::Int16,
            PodValue::Int32(_) => PodType::Int32,
            PodValue::Int64(_) => PodType::Int64,
            PodValue::Uint8(_) => PodType::Uint8,
            PodValue::Uint16(_) => PodType::Uint16,
            PodValue::Uint32(_) => PodType::Uint32,
            PodValue::Uint64(_) => PodType::Uint64,
            PodValue::Float32(_) => PodType::Float32,
            PodValue::Float64(_) => PodType::Float64,
        }
    }

    /// Widen to f64 (lossy for 64-bit integers beyond 2^53).
    pub fn as_f64(&self) -> f64 {
        match *self {
            PodValue::Int8(v) => v as f64,
            PodValue::Int16(v) => v as f64,
            PodValue::Int32(v) => v as f64,
            PodValue::Int64(v) => v as f64,
            PodValue::Uint8(v) => v as f64,
            PodValue::Uint16(v) => v as f64,
            PodValue::Uint32(v) => v as f64,
            PodValue::Uint64(v) => v as f64,
            PodValue::Float32(v) => v as f64,
            PodValue::Float64(v) => v,
        }
    }
}

/// Rust primitive that can be stored in a pod series.
pub trait PodScalar: Copy + 'static {
    /// Pod type recorded for series of this scalar.
    const POD_TYPE: PodType;
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Append the little-endian encoding to `buf`.
    fn write_le(self, buf: &mut Vec<u8>);

    /// Decode from exactly `SIZE` little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Wrap as a [`PodValue`].
    fn into_value(self) -> PodValue;
}

macro_rules! impl_pod_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl PodScalar for $ty {
                const POD_TYPE: PodType = PodType::$variant;
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn write_le(self, buf: &mut Vec<u8>) {
                    buf.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }

                fn into_value(self) -> PodValue {
                    PodValue::$variant(self)
                }
            }
        )*
    };
}

impl_pod_scalar!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float32,
    f64 => Float64,
);

/// Pack scalars into a little-endian buffer.
pub fn encode_scalars<T: PodScalar>(values: &[T]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(values.len() * T::SIZE);
    for &value in values {
        value.write_le(&mut buf);
    }
    buf
}

/// Unpack a little-endian buffer of `T` scalars.
pub fn decode_scalars<T: PodScalar>(bytes: &[u8]) -> Result<Vec<T>> {
    if bytes.len() % T::SIZE != 0 {
        return Err(BddfError::decode(
            "pod",
            format!(
                "{} bytes is not a multiple of the {}-byte {} width",
                bytes.len(),
                T::SIZE,
                T::POD_TYPE.as_str()
            ),
        ));
    }
    Ok(bytes.chunks_exact(T::SIZE).map(T::read_le).collect())
}
