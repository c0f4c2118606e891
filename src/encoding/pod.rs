// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Pod (plain old data) series.
//!
//! A pod block packs one or more samples sharing a timestamp. A sample is
//! `product(dimensions)` little-endian scalars of the series' [`PodType`].
//!
//! # Example
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bddf::core::PodType;
//! use bddf::encoding::pod::{PodSeriesReader, PodSeriesWriter};
//! use bddf::io::{DataReader, DataWriter, SeriesIdentifier, SeriesOptions};
//!
//! let writer = DataWriter::create("imu.bddf", Default::default())?;
//! let accel = PodSeriesWriter::new(
//!     &writer,
//!     SeriesIdentifier::from_pairs("imu", [("axis", "z")]),
//!     PodType::Float32,
//!     SeriesOptions::new().annotation("unit", "m/s^2"),
//! )?;
//! accel.write(1_000, &[9.81f32, 9.79, 9.80])?;
//! writer.close()?;
//!
//! let reader = DataReader::open("imu.bddf")?;
//! let accel = PodSeriesReader::open(&reader, &SeriesIdentifier::from_pairs("imu", [("axis", "z")]))?;
//! let (timestamp_nsec, samples) = accel.read_samples::<f32>(0)?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};

use crate::core::{decode_scalars, encode_scalars, BddfError, PodScalar, PodType, PodValue, Result};
use crate::io::metadata::{BlockDescriptor, PodKind, SeriesDescriptor, SeriesIdentifier, SeriesKind};
use crate::io::traits::{BlockDecoder, SeriesReader};
use crate::io::{DataReader, DataWriter, SeriesOptions};

/// Decodes pod payloads into dynamically typed values.
#[derive(Debug, Clone, Copy, Default)]
pub struct PodDecoder;

impl BlockDecoder for PodDecoder {
    type Output = Vec<PodValue>;

    fn check(&self, series: &SeriesDescriptor) -> Result<()> {
        pod_kind(series).map(|_| ())
    }

    fn decode(&self, series: &SeriesDescriptor, payload: &[u8]) -> Result<Vec<PodValue>> {
        pod_kind(series)?.pod_type.decode_values(payload)
    }
}

fn pod_kind(series: &SeriesDescriptor) -> Result<&PodKind> {
    series.kind.as_pod().ok_or_else(|| {
        BddfError::schema_mismatch(
            series.series_index,
            format!("{} is not a pod series", series.identifier),
        )
    })
}

fn check_scalar<T: PodScalar>(series_index: u32, kind: &PodKind) -> Result<()> {
    if T::POD_TYPE == kind.pod_type {
        Ok(())
    } else {
        Err(BddfError::schema_mismatch(
            series_index,
            format!(
                "series stores {} but {} was requested",
                kind.pod_type.as_str(),
                T::POD_TYPE.as_str()
            ),
        ))
    }
}

/// Writer for one pod series.
pub struct PodSeriesWriter<'a, W: Write> {
    writer: &'a DataWriter<W>,
    series_index: u32,
    kind: PodKind,
}

impl<'a, W: Write> PodSeriesWriter<'a, W> {
    /// Register a scalar pod series.
    pub fn new(
        writer: &'a DataWriter<W>,
        identifier: SeriesIdentifier,
        pod_type: PodType,
        options: SeriesOptions,
    ) -> Result<Self> {
        Self::with_kind(writer, identifier, PodKind::scalar(pod_type), options)
    }

    /// Register a pod series with an explicit sample shape.
    pub fn with_kind(
        writer: &'a DataWriter<W>,
        identifier: SeriesIdentifier,
        kind: PodKind,
        options: SeriesOptions,
    ) -> Result<Self> {
        if kind.pod_type == PodType::Unspecified {
            return Err(BddfError::Other(format!(
                "pod series {identifier} needs a pod type"
            )));
        }
        let series_index = writer.add_series(identifier, SeriesKind::Pod(kind.clone()), options)?;
        Ok(Self {
            writer,
            series_index,
            kind,
        })
    }

    pub fn series_index(&self) -> u32 {
        self.series_index
    }

    pub fn pod_kind(&self) -> &PodKind {
        &self.kind
    }

    /// Write one or more samples sharing `timestamp_nsec`.
    pub fn write<T: PodScalar>(&self, timestamp_nsec: i64, values: &[T]) -> Result<BlockDescriptor> {
        self.write_with_indexes(timestamp_nsec, values, &[])
    }

    /// Write a single scalar.
    pub fn write_value<T: PodScalar>(&self, timestamp_nsec: i64, value: T) -> Result<BlockDescriptor> {
        self.write(timestamp_nsec, &[value])
    }

    /// Write samples with additional index values.
    ///
    /// Fails with `SchemaMismatch` if `T` is not the series' scalar type or
    /// `values` is not a positive multiple of the sample size.
    pub fn write_with_indexes<T: PodScalar>(
        &self,
        timestamp_nsec: i64,
        values: &[T],
        additional_indexes: &[i64],
    ) -> Result<BlockDescriptor> {
        check_scalar::<T>(self.series_index, &self.kind)?;
        let sample_len = self.kind.sample_len();
        if values.is_empty() || sample_len == 0 || values.len() % sample_len != 0 {
            return Err(BddfError::schema_mismatch(
                self.series_index,
                format!(
                    "{} values is not a positive multiple of the {sample_len}-value sample",
                    values.len()
                ),
            ));
        }
        self.writer.write_block(
            self.series_index,
            timestamp_nsec,
            &encode_scalars(values),
            additional_indexes,
        )
    }
}

/// Reader for one pod series.
pub struct PodSeriesReader<'a, R: Read + Seek> {
    reader: &'a DataReader<R>,
    inner: SeriesReader<'a, R, PodDecoder>,
    kind: &'a PodKind,
}

impl<'a, R: Read + Seek> PodSeriesReader<'a, R> {
    /// Bind to the unique pod series whose spec equals `spec`.
    ///
    /// Fails with `UnknownSeries` when no pod series, or more than one,
    /// carries that spec.
    pub fn new(reader: &'a DataReader<R>, spec: &BTreeMap<String, String>) -> Result<Self> {
        let mut matches = reader
            .series_descriptors()
            .iter()
            .filter(|series| series.kind.as_pod().is_some() && series.identifier.spec == *spec);
        let series = matches
            .next()
            .ok_or_else(|| BddfError::unknown_series(format!("pod series with spec {spec:?}")))?;
        if matches.next().is_some() {
            return Err(BddfError::unknown_series(format!(
                "several pod series share spec {spec:?}"
            )));
        }
        Self::from_series_index(reader, series.series_index)
    }

    /// Bind to the series registered under `identifier`.
    pub fn open(reader: &'a DataReader<R>, identifier: &SeriesIdentifier) -> Result<Self> {
        let series_index = reader
            .series_index(identifier)
            .ok_or_else(|| BddfError::unknown_series(identifier.to_string()))?;
        Self::from_series_index(reader, series_index)
    }

    /// Bind to series `series_index`, which must be a pod series.
    pub fn from_series_index(reader: &'a DataReader<R>, series_index: u32) -> Result<Self> {
        let inner = SeriesReader::new(reader, series_index, PodDecoder)?;
        let kind = pod_kind(inner.descriptor())?;
        Ok(Self {
            reader,
            inner,
            kind,
        })
    }

    pub fn pod_type(&self) -> PodType {
        self.kind.pod_type
    }

    pub fn pod_kind(&self) -> &'a PodKind {
        self.kind
    }

    /// Descriptor of the series, including its annotations.
    pub fn series_descriptor(&self) -> &'a SeriesDescriptor {
        self.inner.descriptor()
    }

    pub fn num_data_blocks(&self) -> usize {
        self.inner.num_blocks()
    }

    /// Read block `block_index` as typed scalars.
    ///
    /// Fails with `SchemaMismatch` if `T` is not the series' scalar type.
    pub fn read_samples<T: PodScalar>(&self, block_index: usize) -> Result<(i64, Vec<T>)> {
        let series_index = self.inner.series_index();
        check_scalar::<T>(series_index, self.kind)?;
        let block = self.reader.read(series_index, block_index)?;
        Ok((block.timestamp_nsec(), decode_scalars(&block.payload)?))
    }

    /// Read block `block_index` as dynamically typed values.
    pub fn read_values(&self, block_index: usize) -> Result<(i64, Vec<PodValue>)> {
        self.inner.read(block_index)
    }
}
