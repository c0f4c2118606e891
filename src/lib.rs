// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # BDDF
//!
//! Self-describing binary container for multiplexed, timestamped robot data.
//!
//! A BDDF file holds any number of independently indexed series (sensor
//! frames, protobuf messages, scalar telemetry, captured RPC traffic), each
//! a sequence of timestamped byte blocks. The library is organized as:
//! - `core/` - Error type, pod scalar model, timestamp helpers
//! - `io/` - Block codec, file index, [`DataWriter`], [`DataReader`] and
//!   [`StreamDataReader`]
//! - `encoding/` - Typed adapters (message, protobuf, pod, gRPC)
//!
//! ## Example: Writing
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bddf::core::PodType;
//! use bddf::encoding::PodSeriesWriter;
//! use bddf::io::{Annotations, DataWriter, SeriesIdentifier, SeriesOptions};
//!
//! let annotations: Annotations = [("robot".to_string(), "spot".to_string())].into();
//! let writer = DataWriter::create("run.bddf", annotations)?;
//! let battery = PodSeriesWriter::new(
//!     &writer,
//!     SeriesIdentifier::from_pairs("battery", [("cell", "0")]),
//!     PodType::Float32,
//!     SeriesOptions::new(),
//! )?;
//! battery.write(1_700_000_000_000_000_000, &[0.93f32])?;
//! writer.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Reading
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bddf::io::{DataReader, StreamDataReader};
//!
//! // Random access through the trailing index
//! let reader = DataReader::open("run.bddf")?;
//! let block = reader.read(0, 0)?;
//! println!("{} bytes at {}", block.payload.len(), block.timestamp_nsec());
//!
//! // Forward-only, also works on files that were never closed
//! for block in StreamDataReader::open("run.bddf")? {
//!     let block = block?;
//!     println!("{} -> {} bytes", block.series.identifier, block.payload.len());
//! }
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use crate::core::{BddfError, PodScalar, PodType, PodValue, Result};

// Format engine
pub mod io;

// Re-export key I/O types
pub use io::{
    Annotations, BlockDescriptor, DataReader, DataWriter, FileIndex, SeriesDescriptor,
    SeriesIdentifier, SeriesKind, SeriesOptions, StreamDataReader,
};

// Typed series adapters
pub mod encoding;
