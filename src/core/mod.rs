// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout bddf.
//!
//! This module provides the foundational types for the library:
//! - [`BddfError`] - Error taxonomy shared by writers, readers and adapters
//! - [`PodType`] / [`PodScalar`] / [`PodValue`] - Fixed-width sample model
//! - Timestamp conversions between nanoseconds and `prost_types::Timestamp`

pub mod error;
pub mod time;
pub mod value;

pub use error::{BddfError, Result};
pub use time::{now_nsec, nsec_to_timestamp, timestamp_to_nsec};
pub use value::{decode_scalars, encode_scalars, PodScalar, PodType, PodValue};
