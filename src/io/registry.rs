// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Series registry.
//!
//! Assigns stable 0-based series indices and enforces that no two series in a
//! file share an identical `(series_type, spec)` pair. The writer registers
//! series as they are added; the readers rebuild a registry from descriptors
//! discovered in the file so identifier lookups are hash lookups.

use std::collections::HashMap;

use crate::core::{BddfError, Result};

use super::metadata::{Annotations, SeriesDescriptor, SeriesIdentifier, SeriesKind};

/// Ordered series descriptors with an identifier lookup table.
#[derive(Debug, Clone, Default)]
pub struct SeriesRegistry {
    descriptors: Vec<SeriesDescriptor>,
    by_identifier: HashMap<SeriesIdentifier, u32>,
}

impl SeriesRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from descriptors in series-index order.
    pub fn from_descriptors(descriptors: &[SeriesDescriptor]) -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.insert(descriptor.clone())?;
        }
        Ok(registry)
    }

    /// Register a new series and return its index.
    pub fn register(
        &mut self,
        identifier: SeriesIdentifier,
        kind: SeriesKind,
        annotations: Annotations,
        additional_index_names: Vec<String>,
    ) -> Result<&SeriesDescriptor> {
        if self.by_identifier.contains_key(&identifier) {
            return Err(duplicate(&identifier));
        }
        let series_index = u32::try_from(self.descriptors.len())
            .map_err(|_| BddfError::Other("series index space exhausted".to_string()))?;
        self.by_identifier.insert(identifier.clone(), series_index);
        self.descriptors.push(SeriesDescriptor {
            series_index,
            identifier,
            kind,
            annotations,
            additional_index_names,
        });
        Ok(&self.descriptors[series_index as usize])
    }

    /// Insert a descriptor read from a file.
    ///
    /// Its index must be the next free index and its identifier must be new.
    pub fn insert(&mut self, descriptor: SeriesDescriptor) -> Result<()> {
        let expected = self.descriptors.len();
        if descriptor.series_index as usize != expected {
            return Err(BddfError::malformed(format!(
                "series {} declared where series {expected} was expected",
                descriptor.series_index
            )));
        }
        if self.by_identifier.contains_key(&descriptor.identifier) {
            return Err(duplicate(&descriptor.identifier));
        }
        self.by_identifier
            .insert(descriptor.identifier.clone(), descriptor.series_index);
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Look up a series index by identifier.
    pub fn lookup(&self, identifier: &SeriesIdentifier) -> Option<u32> {
        self.by_identifier.get(identifier).copied()
    }

    /// Get a descriptor by series index.
    pub fn get(&self, series_index: u32) -> Option<&SeriesDescriptor> {
        self.descriptors.get(series_index as usize)
    }

    /// Get a descriptor by series index or fail with `UnknownSeries`.
    pub fn require(&self, series_index: u32) -> Result<&SeriesDescriptor> {
        self.get(series_index)
            .ok_or_else(|| BddfError::unknown_series(format!("series index {series_index}")))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptors(&self) -> &[SeriesDescriptor] {
        &self.descriptors
    }
}

fn duplicate(identifier: &SeriesIdentifier) -> BddfError {
    BddfError::DuplicateSeries {
        series_type: identifier.series_type.clone(),
        spec: identifier.spec_string(),
    }
}
