// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Builder pattern for creating data writers.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{BddfError, Result};
use crate::io::metadata::Annotations;

use super::DataWriter;

/// Default buffer capacity for file-backed writers (1 MiB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024 * 1024;

/// Configuration for creating a writer.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Path to the output file
    pub path: PathBuf,
    /// File-level annotations written into the header
    pub annotations: Annotations,
    /// Capacity of the `BufWriter` wrapping the file
    pub buffer_capacity: usize,
    /// Replace an existing file instead of failing
    pub overwrite: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            annotations: Annotations::new(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            overwrite: true,
        }
    }
}

/// Builder for creating data writers.
#[derive(Debug, Clone, Default)]
pub struct WriterBuilder {
    config: WriterConfig,
}

impl WriterBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the path to the output file.
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.path = path.as_ref().to_path_buf();
        self
    }

    /// Add one file-level annotation.
    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.annotations.insert(key.into(), value.into());
        self
    }

    /// Replace all file-level annotations.
    pub fn annotations(mut self, annotations: Annotations) -> Self {
        self.config.annotations = annotations;
        self
    }

    /// Set the output buffer capacity in bytes.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    /// Choose whether an existing file is replaced (default) or is an error.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.config.overwrite = overwrite;
        self
    }

    /// Create the file and write the header.
    pub fn build(self) -> Result<DataWriter<BufWriter<File>>> {
        let path = &self.config.path;
        if path.as_os_str().is_empty() {
            return Err(BddfError::Other("WriterBuilder: path is not set".to_string()));
        }
        if self.config.buffer_capacity == 0 {
            return Err(BddfError::Other(
                "WriterBuilder: buffer capacity must be positive".to_string(),
            ));
        }

        let file = if self.config.overwrite {
            File::create(path)?
        } else {
            OpenOptions::new().write(true).create_new(true).open(path)?
        };

        tracing::debug!(path = %path.display(), "creating BDDF file");
        let sink = BufWriter::with_capacity(self.config.buffer_capacity, file);
        DataWriter::new(sink, self.config.annotations)
    }

    /// Write the header into an arbitrary sink, ignoring path settings.
    pub fn build_with_sink<W: Write>(self, sink: W) -> Result<DataWriter<W>> {
        DataWriter::new(sink, self.config.annotations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_builder_default() {
        let builder = WriterBuilder::new();
        assert_eq!(builder.config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert!(builder.config.overwrite);
        assert!(builder.config.annotations.is_empty());
    }

    #[test]
    fn test_builder_fluent() {
        let builder = WriterBuilder::new()
            .path("output.bddf")
            .annotation("robot", "spot")
            .buffer_capacity(4096)
            .overwrite(false);

        assert_eq!(builder.config.path, PathBuf::from("output.bddf"));
        assert_eq!(
            builder.config.annotations.get("robot").map(String::as_str),
            Some("spot")
        );
        assert_eq!(builder.config.buffer_capacity, 4096);
        assert!(!builder.config.overwrite);
    }

    #[test]
    fn test_build_without_path_fails() {
        assert!(WriterBuilder::new().build().is_err());
    }

    #[test]
    fn test_build_with_zero_capacity_fails() {
        assert!(WriterBuilder::new()
            .path("unused.bddf")
            .buffer_capacity(0)
            .build()
            .is_err());
    }

    #[test]
    fn test_build_with_sink_keeps_annotations() {
        let writer = WriterBuilder::new()
            .annotation("site", "lab")
            .build_with_sink(Cursor::new(Vec::new()))
            .unwrap();
        assert_eq!(
            writer.annotations().get("site").map(String::as_str),
            Some("lab")
        );
    }
}
