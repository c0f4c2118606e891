// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! BDDF detection by magic number.
//!
//! Only the leading file magic is inspected, so unfinished files (no
//! footer yet) are still recognized.
//!
//! # Example
//!
//! ```rust,no_run
//! use bddf::io::detection::is_bddf_file;
//!
//! if is_bddf_file("run.bddf") {
//!     println!("BDDF file");
//! }
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::constants::FILE_MAGIC;

/// Check whether `header` starts with the BDDF file magic.
pub fn has_bddf_magic(header: &[u8]) -> bool {
    header.starts_with(&FILE_MAGIC)
}

/// Check whether the file at `path` starts with the BDDF file magic.
///
/// Unreadable files are reported as not BDDF.
pub fn is_bddf_file<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    let mut header = Vec::with_capacity(FILE_MAGIC.len());
    let read = File::open(path).and_then(|file| {
        file.take(FILE_MAGIC.len() as u64)
            .read_to_end(&mut header)
    });
    match read {
        Ok(_) => has_bddf_magic(&header),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "cannot probe file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_temp_file(name: &str, data: &[u8]) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "bddf_test_detect_{}_{}.bddf",
            std::process::id(),
            name
        ));
        let mut file = File::create(&path).unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        path
    }

    #[test]
    fn test_has_bddf_magic() {
        let mut bytes = FILE_MAGIC.to_vec();
        bytes.extend_from_slice(b"rest");
        assert!(has_bddf_magic(&bytes));
        assert!(!has_bddf_magic(&FILE_MAGIC[..4]));
        assert!(!has_bddf_magic(b"\x89MCAP0\r\n"));
    }

    #[test]
    fn test_is_bddf_file() {
        let good = create_temp_file("good", &FILE_MAGIC);
        let bad = create_temp_file("bad", b"#ROSBAG V2.0\n");

        assert!(is_bddf_file(&good));
        assert!(!is_bddf_file(&bad));

        let _ = std::fs::remove_file(&good);
        let _ = std::fs::remove_file(&bad);
    }

    #[test]
    fn test_missing_file_is_not_bddf() {
        assert!(!is_bddf_file("/nonexistent/definitely/missing.bddf"));
    }
}
