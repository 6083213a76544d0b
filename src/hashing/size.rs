//! Artifact sizes and human-readable size formatting.

use std::path::Path;

use walkdir::WalkDir;

use crate::hashing::error::{HashError, HashResult};

const UNITS: [&str; 8] = ["", "K", "M", "G", "T", "P", "E", "Z"];

/// Scale a byte count to its largest whole unit, e.g. `1253656 => "1.20 MB"`.
///
/// Values still `>= factor` after zebibytes are reported in `Y`.
pub fn scale_bytes(value: u64, factor: u64, suffix: &str) -> String {
    let factor = factor as f64;
    let mut value = value as f64;
    for unit in UNITS {
        if value < factor {
            return format!("{:.2} {}{}", value, unit, suffix);
        }
        value /= factor;
    }
    format!("{:.2} Y{}", value, suffix)
}

/// [`scale_bytes`] with binary prefixes and a `B` suffix.
pub fn format_size(value: u64) -> String {
    scale_bytes(value, 1024, "B")
}

/// size of a single file in bytes
pub fn file_size(path: impl AsRef<Path>) -> HashResult<u64> {
    Ok(std::fs::metadata(path.as_ref())?.len())
}

/// Recursive sum of the sizes of all regular files below `path`.
///
/// Symlinks are not followed.
pub fn directory_size(path: impl AsRef<Path>) -> HashResult<u64> {
    let path = path.as_ref();
    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(|e| HashError::Walk {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_file() {
            let meta = entry.metadata().map_err(|e| HashError::Walk {
                path: entry.path().display().to_string(),
                reason: e.to_string(),
            })?;
            total += meta.len();
        }
    }
    Ok(total)
}
