//! Content fingerprinting and size helpers.
//!
//! Artifact keys are lowercase hex digests. Files are streamed through the
//! hasher in chunks; in-memory content (such as serialized git metadata) is
//! hashed directly with SHA-256.

mod checksum;
mod error;
mod size;

pub use checksum::{hash_content, hash_file, hash_reader, HashAlgorithm, Hasher, DEFAULT_CHUNK_SIZE};
pub use error::{HashError, HashResult};
pub use size::{directory_size, file_size, format_size, scale_bytes};
