//! Streaming checksums for files, open handles and in-memory content.
//!
//! Files are never read whole: the source is fed to an incremental hasher in
//! fixed-size chunks, so large artifacts cost one buffer of memory.

use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::str::FromStr;

use sha2::Digest;

use crate::hashing::error::{HashError, HashResult};

/// Default read size for chunked hashing (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Digest algorithms accepted for file checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    Sha1,
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
    Blake3,
}

impl HashAlgorithm {
    /// canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }

    /// create a fresh incremental hasher for this algorithm
    pub fn hasher(&self) -> Hasher {
        let state = match self {
            Self::Sha1 => HasherState::Sha1(sha1::Sha1::new()),
            Self::Sha224 => HasherState::Sha224(sha2::Sha224::new()),
            Self::Sha256 => HasherState::Sha256(sha2::Sha256::new()),
            Self::Sha384 => HasherState::Sha384(sha2::Sha384::new()),
            Self::Sha512 => HasherState::Sha512(sha2::Sha512::new()),
            Self::Blake3 => HasherState::Blake3(Box::new(blake3::Hasher::new())),
        };
        Hasher { state }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            _ => Err(HashError::UnknownAlgorithm(s.to_string())),
        }
    }
}

enum HasherState {
    Sha1(sha1::Sha1),
    Sha224(sha2::Sha224),
    Sha256(sha2::Sha256),
    Sha384(sha2::Sha384),
    Sha512(sha2::Sha512),
    Blake3(Box<blake3::Hasher>),
}

/// An incremental hasher over any supported algorithm.
pub struct Hasher {
    state: HasherState,
}

impl Hasher {
    /// feed more bytes
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Sha1(h) => h.update(data),
            HasherState::Sha224(h) => h.update(data),
            HasherState::Sha256(h) => h.update(data),
            HasherState::Sha384(h) => h.update(data),
            HasherState::Sha512(h) => h.update(data),
            HasherState::Blake3(h) => {
                h.update(data);
            }
        }
    }

    /// consume the hasher and return the lowercase hex digest
    pub fn hex_digest(self) -> String {
        match self.state {
            HasherState::Sha1(h) => hex::encode(h.finalize()),
            HasherState::Sha224(h) => hex::encode(h.finalize()),
            HasherState::Sha256(h) => hex::encode(h.finalize()),
            HasherState::Sha384(h) => hex::encode(h.finalize()),
            HasherState::Sha512(h) => hex::encode(h.finalize()),
            HasherState::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Hash a file on disk, reading it in `chunk_size` pieces.
pub fn hash_file(
    path: impl AsRef<Path>,
    algorithm: HashAlgorithm,
    chunk_size: usize,
) -> HashResult<String> {
    let mut file = File::open(path.as_ref())?;
    feed(&mut file, algorithm, chunk_size)
}

/// Hash an already-open handle.
///
/// The handle is rewound first, so a partially consumed file hashes the same
/// as the path it came from.
pub fn hash_reader<R: Read + Seek>(
    reader: &mut R,
    algorithm: HashAlgorithm,
    chunk_size: usize,
) -> HashResult<String> {
    reader.seek(SeekFrom::Start(0))?;
    feed(reader, algorithm, chunk_size)
}

fn feed<R: Read>(reader: &mut R, algorithm: HashAlgorithm, chunk_size: usize) -> HashResult<String> {
    if chunk_size == 0 {
        return Err(HashError::ZeroChunkSize);
    }

    let mut hasher = algorithm.hasher();
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hasher.hex_digest())
}

/// SHA-256 of in-memory content. Text is hashed as its UTF-8 bytes.
pub fn hash_content(content: impl AsRef<[u8]>) -> String {
    let mut hasher = HashAlgorithm::Sha256.hasher();
    hasher.update(content.as_ref());
    hasher.hex_digest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_hash_content_known_vector() {
        assert_eq!(hash_content("hello world"), HELLO_SHA256);
        assert_eq!(hash_content(b"x"), hash_content("x"));
        assert_eq!(hash_content(String::from("x")), hash_content(vec![b'x']));
    }

    #[test]
    fn test_hash_file_is_deterministic() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();

        let first = hash_file(file.path(), HashAlgorithm::Sha256, DEFAULT_CHUNK_SIZE).unwrap();
        let second = hash_file(file.path(), HashAlgorithm::Sha256, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, HELLO_SHA256);
    }

    #[test]
    fn test_small_chunks_match_single_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        file.write_all(&data).unwrap();

        let chunked = hash_file(file.path(), HashAlgorithm::Sha256, 7).unwrap();
        assert_eq!(chunked, hash_content(&data));
    }

    #[test]
    fn test_handle_is_rewound() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"hello world").unwrap();
        // cursor is at EOF after the write
        let digest = hash_reader(&mut file, HashAlgorithm::Sha256, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(digest, HELLO_SHA256);
    }

    #[test]
    fn test_other_algorithms() {
        let mut cursor = std::io::Cursor::new(b"hello world".to_vec());
        let sha1 = hash_reader(&mut cursor, HashAlgorithm::Sha1, 4).unwrap();
        assert_eq!(sha1, "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");

        let blake = hash_reader(&mut cursor, HashAlgorithm::Blake3, 4).unwrap();
        assert_eq!(blake, blake3::hash(b"hello world").to_hex().to_string());
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("SHA-512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
        assert!(matches!(
            "md4".parse::<HashAlgorithm>(),
            Err(HashError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn test_zero_chunk_rejected() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        assert!(matches!(
            hash_reader(&mut cursor, HashAlgorithm::Sha256, 0),
            Err(HashError::ZeroChunkSize)
        ));
    }
}
