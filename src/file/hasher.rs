//! Content hashing collaborator.
//!
//! # Overview
//!
//! Hashing is consumed as an opaque deterministic function from bytes to a
//! fixed-length [`Digest`]. The [`ContentHasher`] trait is that function;
//! [`HashAlgorithm`] selects one of the built-in implementations:
//!
//! | Algorithm | Digest length | Hex characters |
//! |-----------|---------------|----------------|
//! | SHA-1     | 20 bytes      | 40             |
//! | SHA-256   | 32 bytes      | 64             |
//! | BLAKE3    | 32 bytes      | 64             |
//!
//! SHA-1 is the default so that digests line up with what common command-line
//! tools print.
//!
//! # Example
//!
//! ```
//! use dupfind::file::{ContentHasher, HashAlgorithm};
//!
//! let digest = HashAlgorithm::Sha1.digest(b"abc");
//! assert_eq!(digest.to_string(), "A9993E364706816ABA3E25717850C26C9CD0D89D");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::Digest as _;

/// A computed content digest.
///
/// Displays as uppercase hexadecimal. Ordering is byte-wise, which is also the
/// order of the hex strings.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(Vec<u8>);

impl Digest {
    /// Wrap raw digest bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse a hexadecimal digest (either case).
    ///
    /// # Errors
    ///
    /// Returns [`DigestParseError`] if the string is empty, has an odd number
    /// of characters or contains a non-hex character.
    pub fn from_hex(hex: &str) -> Result<Self, DigestParseError> {
        if hex.is_empty() {
            return Err(DigestParseError::Empty);
        }
        if let Some((position, ch)) = hex.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
            return Err(DigestParseError::InvalidCharacter { ch, position });
        }
        if hex.len() % 2 != 0 {
            return Err(DigestParseError::OddLength(hex.len()));
        }

        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| DigestParseError::InvalidCharacter { ch: '?', position: 0 })?;

        Ok(Self(bytes))
    }

    /// The raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Uppercase hexadecimal rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        use fmt::Write;
        self.0.iter().fold(String::with_capacity(self.0.len() * 2), |mut s, b| {
            let _ = write!(s, "{:02X}", b);
            s
        })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

impl FromStr for Digest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.trim())
    }
}

impl Serialize for Digest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Errors from parsing a hexadecimal digest.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestParseError {
    /// Nothing to parse.
    #[error("digest is empty")]
    Empty,

    /// Hex digests have two characters per byte.
    #[error("digest has an odd number of characters ({0})")]
    OddLength(usize),

    /// A character outside `0-9a-fA-F`.
    #[error("invalid character '{ch}' at position {position}")]
    InvalidCharacter {
        /// The offending character
        ch: char,
        /// Byte offset in the input
        position: usize,
    },
}

/// Pure function from content bytes to a digest.
pub trait ContentHasher: Send + Sync {
    /// Hash the full content.
    fn digest(&self, content: &[u8]) -> Digest;
}

/// Built-in hash algorithms.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-1 (20-byte digest)
    #[default]
    Sha1,
    /// SHA-256 (32-byte digest)
    Sha256,
    /// BLAKE3 (32-byte digest)
    Blake3,
}

impl HashAlgorithm {
    /// Digest length in bytes.
    #[must_use]
    pub fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 | Self::Blake3 => 32,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        })
    }
}

impl ContentHasher for HashAlgorithm {
    fn digest(&self, content: &[u8]) -> Digest {
        match self {
            Self::Sha1 => Digest(sha1::Sha1::digest(content).to_vec()),
            Self::Sha256 => Digest(sha2::Sha256::digest(content).to_vec()),
            Self::Blake3 => Digest(blake3::hash(content).as_bytes().to_vec()),
        }
    }
}
