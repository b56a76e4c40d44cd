//! Content and hash filter criteria.
//!
//! A file passes the filter when its content contains the needle (if one is
//! set) and its digest is in the allow list (if one is set). Empty criteria
//! impose no constraint.

use std::collections::BTreeSet;

use regex::bytes::{Regex, RegexBuilder};

use super::hasher::{Digest, DigestParseError};

/// Errors raised while building filter criteria.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A hash in the allow list is not valid hexadecimal.
    #[error("Invalid hash '{input}': {source}")]
    InvalidDigest {
        /// The string as supplied
        input: String,
        /// Parse failure
        #[source]
        source: DigestParseError,
    },

    /// The content needle could not be compiled.
    #[error("Invalid content search term: {0}")]
    InvalidNeedle(String),
}

/// A raw byte sequence searched for in file content.
///
/// Compiled once into a byte-level literal matcher, so arbitrary bytes
/// (including non-UTF-8 sequences) are allowed.
#[derive(Clone)]
pub struct ContentNeedle {
    bytes: Vec<u8>,
    matcher: Regex,
}

impl std::fmt::Debug for ContentNeedle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentNeedle")
            .field("bytes", &String::from_utf8_lossy(&self.bytes))
            .finish()
    }
}

impl ContentNeedle {
    /// Compile a needle. Returns `Ok(None)` for an empty needle.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidNeedle`] if the needle exceeds the
    /// matcher's size limits.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Option<Self>, FilterError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Ok(None);
        }

        let mut source = String::with_capacity(4 + bytes.len() * 4);
        source.push_str("(?-u)");
        for byte in &bytes {
            source.push_str(&format!("\\x{:02X}", byte));
        }

        let matcher = RegexBuilder::new(&source)
            .unicode(false)
            .build()
            .map_err(|e| FilterError::InvalidNeedle(e.to_string()))?;

        Ok(Some(Self { bytes, matcher }))
    }

    /// The raw needle bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether `haystack` contains the needle.
    #[must_use]
    pub fn is_found_in(&self, haystack: &[u8]) -> bool {
        self.matcher.is_match(haystack)
    }
}

/// Combined content and hash criteria.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    hashes: BTreeSet<Digest>,
    content: Option<ContentNeedle>,
}

impl FilterCriteria {
    /// Criteria that accept every file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add hex digests to the allow list.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidDigest`] on the first malformed digest.
    pub fn with_hashes<I, S>(mut self, hashes: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in hashes {
            let raw = raw.as_ref();
            let digest = raw.parse::<Digest>().map_err(|source| FilterError::InvalidDigest {
                input: raw.to_string(),
                source,
            })?;
            self.hashes.insert(digest);
        }
        Ok(self)
    }

    /// Set the content needle; an empty needle clears it.
    ///
    /// # Errors
    ///
    /// See [`ContentNeedle::new`].
    pub fn with_content(mut self, needle: impl Into<Vec<u8>>) -> Result<Self, FilterError> {
        self.content = ContentNeedle::new(needle)?;
        Ok(self)
    }

    /// The hash allow list.
    #[must_use]
    pub fn hashes(&self) -> &BTreeSet<Digest> {
        &self.hashes
    }

    /// The content needle, if any.
    #[must_use]
    pub fn content(&self) -> Option<&ContentNeedle> {
        self.content.as_ref()
    }

    /// Whether any criterion is set.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.hashes.is_empty() || self.content.is_some()
    }

    /// Whether a digest is allowed. An empty list allows every digest.
    #[must_use]
    pub fn allows(&self, digest: &Digest) -> bool {
        self.hashes.is_empty() || self.hashes.contains(digest)
    }
}
