//! Compiled name/path patterns.
//!
//! A pattern without `*` or `?` is stored as a lowercase literal and compared
//! with plain string equality. Anything else is translated into an anchored
//! regular expression where `*` matches any run of characters, `?` matches a
//! single character, and every other character is matched literally.

use regex::{Regex, RegexBuilder};

use super::MaskError;

/// Characters that turn a pattern into a wildcard pattern.
const WILDCARDS: &[char] = &['*', '?'];

/// How a pattern is matched against a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Exact, case-insensitive string equality.
    Literal,
    /// Anchored wildcard match.
    Wildcard,
}

#[derive(Debug, Clone)]
enum Matcher {
    Literal(String),
    Wildcard(Regex),
}

/// A single compiled mask.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// The lowercased pattern as written by the user.
    source: String,
    matcher: Matcher,
}

impl Pattern {
    /// Compile a raw user pattern.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::InvalidPattern`] if the translated expression
    /// cannot be compiled.
    pub fn compile(raw: &str) -> Result<Self, MaskError> {
        let source = raw.to_lowercase();

        if !source.contains(WILDCARDS) {
            return Ok(Self {
                matcher: Matcher::Literal(source.clone()),
                source,
            });
        }

        let translated = translate_wildcard(&source);
        let regex = RegexBuilder::new(&translated)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| MaskError::InvalidPattern {
                pattern: raw.to_string(),
                reason: e.to_string(),
            })?;

        log::trace!("Compiled mask '{}' as {}", raw, translated);

        Ok(Self {
            source,
            matcher: Matcher::Wildcard(regex),
        })
    }

    /// The lowercased source pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether this pattern was stored as a literal or a wildcard matcher.
    #[must_use]
    pub fn kind(&self) -> MatchKind {
        match self.matcher {
            Matcher::Literal(_) => MatchKind::Literal,
            Matcher::Wildcard(_) => MatchKind::Wildcard,
        }
    }

    /// Match an already lowercased subject.
    #[must_use]
    pub fn matches_lowered(&self, subject: &str) -> bool {
        match &self.matcher {
            Matcher::Literal(literal) => literal == subject,
            Matcher::Wildcard(regex) => regex.is_match(subject),
        }
    }

    /// Match a subject, folding its case first.
    #[must_use]
    pub fn matches(&self, subject: &str) -> bool {
        self.matches_lowered(&subject.to_lowercase())
    }
}

/// Translate a wildcard mask into an anchored regular expression.
///
/// ```
/// use dupfind::mask::translate_wildcard;
///
/// assert_eq!(translate_wildcard("*.txt"), r"^.*\.txt$");
/// assert_eq!(translate_wildcard("a?(1)"), r"^a.\(1\)$");
/// ```
#[must_use]
pub fn translate_wildcard(pattern: &str) -> String {
    let mut translated = String::with_capacity(pattern.len() * 2 + 2);
    translated.push('^');

    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => translated.push_str(".*"),
            '?' => translated.push('.'),
            other => translated.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }

    translated.push('$');
    translated
}
