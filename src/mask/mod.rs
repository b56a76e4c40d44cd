//! Mask engine deciding which filesystem objects are scanned and reported.
//!
//! # Overview
//!
//! Rules are grouped by three keys:
//!
//! - [`Family`]: [`Family::Consider`] rules decide whether an object is looked
//!   at at all (and, for directories, recursed into). [`Family::RecurseInto`]
//!   rules restrict which directories are *searched in*: a directory that fails
//!   them is still traversed, but it is not reported and its files are not
//!   reported either.
//! - [`Target`]: the subject a rule is matched against (file name, directory
//!   name, or the full path).
//! - [`Polarity`]: include or exclude.
//!
//! An object is ignored for a `(family, target)` pair when any exclude rule
//! matches it, or when the include set is non-empty and none of its rules
//! match. Empty sets impose no constraint, and a pair without any rules is
//! never evaluated. All matching is case-insensitive.
//!
//! The size range is checked before any name matching and only applies to
//! files.
//!
//! # Example
//!
//! ```
//! use dupfind::mask::{Family, MaskEngine, Polarity, Target};
//! use dupfind::scanner::FilesystemObject;
//!
//! let mut masks = MaskEngine::new();
//! masks
//!     .add_rules(Family::Consider, Target::DirName, Polarity::Exclude, ["skip_*"])
//!     .unwrap();
//!
//! let dir = FilesystemObject::directory("/data/skip_me");
//! assert!(masks.evaluate(Family::Consider, Target::DirName, &dir));
//! ```

mod pattern;

pub use pattern::{translate_wildcard, MatchKind, Pattern};

use std::collections::HashMap;

use crate::scanner::FilesystemObject;

/// Errors raised while building the mask configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MaskError {
    /// A wildcard pattern could not be compiled.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as supplied by the user
        pattern: String,
        /// Why compilation failed
        reason: String,
    },

    /// The minimum size is greater than the maximum size.
    #[error("Invalid size range: minimum {min} is greater than maximum {max}")]
    InvalidSizeRange {
        /// Lower bound
        min: u64,
        /// Upper bound
        max: u64,
    },
}

/// Rule family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    /// Whether an object is considered at all.
    Consider,
    /// Whether a directory's contents are searched in.
    RecurseInto,
}

/// The subject a rule is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    /// Base name of a file.
    FileName,
    /// Base name of a directory.
    DirName,
    /// The complete path string.
    FullPath,
}

/// Include or exclude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// The subject must match one of the rules.
    Include,
    /// The subject must match none of the rules.
    Exclude,
}

/// Inclusive file size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRange {
    /// Smallest accepted size
    pub min: u64,
    /// Largest accepted size
    pub max: u64,
}

impl Default for SizeRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: u64::MAX,
        }
    }
}

impl SizeRange {
    /// Build a range from optional bounds.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::InvalidSizeRange`] if `min > max`.
    pub fn new(min: Option<u64>, max: Option<u64>) -> Result<Self, MaskError> {
        let range = Self {
            min: min.unwrap_or(0),
            max: max.unwrap_or(u64::MAX),
        };
        if range.min > range.max {
            return Err(MaskError::InvalidSizeRange {
                min: range.min,
                max: range.max,
            });
        }
        Ok(range)
    }

    /// Whether `size` lies within the bounds.
    #[must_use]
    pub fn contains(&self, size: u64) -> bool {
        self.min <= size && size <= self.max
    }

    /// Whether the range accepts every size.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.min == 0 && self.max == u64::MAX
    }
}

#[derive(Debug, Clone, Default)]
struct RuleSet {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl RuleSet {
    fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    fn ignores(&self, lowered: &str) -> bool {
        if self.exclude.iter().any(|p| p.matches_lowered(lowered)) {
            return true;
        }
        !self.include.is_empty() && !self.include.iter().any(|p| p.matches_lowered(lowered))
    }

    fn excludes(&self, lowered: &str) -> bool {
        self.exclude.iter().any(|p| p.matches_lowered(lowered))
    }
}

/// Compiled mask configuration.
///
/// Built once before scanning; immutable while a walk is running.
#[derive(Debug, Clone, Default)]
pub struct MaskEngine {
    sets: HashMap<(Family, Target), RuleSet>,
    size: SizeRange,
}

impl MaskEngine {
    /// Create an engine without any rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and add a list of patterns to one rule set.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::InvalidPattern`] on the first pattern that fails to
    /// compile. Patterns before it are kept.
    pub fn add_rules<I, S>(
        &mut self,
        family: Family,
        target: Target,
        polarity: Polarity,
        patterns: I,
    ) -> Result<&mut Self, MaskError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = self.sets.entry((family, target)).or_default();
        for raw in patterns {
            let pattern = Pattern::compile(raw.as_ref())?;
            match polarity {
                Polarity::Include => set.include.push(pattern),
                Polarity::Exclude => set.exclude.push(pattern),
            }
        }
        Ok(self)
    }

    /// Set the inclusive file size bounds.
    pub fn set_size_range(&mut self, range: SizeRange) -> &mut Self {
        self.size = range;
        self
    }

    /// The configured file size bounds.
    #[must_use]
    pub fn size_range(&self) -> SizeRange {
        self.size
    }

    /// Whether any rule is configured for the pair.
    #[must_use]
    pub fn has_rules(&self, family: Family, target: Target) -> bool {
        self.sets.get(&(family, target)).is_some_and(|s| !s.is_empty())
    }

    /// Patterns configured for one rule set.
    pub fn patterns(
        &self,
        family: Family,
        target: Target,
        polarity: Polarity,
    ) -> impl Iterator<Item = &Pattern> {
        self.sets
            .get(&(family, target))
            .into_iter()
            .flat_map(move |set| match polarity {
                Polarity::Include => set.include.iter(),
                Polarity::Exclude => set.exclude.iter(),
            })
    }

    /// Whether the size range excludes this object.
    ///
    /// Only files evaluated against [`Target::FileName`] are size-checked.
    #[must_use]
    pub fn size_excludes(&self, target: Target, object: &FilesystemObject) -> bool {
        target == Target::FileName && !object.is_dir && !self.size.contains(object.size)
    }

    /// Match an already lowercased subject against one rule set.
    ///
    /// Returns `false` when the pair has no rules.
    #[must_use]
    pub fn is_subject_ignored(&self, family: Family, target: Target, lowered: &str) -> bool {
        self.sets
            .get(&(family, target))
            .is_some_and(|set| set.ignores(lowered))
    }

    /// Match an already lowercased subject against the exclude rules of one
    /// rule set only.
    #[must_use]
    pub fn is_subject_excluded(&self, family: Family, target: Target, lowered: &str) -> bool {
        self.sets
            .get(&(family, target))
            .is_some_and(|set| set.excludes(lowered))
    }

    /// Decide whether `object` is ignored for the given family and target.
    ///
    /// The subject is the object's base name for [`Target::FileName`] and
    /// [`Target::DirName`], and the full path for [`Target::FullPath`].
    #[must_use]
    pub fn evaluate(&self, family: Family, target: Target, object: &FilesystemObject) -> bool {
        if self.size_excludes(target, object) {
            return true;
        }
        if !self.has_rules(family, target) {
            return false;
        }
        self.is_subject_ignored(family, target, &subject_of(target, object))
    }
}

/// The lowercased string a rule with `target` is matched against.
#[must_use]
pub fn subject_of(target: Target, object: &FilesystemObject) -> String {
    match target {
        Target::FullPath => object.path.to_string_lossy().to_lowercase(),
        Target::FileName | Target::DirName => object.name().to_lowercase(),
    }
}
