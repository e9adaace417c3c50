//! Pairwise subsequence matching between two stream buffers.
//!
//! # Overview
//!
//! A smaller stream matches a larger one when:
//! 1. the whole smaller buffer occurs contiguously in the larger one, or
//! 2. its first `threshold`% occurs in the larger one, or
//! 3. its last `threshold`% occurs in the larger one.
//!
//! The window length is `floor(len(small) * threshold / 100)`. A window of
//! zero bytes never produces a partial match, and a window covering the whole
//! buffer is not re-checked after the complete check failed.
//!
//! Containment uses [`memchr::memmem`], so the needle is preprocessed once
//! per [`SubsequenceMatcher`] and reused for every haystack.
//!
//! # Example
//!
//! ```
//! use vidupe::streams::{find_match, MatchKind, Threshold};
//!
//! let large = b"0123456789abcdef";
//! let threshold = Threshold::new(50.0).unwrap();
//!
//! assert_eq!(find_match(b"4567", large, threshold), Some(MatchKind::Complete));
//! assert_eq!(find_match(b"89abXXXX", large, threshold), Some(MatchKind::Prefix));
//! assert_eq!(find_match(b"XXXXcdef", large, threshold), Some(MatchKind::Suffix));
//! assert_eq!(find_match(b"XXXXYYYY", large, threshold), None);
//! ```

use std::fmt;

use memchr::memmem::Finder;
use serde::Serialize;

/// Percentage of the smaller stream used for partial matching.
///
/// Always within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Threshold(f64);

impl Threshold {
    /// Default threshold used when none is configured.
    pub const DEFAULT: Threshold = Threshold(95.0);

    /// Create a validated threshold.
    ///
    /// # Errors
    ///
    /// Returns `ThresholdError` if `value` is not a finite number in `[0, 100]`.
    pub fn new(value: f64) -> Result<Self, ThresholdError> {
        if value.is_finite() && (0.0..=100.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ThresholdError::OutOfRange(value))
        }
    }

    /// The percentage value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Length of the partial window for a buffer of `len` bytes.
    ///
    /// ```
    /// use vidupe::streams::Threshold;
    ///
    /// assert_eq!(Threshold::new(95.0).unwrap().window_len(10), 9);
    /// assert_eq!(Threshold::new(0.0).unwrap().window_len(10), 0);
    /// assert_eq!(Threshold::new(100.0).unwrap().window_len(10), 10);
    /// ```
    #[must_use]
    pub fn window_len(self, len: usize) -> usize {
        let window = (len as f64 * self.0 / 100.0).floor() as usize;
        window.min(len)
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<f64> for Threshold {
    type Error = ThresholdError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Invalid threshold values.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    /// Threshold outside `[0, 100]` or not a number.
    #[error("{0} is out of range. Must be between 0 and 100.")]
    OutOfRange(f64),
}

/// Which check confirmed a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// The whole smaller stream occurs in the larger one.
    Complete,
    /// The leading window of the smaller stream occurs in the larger one.
    Prefix,
    /// The trailing window of the smaller stream occurs in the larger one.
    Suffix,
}

impl MatchKind {
    /// Short machine-friendly name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Prefix => "prefix",
            Self::Suffix => "suffix",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preprocessed searcher for one smaller stream.
///
/// Build it once per small buffer and call [`find_in`](Self::find_in) for
/// every larger candidate.
pub struct SubsequenceMatcher<'a> {
    full: Finder<'a>,
    prefix: Option<Finder<'a>>,
    suffix: Option<Finder<'a>>,
}

impl<'a> SubsequenceMatcher<'a> {
    /// Prepare searchers for `small` at the given threshold.
    #[must_use]
    pub fn new(small: &'a [u8], threshold: Threshold) -> Self {
        let window = threshold.window_len(small.len());
        // Empty windows and full-length windows add nothing over the complete check.
        let partial = window > 0 && window < small.len();

        Self {
            full: Finder::new(small),
            prefix: partial.then(|| Finder::new(&small[..window])),
            suffix: partial.then(|| Finder::new(&small[small.len() - window..])),
        }
    }

    /// Check the prepared stream against `large`.
    #[must_use]
    pub fn find_in(&self, large: &[u8]) -> Option<MatchKind> {
        if self.full.find(large).is_some() {
            return Some(MatchKind::Complete);
        }
        if let Some(ref prefix) = self.prefix {
            if prefix.find(large).is_some() {
                return Some(MatchKind::Prefix);
            }
        }
        if let Some(ref suffix) = self.suffix {
            if suffix.find(large).is_some() {
                return Some(MatchKind::Suffix);
            }
        }
        None
    }
}

/// Decide whether `small` matches `large`, and how.
#[must_use]
pub fn find_match(small: &[u8], large: &[u8], threshold: Threshold) -> Option<MatchKind> {
    SubsequenceMatcher::new(small, threshold).find_in(large)
}

/// Boolean form of [`find_match`].
#[must_use]
pub fn is_match(small: &[u8], large: &[u8], threshold: Threshold) -> bool {
    find_match(small, large, threshold).is_some()
}
