//! Confirmed matches between a smaller and a larger stream.

use std::path::PathBuf;

use serde::Serialize;

use crate::streams::{MatchKind, Stream, Threshold};

/// A smaller stream found inside (or mostly inside) a larger one.
///
/// # Example
///
/// ```
/// use vidupe::duplicates::MatchPair;
/// use vidupe::streams::{MatchKind, Stream, Threshold};
/// use std::path::PathBuf;
///
/// let small = Stream::new(PathBuf::from("/t/Trailer_trimmed.h264"), 10);
/// let large = Stream::new(PathBuf::from("/t/Movie_trimmed.h264"), 100);
/// let pair = MatchPair::new(&small, &large, MatchKind::Complete, Threshold::default());
///
/// assert_eq!(pair.labels(), ("Trailer", "Movie"));
/// assert_eq!(
///     pair.describe(),
///     "Trailer is part of or matches Movie by more than 95% (complete match)"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchPair {
    /// Label of the smaller stream
    pub small: String,
    /// Label of the larger stream
    pub large: String,
    /// Path of the smaller stream
    pub small_path: PathBuf,
    /// Path of the larger stream
    pub large_path: PathBuf,
    /// Size of the smaller stream in bytes
    pub small_size: u64,
    /// Size of the larger stream in bytes
    pub large_size: u64,
    /// Check that confirmed the match
    pub kind: MatchKind,
    /// Threshold in effect when the match was found
    pub threshold: f64,
}

impl MatchPair {
    /// Record a match between two streams.
    #[must_use]
    pub fn new(small: &Stream, large: &Stream, kind: MatchKind, threshold: Threshold) -> Self {
        Self {
            small: small.label.clone(),
            large: large.label.clone(),
            small_path: small.path.clone(),
            large_path: large.path.clone(),
            small_size: small.size,
            large_size: large.size,
            kind,
            threshold: threshold.value(),
        }
    }

    /// The `(small, large)` label pair.
    #[must_use]
    pub fn labels(&self) -> (&str, &str) {
        (&self.small, &self.large)
    }

    /// One-line human description including the threshold and kind.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "{} is part of or matches {} by more than {}% ({} match)",
            self.small, self.large, self.threshold, self.kind
        )
    }
}
