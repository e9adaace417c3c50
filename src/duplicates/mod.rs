//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-ordered pairwise comparison of normalized streams
//! - Early exit once a smaller stream has found its larger match
//! - Match records for reporting

pub mod finder;
pub mod matches;

pub use finder::{
    sort_by_size_desc, total_comparisons, DetectSummary, DuplicateFinder, FinderConfig,
    FinderError,
};
pub use matches::MatchPair;
