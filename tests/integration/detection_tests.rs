use std::fs;
use std::path::Path;

use tempfile::tempdir;
use vidupe::duplicates::{DuplicateFinder, FinderConfig};
use vidupe::streams::{Normalizer, ShortStreamPolicy, Threshold, SKIPPED_DIR};

const MIB: usize = 1_048_576;

/// Deterministic pseudo-random bytes (xorshift).
fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

fn write(dir: &Path, name: &str, data: &[u8]) {
    fs::write(dir.join(name), data).unwrap();
}

fn labels(pairs: &[vidupe::duplicates::MatchPair]) -> Vec<(&str, &str)> {
    pairs.iter().map(|p| p.labels()).collect()
}

#[test]
fn test_prefix_copy_found_unrelated_ignored() {
    let dir = tempdir().unwrap();
    let a = noise(10 * MIB, 1);
    write(dir.path(), "A.h264", &a);
    write(dir.path(), "B.h264", &a[..8 * MIB]);
    write(dir.path(), "C.h264", &noise(MIB, 2));

    let finder = DuplicateFinder::with_defaults();
    let (matches, summary) = finder
        .detect_in_folder(dir.path(), Threshold::default())
        .unwrap();

    assert_eq!(labels(&matches), vec![("B", "A")]);
    assert_eq!(summary.total_streams, 3);
    assert_eq!(summary.total_comparisons, 3);
    assert!(summary.errors.is_empty());
}

#[test]
fn test_empty_folder_has_no_matches() {
    let dir = tempdir().unwrap();
    let (matches, summary) = DuplicateFinder::with_defaults()
        .detect_in_folder(dir.path(), Threshold::default())
        .unwrap();
    assert!(matches.is_empty());
    assert_eq!(summary.total_comparisons, 0);
}

#[test]
fn test_equal_sizes_break_ties_by_file_name() {
    let dir = tempdir().unwrap();
    let data = noise(4096, 7);
    write(dir.path(), "b.h264", &data);
    write(dir.path(), "a.h264", &data);

    let (matches, _) = DuplicateFinder::with_defaults()
        .detect_in_folder(dir.path(), Threshold::default())
        .unwrap();
    assert_eq!(labels(&matches), vec![("b", "a")]);
}

#[test]
fn test_each_small_matches_at_most_once() {
    let dir = tempdir().unwrap();
    let movie = noise(64 * 1024, 3);
    write(dir.path(), "Movie.h264", &movie);
    write(dir.path(), "Copy.h264", &movie[..60 * 1024]);
    write(dir.path(), "Trailer.h264", &movie[1024..9 * 1024]);

    let (matches, summary) = DuplicateFinder::with_defaults()
        .detect_in_folder(dir.path(), Threshold::default())
        .unwrap();

    // The trailer stops at the largest stream; the copy pairs with the movie.
    assert_eq!(
        labels(&matches),
        vec![("Trailer", "Movie"), ("Copy", "Movie")]
    );
    assert_eq!(summary.comparisons, 2);
    assert_eq!(summary.skipped_comparisons(), 1);
}

#[test]
fn test_parallel_sweep_matches_sequential() {
    let dir = tempdir().unwrap();
    let base = noise(32 * 1024, 11);
    for i in 0..6 {
        let end = base.len() - i * 2048;
        write(dir.path(), &format!("part{i}.h264"), &base[i * 512..end]);
    }
    write(dir.path(), "other.h264", &noise(8 * 1024, 12));

    let sequential = DuplicateFinder::with_defaults()
        .detect_in_folder(dir.path(), Threshold::default())
        .unwrap()
        .0;
    let parallel = DuplicateFinder::new(FinderConfig::default().with_threads(4))
        .detect_in_folder(dir.path(), Threshold::default())
        .unwrap()
        .0;
    assert_eq!(sequential, parallel);
    assert_eq!(sequential.len(), 5);
}

#[test]
fn test_trimmed_prefix_copy_detected() {
    let dir = tempdir().unwrap();
    let a = noise(10 * MIB, 21);
    write(dir.path(), "A.h264", &a);
    write(dir.path(), "B.h264", &a[..8 * MIB]);
    write(dir.path(), "Short.h264", &noise(500 * 1024, 22));

    let report = Normalizer::new(MIB as u64, MIB as u64, ShortStreamPolicy::Skip)
        .normalize_folder(dir.path())
        .unwrap();
    assert_eq!(report.normalized.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].1, 500 * 1024);

    assert!(dir.path().join(SKIPPED_DIR).join("Short.h264").exists());

    let (matches, summary) = DuplicateFinder::with_defaults()
        .detect_in_folder(dir.path(), Threshold::default())
        .unwrap();
    assert_eq!(summary.total_streams, 2);
    assert_eq!(labels(&matches), vec![("B", "A")]);
}
