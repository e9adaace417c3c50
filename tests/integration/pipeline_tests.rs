use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tempfile::{tempdir, TempDir};
use vidupe::error::ExitCode;
use vidupe::pipeline::{
    unique_output_path, DemuxError, Demuxer, Pipeline, PipelineConfig, ScanMode,
};

/// Treats every container as if it were already the raw stream.
struct CopyDemuxer;

impl Demuxer for CopyDemuxer {
    fn name(&self) -> &str {
        "copy"
    }

    fn extract(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, DemuxError> {
        let stem = input
            .file_stem()
            .ok_or_else(|| DemuxError::InvalidInput(input.to_path_buf()))?;
        let output = unique_output_path(output_dir, stem, "h264");
        fs::copy(input, &output).map_err(|e| DemuxError::Failed {
            input: input.to_path_buf(),
            code: None,
            message: e.to_string(),
        })?;
        Ok(output)
    }
}

fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x2545_F491_4F6C_DD1D) | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 32) as u8
        })
        .collect()
}

/// Container bytes: 16-byte header, body, 16-byte footer.
fn container(body: &[u8], seed: u8) -> Vec<u8> {
    let mut data = vec![seed; 16];
    data.extend_from_slice(body);
    data.extend(std::iter::repeat(seed ^ 0xff).take(16));
    data
}

fn pipeline(temp: &TempDir) -> Pipeline {
    let config = PipelineConfig::default()
        .with_trim(16, 16)
        .with_temp_dir(Some(temp.path().to_path_buf()));
    Pipeline::new(config, Arc::new(CopyDemuxer))
}

/// Movie folder with a full copy of the feature and a trailer cut from it.
fn movie_folder(root: &Path, name: &str, seed: u64) {
    let dir = root.join(name);
    fs::create_dir_all(dir.join("Extras")).unwrap();
    let feature = noise(20_000, seed);
    fs::write(dir.join("Feature.mkv"), container(&feature, 1)).unwrap();
    fs::write(
        dir.join("Extras").join("Trailer.mkv"),
        container(&feature[2_000..6_000], 2),
    )
    .unwrap();
    fs::write(
        dir.join("Extras").join("Interview.mkv"),
        container(&noise(5_000, seed + 100), 3),
    )
    .unwrap();
}

#[test]
fn test_movie_folder_mode_reports_per_folder() {
    let lib = tempdir().unwrap();
    let temp = tempdir().unwrap();
    movie_folder(lib.path(), "Movie 1", 1);
    movie_folder(lib.path(), "Movie 2", 2);

    let report = pipeline(&temp)
        .run(lib.path(), ScanMode::CheckMovieFolder)
        .unwrap();

    assert_eq!(report.folders.len(), 2);
    assert_eq!(report.folders[0].folder, lib.path().join("Movie 1"));
    for folder in &report.folders {
        assert_eq!(folder.containers, 3);
        let labels: Vec<_> = folder.matches.iter().map(|m| m.labels()).collect();
        assert_eq!(labels, vec![("Trailer", "Feature")]);
    }
    assert_eq!(report.total_matches(), 2);
    assert_eq!(report.exit_code(), ExitCode::Success);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn test_extras_mode_does_not_see_feature() {
    let lib = tempdir().unwrap();
    let temp = tempdir().unwrap();
    movie_folder(lib.path(), "Movie 1", 5);

    let report = pipeline(&temp)
        .run(lib.path(), ScanMode::CheckExtrasFolder)
        .unwrap();

    assert_eq!(report.folders.len(), 1);
    assert_eq!(report.folders[0].folder, lib.path().join("Movie 1").join("Extras"));
    assert_eq!(report.folders[0].containers, 2);
    assert_eq!(report.total_matches(), 0);
    assert_eq!(report.exit_code(), ExitCode::NoMatches);
}

#[test]
fn test_check_folder_mode_compares_whole_tree() {
    let lib = tempdir().unwrap();
    let temp = tempdir().unwrap();
    movie_folder(lib.path(), "Movie 1", 8);

    let report = pipeline(&temp).run(lib.path(), ScanMode::CheckFolder).unwrap();

    assert_eq!(report.folders.len(), 1);
    assert_eq!(report.folders[0].containers, 3);
    assert_eq!(report.total_matches(), 1);
}

#[test]
fn test_missing_base_folder_is_an_error() {
    let temp = tempdir().unwrap();
    let missing = temp.path().join("nope");
    assert!(pipeline(&temp).run(&missing, ScanMode::CheckFolder).is_err());
}

#[test]
fn test_short_streams_are_reported_not_compared() {
    let lib = tempdir().unwrap();
    let temp = tempdir().unwrap();
    let body = noise(4_000, 9);
    fs::write(lib.path().join("Movie.mkv"), container(&body, 1)).unwrap();
    fs::write(lib.path().join("Stub.mkv"), b"too short").unwrap();

    let report = pipeline(&temp).run(lib.path(), ScanMode::CheckFolder).unwrap();
    let folder = &report.folders[0];
    assert_eq!(folder.skipped.len(), 1);
    assert_eq!(folder.compared_streams, 1);
    assert!(folder.matches.is_empty());
}

#[test]
fn test_interrupted_before_start() {
    let lib = tempdir().unwrap();
    let temp = tempdir().unwrap();
    movie_folder(lib.path(), "Movie 1", 3);

    let flag = Arc::new(AtomicBool::new(false));
    flag.store(true, Ordering::SeqCst);
    let config = PipelineConfig::default()
        .with_trim(16, 16)
        .with_temp_dir(Some(temp.path().to_path_buf()))
        .with_shutdown_flag(flag);
    let report = Pipeline::new(config, Arc::new(CopyDemuxer))
        .run(lib.path(), ScanMode::CheckMovieFolder)
        .unwrap();

    assert!(report.interrupted);
    assert!(report.folders.is_empty());
    assert_eq!(report.exit_code(), ExitCode::Interrupted);
}
