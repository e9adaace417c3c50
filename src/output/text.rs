//! Human-readable report.
//!
//! ```text
//! Combined Matches:
//! -------------------------
//!
//! Matches found in /media/Movies/Movie 1:
//! - Trailer is part of or matches Movie by more than 95% (complete match)
//!
//! Time elapsed: 12.345s.
//! ```

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::{Paint, Style};

use crate::pipeline::RunReport;

/// Message printed when no folder produced a match.
pub const NO_MATCHES_MESSAGE: &str = "No duplicates or matches found in any folder.";

/// Terminal report formatter.
pub struct TextOutput<'a> {
    report: &'a RunReport,
    color: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a formatter; `color` enables ANSI styling.
    #[must_use]
    pub fn new(report: &'a RunReport, color: bool) -> Self {
        Self { report, color }
    }

    fn styled(&self, text: &str, style: Style) -> String {
        if self.color {
            text.paint(style).to_string()
        } else {
            text.to_string()
        }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let report = self.report;
        let heading = Style::new().bold();
        let folder_style = Style::new().cyan().bold();
        let warn = Style::new().yellow();
        let error = Style::new().red().bold();

        writeln!(writer)?;
        if report.total_matches() == 0 {
            writeln!(writer, "{}", self.styled(NO_MATCHES_MESSAGE, heading))?;
        } else {
            writeln!(writer, "{}", self.styled("Combined Matches:", heading))?;
            writeln!(writer, "-------------------------")?;
            writeln!(writer)?;
            for folder in report.matched_folders() {
                let title = format!("Matches found in {}:", folder.folder.display());
                writeln!(writer, "{}", self.styled(&title, folder_style))?;
                for pair in &folder.matches {
                    writeln!(writer, "- {}", pair.describe())?;
                }
                writeln!(writer)?;
            }
        }

        let skipped: Vec<_> = report
            .folders
            .iter()
            .flat_map(|f| f.skipped.iter().map(move |s| (f, s)))
            .collect();
        if !skipped.is_empty() {
            writeln!(writer)?;
            writeln!(
                writer,
                "{}",
                self.styled("Skipped (too short to trim):", warn)
            )?;
            // Stream paths point into workspaces that no longer exist.
            for (folder, stream) in skipped {
                writeln!(
                    writer,
                    "- {} in {} ({})",
                    stream.label,
                    folder.folder.display(),
                    ByteSize::b(stream.size)
                )?;
            }
        }

        let issues: Vec<_> = report
            .folders
            .iter()
            .flat_map(|f| f.errors.iter())
            .collect();
        if !issues.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "{}", self.styled("Errors:", warn))?;
            for issue in issues {
                writeln!(writer, "- {}", issue.message)?;
            }
        }

        if !report.failures.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "{}", self.styled("Failed folders:", error))?;
            for failure in &report.failures {
                writeln!(writer, "- {}: {}", failure.folder.display(), failure.error)?;
            }
        }

        if report.interrupted {
            writeln!(writer)?;
            writeln!(
                writer,
                "{}",
                self.styled("Interrupted: remaining folders were not processed.", error)
            )?;
        }

        writeln!(writer)?;
        writeln!(
            writer,
            "Time elapsed: {:.3}s.",
            report.duration.as_secs_f64()
        )?;
        Ok(())
    }

    /// Render the report as a string.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if formatting fails.
    pub fn to_string(&self) -> io::Result<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::MatchPair;
    use crate::pipeline::{FolderFailure, FolderIssue, FolderReport, ScanMode, SkippedStream};
    use crate::streams::{MatchKind, Stream, Threshold};
    use std::path::PathBuf;
    use std::time::Duration;

    fn empty_report() -> RunReport {
        RunReport {
            base: PathBuf::from("/media"),
            mode: ScanMode::CheckMovieFolder,
            threshold: Threshold::default(),
            folders: Vec::new(),
            failures: Vec::new(),
            interrupted: false,
            duration: Duration::from_millis(1500),
        }
    }

    fn folder_with_match() -> FolderReport {
        let small = Stream::new(PathBuf::from("/w/Trailer_trimmed.h264"), 10);
        let large = Stream::new(PathBuf::from("/w/Movie_trimmed.h264"), 100);
        FolderReport {
            folder: PathBuf::from("/media/Movie 1"),
            matches: vec![MatchPair::new(
                &small,
                &large,
                MatchKind::Complete,
                Threshold::default(),
            )],
            ..Default::default()
        }
    }

    #[test]
    fn test_text_no_matches() {
        let report = empty_report();
        let text = TextOutput::new(&report, false).to_string().unwrap();
        assert!(text.contains(NO_MATCHES_MESSAGE));
        assert!(text.contains("Time elapsed: 1.500s."));
        assert!(!text.contains("Combined Matches"));
    }

    #[test]
    fn test_text_lists_matches_per_folder() {
        let mut report = empty_report();
        report.folders.push(folder_with_match());
        report.folders.push(FolderReport {
            folder: PathBuf::from("/media/Movie 2"),
            ..Default::default()
        });

        let text = TextOutput::new(&report, false).to_string().unwrap();
        assert!(text.contains("Combined Matches:"));
        assert!(text.contains("Matches found in /media/Movie 1:"));
        assert!(text.contains(
            "- Trailer is part of or matches Movie by more than 95% (complete match)"
        ));
        assert!(!text.contains("Movie 2"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_text_lists_problems() {
        let mut report = empty_report();
        let mut folder = folder_with_match();
        folder.skipped.push(SkippedStream {
            label: "Tiny".to_string(),
            path: PathBuf::from("/w/skipped/Tiny.h264"),
            size: 2048,
        });
        folder.errors.push(FolderIssue {
            path: PathBuf::from("/media/Movie 1/Broken.mkv"),
            message: "extraction failed".to_string(),
        });
        report.folders.push(folder);
        report.failures.push(FolderFailure {
            folder: PathBuf::from("/media/Movie 3"),
            error: "Path not found".to_string(),
        });
        report.interrupted = true;

        let text = TextOutput::new(&report, false).to_string().unwrap();
        assert!(text.contains("Skipped (too short to trim):"));
        assert!(text.contains("- Tiny in /media/Movie 1 ("));
        assert!(!text.contains("/w/skipped"));
        assert!(text.contains("- extraction failed"));
        assert!(text.contains("- /media/Movie 3: Path not found"));
        assert!(text.contains("Interrupted"));
    }

    #[test]
    fn test_text_color_keeps_content() {
        let report = empty_report();
        let text = TextOutput::new(&report, true).to_string().unwrap();
        assert!(text.contains(NO_MATCHES_MESSAGE));
    }
}
