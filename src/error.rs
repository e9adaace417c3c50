//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the vidupe application.
///
/// - 0: Success (completed normally, matches found)
/// - 1: General error (unexpected failure)
/// - 2: No matches found (completed normally, nothing matched)
/// - 3: Partial success (some folders failed or streams could not be read)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: Run completed and matches were found.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No matches: Run completed but no duplicates were found.
    NoMatches = 2,
    /// Partial success: Run completed but some folders or streams failed.
    PartialSuccess = 3,
    /// Interrupted: Run was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "VD000",
            Self::GeneralError => "VD001",
            Self::NoMatches => "VD002",
            Self::PartialSuccess => "VD003",
            Self::Interrupted => "VD130",
        }
    }

    /// Pick the exit code for an error that reached the binary boundary.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        let interrupted = err
            .downcast_ref::<crate::duplicates::FinderError>()
            .is_some_and(|e| matches!(e, crate::duplicates::FinderError::Interrupted))
            || err
                .downcast_ref::<crate::pipeline::FolderError>()
                .is_some_and(|e| matches!(e, crate::pipeline::FolderError::Interrupted));
        if interrupted {
            Self::Interrupted
        } else {
            Self::GeneralError
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "VD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
