//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config FILE`, or `config.toml` in the platform config dir)
//! 3. `VIDUPE_*` environment variables (e.g. `VIDUPE_THRESHOLD=90`)
//! 4. Command-line flags
//!
//! Size fields accept either a byte count or a string such as `"1MiB"`.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Deserializer, Serialize};

use crate::cli::{parse_size, OutputFormat, ScanArgs};
use crate::pipeline::{PipelineConfig, DEFAULT_TRIM_BYTES};
use crate::streams::{ShortStreamPolicy, Threshold, ThresholdError};

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "VIDUPE_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Match threshold percentage
    pub threshold: f64,
    /// Bytes trimmed from the start of each stream
    #[serde(deserialize_with = "deserialize_size")]
    pub header_bytes: u64,
    /// Bytes trimmed from the end of each stream
    #[serde(deserialize_with = "deserialize_size")]
    pub footer_bytes: u64,
    /// Container extensions to scan
    pub extensions: Vec<String>,
    /// Explicit mkvextract location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mkvextract: Option<PathBuf>,
    /// Parent directory for workspaces
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
    /// Worker threads for the comparison sweep
    pub threads: usize,
    /// Fail a folder on the first unreadable stream
    pub strict: bool,
    /// Handling of streams too short to trim
    pub short_streams: ShortStreamPolicy,
    /// Report format
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: Threshold::DEFAULT.value(),
            header_bytes: DEFAULT_TRIM_BYTES,
            footer_bytes: DEFAULT_TRIM_BYTES,
            extensions: vec!["mkv".to_string()],
            mkvextract: None,
            temp_dir: None,
            threads: 1,
            strict: false,
            short_streams: ShortStreamPolicy::Skip,
            output: OutputFormat::Text,
        }
    }
}

/// Errors that can occur while loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// The threshold is out of range.
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(#[from] ThresholdError),

    /// Zero worker threads were requested.
    #[error("Thread count must be at least 1")]
    InvalidThreads,

    /// No container extension is configured.
    #[error("At least one container extension is required")]
    NoExtensions,
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Bytes(u64),
        Text(String),
    }

    match Size::deserialize(deserializer)? {
        Size::Bytes(bytes) => Ok(bytes),
        Size::Text(text) => parse_size(&text).map_err(serde::de::Error::custom),
    }
}

impl Config {
    /// Default platform-specific configuration file path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "vidupe").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from defaults, a TOML file and the environment.
    ///
    /// With `explicit` unset, the default path is used when it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an explicit file is missing or any layer
    /// fails to parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Some(path.to_path_buf())
            }
            None => Self::default_path().filter(|p| p.is_file()),
        };

        Self::figment(path.as_deref())
            .extract()
            .map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// The layered provider, without command-line values.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            log::debug!("Loading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Apply explicitly given scan flags on top of the loaded layers.
    pub fn merge_scan_args(&mut self, args: &ScanArgs) {
        if let Some(threshold) = args.threshold {
            self.threshold = threshold;
        }
        if let Some(bytes) = args.header_bytes {
            self.header_bytes = bytes;
        }
        if let Some(bytes) = args.footer_bytes {
            self.footer_bytes = bytes;
        }
        if !args.extensions.is_empty() {
            self.extensions.clone_from(&args.extensions);
        }
        if args.mkvextract.is_some() {
            self.mkvextract.clone_from(&args.mkvextract);
        }
        if args.temp_dir.is_some() {
            self.temp_dir.clone_from(&args.temp_dir);
        }
        if let Some(threads) = args.threads {
            self.threads = threads;
        }
        if args.strict {
            self.strict = true;
        }
        if let Some(policy) = args.short_streams {
            self.short_streams = policy;
        }
        if let Some(output) = args.output {
            self.output = output;
        }
    }

    /// Validated threshold.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidThreshold` if out of range.
    pub fn threshold(&self) -> Result<Threshold, ConfigError> {
        Ok(Threshold::new(self.threshold)?)
    }

    /// Check every field for usable values.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.threshold()?;
        if self.threads == 0 {
            return Err(ConfigError::InvalidThreads);
        }
        if self.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
            return Err(ConfigError::NoExtensions);
        }
        Ok(())
    }

    /// Build the pipeline settings from this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        self.validate()?;
        Ok(PipelineConfig::default()
            .with_threshold(self.threshold()?)
            .with_trim(self.header_bytes, self.footer_bytes)
            .with_extensions(self.extensions.clone())
            .with_temp_dir(self.temp_dir.clone())
            .with_threads(self.threads)
            .with_strict(self.strict)
            .with_short_streams(self.short_streams))
    }
}
