//! Configuration loaded from `blobfetch.toml`.
//!
//! Every field is optional and unknown keys are rejected so typos surface
//! as errors rather than silently falling back to defaults. Command-line
//! flags are layered on top by the binary.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;

use crate::fetcher::RetryPolicy;

/// File name looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "blobfetch.toml";

/// Platform token used when neither configuration nor flags name one.
pub const DEFAULT_PLATFORM: &str = "linux-x64";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// The file that was opened.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("invalid configuration in {path}: {reason}")]
    Parse {
        /// The file that was parsed.
        path: Utf8PathBuf,
        /// The TOML parser's message.
        reason: String,
    },

    /// The retry settings cannot form a usable policy.
    #[error("retry.max_attempts must be at least 1")]
    InvalidRetryPolicy,
}

/// Top-level configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Root under which `download/` and `extracted/` are created.
    pub output_dir: Utf8PathBuf,
    /// Platform token for single-package downloads and extraction.
    pub platform: String,
    /// Retry behaviour for artefact transfers.
    pub retry: RetrySettings,
    /// HTTP client settings.
    pub http: HttpSettings,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            output_dir: Utf8PathBuf::from("output"),
            platform: DEFAULT_PLATFORM.to_owned(),
            retry: RetrySettings::default(),
            http: HttpSettings::default(),
        }
    }
}

/// Retry settings as written in the `[retry]` table.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Attempt ceiling per artefact.
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts(),
            retry_delay_ms: u64::try_from(policy.retry_delay().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Settings in the `[http]` table.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    /// Global per-request timeout; absent means none.
    pub timeout_secs: Option<u64>,
}

impl HttpSettings {
    /// The configured timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl FetchConfig {
    /// Loads configuration for a command run from the current directory.
    ///
    /// An `explicit` path must exist. Without one, `./blobfetch.toml` is
    /// read when present and defaults apply otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load(explicit: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        Self::load_in(explicit, Utf8Path::new("."))
    }

    /// Like [`Self::load`] but looks in `working_dir` for the default file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load_in(explicit: Option<&Utf8Path>, working_dir: &Utf8Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        let candidate = working_dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Parses configuration from TOML text; `path` is used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use blobfetch::config::FetchConfig;
    ///
    /// let config = FetchConfig::load_from_str("platform = \"win-x64\"\n", Utf8Path::new("inline"))
    ///     .expect("valid configuration");
    /// assert_eq!(config.platform, "win-x64");
    /// assert_eq!(config.retry.max_attempts, 3);
    /// ```
    pub fn load_from_str(source: &str, path: &Utf8Path) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|error| ConfigError::Parse {
            path: path.to_owned(),
            reason: error.message().to_owned(),
        })
    }

    fn load_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::load_from_str(&source, path)
    }

    /// Builds the retry policy described by `[retry]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRetryPolicy`] when `max_attempts` is zero.
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.retry_delay_ms),
        )
        .ok_or(ConfigError::InvalidRetryPolicy)
    }

    /// Directory downloads are written to.
    #[must_use]
    pub fn download_dir(&self) -> Utf8PathBuf {
        self.output_dir.join("download")
    }

    /// Directory archives are extracted into.
    #[must_use]
    pub fn extracted_dir(&self) -> Utf8PathBuf {
        self.output_dir.join("extracted")
    }
}
