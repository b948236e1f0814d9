//! Error types for artefact downloads and the CLI.
//!
//! [`FetchError`] covers failures of the resilient fetcher. Only
//! [`FetchError::RetriesExhausted`] escapes the package workflow as an
//! error; everything else is folded into a structured outcome there.
//! [`CommandError`] is what the `blobfetch` binary reports before exiting.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::extract::ExtractionError;
use crate::store::StoreError;

/// Errors that can occur while materializing an artefact on disk.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The artefact path has no file name segment.
    #[error("artefact path \"{path}\" has no file name")]
    InvalidArtefactPath {
        /// The rejected relative path.
        path: String,
    },

    /// Every attempt failed transiently.
    #[error("failed to download {artefact} after {attempts} attempts")]
    RetriesExhausted {
        /// Artefact path relative to the container root.
        artefact: String,
        /// Number of attempts made.
        attempts: u32,
        /// The store error from the final attempt.
        #[source]
        source: StoreError,
    },

    /// The store failed in a way retrying cannot fix.
    #[error("download of {artefact} failed: {source}")]
    Store {
        /// Artefact path relative to the container root.
        artefact: String,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// A local filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path involved.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Returns `true` when the error must halt the invoking workflow.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }
}

/// Errors reported by the `blobfetch` command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No access URL was given on the command line or in the environment.
    #[error("no access URL given; pass --sas-url or set BLOBFETCH_SAS_URL")]
    MissingAccessUrl,

    /// The access URL failed validation.
    #[error("invalid access capability")]
    InvalidAccessUrl,

    /// The package index could not be obtained.
    #[error("package index unavailable")]
    IndexUnavailable,

    /// A download halted after exhausting its retries.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A download finished unsuccessfully.
    #[error("package download failed: {message}")]
    DownloadFailed {
        /// The outcome's error message.
        message: String,
    },

    /// Archive extraction failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Failed to write command output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using [`CommandError`].
pub type Result<T> = std::result::Result<T, CommandError>;
