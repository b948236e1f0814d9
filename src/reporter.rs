//! Diagnostic events and the observer that receives them.
//!
//! Resolution and download logic never log directly. Each component takes a
//! `&dyn Reporter` and emits typed [`FetchEvent`] values; [`LogReporter`]
//! forwards them to the `log` facade for the CLI, while tests inject a
//! recording implementation.

use std::fmt;
use std::time::Duration;

use camino::Utf8PathBuf;
use log::Level;

use crate::capability::CapabilityError;

/// A diagnostic emitted while resolving or downloading artefacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    /// The access URL failed pre-flight validation.
    CapabilityRejected {
        /// Why the URL was rejected.
        reason: CapabilityError,
    },
    /// The access URL lacks a permissions or signature marker.
    CapabilityUnsigned,
    /// The container has no `index.json`.
    IndexMissing,
    /// The index could not be read or parsed.
    IndexUnreadable {
        /// Description of the underlying failure.
        reason: String,
    },
    /// The index was loaded.
    IndexLoaded {
        /// Number of versions listed.
        versions: usize,
    },
    /// The requested version is not listed in the index.
    VersionNotFound {
        /// The normalized version that was looked up.
        version: String,
        /// Versions the index does list.
        available: Vec<String>,
    },
    /// The version has no asset for the requested platform.
    PlatformNotFound {
        /// The platform token that was looked up.
        platform: String,
        /// The normalized version.
        version: String,
        /// Asset names listed under the version.
        available: Vec<String>,
    },
    /// A single asset was resolved.
    AssetResolved {
        /// Asset display name.
        name: String,
        /// Asset path relative to the container root.
        path: String,
    },
    /// All assets for a version were resolved.
    AssetsResolved {
        /// The normalized version.
        version: String,
        /// Number of asset paths returned.
        count: usize,
    },
    /// The destination already existed, so no transfer was made.
    DownloadSkipped {
        /// The existing local file.
        path: Utf8PathBuf,
        /// Its size on disk.
        bytes: u64,
    },
    /// A transfer attempt is starting.
    AttemptStarted {
        /// One-based attempt number.
        attempt: u32,
        /// Configured attempt ceiling.
        max_attempts: u32,
        /// Artefact path relative to the container root.
        artefact: String,
    },
    /// A transfer attempt failed transiently and will be retried.
    AttemptFailed {
        /// One-based attempt number.
        attempt: u32,
        /// Description of the store failure.
        reason: String,
        /// How long the fetcher waits before the next attempt.
        retry_delay: Duration,
    },
    /// A failed transfer left a file behind that could not be removed.
    PartialFileRetained {
        /// The leftover local file.
        path: Utf8PathBuf,
        /// Why removal failed.
        reason: String,
    },
    /// A transfer completed.
    DownloadCompleted {
        /// The written file.
        path: Utf8PathBuf,
        /// Its size on disk.
        bytes: u64,
    },
    /// Every artefact in a batch is on disk.
    BatchCompleted {
        /// Number of artefacts.
        count: usize,
        /// Cumulative size on disk.
        total_bytes: u64,
    },
    /// A package download failed at the workflow boundary.
    DownloadFailed {
        /// Human-readable failure message.
        message: String,
    },
}

impl FetchEvent {
    /// Severity of the event.
    #[must_use]
    pub const fn level(&self) -> Level {
        match self {
            Self::CapabilityRejected { .. }
            | Self::IndexUnreadable { .. }
            | Self::DownloadFailed { .. } => Level::Error,
            Self::CapabilityUnsigned
            | Self::IndexMissing
            | Self::VersionNotFound { .. }
            | Self::PlatformNotFound { .. }
            | Self::AttemptFailed { .. }
            | Self::PartialFileRetained { .. } => Level::Warn,
            Self::IndexLoaded { .. }
            | Self::AssetResolved { .. }
            | Self::AssetsResolved { .. }
            | Self::DownloadSkipped { .. }
            | Self::AttemptStarted { .. }
            | Self::DownloadCompleted { .. }
            | Self::BatchCompleted { .. } => Level::Info,
        }
    }
}

impl fmt::Display for FetchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapabilityRejected { reason } => write!(f, "invalid access URL: {reason}"),
            Self::CapabilityUnsigned => f.write_str(
                "access URL may be invalid: missing permissions or signature",
            ),
            Self::IndexMissing => f.write_str("index.json not found in container root"),
            Self::IndexUnreadable { reason } => {
                write!(f, "failed to download or parse index.json: {reason}")
            }
            Self::IndexLoaded { versions } => write!(f, "loaded index with {versions} versions"),
            Self::VersionNotFound { version, available } => write!(
                f,
                "version {version} not found in index; available versions: {}",
                available.join(", ")
            ),
            Self::PlatformNotFound {
                platform,
                version,
                available,
            } => write!(
                f,
                "platform {platform} not found for version {version}; available assets: {}",
                available.join(", ")
            ),
            Self::AssetResolved { name, path } => write!(f, "found package {name} at {path}"),
            Self::AssetsResolved { version, count } => {
                write!(f, "found {count} packages for version {version}")
            }
            Self::DownloadSkipped { path, bytes } => {
                write!(f, "file already exists, skipping download: {path} ({bytes} bytes)")
            }
            Self::AttemptStarted {
                attempt,
                max_attempts,
                artefact,
            } => write!(f, "download attempt {attempt}/{max_attempts}: {artefact}"),
            Self::AttemptFailed {
                attempt,
                reason,
                retry_delay,
            } => write!(
                f,
                "download attempt {attempt} failed: {reason}; retrying in {}ms",
                retry_delay.as_millis()
            ),
            Self::PartialFileRetained { path, reason } => write!(
                f,
                "could not remove partial download {path}: {reason}; delete it before retrying"
            ),
            Self::DownloadCompleted { path, bytes } => {
                write!(f, "downloaded {path} ({bytes} bytes)")
            }
            Self::BatchCompleted { count, total_bytes } => write!(
                f,
                "all {count} packages downloaded ({total_bytes} bytes total)"
            ),
            Self::DownloadFailed { message } => write!(f, "package download failed: {message}"),
        }
    }
}

/// Observer for diagnostic events.
pub trait Reporter {
    /// Receive one event.
    fn report(&self, event: FetchEvent);
}

/// Forwards events to the `log` facade at their own level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, event: FetchEvent) {
        log::log!(target: "blobfetch", event.level(), "{event}");
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: FetchEvent) {}
}

/// Test reporter recording every event for later assertions.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: std::cell::RefCell<Vec<FetchEvent>>,
}

#[cfg(any(test, feature = "test-support"))]
impl RecordingReporter {
    /// All events recorded so far, in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<FetchEvent> {
        self.events.borrow().clone()
    }

    /// Recorded events at exactly `level`.
    #[must_use]
    pub fn events_at(&self, level: Level) -> Vec<FetchEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.level() == level)
            .cloned()
            .collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Reporter for RecordingReporter {
    fn report(&self, event: FetchEvent) {
        self.events.borrow_mut().push(event);
    }
}
