//! Resilient artefact downloads.
//!
//! The fetcher turns a resolved artefact path into a file on disk. It is
//! idempotent (an existing destination file is never re-fetched) and retries
//! transient store failures a fixed number of times with a fixed, blocking
//! delay between attempts.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use crate::capability::AccessCapability;
use crate::error::FetchError;
use crate::reporter::{FetchEvent, Reporter};
use crate::store::{BlobStore, StoreError};

/// Attempt ceiling and inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_delay: Duration,
}

impl RetryPolicy {
    /// Default attempt ceiling.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    /// Default delay between attempts.
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

    /// Build a policy. Returns `None` when `max_attempts` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use blobfetch::fetcher::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(5, Duration::from_millis(250)).expect("non-zero");
    /// assert_eq!(policy.max_attempts(), 5);
    /// assert!(RetryPolicy::new(0, Duration::ZERO).is_none());
    /// ```
    #[must_use]
    pub const fn new(max_attempts: u32, retry_delay: Duration) -> Option<Self> {
        if max_attempts == 0 {
            return None;
        }
        Some(Self {
            max_attempts,
            retry_delay,
        })
    }

    /// Maximum number of transfer attempts per artefact.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Blocking wait between attempts.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            retry_delay: Self::DEFAULT_RETRY_DELAY,
        }
    }
}

/// A single artefact present on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtefact {
    /// Where the file lives.
    pub local_path: Utf8PathBuf,
    /// Its size on disk.
    pub bytes: u64,
    /// `true` when the file already existed and no transfer was made.
    pub skipped: bool,
}

/// Result of a sequential multi-artefact download.
///
/// Artefacts downloaded before a failure are kept; a batch is not a
/// transaction.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Local paths of the artefacts on disk, in request order.
    pub paths: Vec<Utf8PathBuf>,
    /// Cumulative size of those artefacts.
    pub total_bytes: u64,
    /// The failure that stopped the batch, if any.
    pub error: Option<FetchError>,
}

impl BatchOutcome {
    /// Returns `true` when every requested artefact is on disk.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Downloads artefacts from a blob store into a local directory.
pub struct Fetcher<'a> {
    store: &'a dyn BlobStore,
    reporter: &'a dyn Reporter,
    policy: RetryPolicy,
}

impl<'a> Fetcher<'a> {
    /// Create a fetcher over `store` using `policy`.
    #[must_use]
    pub fn new(store: &'a dyn BlobStore, reporter: &'a dyn Reporter, policy: RetryPolicy) -> Self {
        Self {
            store,
            reporter,
            policy,
        }
    }

    /// Materialize one artefact under `destination_dir`.
    ///
    /// The local file is named after the final segment of `artefact_path`.
    /// An existing file at that location is trusted as complete and no
    /// store call is made.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::RetriesExhausted`] when every attempt failed
    /// transiently, [`FetchError::Store`] on a non-transient store failure,
    /// [`FetchError::InvalidArtefactPath`] when the path has no file name,
    /// and [`FetchError::Io`] on local filesystem failures.
    pub fn download(
        &self,
        capability: &AccessCapability,
        artefact_path: &str,
        destination_dir: &Utf8Path,
    ) -> Result<FetchedArtefact, FetchError> {
        let file_name = file_name_of(artefact_path)?;
        let local_path = destination_dir.join(file_name);

        if let Some(bytes) = existing_file_size(&local_path)? {
            self.reporter.report(FetchEvent::DownloadSkipped {
                path: local_path.clone(),
                bytes,
            });
            return Ok(FetchedArtefact {
                local_path,
                bytes,
                skipped: true,
            });
        }

        std::fs::create_dir_all(destination_dir).map_err(|source| FetchError::Io {
            path: destination_dir.to_owned(),
            source,
        })?;

        let url = capability.blob_url(artefact_path);
        if let Err(error) = self.transfer_with_retry(&url, artefact_path, &local_path) {
            self.discard_partial(&local_path);
            return Err(error);
        }

        let bytes = file_size(&local_path)?;
        self.reporter.report(FetchEvent::DownloadCompleted {
            path: local_path.clone(),
            bytes,
        });
        Ok(FetchedArtefact {
            local_path,
            bytes,
            skipped: false,
        })
    }

    /// Download each artefact in order, stopping at the first failure.
    pub fn download_all(
        &self,
        capability: &AccessCapability,
        artefact_paths: &[String],
        destination_dir: &Utf8Path,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for artefact_path in artefact_paths {
            match self.download(capability, artefact_path, destination_dir) {
                Ok(fetched) => {
                    outcome.total_bytes += fetched.bytes;
                    outcome.paths.push(fetched.local_path);
                }
                Err(error) => {
                    outcome.error = Some(error);
                    return outcome;
                }
            }
        }
        self.reporter.report(FetchEvent::BatchCompleted {
            count: outcome.paths.len(),
            total_bytes: outcome.total_bytes,
        });
        outcome
    }

    /// Remove what a failed transfer left behind so a later run does not
    /// mistake it for a complete download.
    fn discard_partial(&self, path: &Utf8Path) {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => self.reporter.report(FetchEvent::PartialFileRetained {
                path: path.to_owned(),
                reason: e.to_string(),
            }),
        }
    }

    fn transfer_with_retry(
        &self,
        url: &str,
        artefact_path: &str,
        local_path: &Utf8Path,
    ) -> Result<(), FetchError> {
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 1;
        loop {
            self.reporter.report(FetchEvent::AttemptStarted {
                attempt,
                max_attempts,
                artefact: artefact_path.to_owned(),
            });
            let failure = match self.store.download_to(url, local_path) {
                Ok(()) => return Ok(()),
                Err(source) if !source.is_transient() => {
                    return Err(FetchError::Store {
                        artefact: artefact_path.to_owned(),
                        source,
                    });
                }
                Err(source) => source,
            };

            if attempt >= max_attempts {
                return Err(exhausted(artefact_path, attempt, failure));
            }

            self.reporter.report(FetchEvent::AttemptFailed {
                attempt,
                reason: failure.to_string(),
                retry_delay: self.policy.retry_delay,
            });
            std::thread::sleep(self.policy.retry_delay);
            attempt += 1;
        }
    }
}

fn exhausted(artefact_path: &str, attempts: u32, source: StoreError) -> FetchError {
    FetchError::RetriesExhausted {
        artefact: artefact_path.to_owned(),
        attempts,
        source,
    }
}

/// Final `/`-separated segment of an artefact path.
fn file_name_of(artefact_path: &str) -> Result<&str, FetchError> {
    match artefact_path.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => Ok(name),
        _ => Err(FetchError::InvalidArtefactPath {
            path: artefact_path.to_owned(),
        }),
    }
}

fn existing_file_size(path: &Utf8Path) -> Result<Option<u64>, FetchError> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => Ok(Some(metadata.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(FetchError::Io {
            path: path.to_owned(),
            source,
        }),
    }
}

fn file_size(path: &Utf8Path) -> Result<u64, FetchError> {
    std::fs::metadata(path)
        .map(|metadata| metadata.len())
        .map_err(|source| FetchError::Io {
            path: path.to_owned(),
            source,
        })
}

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod tests;
