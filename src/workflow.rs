//! Package download orchestration.
//!
//! Chains capability validation, index retrieval, resolution and the
//! resilient fetcher into the two operations the CLI exposes. Recoverable
//! failures become an unsuccessful outcome carrying a message; only
//! exhausted retries are returned as an error, so the invoking command
//! halts instead of carrying on with a missing artefact.

use camino::{Utf8Path, Utf8PathBuf};

use crate::capability::{self, AccessCapability};
use crate::config::DEFAULT_PLATFORM;
use crate::error::FetchError;
use crate::fetcher::{Fetcher, RetryPolicy};
use crate::reporter::{FetchEvent, Reporter};
use crate::resolver::{fetch_index, resolve_all_assets, resolve_asset};
use crate::store::BlobStore;

/// Parameters for a single-package download.
#[derive(Debug, Clone, Copy)]
pub struct DownloadRequest<'a> {
    /// Pre-signed container URL.
    pub sas_url: &'a str,
    /// Version label, with or without a leading `v`.
    pub version: &'a str,
    /// Platform token matched against asset names.
    pub platform: &'a str,
    /// Directory the artefact is written to.
    pub destination_dir: &'a Utf8Path,
}

impl<'a> DownloadRequest<'a> {
    /// A request for the default `linux-x64` platform.
    #[must_use]
    pub const fn new(sas_url: &'a str, version: &'a str, destination_dir: &'a Utf8Path) -> Self {
        Self {
            sas_url,
            version,
            platform: DEFAULT_PLATFORM,
            destination_dir,
        }
    }
}

/// Parameters for downloading every artefact of a version.
#[derive(Debug, Clone, Copy)]
pub struct BatchRequest<'a> {
    /// Pre-signed container URL.
    pub sas_url: &'a str,
    /// Version label, with or without a leading `v`.
    pub version: &'a str,
    /// Directory the artefacts are written to.
    pub destination_dir: &'a Utf8Path,
}

/// Result of [`download_package`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// `true` when the artefact is on disk.
    pub success: bool,
    /// Local path of the artefact on success.
    pub package_path: Option<Utf8PathBuf>,
    /// Failure message when unsuccessful.
    pub error: Option<String>,
    /// Size of the artefact on disk.
    pub downloaded_bytes: u64,
}

impl DownloadOutcome {
    fn failed(message: String) -> Self {
        Self {
            error: Some(message),
            ..Self::default()
        }
    }
}

/// Result of [`download_all_packages`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDownloadOutcome {
    /// `true` when every artefact is on disk.
    pub success: bool,
    /// Local paths of the artefacts on disk, in manifest order.
    pub package_paths: Vec<Utf8PathBuf>,
    /// Failure message when unsuccessful.
    pub error: Option<String>,
    /// Cumulative size of the artefacts on disk.
    pub total_downloaded_bytes: u64,
}

/// Download the artefact for one version and platform.
///
/// # Errors
///
/// Returns [`FetchError::RetriesExhausted`] when every transfer attempt
/// failed. All other failures are reported through the outcome.
pub fn download_package(
    store: &dyn BlobStore,
    reporter: &dyn Reporter,
    policy: RetryPolicy,
    request: &DownloadRequest<'_>,
) -> Result<DownloadOutcome, FetchError> {
    let capability = match prepare(request.sas_url, request.destination_dir, reporter) {
        Ok(capability) => capability,
        Err(message) => return Ok(fail(reporter, DownloadOutcome::failed(message))),
    };

    let index = fetch_index(store, &capability, reporter).unwrap_or_default();
    let Ok(artefact_path) = resolve_asset(&index, request.version, request.platform, reporter)
    else {
        let message = format!(
            "version {} (platform: {}) not found in index",
            request.version, request.platform
        );
        return Ok(fail(reporter, DownloadOutcome::failed(message)));
    };

    let fetcher = Fetcher::new(store, reporter, policy);
    match fetcher.download(&capability, artefact_path, request.destination_dir) {
        Ok(fetched) => Ok(DownloadOutcome {
            success: true,
            package_path: Some(fetched.local_path),
            error: None,
            downloaded_bytes: fetched.bytes,
        }),
        Err(error) if error.is_fatal() => Err(error),
        Err(error) => {
            let message = format!("download failed: {error}");
            Ok(fail(reporter, DownloadOutcome::failed(message)))
        }
    }
}

/// Download every artefact published under one version.
///
/// Artefacts already on disk are kept and counted. A batch that stops
/// early keeps the paths and bytes of what it finished.
///
/// # Errors
///
/// Returns [`FetchError::RetriesExhausted`] when an artefact exhausted its
/// transfer attempts. All other failures are reported through the outcome.
pub fn download_all_packages(
    store: &dyn BlobStore,
    reporter: &dyn Reporter,
    policy: RetryPolicy,
    request: &BatchRequest<'_>,
) -> Result<BatchDownloadOutcome, FetchError> {
    let capability = match prepare(request.sas_url, request.destination_dir, reporter) {
        Ok(capability) => capability,
        Err(message) => {
            let outcome = BatchDownloadOutcome {
                error: Some(message),
                ..BatchDownloadOutcome::default()
            };
            return Ok(fail_batch(reporter, outcome));
        }
    };

    let index = fetch_index(store, &capability, reporter).unwrap_or_default();
    let artefact_paths = resolve_all_assets(&index, request.version, reporter);
    if artefact_paths.is_empty() {
        let outcome = BatchDownloadOutcome {
            error: Some(format!("version {} not found in index", request.version)),
            ..BatchDownloadOutcome::default()
        };
        return Ok(fail_batch(reporter, outcome));
    }

    let fetcher = Fetcher::new(store, reporter, policy);
    let batch = fetcher.download_all(&capability, &artefact_paths, request.destination_dir);
    let mut outcome = BatchDownloadOutcome {
        success: batch.is_complete(),
        package_paths: batch.paths,
        error: None,
        total_downloaded_bytes: batch.total_bytes,
    };
    match batch.error {
        None => Ok(outcome),
        Some(error) if error.is_fatal() => Err(error),
        Some(error) => {
            outcome.error = Some(format!("download failed: {error}"));
            Ok(fail_batch(reporter, outcome))
        }
    }
}

/// Validate the access URL and create the destination directory.
fn prepare(
    sas_url: &str,
    destination_dir: &Utf8Path,
    reporter: &dyn Reporter,
) -> Result<AccessCapability, String> {
    if !capability::validate(sas_url, reporter) {
        return Err("invalid access capability".to_owned());
    }
    let capability =
        AccessCapability::parse(sas_url).map_err(|_| "invalid access capability".to_owned())?;
    std::fs::create_dir_all(destination_dir)
        .map_err(|e| format!("failed to create {destination_dir}: {e}"))?;
    Ok(capability)
}

fn fail(reporter: &dyn Reporter, outcome: DownloadOutcome) -> DownloadOutcome {
    if let Some(message) = &outcome.error {
        reporter.report(FetchEvent::DownloadFailed {
            message: message.clone(),
        });
    }
    outcome
}

fn fail_batch(reporter: &dyn Reporter, outcome: BatchDownloadOutcome) -> BatchDownloadOutcome {
    if let Some(message) = &outcome.error {
        reporter.report(FetchEvent::DownloadFailed {
            message: message.clone(),
        });
    }
    outcome
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
