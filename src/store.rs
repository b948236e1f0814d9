//! Blob store boundary.
//!
//! The resolver and fetcher only need three operations from the remote
//! container: an existence check, a whole-body text read for the index, and
//! a streamed download into a local file. [`BlobStore`] captures them so
//! tests can substitute the network; [`HttpBlobStore`] is the production
//! implementation on top of a blocking `ureq` agent.

use std::io::{self, Read, Write};
use std::time::Duration;

use camino::Utf8Path;

use crate::capability::redact;

/// Operations consumed from the remote blob container.
///
/// Every URL already carries the pre-signed credential in its query string;
/// implementations add no further authentication.
#[cfg_attr(test, mockall::automock)]
pub trait BlobStore {
    /// Report whether the object at `url` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot answer.
    fn exists(&self, url: &str) -> Result<bool, StoreError>;

    /// Read the full body of the object at `url` as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or body read fails.
    fn read_to_string(&self, url: &str) -> Result<String, StoreError>;

    /// Stream the object at `url` into `destination`.
    ///
    /// The file is created or truncated, never appended to.
    ///
    /// # Errors
    ///
    /// Returns an error if the request, transfer, or file write fails.
    fn download_to(&self, url: &str, destination: &Utf8Path) -> Result<(), StoreError>;
}

/// Errors reported by a [`BlobStore`].
///
/// URLs held by these variants are redacted: the credential-bearing query
/// string is removed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store rejected or failed the request. Worth retrying.
    #[error("request failed for {url}: {reason}")]
    RequestFailed {
        /// The redacted URL.
        url: String,
        /// HTTP status, when the store answered.
        status: Option<u16>,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The request could not be formed, e.g. a malformed URL.
    #[error("invalid request for {url}: {reason}")]
    InvalidRequest {
        /// The redacted URL.
        url: String,
        /// A human-readable description of the problem.
        reason: String,
    },

    /// Writing the local file failed.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` for failures a later attempt may not repeat.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RequestFailed { .. })
    }
}

/// HTTP-based store using `ureq`.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    agent: ureq::Agent,
}

impl HttpBlobStore {
    /// Build a store whose requests are bounded by `timeout`, or unbounded
    /// when `None`.
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpBlobStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl BlobStore for HttpBlobStore {
    fn exists(&self, url: &str) -> Result<bool, StoreError> {
        match self.agent.head(url).call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::StatusCode(404)) => Ok(false),
            Err(e) => Err(map_ureq_error(url, &e)),
        }
    }

    fn read_to_string(&self, url: &str) -> Result<String, StoreError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        response
            .into_body()
            .read_to_string()
            .map_err(|e| map_ureq_error(url, &e))
    }

    fn download_to(&self, url: &str, destination: &Utf8Path) -> Result<(), StoreError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let mut file = std::fs::File::create(destination)?;
        stream_body(url, response.into_body().into_reader(), &mut file)?;
        Ok(())
    }
}

/// Body reader that remembers whether the remote side failed.
struct BodyReader<R> {
    inner: R,
    failed: bool,
}

impl<R: Read> Read for BodyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).inspect_err(|e| {
            if e.kind() != io::ErrorKind::Interrupted {
                self.failed = true;
            }
        })
    }
}

/// Copy a response body into `sink`.
///
/// A body that breaks off is a transient [`StoreError::RequestFailed`]; a
/// failed local write is [`StoreError::Io`].
fn stream_body(url: &str, body: impl Read, sink: &mut impl Write) -> Result<u64, StoreError> {
    let mut reader = BodyReader {
        inner: body,
        failed: false,
    };
    match io::copy(&mut reader, sink).and_then(|copied| sink.flush().map(|()| copied)) {
        Ok(copied) => Ok(copied),
        Err(e) if reader.failed => Err(StoreError::RequestFailed {
            url: redact(url).to_owned(),
            status: None,
            reason: format!("transfer interrupted: {e}"),
        }),
        Err(e) => Err(StoreError::Io(e)),
    }
}

/// Map a ureq error to a [`StoreError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> StoreError {
    let url = redact(url).to_owned();
    match err {
        ureq::Error::BadUri(reason) => StoreError::InvalidRequest {
            url,
            reason: reason.clone(),
        },
        ureq::Error::StatusCode(status) => StoreError::RequestFailed {
            url,
            status: Some(*status),
            reason: format!("HTTP status {status}"),
        },
        other => StoreError::RequestFailed {
            url,
            status: None,
            reason: other.to_string(),
        },
    }
}
