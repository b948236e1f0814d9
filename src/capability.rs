//! Pre-signed access URL handling.
//!
//! An [`AccessCapability`] wraps the pre-authorized container URL supplied by
//! the caller. The query string carries the signature scope and expiry, so it
//! is split off once and reattached verbatim to every derived blob URL.

use std::fmt;

use thiserror::Error;

use crate::reporter::{FetchEvent, Reporter};

/// Object name of the package index at the container root.
pub const INDEX_OBJECT: &str = "index.json";

/// Errors arising from an unusable access URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The URL is empty or contains only whitespace.
    #[error("access URL is empty")]
    Empty,

    /// The URL scheme is neither `http` nor `https`.
    #[error("access URL must use http or https, found \"{scheme}\"")]
    UnsupportedScheme {
        /// The rejected scheme.
        scheme: String,
    },

    /// The URL could not be parsed as an absolute URL with a host.
    #[error("access URL is malformed: {reason}")]
    Malformed {
        /// Description of the parse failure.
        reason: String,
    },
}

/// A validated, pre-authorized container URL.
///
/// # Examples
///
/// ```
/// use blobfetch::capability::AccessCapability;
///
/// let capability =
///     AccessCapability::parse("https://acct.blob.example/releases?sp=r&sig=abc")?;
/// assert_eq!(
///     capability.blob_url("v1.0.0/app-linux-x64.zip"),
///     "https://acct.blob.example/releases/v1.0.0/app-linux-x64.zip?sp=r&sig=abc",
/// );
/// # Ok::<(), blobfetch::capability::CapabilityError>(())
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct AccessCapability {
    base: String,
    query: String,
}

impl AccessCapability {
    /// Parse and validate a raw access URL.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError`] when the URL is blank, not `http(s)`, or
    /// not an absolute URL with a host.
    pub fn parse(raw: &str) -> Result<Self, CapabilityError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CapabilityError::Empty);
        }

        let parsed = url::Url::parse(trimmed).map_err(|e| CapabilityError::Malformed {
            reason: e.to_string(),
        })?;
        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(CapabilityError::UnsupportedScheme {
                scheme: scheme.to_owned(),
            });
        }
        // `Url::parse` tolerates `https:host` and `https:/host`; derived
        // URLs reuse the caller's text, so insist on the authority marker.
        let after_scheme = trimmed.get(scheme.len() + 1..).unwrap_or_default();
        if !after_scheme.starts_with("//") || after_scheme.starts_with("///") {
            return Err(CapabilityError::Malformed {
                reason: format!("expected {scheme}:// followed by a host"),
            });
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(CapabilityError::Malformed {
                reason: "missing host".to_owned(),
            });
        }

        // Split the caller's text rather than re-serializing `parsed`, which
        // may re-encode the signature.
        let without_fragment = trimmed.split_once('#').map_or(trimmed, |(head, _)| head);
        let (base, query) = match without_fragment.find('?') {
            Some(index) => without_fragment.split_at(index),
            None => (without_fragment, ""),
        };

        Ok(Self {
            base: base.trim_end_matches('/').to_owned(),
            query: query.to_owned(),
        })
    }

    /// Compose the URL of an object relative to the container root.
    ///
    /// The caller's query string is appended byte-for-byte.
    #[must_use]
    pub fn blob_url(&self, relative_path: &str) -> String {
        let path = relative_path.trim_start_matches('/');
        format!("{}/{path}{}", self.base, self.query)
    }

    /// URL of the package index object.
    #[must_use]
    pub fn index_url(&self) -> String {
        self.blob_url(INDEX_OBJECT)
    }

    /// Container URL without the credential.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Original query string including its leading `?`, or empty.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns `true` when the query carries both a permissions and a
    /// signature marker.
    #[must_use]
    pub fn looks_signed(&self) -> bool {
        let query = self.query.to_ascii_lowercase();
        query.contains("sp=") && query.contains("sig=")
    }
}

impl fmt::Debug for AccessCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCapability")
            .field("base", &self.base)
            .field("query", &"<redacted>")
            .finish()
    }
}

/// Pre-flight check of a raw access URL.
///
/// Returns `false` for blank or non-`http(s)` URLs, reporting the reason.
/// A URL without `sp=` or `sig=` markers is accepted with a warning: the
/// check is heuristic and the store has the final say on authorization.
pub fn validate(raw: &str, reporter: &dyn Reporter) -> bool {
    match AccessCapability::parse(raw) {
        Ok(capability) => {
            if !capability.looks_signed() {
                reporter.report(FetchEvent::CapabilityUnsigned);
            }
            true
        }
        Err(reason) => {
            reporter.report(FetchEvent::CapabilityRejected { reason });
            false
        }
    }
}

/// Strip the query string from a URL so credentials stay out of messages.
///
/// # Examples
///
/// ```
/// use blobfetch::capability::redact;
///
/// assert_eq!(redact("https://host/c/index.json?sig=secret"), "https://host/c/index.json");
/// ```
#[must_use]
pub fn redact(url: &str) -> &str {
    url.split_once('?').map_or(url, |(head, _)| head)
}
