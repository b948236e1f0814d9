//! Resolve and download versioned release artefacts from a blob container.
//!
//! A container is addressed by a pre-signed URL ([`capability`]) and
//! publishes an `index.json` at its root ([`manifest`]). The [`resolver`]
//! maps a version and platform token to artefact paths, and the
//! [`fetcher`] downloads them idempotently, retrying transient
//! [`store`] failures. [`workflow`] chains these steps for the `blobfetch`
//! binary, which is configured through [`config`] and [`cli`].
//!
//! Diagnostics never go straight to a logger: every component reports
//! typed events to an injected [`reporter::Reporter`].

pub mod capability;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod manifest;
pub mod reporter;
pub mod resolver;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod versions;
pub mod workflow;

pub use capability::AccessCapability;
pub use error::{CommandError, FetchError};
pub use fetcher::{Fetcher, RetryPolicy};
pub use reporter::{FetchEvent, LogReporter, Reporter};
pub use store::{BlobStore, HttpBlobStore, StoreError};
