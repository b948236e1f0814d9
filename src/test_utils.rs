//! Shared test utilities for the blobfetch crate.

use crate::capability::redact;
use crate::store::{BlobStore, StoreError};
use camino::Utf8Path;
use std::cell::RefCell;
use std::collections::VecDeque;

/// Build index JSON from `(version, [(asset name, asset path)])` entries.
///
/// Field names use the camel case the release pipeline publishes.
#[must_use]
pub fn index_json(versions: &[(&str, &[(&str, &str)])]) -> String {
    let versions: Vec<serde_json::Value> = versions
        .iter()
        .map(|(version, assets)| {
            let assets: Vec<serde_json::Value> = assets
                .iter()
                .map(|(name, path)| {
                    serde_json::json!({
                        "name": name,
                        "path": path,
                        "size": 1024,
                        "lastModified": "2026-03-01T11:00:00Z",
                    })
                })
                .collect();
            let files: Vec<&str> = assets.iter().filter_map(|a| a["name"].as_str()).collect();
            serde_json::json!({ "version": version, "files": files, "assets": assets })
        })
        .collect();
    serde_json::json!({ "updatedAt": "2026-03-01T12:00:00Z", "versions": versions }).to_string()
}

/// Index with version `2.0.0` publishing a linux-x64 and a win-x64 archive.
#[must_use]
pub fn two_platform_index_json() -> String {
    index_json(&[(
        "2.0.0",
        &[
            ("app-linux-x64.zip", "v2.0.0/app-linux-x64.zip"),
            ("app-win-x64.zip", "v2.0.0/app-win-x64.zip"),
        ],
    )])
}

/// Scripted response to one `download_to` call.
#[derive(Debug, Clone)]
pub enum StubTransfer {
    /// Write these bytes to the destination.
    Body(Vec<u8>),
    /// Write these bytes, then fail transiently as if the connection dropped.
    Interrupted(Vec<u8>),
    /// Fail transiently without touching the destination.
    Transient,
    /// Fail with a non-transient error.
    Rejected,
}

/// A stub [`BlobStore`] replaying scripted responses.
///
/// Every call is recorded with its redacted URL so tests can assert how
/// much network traffic an operation produced.
#[derive(Debug, Default)]
pub struct StubBlobStore {
    index: Option<String>,
    transfers: RefCell<VecDeque<StubTransfer>>,
    calls: RefCell<Vec<String>>,
}

impl StubBlobStore {
    /// Creates a store serving `index` as `index.json` (absent when `None`)
    /// and answering downloads with `transfers` in order.
    #[must_use]
    pub fn new(index: Option<String>, transfers: Vec<StubTransfer>) -> Self {
        Self {
            index,
            transfers: RefCell::new(transfers.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Every call made so far as `"<operation> <redacted url>"`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Number of `download_to` calls made so far.
    #[must_use]
    pub fn download_calls(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.starts_with("download "))
            .count()
    }

    /// Asserts that every scripted transfer has been consumed.
    ///
    /// # Panics
    ///
    /// Panics if scripted transfers remain.
    pub fn assert_finished(&self) {
        assert!(
            self.transfers.borrow().is_empty(),
            "expected every scripted transfer to be consumed"
        );
    }

    fn record(&self, operation: &str, url: &str) {
        self.calls
            .borrow_mut()
            .push(format!("{operation} {}", redact(url)));
    }
}

impl BlobStore for StubBlobStore {
    fn exists(&self, url: &str) -> Result<bool, StoreError> {
        self.record("exists", url);
        Ok(self.index.is_some() && redact(url).ends_with("/index.json"))
    }

    fn read_to_string(&self, url: &str) -> Result<String, StoreError> {
        self.record("read", url);
        self.index.clone().ok_or_else(|| StoreError::RequestFailed {
            url: redact(url).to_owned(),
            status: Some(404),
            reason: "HTTP status 404".to_owned(),
        })
    }

    fn download_to(&self, url: &str, destination: &Utf8Path) -> Result<(), StoreError> {
        self.record("download", url);
        let transient = || StoreError::RequestFailed {
            url: redact(url).to_owned(),
            status: Some(503),
            reason: "HTTP status 503".to_owned(),
        };
        match self.transfers.borrow_mut().pop_front() {
            Some(StubTransfer::Body(bytes)) => Ok(std::fs::write(destination, bytes)?),
            Some(StubTransfer::Interrupted(bytes)) => {
                std::fs::write(destination, bytes)?;
                Err(transient())
            }
            Some(StubTransfer::Transient) => Err(transient()),
            Some(StubTransfer::Rejected) | None => Err(StoreError::InvalidRequest {
                url: redact(url).to_owned(),
                reason: "unexpected download".to_owned(),
            }),
        }
    }
}
