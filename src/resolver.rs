//! Package index retrieval and artefact resolution.
//!
//! [`fetch_index`] turns the container's `index.json` into a
//! [`PackageIndex`], treating a missing or unreadable index as an empty
//! catalogue rather than an error. [`resolve_asset`] and
//! [`resolve_all_assets`] then map a version (and optionally a platform
//! token) to artefact paths relative to the container root.

use crate::capability::AccessCapability;
use crate::manifest::{PackageIndex, parse_index};
use crate::reporter::{FetchEvent, Reporter};
use crate::store::BlobStore;
use crate::versions::normalise_version;

/// Why a version/platform pair could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The version is not listed in the index.
    #[error("version {version} not found in index; available versions: {}", .available.join(", "))]
    VersionNotFound {
        /// The normalized version.
        version: String,
        /// Versions the index lists.
        available: Vec<String>,
    },

    /// The version has no asset whose name contains the platform token.
    #[error(
        "platform {platform} not found for version {version}; available assets: {}",
        .available.join(", ")
    )]
    PlatformNotFound {
        /// The requested platform token.
        platform: String,
        /// The normalized version.
        version: String,
        /// Asset names listed under the version.
        available: Vec<String>,
    },
}

/// Download and parse the container's package index.
///
/// Returns `None` when the index is absent (one warning event) or when the
/// store or parser fails (one error event carrying the cause).
pub fn fetch_index(
    store: &dyn BlobStore,
    capability: &AccessCapability,
    reporter: &dyn Reporter,
) -> Option<PackageIndex> {
    let url = capability.index_url();
    match load_index(store, &url) {
        Ok(Some(index)) => {
            reporter.report(FetchEvent::IndexLoaded {
                versions: index.versions.len(),
            });
            Some(index)
        }
        Ok(None) => {
            reporter.report(FetchEvent::IndexMissing);
            None
        }
        Err(reason) => {
            reporter.report(FetchEvent::IndexUnreadable { reason });
            None
        }
    }
}

fn load_index(store: &dyn BlobStore, url: &str) -> Result<Option<PackageIndex>, String> {
    if !store.exists(url).map_err(|e| e.to_string())? {
        return Ok(None);
    }
    let json = store.read_to_string(url).map_err(|e| e.to_string())?;
    let index = parse_index(&json).map_err(|e| e.to_string())?;
    Ok(Some(index))
}

/// Resolve the artefact path for `version` on `platform`.
///
/// The version is normalized with [`normalise_version`] and matched exactly;
/// the platform token must appear, case-insensitively, in the asset name.
/// The first match in manifest order wins.
///
/// # Errors
///
/// Returns [`ResolveError`] listing the available versions or asset names
/// when nothing matches. The same diagnostic is reported as a warning.
///
/// # Examples
///
/// ```
/// use blobfetch::manifest::parse_index;
/// use blobfetch::reporter::NullReporter;
/// use blobfetch::resolver::resolve_asset;
///
/// let index = parse_index(r#"{"versions":[{"version":"2.0.0","assets":[
///     {"name":"app-linux-x64.zip","path":"v2.0.0/app-linux-x64.zip"}]}]}"#)?;
/// let path = resolve_asset(&index, "v2.0.0", "LINUX", &NullReporter);
/// assert_eq!(path, Ok("v2.0.0/app-linux-x64.zip"));
/// # Ok::<(), blobfetch::manifest::ManifestParseError>(())
/// ```
pub fn resolve_asset<'a>(
    index: &'a PackageIndex,
    version: &str,
    platform: &str,
    reporter: &dyn Reporter,
) -> Result<&'a str, ResolveError> {
    let version = normalise_version(version);
    let Some(entry) = index.version(version) else {
        let available = index.version_labels();
        reporter.report(FetchEvent::VersionNotFound {
            version: version.to_owned(),
            available: available.clone(),
        });
        return Err(ResolveError::VersionNotFound {
            version: version.to_owned(),
            available,
        });
    };

    let token = platform.to_lowercase();
    let Some(asset) = entry
        .assets
        .iter()
        .find(|asset| asset.name.to_lowercase().contains(&token))
    else {
        let available = entry.asset_names();
        reporter.report(FetchEvent::PlatformNotFound {
            platform: platform.to_owned(),
            version: version.to_owned(),
            available: available.clone(),
        });
        return Err(ResolveError::PlatformNotFound {
            platform: platform.to_owned(),
            version: version.to_owned(),
            available,
        });
    };

    reporter.report(FetchEvent::AssetResolved {
        name: asset.name.clone(),
        path: asset.path.clone(),
    });
    Ok(asset.path.as_str())
}

/// Every artefact path published under `version`, in manifest order.
///
/// An unknown version yields an empty list and a warning naming the
/// versions the index does list.
pub fn resolve_all_assets(
    index: &PackageIndex,
    version: &str,
    reporter: &dyn Reporter,
) -> Vec<String> {
    let version = normalise_version(version);
    let Some(entry) = index.version(version) else {
        reporter.report(FetchEvent::VersionNotFound {
            version: version.to_owned(),
            available: index.version_labels(),
        });
        return Vec::new();
    };

    let paths: Vec<String> = entry.assets.iter().map(|asset| asset.path.clone()).collect();
    reporter.report(FetchEvent::AssetsResolved {
        version: version.to_owned(),
        count: paths.len(),
    });
    paths
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
