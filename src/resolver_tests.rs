//! Unit tests for index retrieval and artefact resolution.

use super::*;
use crate::reporter::RecordingReporter;
use crate::store::{MockBlobStore, StoreError};
use crate::test_utils::{index_json, two_platform_index_json};
use log::Level;
use rstest::{fixture, rstest};

const SAS_URL: &str = "https://acct.blob.example/releases?sp=rl&sig=abc";
const INDEX_URL: &str = "https://acct.blob.example/releases/index.json?sp=rl&sig=abc";

#[fixture]
fn capability() -> AccessCapability {
    AccessCapability::parse(SAS_URL).expect("valid capability")
}

#[fixture]
fn index() -> PackageIndex {
    parse_index(&two_platform_index_json()).expect("valid index")
}

#[rstest]
fn fetch_index_reads_index_at_container_root(capability: AccessCapability) {
    let mut store = MockBlobStore::new();
    store
        .expect_exists()
        .withf(|url| url == INDEX_URL)
        .times(1)
        .returning(|_| Ok(true));
    store
        .expect_read_to_string()
        .withf(|url| url == INDEX_URL)
        .times(1)
        .returning(|_| Ok(two_platform_index_json()));
    let reporter = RecordingReporter::default();

    let index = fetch_index(&store, &capability, &reporter).expect("index loaded");

    assert_eq!(index.versions.len(), 1);
    assert_eq!(reporter.events(), vec![FetchEvent::IndexLoaded { versions: 1 }]);
}

#[rstest]
fn missing_index_returns_none_with_single_warning(capability: AccessCapability) {
    let mut store = MockBlobStore::new();
    store.expect_exists().times(1).returning(|_| Ok(false));
    store.expect_read_to_string().times(0);
    let reporter = RecordingReporter::default();

    let index = fetch_index(&store, &capability, &reporter);

    assert!(index.is_none());
    assert_eq!(reporter.events(), vec![FetchEvent::IndexMissing]);
    assert_eq!(reporter.events_at(Level::Warn).len(), 1);
}

#[rstest]
#[case::exists_failure(true)]
#[case::read_failure(false)]
fn store_failures_become_none(capability: AccessCapability, #[case] exists_fails: bool) {
    let mut store = MockBlobStore::new();
    store.expect_exists().returning(move |url| {
        if exists_fails {
            Err(StoreError::RequestFailed {
                url: url.to_owned(),
                status: Some(403),
                reason: "HTTP status 403".to_owned(),
            })
        } else {
            Ok(true)
        }
    });
    store.expect_read_to_string().returning(|_| {
        Err(StoreError::RequestFailed {
            url: "https://acct.blob.example/releases/index.json".to_owned(),
            status: None,
            reason: "connection reset".to_owned(),
        })
    });
    let reporter = RecordingReporter::default();

    assert!(fetch_index(&store, &capability, &reporter).is_none());
    assert!(matches!(
        reporter.events().as_slice(),
        [FetchEvent::IndexUnreadable { .. }]
    ));
}

#[rstest]
fn unparsable_index_becomes_none(capability: AccessCapability) {
    let mut store = MockBlobStore::new();
    store.expect_exists().returning(|_| Ok(true));
    store
        .expect_read_to_string()
        .returning(|_| Ok("{not valid json".to_owned()));
    let reporter = RecordingReporter::default();

    assert!(fetch_index(&store, &capability, &reporter).is_none());
    match reporter.events().as_slice() {
        [FetchEvent::IndexUnreadable { reason }] => assert!(reason.contains("parse")),
        other => panic!("expected a single IndexUnreadable event, got {other:?}"),
    }
}

#[rstest]
#[case::prefixed("v2.0.0")]
#[case::bare("2.0.0")]
fn version_prefix_does_not_change_resolution(index: PackageIndex, #[case] version: &str) {
    let reporter = RecordingReporter::default();
    assert_eq!(
        resolve_asset(&index, version, "linux-x64", &reporter),
        Ok("v2.0.0/app-linux-x64.zip")
    );
    assert_eq!(
        resolve_all_assets(&index, version, &reporter),
        vec!["v2.0.0/app-linux-x64.zip", "v2.0.0/app-win-x64.zip"]
    );
}

#[rstest]
#[case::exact("linux-x64", true)]
#[case::upper("LINUX-X64", true)]
#[case::partial("Linux", true)]
#[case::other_platform("win-x64", false)]
fn platform_token_is_a_case_insensitive_substring(#[case] platform: &str, #[case] hit: bool) {
    let json = index_json(&[(
        "1.0.0",
        &[("hagicode-linux-x64.zip", "v1.0.0/hagicode-linux-x64.zip")],
    )]);
    let index = parse_index(&json).expect("valid index");

    let resolved = resolve_asset(&index, "1.0.0", platform, &RecordingReporter::default());

    assert_eq!(resolved.is_ok(), hit, "platform {platform}: {resolved:?}");
}

#[rstest]
fn missing_platform_lists_available_assets(index: PackageIndex) {
    let reporter = RecordingReporter::default();

    let err = resolve_asset(&index, "2.0.0", "osx-x64", &reporter).expect_err("not found");

    let available = vec!["app-linux-x64.zip".to_owned(), "app-win-x64.zip".to_owned()];
    assert_eq!(
        err,
        ResolveError::PlatformNotFound {
            platform: "osx-x64".to_owned(),
            version: "2.0.0".to_owned(),
            available: available.clone(),
        }
    );
    assert!(err.to_string().contains("app-linux-x64.zip, app-win-x64.zip"));
    assert_eq!(
        reporter.events_at(Level::Warn),
        vec![FetchEvent::PlatformNotFound {
            platform: "osx-x64".to_owned(),
            version: "2.0.0".to_owned(),
            available,
        }]
    );
}

#[rstest]
fn missing_version_lists_available_versions(index: PackageIndex) {
    let reporter = RecordingReporter::default();

    let err = resolve_asset(&index, "v9.9.9", "linux-x64", &reporter).expect_err("not found");

    assert_eq!(
        err,
        ResolveError::VersionNotFound {
            version: "9.9.9".to_owned(),
            available: vec!["2.0.0".to_owned()],
        }
    );
}

#[test]
fn empty_index_reports_version_not_found() {
    let reporter = RecordingReporter::default();
    let err = resolve_asset(&PackageIndex::default(), "1.0.0", "linux-x64", &reporter)
        .expect_err("empty index");
    assert!(matches!(err, ResolveError::VersionNotFound { available, .. } if available.is_empty()));
}

#[test]
fn ambiguous_platform_picks_first_listed_asset() {
    let json = index_json(&[(
        "1.0.0",
        &[
            ("app-linux-x64.zip", "v1.0.0/app-linux-x64.zip"),
            ("app-linux-x64-debug.zip", "v1.0.0/app-linux-x64-debug.zip"),
        ],
    )]);
    let index = parse_index(&json).expect("valid index");

    let path = resolve_asset(&index, "1.0.0", "linux-x64", &RecordingReporter::default());

    assert_eq!(path, Ok("v1.0.0/app-linux-x64.zip"));
}

#[test]
fn resolve_all_assets_keeps_manifest_order() {
    let json = index_json(&[(
        "3.1.0",
        &[
            ("app-win-x64.zip", "v3.1.0/app-win-x64.zip"),
            ("app-osx-x64.zip", "v3.1.0/app-osx-x64.zip"),
            ("app-linux-x64.zip", "v3.1.0/app-linux-x64.zip"),
        ],
    )]);
    let index = parse_index(&json).expect("valid index");
    let reporter = RecordingReporter::default();

    let paths = resolve_all_assets(&index, "v3.1.0", &reporter);

    assert_eq!(
        paths,
        vec![
            "v3.1.0/app-win-x64.zip",
            "v3.1.0/app-osx-x64.zip",
            "v3.1.0/app-linux-x64.zip"
        ]
    );
    assert_eq!(
        reporter.events(),
        vec![FetchEvent::AssetsResolved {
            version: "3.1.0".to_owned(),
            count: 3
        }]
    );
}

#[rstest]
fn resolve_all_assets_for_unknown_version_is_empty(index: PackageIndex) {
    let reporter = RecordingReporter::default();

    let paths = resolve_all_assets(&index, "1.0.0", &reporter);

    assert!(paths.is_empty());
    let warnings = reporter.events_at(Level::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].to_string().contains("available versions: 2.0.0"));
}
