//! BDD tests for idempotent, retrying artefact downloads.

use std::time::Duration;

use blobfetch::capability::AccessCapability;
use blobfetch::error::FetchError;
use blobfetch::fetcher::{FetchedArtefact, Fetcher, RetryPolicy};
use blobfetch::reporter::RecordingReporter;
use blobfetch::test_utils::{StubBlobStore, StubTransfer};
use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

const SAS_URL: &str = "https://acct.blob.example/releases?sp=rl&sig=abc";

struct DownloadWorld {
    _temp_dir: tempfile::TempDir,
    download_dir: Utf8PathBuf,
    transfers: Vec<StubTransfer>,
    download_calls: Option<usize>,
    result: Option<Result<FetchedArtefact, FetchError>>,
}

impl DownloadWorld {
    fn fetched(&self) -> &FetchedArtefact {
        match self.result.as_ref().expect("download not attempted") {
            Ok(fetched) => fetched,
            Err(err) => panic!("expected success, got {err}"),
        }
    }

    fn error(&self) -> &FetchError {
        match self.result.as_ref().expect("download not attempted") {
            Ok(fetched) => panic!("expected failure, got {fetched:?}"),
            Err(err) => err,
        }
    }
}

#[fixture]
fn world() -> DownloadWorld {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let download_dir =
        Utf8PathBuf::try_from(temp_dir.path().join("download")).expect("UTF-8 path");
    DownloadWorld {
        _temp_dir: temp_dir,
        download_dir,
        transfers: Vec::new(),
        download_calls: None,
        result: None,
    }
}

#[given("the store fails transiently {count} times")]
fn given_transient_failures(world: &mut DownloadWorld, count: usize) {
    world
        .transfers
        .extend(std::iter::repeat_n(StubTransfer::Transient, count));
}

#[given("the store then serves {bytes} bytes")]
fn given_body(world: &mut DownloadWorld, bytes: usize) {
    world.transfers.push(StubTransfer::Body(vec![7_u8; bytes]));
}

#[given("the store rejects the request")]
fn given_rejection(world: &mut DownloadWorld) {
    world.transfers.push(StubTransfer::Rejected);
}

#[given("the file \"{name}\" already exists with {bytes} bytes")]
fn given_existing_file(world: &mut DownloadWorld, name: String, bytes: usize) {
    std::fs::create_dir_all(&world.download_dir).expect("create download dir");
    std::fs::write(world.download_dir.join(name), vec![0_u8; bytes]).expect("write file");
}

#[when("the artefact \"{path}\" is downloaded")]
fn when_downloaded(world: &mut DownloadWorld, path: String) {
    let store = StubBlobStore::new(None, std::mem::take(&mut world.transfers));
    let reporter = RecordingReporter::default();
    let policy = RetryPolicy::new(3, Duration::ZERO).expect("non-zero attempts");
    let capability = AccessCapability::parse(SAS_URL).expect("valid capability");
    let fetcher = Fetcher::new(&store, &reporter, policy);

    world.result = Some(fetcher.download(&capability, &path, &world.download_dir));
    world.download_calls = Some(store.download_calls());
}

#[then("the download succeeds with {bytes} bytes")]
fn then_success(world: &mut DownloadWorld, bytes: u64) {
    let fetched = world.fetched();
    assert!(!fetched.skipped);
    assert_eq!(fetched.bytes, bytes);
    let on_disk = std::fs::metadata(&fetched.local_path).expect("file exists").len();
    assert_eq!(on_disk, bytes);
}

#[then("the download is skipped with {bytes} bytes")]
fn then_skipped(world: &mut DownloadWorld, bytes: u64) {
    let fetched = world.fetched();
    assert!(fetched.skipped);
    assert_eq!(fetched.bytes, bytes);
}

#[then("the download fails after {attempts} attempts")]
fn then_exhausted(world: &mut DownloadWorld, attempts: u32) {
    match world.error() {
        FetchError::RetriesExhausted { attempts: made, .. } => assert_eq!(*made, attempts),
        other => panic!("expected RetriesExhausted, got {other}"),
    }
}

#[then("the download fails without retrying")]
fn then_not_retried(world: &mut DownloadWorld) {
    let err = world.error();
    assert!(matches!(err, FetchError::Store { .. }), "got {err}");
    assert!(!err.is_fatal());
}

#[then("the store received {count} download requests")]
fn then_request_count(world: &mut DownloadWorld, count: usize) {
    assert_eq!(world.download_calls, Some(count));
}

#[scenario(
    path = "tests/features/resilient_download.feature",
    name = "Transient failures are retried until the transfer succeeds"
)]
fn scenario_retry_then_success(world: DownloadWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/resilient_download.feature",
    name = "Retries are exhausted after three transient failures"
)]
fn scenario_retries_exhausted(world: DownloadWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/resilient_download.feature",
    name = "Existing files are not downloaded again"
)]
fn scenario_existing_file(world: DownloadWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/resilient_download.feature",
    name = "Rejected requests are not retried"
)]
fn scenario_rejected(world: DownloadWorld) {
    let _ = world;
}
