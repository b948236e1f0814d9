//! Checks that `LogReporter` forwards events to the `log` facade.

use std::time::Duration;

use blobfetch::reporter::{FetchEvent, LogReporter, Reporter};
use log::Level;
use logtest::Logger;

#[test]
fn events_are_logged_at_their_own_level() {
    let mut logger = Logger::start();
    let reporter = LogReporter;

    reporter.report(FetchEvent::IndexMissing);
    reporter.report(FetchEvent::AttemptFailed {
        attempt: 1,
        reason: "HTTP status 503".to_owned(),
        retry_delay: Duration::from_millis(1000),
    });
    reporter.report(FetchEvent::DownloadFailed {
        message: "version 9.9.9 not found in index".to_owned(),
    });

    let mut records = Vec::new();
    while let Some(record) = logger.pop() {
        if record.target() == "blobfetch" {
            records.push((record.level(), record.args().to_string()));
        }
    }

    assert_eq!(
        records,
        vec![
            (Level::Warn, "index.json not found in container root".to_owned()),
            (
                Level::Warn,
                "download attempt 1 failed: HTTP status 503; retrying in 1000ms".to_owned()
            ),
            (
                Level::Error,
                "package download failed: version 9.9.9 not found in index".to_owned()
            ),
        ]
    );
}
