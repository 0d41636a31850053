//! E2E Request Log Tests
//!
//! Captures the server's records in a rotating log file and checks the
//! per-request line.

use super::common::{generate_test_data, E2ETestEnv};
use fileserver::logging::{RotatingFile, RotationPolicy};
use reqwest::StatusCode;
use tracing::subscriber::DefaultGuard;

fn capture_into(sink: &RotatingFile) -> DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(sink.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_default(subscriber)
}

fn request_lines(sink: &RotatingFile) -> Vec<String> {
    std::fs::read_to_string(sink.path())
        .unwrap()
        .lines()
        .filter(|line| line.contains(" request from "))
        .map(str::to_string)
        .collect()
}

// The default subscriber is per thread, so the server's tasks must share
// the test's current-thread runtime.
#[tokio::test(flavor = "current_thread")]
async fn test_one_request_line_per_request() {
    let logs = tempfile::tempdir().unwrap();
    let sink = RotatingFile::open(
        logs.path().join("requests.log"),
        RotationPolicy {
            max_size_bytes: 0,
            max_backups: 0,
            max_age_days: 0,
        },
    )
    .unwrap();
    let _guard = capture_into(&sink);
    let env = E2ETestEnv::new().await;

    let (status, _) = env.get("/").await;
    assert_eq!(status, StatusCode::OK);

    let response = env
        .client
        .put(format!("{}/receive?x=1", env.base_url()))
        .body("data")
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);

    let response = env
        .upload("/receive", Some("docs"), "a.bin", generate_test_data(64))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let lines = request_lines(&sink);
    assert_eq!(lines.len(), 3, "{:#?}", lines);

    let peer_prefix = "request from \"127.0.0.1:";
    assert!(lines.iter().all(|line| line.contains(peer_prefix)));
    assert!(lines[0].contains("\"GET\" request from") && lines[0].ends_with("for path \"/\""));
    assert!(lines[1].contains("\"PUT\" request from"));
    assert!(lines[1].ends_with("for path \"/receive?x=1\""));
    assert!(lines[2].contains("\"POST\" request from"));
    assert!(lines[2].ends_with("for path \"/receive\""));
}
