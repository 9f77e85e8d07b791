//! Integration tests for the report HTTP routes.
//!
//! Each test spins up an Axum server on a random port, runs the real
//! pipeline against a JSON inbox, and checks the REST contract.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;

use emotion_organizer::channels::JsonFileSource;
use emotion_organizer::classifier::LexiconClassifier;
use emotion_organizer::config::OrganizerConfig;
use emotion_organizer::pipeline::{Organizer, PipelineRunner};
use emotion_organizer::report::{SharedReport, report_routes};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const INBOX: &str = r#"[
    {"id": "m1", "content": "We are thrilled, congratulations on the launch!"},
    {"id": "m2", "content": "This is unacceptable and I am furious."},
    {"id": "m3", "content": "   "},
    {"id": "m4", "content": "Meeting moved to Tuesday."},
    {"id": "m5", "content": "I'm worried and angry about this."}
]"#;

/// Start an Axum server on a random port, return (base url, shared report).
async fn start_server() -> (String, SharedReport) {
    let shared = SharedReport::new();
    let app = report_routes(shared.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{}", port), shared)
}

/// Run the pipeline over `INBOX`, publishing into `shared`.
async fn run_pipeline(shared: &SharedReport) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inbox.json");
    std::fs::write(&path, INBOX).unwrap();

    let config = OrganizerConfig {
        worker_count: 2,
        ..OrganizerConfig::default()
    };
    let organizer = Organizer::new(Arc::new(LexiconClassifier::new(10_000)), &config).unwrap();
    PipelineRunner::new(Arc::new(JsonFileSource::new(&path)), organizer)
        .with_reporter(Arc::new(shared.clone()))
        .run()
        .await
        .unwrap();
}

async fn get(url: &str) -> (u16, String) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.text().await.unwrap())
}

#[tokio::test]
async fn home_and_health_respond() {
    timeout(TEST_TIMEOUT, async {
        let (base, _shared) = start_server().await;

        let (status, body) = get(&format!("{}/", base)).await;
        assert_eq!(status, 200);
        assert_eq!(body, "Welcome to the Email Emotion Organizer!");

        let (status, body) = get(&format!("{}/health", base)).await;
        assert_eq!(status, 200);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn report_is_not_found_before_first_run() {
    timeout(TEST_TIMEOUT, async {
        let (base, _shared) = start_server().await;

        let (status, _) = get(&format!("{}/api/report", base)).await;
        assert_eq!(status, 404);

        let (status, _) = get(&format!("{}/api/buckets", base)).await;
        assert_eq!(status, 404);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn buckets_reflect_latest_run() {
    timeout(TEST_TIMEOUT, async {
        let (base, shared) = start_server().await;
        run_pipeline(&shared).await;

        let (status, body) = get(&format!("{}/api/buckets", base)).await;
        assert_eq!(status, 200);
        let buckets: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(buckets["joy"], serde_json::json!(["m1"]));
        assert_eq!(buckets["anger"], serde_json::json!(["m2", "m5"]));
        assert_eq!(buckets["fear"], serde_json::json!(["m5"]));
        assert_eq!(buckets["neutral"], serde_json::json!(["m4"]));
        assert_eq!(buckets["unclassified"], serde_json::json!(["m3"]));

        let (status, body) = get(&format!("{}/api/buckets/anger", base)).await;
        assert_eq!(status, 200);
        let ids: Vec<String> = serde_json::from_str(&body).unwrap();
        assert_eq!(ids, vec!["m2", "m5"]);

        // Known bucket with no members is an empty list, not an error
        let (status, body) = get(&format!("{}/api/buckets/surprise", base)).await;
        assert_eq!(status, 200);
        assert_eq!(body, "[]");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_bucket_is_not_found() {
    timeout(TEST_TIMEOUT, async {
        let (base, shared) = start_server().await;
        run_pipeline(&shared).await;

        let (status, body) = get(&format!("{}/api/buckets/bored", base)).await;
        assert_eq!(status, 404);
        assert!(body.contains("unknown bucket"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn report_lists_failures() {
    timeout(TEST_TIMEOUT, async {
        let (base, shared) = start_server().await;
        run_pipeline(&shared).await;

        let (status, body) = get(&format!("{}/api/report", base)).await;
        assert_eq!(status, 200);
        let report: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(report["total_messages"], 5);
        assert_eq!(report["cancelled"], false);

        let failures = report["failures"].as_array().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0]["message_id"], "m3");
        assert_eq!(failures[0]["kind"], "invalid_input");
    })
    .await
    .expect("test timed out");
}
