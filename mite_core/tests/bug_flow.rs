/*!
 * Bug submission flow: validation, the per-attachment upload handshake,
 * and the final report POST.
 */
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mite_core::error::MiteError;
use mite_core::transport::{ApiClient, ApiClientOptions};
use mite_core::{Attachment, BugReportPayload, BugReporter, DeviceSnapshot, Priority};

fn bug_reporter(server: &MockServer) -> Arc<BugReporter> {
    let api = Arc::new(
        ApiClient::new(ApiClientOptions {
            base_url: server.uri(),
            timeout: Some(Duration::from_secs(5)),
            max_retries: 0,
            headers: Default::default(),
        })
        .unwrap(),
    );

    let mut device = DeviceSnapshot::new();
    device.insert("osName".into(), "linux".into());

    let reporter = BugReporter::new(api, Arc::new(device));
    reporter.init();
    Arc::new(reporter)
}

async fn mount_submission_ack(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/bug-reports"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "bug_1", "status": "received"})),
        )
        .mount(server)
        .await;
}

/**
 * Three attachments: three upload-URL requests and three uploads, in
 * input order, each consuming its own one-time URL. The submitted
 * attachment list preserves the order with the matching storage ids.
 */
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn attachments_upload_sequentially_and_in_order() {
    let server = MockServer::start().await;
    mount_submission_ack(&server).await;

    /* Each upload-URL request consumes a fresh one-time URL. */
    for n in 1..=3 {
        Mock::given(method("POST"))
            .and(path("/api/v1/upload-url"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "uploadUrl": format!("{}/upload/{n}", server.uri()),
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
    }

    /* The upload legs, matched on target, declared content type, and bytes. */
    let uploads = [
        ("/upload/1", "image/png", "png-bytes", "st-1"),
        ("/upload/2", "text/plain", "log text", "st-2"),
        ("/upload/3", "image/jpeg", "opaque-bytes", "st-3"),
    ];
    for (upload_path, content_type, bytes, storage_id) in uploads {
        Mock::given(method("PUT"))
            .and(path(upload_path))
            .and(header("Content-Type", content_type))
            .and(body_string(bytes))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"storageId": storage_id})),
            )
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("shot.png");
    let txt = dir.path().join("notes.txt");
    let blob = dir.path().join("blob");
    std::fs::write(&png, "png-bytes").unwrap();
    std::fs::write(&txt, "log text").unwrap();
    std::fs::write(&blob, "opaque-bytes").unwrap();

    let payload = BugReportPayload {
        title: "crash on open".into(),
        description: "app dies on the settings screen".into(),
        priority: Some(Priority::High),
        attachments: vec![
            Attachment::new(png.to_string_lossy().to_string()),
            Attachment::new(txt.to_string_lossy().to_string()),
            Attachment::new(blob.to_string_lossy().to_string()),
        ],
        ..Default::default()
    };

    let reporter = bug_reporter(&server);
    let ack = tokio::task::spawn_blocking(move || reporter.submit(payload))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(ack.id, "bug_1");
    assert_eq!(ack.status, "received");

    let requests = server.received_requests().await.unwrap();

    let upload_url_requests = requests
        .iter()
        .filter(|r| r.url.path() == "/api/v1/upload-url")
        .count();
    assert_eq!(upload_url_requests, 3);

    let put_paths: Vec<_> = requests
        .iter()
        .filter(|r| r.method.to_string() == "PUT")
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(put_paths, vec!["/upload/1", "/upload/2", "/upload/3"]);

    let submission: Value = requests
        .iter()
        .find(|r| r.url.path() == "/api/v1/bug-reports")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();

    let attachments = submission["attachments"].as_array().unwrap();
    assert_eq!(attachments.len(), 3);
    assert_eq!(attachments[0]["storage_id"], "st-1");
    assert_eq!(attachments[1]["storage_id"], "st-2");
    assert_eq!(attachments[2]["storage_id"], "st-3");
    assert_eq!(attachments[0]["file_name"], "shot.png");
    assert_eq!(attachments[0]["file_type"], "image/png");
    assert_eq!(attachments[2]["file_type"], "image/jpeg");

    assert_eq!(submission["priority"], "HIGH");
    assert_eq!(submission["device_info"]["osName"], "linux");
}

/**
 * No attachments: the submitted JSON has no `attachments` key at all.
 */
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn zero_attachments_omit_the_key() {
    let server = MockServer::start().await;
    mount_submission_ack(&server).await;

    let payload = BugReportPayload {
        title: "typo".into(),
        description: "label says 'Setings'".into(),
        ..Default::default()
    };

    let reporter = bug_reporter(&server);
    tokio::task::spawn_blocking(move || reporter.submit(payload))
        .await
        .unwrap()
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let submission: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(submission.get("attachments").is_none());
    assert_eq!(submission["priority"], "MEDIUM");
}

/**
 * Submission before `init()` fails without attempting the network call.
 */
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn submit_before_init_is_rejected() {
    let server = MockServer::start().await;

    let api = Arc::new(
        ApiClient::new(ApiClientOptions {
            base_url: server.uri(),
            timeout: Some(Duration::from_secs(5)),
            max_retries: 0,
            headers: Default::default(),
        })
        .unwrap(),
    );
    let reporter = Arc::new(BugReporter::new(api, Arc::new(DeviceSnapshot::new())));

    let payload = BugReportPayload {
        title: "t".into(),
        description: "d".into(),
        ..Default::default()
    };

    let result = tokio::task::spawn_blocking(move || reporter.submit(payload))
        .await
        .unwrap();

    assert!(matches!(result, Err(MiteError::NotInitialized)));
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

/**
 * Invalid payloads are rejected before any request is issued.
 */
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalid_payload_is_rejected_without_network() {
    let server = MockServer::start().await;

    let payload = BugReportPayload {
        title: "  ".into(),
        description: "d".into(),
        ..Default::default()
    };

    let reporter = bug_reporter(&server);
    let result = tokio::task::spawn_blocking(move || reporter.submit(payload))
        .await
        .unwrap();

    assert!(matches!(result, Err(MiteError::InvalidPayload(_))));
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

/**
 * An upload-URL failure aborts the submission; nothing is posted to the
 * bug-reports endpoint and the error reaches the caller.
 */
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn upload_failure_propagates_and_aborts_submission() {
    let server = MockServer::start().await;
    mount_submission_ack(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/upload-url"))
        .respond_with(ResponseTemplate::new(500).set_body_string("storage offline"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("shot.png");
    std::fs::write(&file, "png-bytes").unwrap();

    let payload = BugReportPayload {
        title: "crash".into(),
        description: "see attachment".into(),
        attachments: vec![Attachment::new(file.to_string_lossy().to_string())],
        ..Default::default()
    };

    let reporter = bug_reporter(&server);
    let result = tokio::task::spawn_blocking(move || reporter.submit(payload))
        .await
        .unwrap();

    assert!(matches!(result, Err(MiteError::Server { status: 500, .. })));

    let submitted = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/api/v1/bug-reports")
        .count();
    assert_eq!(submitted, 0);
}

/**
 * A missing local file surfaces as an attachment error, after the
 * upload URL was already consumed but before any upload is attempted.
 */
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_attachment_file_propagates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/upload-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploadUrl": format!("{}/upload/1", server.uri()),
        })))
        .mount(&server)
        .await;

    let payload = BugReportPayload {
        title: "crash".into(),
        description: "see attachment".into(),
        attachments: vec![Attachment::new("file:///nonexistent/shot.png")],
        ..Default::default()
    };

    let reporter = bug_reporter(&server);
    let result = tokio::task::spawn_blocking(move || reporter.submit(payload))
        .await
        .unwrap();

    assert!(matches!(result, Err(MiteError::Attachment { .. })));
}
