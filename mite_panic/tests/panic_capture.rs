/*!
 * End-to-end panic capture: a panicking thread produces a fatal report
 * on the collector before the previous hook runs.
 *
 * The panic hook is process-global, so this file holds a single test.
 */
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mite_core::hooks::FaultHub;
use mite_core::transport::{ApiClient, ApiClientOptions};
use mite_core::{DeviceSnapshot, ErrorReporter};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panics_are_captured_as_fatal_reports() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/error-reporting"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let api = Arc::new(
        ApiClient::new(ApiClientOptions {
            base_url: server.uri(),
            timeout: Some(Duration::from_secs(5)),
            max_retries: 0,
            headers: Default::default(),
        })
        .unwrap(),
    );
    let reporter = ErrorReporter::new(
        "app-test",
        api,
        Arc::new(DeviceSnapshot::new()),
        Arc::new(FaultHub::new()),
    );

    reporter.init();
    mite_panic::install(&reporter);

    /*
     * The hook flushes before delegating, so by the time the panicking
     * thread is joined the report is on the wire.
     */
    let handle = tokio::task::spawn_blocking(|| {
        let worker = std::thread::Builder::new()
            .name("doomed".into())
            .spawn(|| panic!("boom-from-test"))
            .unwrap();
        worker.join()
    });
    assert!(handle.await.unwrap().is_err());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["error"]["name"], "panic");
    assert_eq!(body["error"]["message"], "boom-from-test");
    assert_ne!(body["error"]["stack"], "No stack trace");
    assert_eq!(body["metadata"]["isFatal"], true);
    assert_eq!(body["metadata"]["thread"], "doomed");
    assert!(body["metadata"]["location"]
        .as_str()
        .unwrap()
        .contains("panic_capture.rs"));
}
