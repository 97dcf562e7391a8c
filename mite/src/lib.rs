/*!
 * Mite — crash/error/bug reporting SDK.
 *
 * This is the crate applications should depend on. It composes the error
 * reporter, the bug reporter, the device snapshot, and the HTTP client
 * into one lifecycle unit, and wires up the panic hook on `init()`.
 *
 * # Quick start
 *
 * ```ignore
 * use mite::{Mite, MiteConfig};
 *
 * fn main() {
 *     let sdk = Mite::new(
 *         MiteConfig::new("my-app", "pk_live_...")
 *             .endpoint("https://mite.example.com")
 *             .retries(3),
 *     )
 *     .expect("invalid Mite configuration");
 *
 *     sdk.init();
 *
 *     // panics are now captured automatically; manual capture:
 *     if let Err(e) = std::fs::read_to_string("config.toml") {
 *         sdk.log_error(&e, serde_json::Map::new());
 *     }
 *
 *     // sdk is dropped here → pending reports are flushed
 * }
 * ```
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use mite_core::device;
use mite_core::protocol::constants::{DEFAULT_ENDPOINT, RELEASES_PATH, SDK_VERSION};
use mite_core::protocol::types::ReleasesResponse;
use mite_core::transport::{ApiClient, ApiClientOptions};
use mite_core::{BugReporter, DeviceSnapshot, ErrorReporter, FaultHub, FLUSH_TIMEOUT};

// ---------------------------------------------------------------------------
// Re-exports — the public surface area
// ---------------------------------------------------------------------------

pub use mite_core::{
    Attachment, BugReportAck, BugReportPayload, ErrorDetails, ErrorReport, Fault, FaultEvent,
    FaultObserver, FaultOrigin, GetReleasesOptions, MetadataValue, MiteConfig, MiteError, Priority,
    Release, UploadedAttachment,
};

// ---------------------------------------------------------------------------
// Mite — the composition root
// ---------------------------------------------------------------------------

/**
 * The SDK facade.
 *
 * Owns one device snapshot (captured at construction, read-only after),
 * one `ApiClient`, the fault hub, and both reporters. Dropping the
 * facade flushes pending error reports (2 s cap).
 */
pub struct Mite {
    device: Arc<DeviceSnapshot>,
    api: Arc<ApiClient>,
    hub: Arc<FaultHub>,
    error_reporter: ErrorReporter,
    bug_reporter: BugReporter,
    api_key: Option<String>,
    initialized: AtomicBool,
}

impl Mite {
    /**
     * Builds the facade from a configuration bag.
     *
     * Captures the device snapshot, constructs the shared `ApiClient`
     * (default headers: `X-App-Public-Key`, `X-SDK-Version`, and
     * `Authorization: Bearer <api_key>` when configured), and wires both
     * reporters. No hooks are installed until `init()`.
     */
    pub fn new(config: MiteConfig) -> Result<Self, MiteError> {
        config.validate()?;

        let device = Arc::new(device::collect());

        let mut headers = HashMap::new();
        headers.insert("X-App-Public-Key".to_string(), config.public_key.clone());
        headers.insert("X-SDK-Version".to_string(), SDK_VERSION.to_string());
        if let Some(ref api_key) = config.api_key {
            headers.insert("Authorization".to_string(), format!("Bearer {api_key}"));
        }

        let api = Arc::new(ApiClient::new(ApiClientOptions {
            base_url: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            timeout: config.timeout,
            max_retries: config.retries,
            headers,
        })?);

        let hub = Arc::new(FaultHub::new());

        let error_reporter = ErrorReporter::new(
            config.app_id.clone(),
            Arc::clone(&api),
            Arc::clone(&device),
            Arc::clone(&hub),
        );
        let bug_reporter = BugReporter::new(Arc::clone(&api), Arc::clone(&device));

        Ok(Self {
            device,
            api,
            hub,
            error_reporter,
            bug_reporter,
            api_key: config.api_key,
            initialized: AtomicBool::new(false),
        })
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /**
     * Initializes both reporters and installs the panic hook.
     * Idempotent — calling `init()` again is a no-op.
     */
    pub fn init(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }

        self.error_reporter.init();
        self.bug_reporter.init();
        mite_panic::install(&self.error_reporter);
    }

    pub fn enable(&self) {
        self.error_reporter.enable();
    }

    pub fn disable(&self) {
        self.error_reporter.disable();
    }

    pub fn is_enabled(&self) -> bool {
        self.error_reporter.is_enabled()
    }

    /**
     * Blocks until pending error reports are drained or `timeout`
     * elapses. Returns `true` on a full drain.
     */
    pub fn flush(&self, timeout: std::time::Duration) -> bool {
        self.error_reporter.flush(timeout)
    }

    // -----------------------------------------------------------------------
    // Capture
    // -----------------------------------------------------------------------

    /**
     * Captures a fault and sends it best-effort. See
     * `ErrorReporter::capture_error`.
     */
    pub fn capture_error(&self, fault: Fault, additional_info: Map<String, Value>) {
        self.error_reporter.capture_error(fault, additional_info);
    }

    /**
     * Captures a rejection-style fault, tagged with a fresh tracking id.
     */
    pub fn capture_rejection(&self, fault: Fault) {
        self.error_reporter.capture_rejection(fault);
    }

    /**
     * Manual instrumentation: captures any error value with metadata.
     */
    pub fn log_error<E: std::error::Error + ?Sized>(&self, error: &E, metadata: Map<String, Value>) {
        self.error_reporter.log_error(error, metadata);
    }

    // -----------------------------------------------------------------------
    // Bug reports
    // -----------------------------------------------------------------------

    /**
     * Submits a bug report, uploading attachments first. Unlike capture,
     * failures propagate — callers should surface a retry affordance.
     */
    pub fn submit_bug(&self, payload: BugReportPayload) -> Result<BugReportAck, MiteError> {
        self.bug_reporter.submit(payload)
    }

    // -----------------------------------------------------------------------
    // Releases
    // -----------------------------------------------------------------------

    /**
     * Lists application releases.
     *
     * Requires an `api_key` in the configuration; without one this fails
     * with a configuration error and issues no HTTP call.
     */
    pub fn get_releases(&self, options: GetReleasesOptions) -> Result<Vec<Release>, MiteError> {
        let Some(ref api_key) = self.api_key else {
            return Err(MiteError::Config(
                "an API key is required to fetch releases".into(),
            ));
        };

        let url = format!("{}{}", RELEASES_PATH, options.query_suffix());
        let bearer = format!("Bearer {api_key}");

        let response: ReleasesResponse = self
            .api
            .get_with_headers(&url, &[("Authorization", bearer.as_str())])?;

        Ok(response.releases)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The device snapshot captured at construction.
    pub fn device_info(&self) -> &DeviceSnapshot {
        &self.device
    }

    /// The shared HTTP client, for advanced host integrations.
    pub fn api_client(&self) -> &Arc<ApiClient> {
        &self.api
    }

    /// The fault hub — the entry point for host-runtime hooks.
    pub fn fault_hub(&self) -> &Arc<FaultHub> {
        &self.hub
    }
}

impl Drop for Mite {
    /**
     * Flushes pending reports before the facade goes away. Without this,
     * reports enqueued moments before process exit would be lost.
     */
    fn drop(&mut self) {
        if self.initialized.load(Ordering::SeqCst) && !self.error_reporter.flush(FLUSH_TIMEOUT) {
            warn!("flush timed out; some reports may not have been sent");
        }
    }
}
