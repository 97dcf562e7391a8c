/**
 * The error reporter — capture, normalize, enqueue.
 *
 * Lifecycle: `uninitialized → initialized(enabled) ⇄ initialized(disabled)`.
 *
 * `init()` is idempotent and performs the one-time installation work:
 * it spawns the delivery worker and subscribes the capture pipeline to
 * the `FaultHub`. `enable()`/`disable()` only toggle the capture flag —
 * they never re-run installation.
 *
 * Capture is fire-and-forget telemetry: while disabled or uninitialized
 * it is a silent no-op, and nothing on this path ever raises. Delivery
 * failures are logged by the transport and swallowed by the worker.
 */
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::device::DeviceSnapshot;
use crate::hooks::{FaultEvent, FaultHub, FaultOrigin};
use crate::protocol::types::{coerce_metadata, ErrorReport, Fault, UNHANDLED_REJECTION_KIND};
use crate::transport::{ApiClient, FlushSignal, Worker, WorkerMsg};

// ---------------------------------------------------------------------------
// Internal constants
// ---------------------------------------------------------------------------

/// Bounded queue capacity. When full, new reports are dropped
/// with a log line (back-pressure).
const QUEUE_CAPACITY: usize = 100;

/// Maximum time `flush()` waits for the worker to drain the queue.
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// ErrorReporter
// ---------------------------------------------------------------------------

/**
 * Cheaply cloneable handle to the reporter state. Clones share the same
 * queue, flags, and hub subscription.
 */
#[derive(Clone)]
pub struct ErrorReporter {
    inner: Arc<ReporterInner>,
}

struct ReporterInner {
    app_id: String,
    api: Arc<ApiClient>,
    device: Arc<DeviceSnapshot>,
    hub: Arc<FaultHub>,

    sender: Sender<WorkerMsg>,

    /// Held until `init()` hands it to the worker thread.
    pending_receiver: Mutex<Option<Receiver<WorkerMsg>>>,

    enabled: AtomicBool,
    initialized: AtomicBool,
}

impl ErrorReporter {
    pub fn new(
        app_id: impl Into<String>,
        api: Arc<ApiClient>,
        device: Arc<DeviceSnapshot>,
        hub: Arc<FaultHub>,
    ) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(QUEUE_CAPACITY);

        Self {
            inner: Arc::new(ReporterInner {
                app_id: app_id.into(),
                api,
                device,
                hub,
                sender,
                pending_receiver: Mutex::new(Some(receiver)),
                enabled: AtomicBool::new(false),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /**
     * Performs the one-time installation: spawns the delivery worker and
     * subscribes the capture pipeline to the fault hub, then enables
     * capture. Calling `init()` again is a no-op.
     */
    pub fn init(&self) {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return;
        }

        let receiver = self
            .inner
            .pending_receiver
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());

        if let Some(receiver) = receiver {
            if let Err(err) = Worker::spawn(receiver, Arc::clone(&self.inner.api)) {
                tracing::error!(error = %err, "failed to start delivery worker");
            }
        }

        /*
         * Subscribe through a Weak handle: the hub outlives nothing —
         * it is owned by the same facade — and a strong handle here would
         * cycle hub → observer → reporter → hub.
         */
        let weak = Arc::downgrade(&self.inner);
        self.inner.hub.subscribe(Arc::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                ErrorReporter { inner }.on_fault(event);
            }
        }));

        self.inner.enabled.store(true, Ordering::SeqCst);
    }

    pub fn enable(&self) {
        self.inner.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.inner.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    fn is_active(&self) -> bool {
        self.is_enabled() && self.inner.initialized.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Capture
    // -----------------------------------------------------------------------

    /**
     * Captures a fault and enqueues it for delivery.
     *
     * Silent no-op unless the reporter is initialized AND enabled.
     * Missing fault fields get the sentinel defaults; `additional_info`
     * entries are coerced into the flat metadata shape.
     */
    pub fn capture_error(&self, fault: Fault, additional_info: Map<String, Value>) {
        if !self.is_active() {
            return;
        }

        let report = ErrorReport {
            timestamp: Utc::now().to_rfc3339(),
            app_id: self.inner.app_id.clone(),
            error: fault.normalize(),
            device_info: (*self.inner.device).clone(),
            metadata: coerce_metadata(additional_info),
        };

        self.enqueue(report);
    }

    /**
     * Captures a rejection-style fault: tags it with the rejection kind
     * and a fresh tracking id, then runs the normal capture path.
     */
    pub fn capture_rejection(&self, fault: Fault) {
        self.capture_rejection_with(fault, Map::new());
    }

    fn capture_rejection_with(&self, mut fault: Fault, additional_info: Map<String, Value>) {
        let id = self.inner.hub.next_rejection_id();
        fault.kind = Some(UNHANDLED_REJECTION_KIND.to_string());
        fault.rejection_id = Some(id.to_string());
        self.capture_error(fault, additional_info);
    }

    /**
     * Manual instrumentation alias: captures any error value with
     * optional metadata.
     */
    pub fn log_error<E: std::error::Error + ?Sized>(&self, error: &E, metadata: Map<String, Value>) {
        self.capture_error(Fault::from_error(error), metadata);
    }

    /**
     * The hub subscription installed by `init()`.
     */
    fn on_fault(&self, event: &FaultEvent) {
        let mut additional = event.metadata.clone();
        match event.origin {
            FaultOrigin::Exception { is_fatal } => {
                additional.insert("isFatal".into(), Value::Bool(is_fatal));
                self.capture_error(event.fault.clone(), additional);
            }
            FaultOrigin::Rejection => {
                self.capture_rejection_with(event.fault.clone(), additional);
            }
        }
    }

    fn enqueue(&self, report: ErrorReport) {
        match self.inner.sender.try_send(WorkerMsg::Report(Box::new(report))) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("report queue is full; dropping report");
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("delivery worker has shut down; dropping report");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Flush
    // -----------------------------------------------------------------------

    /**
     * Blocks until the worker has drained all reports enqueued before
     * this call, or `timeout` elapses. Returns `true` on a full drain.
     *
     * The channel is FIFO: by the time the worker reaches the flush
     * marker, every preceding report has been sent.
     */
    pub fn flush(&self, timeout: Duration) -> bool {
        let signal = Arc::new(FlushSignal::new());

        match self
            .inner
            .sender
            .send_timeout(WorkerMsg::Flush(Arc::clone(&signal)), timeout)
        {
            Ok(()) => signal.wait_timeout(timeout),
            Err(_) => false,
        }
    }

    pub fn fault_hub(&self) -> Arc<FaultHub> {
        Arc::clone(&self.inner.hub)
    }
}
