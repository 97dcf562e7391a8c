/**
 * Background worker thread that drains the report queue and POSTs
 * captured error reports to the backend.
 *
 * ```text
 *  ┌──────────────┐     bounded channel     ┌────────────────┐
 *  │ capture path │ ───── WorkerMsg ──────► │  worker thread  │
 *  │ (any thread) │                         │  (single)       │
 *  └──────────────┘                         └───────┬────────┘
 *                                                   │
 *                                         ApiClient::post_discard
 *                                                   │
 *                                            ┌──────▼──────┐
 *                                            │   backend    │
 *                                            └─────────────┘
 * ```
 *
 * The channel carries `WorkerMsg` variants:
 * - `Report(ErrorReport)` — a normalized report ready to be POSTed.
 * - `Flush(Arc<FlushSignal>)` — a signal requesting the worker to notify
 *   the caller once all preceding reports have been drained.
 *
 * Delivery is best-effort: a failed POST is already logged by the
 * `ApiClient` and is swallowed here. The capture pipeline must never
 * become a second source of crashes.
 */
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crossbeam_channel::Receiver;
use tracing::debug;

use super::http::ApiClient;
use crate::protocol::constants::ERROR_REPORTING_PATH;
use crate::protocol::types::ErrorReport;

// ---------------------------------------------------------------------------
// WorkerMsg
// ---------------------------------------------------------------------------

/**
 * Messages that flow through the bounded channel from capture call sites
 * to the single background worker.
 */
pub enum WorkerMsg {
    /// A normalized report ready to be serialized and POSTed.
    Report(Box<ErrorReport>),

    /// A flush request. The worker signals `FlushSignal` once all messages
    /// that were in the channel *before* this `Flush` have been processed.
    Flush(Arc<FlushSignal>),
}

// ---------------------------------------------------------------------------
// FlushSignal
// ---------------------------------------------------------------------------

/**
 * Synchronization primitive used to block the caller of `flush()` until
 * the worker has drained all pending messages.
 *
 * A `Mutex<bool>` + `Condvar` pair: the worker flips the flag to `true`
 * and notifies; the caller waits on the condvar with a timeout.
 */
pub struct FlushSignal {
    mutex: Mutex<bool>,
    condvar: Condvar,
}

impl FlushSignal {
    pub fn new() -> Self {
        Self {
            mutex: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /**
     * Called by the worker thread once the flush point is reached.
     */
    pub fn notify(&self) {
        if let Ok(mut done) = self.mutex.lock() {
            *done = true;
            self.condvar.notify_all();
        }
    }

    /**
     * Blocks until the worker signals completion or `timeout` elapses.
     * Returns `true` if the flush completed in time.
     */
    pub fn wait_timeout(&self, timeout: std::time::Duration) -> bool {
        if let Ok(guard) = self.mutex.lock() {
            let result = self
                .condvar
                .wait_timeout_while(guard, timeout, |done| !*done);

            match result {
                Ok((_, timeout_result)) => !timeout_result.timed_out(),
                Err(_) => false,
            }
        } else {
            false
        }
    }
}

impl Default for FlushSignal {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/**
 * Handle to the background worker thread.
 *
 * Spawned once during `ErrorReporter::init()` and runs until the channel
 * disconnects (all senders dropped). Messages are processed sequentially:
 * - `Report` → POST via the shared `ApiClient`, swallowing failures.
 * - `Flush` → signal the requester that all prior reports are drained.
 */
pub struct Worker;

impl Worker {
    /**
     * Spawns the background worker thread.
     *
     * Fire-and-forget — no join handle is stored. The flush-on-drop path
     * in the facade ensures pending reports are drained before exit.
     */
    pub fn spawn(receiver: Receiver<WorkerMsg>, api: Arc<ApiClient>) -> Result<(), String> {
        thread::Builder::new()
            .name("mite-worker".into())
            .spawn(move || {
                /*
                 * A panic inside the send path must not kill the thread
                 * silently — log and exit instead.
                 */
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    Self::run_loop(&receiver, &api);
                }));

                if result.is_err() {
                    tracing::error!("delivery worker panicked; pending reports will be dropped");
                }
            })
            .map(|_| ())
            .map_err(|e| format!("failed to spawn delivery worker: {e}"))
    }

    /**
     * Blocks on `recv()` until the channel disconnects, then exits cleanly.
     */
    fn run_loop(receiver: &Receiver<WorkerMsg>, api: &ApiClient) {
        while let Ok(msg) = receiver.recv() {
            match msg {
                WorkerMsg::Report(report) => {
                    /* Already logged by the client; best-effort. */
                    if let Err(err) = api.post_discard(ERROR_REPORTING_PATH, &*report) {
                        debug!(error = %err, "error report delivery failed");
                    }
                }
                WorkerMsg::Flush(signal) => {
                    signal.notify();
                }
            }
        }
    }
}
