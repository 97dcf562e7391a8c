/*!
 * Mite Panic Hook — automatic panic capture for the Mite SDK.
 *
 * This crate provides a single function `install()` that registers a
 * custom `std::panic::set_hook` handler. When a panic occurs, it:
 *
 * 1. Extracts the panic message, source location, and thread name.
 * 2. Captures a backtrace at the panic site.
 * 3. Raises a fatal fault on the reporter's `FaultHub`.
 * 4. Flushes the delivery queue (bounded wait) so the report is on the
 *    wire before the previous hook runs.
 * 5. Always invokes the previous hook (chaining, never suppressing).
 *
 * # Recursion safety
 *
 * A `thread_local` flag breaks the recursion if capture itself were to
 * panic.
 */

use std::cell::Cell;
use std::panic;
use std::panic::PanicHookInfo;
use std::sync::atomic::{AtomicBool, Ordering};

use mite_core::hooks::{FaultEvent, FaultOrigin};
use mite_core::{ErrorReporter, Fault, FLUSH_TIMEOUT};

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// Ensures `install()` is idempotent — calling it multiple times
/// won't stack hooks and produce duplicate reports per panic.
static INSTALLED: AtomicBool = AtomicBool::new(false);

thread_local! {
    /// Per-thread re-entrancy flag for the panic hook.
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/**
 * Installs the Mite panic hook, wired to the given reporter.
 *
 * Replaces the current panic hook with one that captures the panic as a
 * fatal fault and then forwards to the *previous* hook, preserving the
 * default stderr output and any other user-installed hooks.
 *
 * Idempotent — subsequent calls are silent no-ops.
 *
 * Must be called AFTER `ErrorReporter::init()` — a hook firing before
 * init captures into a disabled reporter (a no-op).
 */
pub fn install(reporter: &ErrorReporter) {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    let reporter = reporter.clone();
    let previous_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        let is_recursive = IN_HOOK.with(|flag| {
            if flag.get() {
                true
            } else {
                flag.set(true);
                false
            }
        });

        if !is_recursive {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                handle_panic(&reporter, info);
            }));

            IN_HOOK.with(|flag| flag.set(false));
        }

        previous_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Internal: build and raise the panic fault
// ---------------------------------------------------------------------------

fn handle_panic(reporter: &ErrorReporter, info: &PanicHookInfo) {
    let message = get_panic_message(info);

    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()));

    let thread_name = std::thread::current()
        .name()
        .unwrap_or("<unnamed>")
        .to_string();

    let bt = backtrace::Backtrace::new();
    let stack = mite_core::format_backtrace(&bt);

    let fault = Fault {
        name: Some("panic".to_string()),
        message: Some(message),
        stack: if stack.is_empty() { None } else { Some(stack) },
        kind: None,
        rejection_id: None,
    };

    let mut metadata = serde_json::Map::new();
    metadata.insert("thread".into(), thread_name.into());
    if let Some(location) = location {
        metadata.insert("location".into(), location.into());
    }

    reporter.fault_hub().raise(FaultEvent {
        fault,
        origin: FaultOrigin::Exception { is_fatal: true },
        metadata,
    });

    /*
     * The process may be about to abort — drain the queue now so the
     * report reaches the wire before the previous hook takes over.
     */
    reporter.flush(FLUSH_TIMEOUT);
}

/**
 * Extracts a human-readable message from the panic payload.
 * Tries `&str`, then `String`, then falls back to `"<unknown panic>"`.
 */
fn get_panic_message(info: &PanicHookInfo) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "<unknown panic>".to_string()
    }
}
