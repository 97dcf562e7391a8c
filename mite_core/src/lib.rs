/*!
 * Mite Core — the internal SDK engine.
 *
 * This crate provides the protocol types, HTTP client, delivery worker,
 * fault hub, and the two reporters. End users should depend on the `mite`
 * facade crate instead, which composes everything and wires up addons
 * (panic hook, etc.).
 *
 * # Module structure
 *
 * - `protocol/` — what we send: wire types and constants
 * - `transport/` — how we deliver: HTTP client, background worker
 * - `hooks` — the fault hub (subscriber registry + rejection tracker)
 * - `reporter` — error capture lifecycle and pipeline
 * - `bug` — bug submission and the attachment upload handshake
 * - `config` / `device` / `error` — configuration bag, device snapshot,
 *   error taxonomy
 */

pub mod bug;
pub mod config;
pub mod device;
pub mod error;
pub mod hooks;
pub mod protocol;
pub mod reporter;
pub mod transport;

// ---------------------------------------------------------------------------
// Re-exports — the public surface area
// ---------------------------------------------------------------------------

pub use bug::BugReporter;
pub use config::MiteConfig;
pub use device::DeviceSnapshot;
pub use error::MiteError;
pub use hooks::{FaultEvent, FaultHub, FaultObserver, FaultOrigin};
pub use protocol::constants::SDK_VERSION;
pub use protocol::types::{
    Attachment, BugReportAck, BugReportPayload, ErrorDetails, ErrorReport, Fault,
    GetReleasesOptions, MetadataValue, Priority, Release, UploadedAttachment,
};
pub use reporter::{ErrorReporter, FLUSH_TIMEOUT};

// ---------------------------------------------------------------------------
// Backtrace helpers
// ---------------------------------------------------------------------------

/**
 * Captures a stack trace at the current call site, rendered as the
 * multi-line string the report schema expects.
 * Returns `None` if no useful frames were resolved.
 */
pub fn capture_stack() -> Option<String> {
    let bt = backtrace::Backtrace::new();
    let rendered = format_backtrace(&bt);
    if rendered.is_empty() {
        None
    } else {
        Some(rendered)
    }
}

/**
 * Renders a `backtrace::Backtrace` as one `  at function (file:line)`
 * line per frame. Frames with no file AND no function are skipped.
 */
pub fn format_backtrace(bt: &backtrace::Backtrace) -> String {
    let mut lines = Vec::new();

    for frame in bt.frames() {
        for symbol in frame.symbols() {
            let function = symbol.name().map(|n| n.to_string());
            let file = symbol.filename().map(|p| p.display().to_string());
            let line = symbol.lineno();

            if function.is_none() && file.is_none() {
                continue;
            }

            let function = function.unwrap_or_else(|| "<unknown>".to_string());
            lines.push(match (file, line) {
                (Some(file), Some(line)) => format!("  at {function} ({file}:{line})"),
                (Some(file), None) => format!("  at {function} ({file})"),
                _ => format!("  at {function}"),
            });
        }
    }

    lines.join("\n")
}
