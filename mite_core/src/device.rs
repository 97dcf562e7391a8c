/**
 * Device/app context snapshot.
 *
 * Captured once when the facade is constructed and attached read-only to
 * every outgoing report. The snapshot is an opaque key→value mapping —
 * the backend does not interpret it beyond display.
 */
use std::collections::BTreeMap;

use serde_json::Value;

/// Opaque device/app context attached to every report.
pub type DeviceSnapshot = BTreeMap<String, Value>;

/**
 * Collects the snapshot from the host environment.
 */
pub fn collect() -> DeviceSnapshot {
    let mut snapshot = DeviceSnapshot::new();

    snapshot.insert("osName".into(), std::env::consts::OS.into());
    snapshot.insert("osFamily".into(), std::env::consts::FAMILY.into());
    snapshot.insert("cpuArchitecture".into(), std::env::consts::ARCH.into());

    if let Ok(parallelism) = std::thread::available_parallelism() {
        snapshot.insert("cpuCount".into(), parallelism.get().into());
    }

    if let Ok(hostname) = std::env::var("HOSTNAME") {
        snapshot.insert("hostname".into(), hostname.into());
    }

    snapshot
}
