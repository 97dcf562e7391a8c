/**
 * SDK-wide constants.
 *
 * Endpoint paths and header values baked into every request the SDK makes.
 */
use std::time::Duration;

/// SDK version string sent in the `X-SDK-Version` header.
/// Derived at compile time from the `mite_core` package version in `Cargo.toml`.
pub const SDK_VERSION: &str = concat!("mite-rust/", env!("CARGO_PKG_VERSION"));

/// Backend base URL used when the host configuration omits `endpoint`.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8787";

/// Per-request timeout used when the host configuration omits `timeout`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Collector path for captured error reports.
pub const ERROR_REPORTING_PATH: &str = "/error-reporting";

/// Submission path for bug reports.
pub const BUG_REPORTS_PATH: &str = "/api/v1/bug-reports";

/// Path that issues a fresh one-time upload URL per attachment.
pub const UPLOAD_URL_PATH: &str = "/api/v1/upload-url";

/// Path for the authenticated release listing.
pub const RELEASES_PATH: &str = "/api/v1/releases";

/// Content type assumed for an attachment when neither the declared type
/// nor the file name extension identifies one.
pub const DEFAULT_ATTACHMENT_CONTENT_TYPE: &str = "image/jpeg";
