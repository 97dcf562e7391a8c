/**
 * Error taxonomy for the Mite SDK.
 *
 * Four families of failures, with different handling policies at the
 * call sites:
 *
 * - `Config` / `NotInitialized` — fatal to the call, not to the process.
 * - Capture-pipeline failures — never surface as `MiteError` at all: the
 *   delivery worker logs and swallows them (`reporter` / `transport::worker`).
 * - Bug-submission failures (`InvalidPayload`, `Attachment`, plus any
 *   transport family) — propagate to the caller unmodified.
 * - Transport failures (`RequestSetup`, `Network`, `Server`, `Decode`) —
 *   logged with categorized context by `ApiClient`, retried per its
 *   backoff policy, then propagated.
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MiteError {
    /// Missing or invalid SDK configuration, detected before any I/O.
    #[error("configuration error: {0}")]
    Config(String),

    /// A reporter operation was invoked before `init()`.
    #[error("reporter is not initialized; call init() first")]
    NotInitialized,

    /// A bug report payload failed validation.
    #[error("invalid bug report payload: {0}")]
    InvalidPayload(String),

    /// The request could not be built (bad URL, unserializable body).
    /// Detected before the request leaves the client.
    #[error("request setup error: {0}")]
    RequestSetup(String),

    /// The request was sent but no response was received
    /// (connection refused, DNS failure, timeout, ...).
    #[error("network error: {source}")]
    Network {
        #[source]
        source: ureq::Error,
    },

    /// The server responded with a non-success status.
    #[error("server responded with HTTP {status}: {body}")]
    Server { status: u16, body: String },

    /// A response arrived but its body could not be decoded.
    #[error("failed to decode server response: {source}")]
    Decode {
        #[source]
        source: ureq::Error,
    },

    /// A local attachment file could not be read.
    #[error("failed to read attachment {uri}: {source}")]
    Attachment {
        uri: String,
        #[source]
        source: std::io::Error,
    },
}
