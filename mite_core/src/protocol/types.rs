/**
 * Wire types for the Mite backend protocol.
 *
 * Two families live here:
 *
 * - The error-reporting schema: `Fault` (the loosely-typed capture input),
 *   `ErrorDetails` (normalized, sentinel-defaulted), and the `ErrorReport`
 *   envelope POSTed to the collector.
 * - The bug-reporting schema: `BugReportPayload` (caller input),
 *   `UploadedAttachment` / `BugReportSubmission` (what actually goes on the
 *   wire after the upload handshake), and the response shapes.
 *
 * Error-reporting JSON is camelCase; bug-reporting JSON is snake_case.
 * Both match the backend validators field-for-field.
 */
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Sentinels
// ---------------------------------------------------------------------------

/// Default for `error.name` when the captured fault carries none.
pub const UNKNOWN_ERROR_NAME: &str = "Unknown Error";

/// Default for `error.message` when the captured fault carries none.
pub const NO_ERROR_MESSAGE: &str = "No error message";

/// Default for `error.stack` when the captured fault carries none.
pub const NO_STACK_TRACE: &str = "No stack trace";

/// `type` value tagged onto faults raised through the rejection path.
pub const UNHANDLED_REJECTION_KIND: &str = "unhandledPromiseRejection";

// ---------------------------------------------------------------------------
// Fault — the capture input
// ---------------------------------------------------------------------------

/**
 * A captured fault before normalization.
 *
 * The capture entry points accept arbitrary fault-shaped input — a real
 * error, a bare message, or nothing at all. Every field is optional;
 * `normalize()` fills the sentinel defaults so the outgoing report never
 * has an absent `name`/`message`/`stack`.
 */
#[derive(Debug, Clone, Default)]
pub struct Fault {
    /// Error class name, e.g. `"Error"` or `"panic"`.
    pub name: Option<String>,

    /// Human-readable fault message.
    pub message: Option<String>,

    /// Stack trace, already rendered as a multi-line string.
    pub stack: Option<String>,

    /// Fault category, e.g. `"unhandledPromiseRejection"`. Absent for a
    /// bare exception.
    pub kind: Option<String>,

    /// Id correlating the fault to the originating rejection, when known.
    pub rejection_id: Option<String>,
}

impl Fault {
    /**
     * Builds a `Fault` from any error value.
     *
     * The error's type name (without its module path) becomes `name`, its
     * `Display` output becomes `message`, and a stack is captured at the
     * call site.
     */
    pub fn from_error<E: std::error::Error + ?Sized>(error: &E) -> Self {
        let type_name = std::any::type_name_of_val(error);
        let name = type_name.rsplit("::").next().unwrap_or(type_name);

        Self {
            name: Some(name.to_string()),
            message: Some(error.to_string()),
            stack: crate::capture_stack(),
            kind: None,
            rejection_id: None,
        }
    }

    /**
     * Builds a message-only `Fault` (no stack, no error class).
     */
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /**
     * Normalizes into the wire shape, applying the sentinel defaults.
     *
     * `kind` and `rejection_id` pass through untouched — they are only
     * present when the capture path tagged them.
     */
    pub fn normalize(self) -> ErrorDetails {
        ErrorDetails {
            name: self.name.unwrap_or_else(|| UNKNOWN_ERROR_NAME.to_string()),
            message: self.message.unwrap_or_else(|| NO_ERROR_MESSAGE.to_string()),
            stack: self.stack.unwrap_or_else(|| NO_STACK_TRACE.to_string()),
            kind: self.kind,
            rejection_id: self.rejection_id,
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorReport — the unit of delivery
// ---------------------------------------------------------------------------

/**
 * Normalized fault details inside an `ErrorReport`.
 *
 * `name`, `message`, and `stack` are always present (sentinel rule above).
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    pub name: String,
    pub message: String,
    pub stack: String,

    /// Distinguishes `"unhandledPromiseRejection"` from a bare exception.
    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Correlates to the originating rejection when known.
    #[serde(rename = "promiseId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_id: Option<String>,
}

/**
 * The envelope POSTed to the error-reporting collector.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// Creation instant, RFC 3339.
    pub timestamp: String,

    /// The application this report belongs to.
    pub app_id: String,

    pub error: ErrorDetails,

    /// Device/app context snapshot, captured once at startup.
    pub device_info: BTreeMap<String, Value>,

    /// Flat caller-supplied context. See `coerce_metadata`.
    pub metadata: BTreeMap<String, MetadataValue>,
}

// ---------------------------------------------------------------------------
// Metadata coercion
// ---------------------------------------------------------------------------

/**
 * A metadata entry on the wire: string, number, or boolean only.
 * The report schema forbids nested structures here.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

/**
 * Coerces arbitrary JSON metadata into the flat wire shape.
 *
 * Strings, numbers, and booleans pass through unchanged; objects, arrays,
 * and null are serialized to their compact JSON string form.
 */
pub fn coerce_metadata(entries: serde_json::Map<String, Value>) -> BTreeMap<String, MetadataValue> {
    entries
        .into_iter()
        .map(|(key, value)| {
            let coerced = match value {
                Value::Bool(flag) => MetadataValue::Bool(flag),
                Value::Number(number) => MetadataValue::Number(number),
                Value::String(text) => MetadataValue::Text(text),
                other => MetadataValue::Text(other.to_string()),
            };
            (key, coerced)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Bug reporting — caller input
// ---------------------------------------------------------------------------

/**
 * Bug priority as understood by the backend. Defaults to `Medium`.
 */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/**
 * A local file referenced by a bug report before upload.
 * The `uri` never reaches the backend — only the storage id assigned by
 * the upload handshake does.
 */
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Local file location. A `file://` prefix is tolerated.
    pub uri: String,

    /// Declared MIME type, if the caller knows it.
    pub file_type: Option<String>,

    /// Display name for the backend, if the caller supplies one.
    pub file_name: Option<String>,
}

impl Attachment {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            file_type: None,
            file_name: None,
        }
    }
}

/**
 * A user/system supplied bug report.
 *
 * `title` and `description` must be non-empty after trimming;
 * `reporter_email` must look like an email when present. Validation
 * happens in `BugReporter::submit`.
 */
#[derive(Debug, Clone, Default)]
pub struct BugReportPayload {
    pub title: String,
    pub description: String,
    pub reporter_name: Option<String>,
    pub reporter_email: Option<String>,
    pub steps_to_reproduce: Option<String>,
    pub expected_behavior: Option<String>,
    pub actual_behavior: Option<String>,

    /// Defaults to `Priority::Medium` when absent.
    pub priority: Option<Priority>,

    pub app_version: Option<String>,

    /// Overrides the SDK's own device snapshot when present.
    pub device_info: Option<Value>,

    pub environment: Option<Value>,

    /// Local files to upload before submission, in order.
    pub attachments: Vec<Attachment>,
}

// ---------------------------------------------------------------------------
// Bug reporting — wire shapes
// ---------------------------------------------------------------------------

/**
 * One attachment after the upload handshake.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedAttachment {
    pub storage_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/**
 * The JSON body POSTed to the bug-reports endpoint.
 *
 * `attachments` is omitted entirely when there were none — backends that
 * validate this payload treat an absent key differently from an explicit
 * empty list.
 */
#[derive(Debug, Clone, Serialize)]
pub struct BugReportSubmission {
    pub device_info: Value,
    pub title: String,
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_to_reproduce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_behavior: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_behavior: Option<String>,

    pub priority: Priority,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<UploadedAttachment>>,
}

/**
 * Server acknowledgement for an accepted bug report.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugReportAck {
    pub id: String,
    pub status: String,
}

/**
 * Response to the upload-URL request: a fresh one-time upload target.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
}

/**
 * Response to the binary upload: the storage id assigned to the file.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub storage_id: String,
}

// ---------------------------------------------------------------------------
// Releases
// ---------------------------------------------------------------------------

/**
 * One application release as listed by the backend.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: String,
    pub version: String,
    pub version_code: i64,
    pub platform: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub released_at: Option<String>,

    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasesResponse {
    pub releases: Vec<Release>,
}

/**
 * Optional filters for the release listing.
 */
#[derive(Debug, Clone, Default)]
pub struct GetReleasesOptions {
    pub platform: Option<String>,
    pub limit: Option<u32>,
}

impl GetReleasesOptions {
    /**
     * Renders the filters as a query suffix, e.g. `"?platform=ios&limit=5"`.
     * Returns an empty string when no filter is set.
     */
    pub fn query_suffix(&self) -> String {
        let mut params = Vec::new();
        if let Some(ref platform) = self.platform {
            params.push(format!("platform={platform}"));
        }
        if let Some(limit) = self.limit {
            params.push(format!("limit={limit}"));
        }

        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}
