/**
 * Bug report submission, including the attachment upload handshake.
 *
 * Unlike error capture, this path is NOT best-effort: validation,
 * upload, and submission failures all propagate to the caller, who is
 * expected to offer a retry affordance.
 *
 * Attachments are processed strictly in order. Each one consumes a
 * freshly issued one-time upload URL:
 *
 *   POST /api/v1/upload-url           → { uploadUrl }
 *   PUT  <uploadUrl>  (raw bytes)     → { storageId }
 *
 * The resolved `{storage_id, file_type, file_name}` list preserves the
 * input order; the local `uri` never reaches the backend.
 */
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::device::DeviceSnapshot;
use crate::error::MiteError;
use crate::protocol::constants::{
    BUG_REPORTS_PATH, DEFAULT_ATTACHMENT_CONTENT_TYPE, UPLOAD_URL_PATH,
};
use crate::protocol::types::{
    Attachment, BugReportAck, BugReportPayload, BugReportSubmission, UploadResponse,
    UploadUrlResponse, UploadedAttachment,
};
use crate::transport::ApiClient;

// ---------------------------------------------------------------------------
// BugReporter
// ---------------------------------------------------------------------------

pub struct BugReporter {
    api: Arc<ApiClient>,
    device: Arc<DeviceSnapshot>,
    initialized: AtomicBool,
}

impl BugReporter {
    pub fn new(api: Arc<ApiClient>, device: Arc<DeviceSnapshot>) -> Self {
        Self {
            api,
            device,
            initialized: AtomicBool::new(false),
        }
    }

    /// Idempotent.
    pub fn init(&self) {
        self.initialized.store(true, Ordering::SeqCst);
    }

    /**
     * Validates the payload, uploads its attachments, and submits the
     * report. Returns the server's `{id, status}` acknowledgement.
     *
     * Fails with `MiteError::NotInitialized` before `init()` — no network
     * call is attempted in that case.
     */
    pub fn submit(&self, payload: BugReportPayload) -> Result<BugReportAck, MiteError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(MiteError::NotInitialized);
        }

        validate(&payload)?;

        let attachments = if payload.attachments.is_empty() {
            /* Omit the key entirely — not an empty list. */
            None
        } else {
            Some(self.upload_attachments(&payload.attachments)?)
        };

        let submission = self.build_submission(payload, attachments);
        self.api.post(BUG_REPORTS_PATH, &submission)
    }

    /**
     * Runs the two-step handshake for each attachment, in input order.
     * Any failure aborts the whole submission.
     */
    fn upload_attachments(
        &self,
        attachments: &[Attachment],
    ) -> Result<Vec<UploadedAttachment>, MiteError> {
        let mut uploaded = Vec::with_capacity(attachments.len());

        for attachment in attachments {
            let ticket: UploadUrlResponse = self.api.post_empty(UPLOAD_URL_PATH)?;

            let bytes = read_attachment(&attachment.uri)?;
            let content_type = resolve_content_type(attachment);

            let stored: UploadResponse =
                self.api
                    .put_bytes(&ticket.upload_url, &bytes, &content_type)?;

            uploaded.push(UploadedAttachment {
                storage_id: stored.storage_id,
                file_type: Some(content_type),
                file_name: attachment
                    .file_name
                    .clone()
                    .or_else(|| file_name_from_uri(&attachment.uri)),
            });
        }

        Ok(uploaded)
    }

    fn build_submission(
        &self,
        payload: BugReportPayload,
        attachments: Option<Vec<UploadedAttachment>>,
    ) -> BugReportSubmission {
        /* A payload-supplied device_info overrides the SDK snapshot. */
        let device_info = payload.device_info.unwrap_or_else(|| {
            Value::Object(
                self.device
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            )
        });

        BugReportSubmission {
            device_info,
            title: payload.title,
            description: payload.description,
            reporter_name: payload.reporter_name,
            reporter_email: payload.reporter_email,
            steps_to_reproduce: payload.steps_to_reproduce,
            expected_behavior: payload.expected_behavior,
            actual_behavior: payload.actual_behavior,
            priority: payload.priority.unwrap_or_default(),
            app_version: payload.app_version,
            environment: payload.environment,
            attachments,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(payload: &BugReportPayload) -> Result<(), MiteError> {
    if payload.title.trim().is_empty() {
        return Err(MiteError::InvalidPayload("title is required".into()));
    }
    if payload.description.trim().is_empty() {
        return Err(MiteError::InvalidPayload("description is required".into()));
    }
    if let Some(ref email) = payload.reporter_email {
        if !looks_like_email(email) {
            return Err(MiteError::InvalidPayload(format!(
                "reporter_email is not a valid email address: {email}"
            )));
        }
    }
    Ok(())
}

/**
 * Basic email shape: non-empty local part, `@`, domain containing a dot,
 * no whitespace anywhere.
 */
fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

// ---------------------------------------------------------------------------
// Attachment helpers
// ---------------------------------------------------------------------------

fn read_attachment(uri: &str) -> Result<Vec<u8>, MiteError> {
    let path = uri.strip_prefix("file://").unwrap_or(uri);
    std::fs::read(path).map_err(|source| MiteError::Attachment {
        uri: uri.to_string(),
        source,
    })
}

/**
 * Content type fallback chain: declared type → guessed from the file
 * name (or uri) extension → `image/jpeg`.
 */
fn resolve_content_type(attachment: &Attachment) -> String {
    if let Some(ref declared) = attachment.file_type {
        return declared.clone();
    }

    attachment
        .file_name
        .as_deref()
        .and_then(guess_content_type)
        .or_else(|| guess_content_type(&attachment.uri))
        .unwrap_or(DEFAULT_ATTACHMENT_CONTENT_TYPE)
        .to_string()
}

fn guess_content_type(name: &str) -> Option<&'static str> {
    let extension = name.rsplit('.').next()?.to_ascii_lowercase();
    let guessed = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" | "log" => "text/plain",
        _ => return None,
    };
    Some(guessed)
}

fn file_name_from_uri(uri: &str) -> Option<String> {
    uri.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_checks() {
        assert!(looks_like_email("user@example.com"));
        assert!(looks_like_email("a.b+c@sub.example.co"));

        assert!(!looks_like_email("no-at-sign"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("user@nodot"));
        assert!(!looks_like_email("user@.com"));
        assert!(!looks_like_email("user name@example.com"));
    }

    #[test]
    fn content_type_prefers_declared_type() {
        let attachment = Attachment {
            uri: "/tmp/shot.png".into(),
            file_type: Some("image/webp".into()),
            file_name: None,
        };
        assert_eq!(resolve_content_type(&attachment), "image/webp");
    }

    #[test]
    fn content_type_guesses_from_name_then_uri() {
        let named = Attachment {
            uri: "/tmp/blob".into(),
            file_type: None,
            file_name: Some("recording.mp4".into()),
        };
        assert_eq!(resolve_content_type(&named), "video/mp4");

        let from_uri = Attachment::new("file:///tmp/crash.log");
        assert_eq!(resolve_content_type(&from_uri), "text/plain");
    }

    #[test]
    fn content_type_falls_back_to_jpeg() {
        let opaque = Attachment::new("/tmp/blob");
        assert_eq!(resolve_content_type(&opaque), "image/jpeg");
    }

    #[test]
    fn file_name_derived_from_uri() {
        assert_eq!(
            file_name_from_uri("file:///data/app/shot.png").as_deref(),
            Some("shot.png")
        );
        assert_eq!(file_name_from_uri("").as_deref(), None);
    }

    #[test]
    fn blank_title_or_description_is_rejected() {
        let mut payload = BugReportPayload {
            title: "   ".into(),
            description: "something broke".into(),
            ..Default::default()
        };
        assert!(matches!(
            validate(&payload),
            Err(MiteError::InvalidPayload(_))
        ));

        payload.title = "crash on open".into();
        payload.description = "\t".into();
        assert!(matches!(
            validate(&payload),
            Err(MiteError::InvalidPayload(_))
        ));

        payload.description = "something broke".into();
        assert!(validate(&payload).is_ok());
    }

    #[test]
    fn bad_reporter_email_is_rejected() {
        let payload = BugReportPayload {
            title: "t".into(),
            description: "d".into(),
            reporter_email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(matches!(
            validate(&payload),
            Err(MiteError::InvalidPayload(_))
        ));
    }
}
