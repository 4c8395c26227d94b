//! Multipart form decoding
//!
//! Turns a `multipart/form-data` body into the first uploaded file plus the
//! value of one named text field. Absent fields decode to empty values; the
//! handlers decide which of them are required.

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::FromRequest;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use bytes::Bytes;
use tracing::debug;

/// Field that carries the analysis instruction
pub const PROMPT_FIELD: &str = "prompt";

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid multipart body: {0}")]
    Rejected(String),

    #[error("Invalid multipart body: {0}")]
    Malformed(String),

    /// Body ran past the configured upload limit
    #[error("Upload too large: {0}")]
    TooLarge(String),
}

impl DecodeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DecodeError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            DecodeError::Rejected(_) | DecodeError::Malformed(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<MultipartRejection> for DecodeError {
    fn from(rejection: MultipartRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            DecodeError::TooLarge(rejection.body_text())
        } else {
            DecodeError::Rejected(rejection.body_text())
        }
    }
}

impl From<MultipartError> for DecodeError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            DecodeError::TooLarge(err.body_text())
        } else {
            DecodeError::Malformed(err.body_text())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadedFile {
    pub filename: String,
    pub media_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    /// First part that carried a non-empty filename
    pub file: Option<UploadedFile>,
    /// Value of the named text field, empty when absent
    pub prompt: String,
}

/// Decode an already-extracted multipart stream.
pub async fn decode_form(
    mut multipart: Multipart,
    text_field: &str,
) -> Result<MultipartForm, DecodeError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        // Browsers send an empty filename when no file was chosen
        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        if let Some(filename) = filename {
            let declared = field.content_type().map(str::to_string);
            let data = field.bytes().await?;
            if form.file.is_some() {
                debug!(field = %name, "Ignoring additional uploaded file {}", filename);
                continue;
            }
            form.file = Some(UploadedFile {
                media_type: resolve_media_type(declared.as_deref(), &filename),
                filename,
                data,
            });
        } else if name == text_field {
            form.prompt = field.text().await?;
        }
    }

    Ok(form)
}

/// Decode a raw body given its declared `Content-Type` header value.
pub async fn decode(content_type: &str, body: Bytes) -> Result<MultipartForm, DecodeError> {
    let request = axum::http::Request::builder()
        .header(CONTENT_TYPE, content_type)
        .body(axum::body::Body::from(body))
        .map_err(|e| DecodeError::Rejected(e.to_string()))?;

    let multipart = Multipart::from_request(request, &()).await?;
    decode_form(multipart, PROMPT_FIELD).await
}

/// Declared media type, falling back to a guess from the filename.
fn resolve_media_type(declared: Option<&str>, filename: &str) -> String {
    match declared {
        Some(ct) if !ct.trim().is_empty() && ct != mime::APPLICATION_OCTET_STREAM.as_ref() => {
            ct.to_string()
        }
        _ => mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}
