//! Route handlers
//!
//! Handlers read the whole form, then run the operation on the blocking
//! pool so PDF work never stalls the async runtime.

use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use tracing::{info, warn};

use super::error::ApiError;
use super::form::UploadForm;
use super::AppState;
use crate::color::Rgb;
use crate::convert::{Artifact, SourceKind, TargetFormat};
use crate::error::Error;
use crate::layout::Placement;
use crate::ops::{self, EncryptOptions, RotateOptions, WatermarkKind, WatermarkOptions};
use crate::session::Session;

type HandlerResult = std::result::Result<Response, ApiError>;

/// RFC 5987 `attr-char` minus the few symbols some clients mishandle
const FILENAME_ENCODE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

#[derive(Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run blocking work off the async runtime
async fn blocking<T, F>(job: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ApiError::internal(format!("worker failed: {e}")))?
        .map_err(ApiError::from)
}

/// Run blocking work inside a fresh session directory.
///
/// The session is dropped, and its directory removed, on the worker thread
/// when the job ends, even if the client has gone away.
async fn in_session<T, F>(state: &AppState, job: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce(&Session) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let sessions = state.sessions().clone();
    blocking(move || {
        let session = sessions.acquire()?;
        let result = job(&session);
        if let Err(e) = session.close() {
            warn!("session cleanup failed: {}", e);
        }
        result
    })
    .await
}

/// A downloadable file response
fn attachment(artifact: Artifact) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback(&artifact.name),
        percent_encode(&artifact.name)
    );
    (
        [
            (header::CONTENT_TYPE, artifact.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response()
}

fn pdf_attachment(name: String, bytes: Vec<u8>) -> Response {
    attachment(Artifact::new(name, bytes))
}

/// Header-safe file name for clients that ignore `filename*`
fn ascii_fallback(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' { c } else { '_' })
        .collect()
}

fn percent_encode(name: &str) -> String {
    utf8_percent_encode(name, FILENAME_ENCODE).to_string()
}

pub(super) async fn split(multipart: Multipart) -> HandlerResult {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.file("file")?;
    file.require_pdf()?;
    let pages = form.text("pages")?.to_string();

    info!("split {} pages '{}'", file.file_name, pages);
    let bytes = blocking(move || ops::split(&file.bytes, &pages)).await?;
    Ok(pdf_attachment(format!("split_{}", file.file_name), bytes))
}

pub(super) async fn merge(multipart: Multipart) -> HandlerResult {
    let mut form = UploadForm::read(multipart).await?;
    let files = form.files("files");
    if files.is_empty() {
        return Err(Error::validation("No files provided").into());
    }
    for file in &files {
        file.require_pdf()?;
    }

    info!("merge {} files", files.len());
    let bytes = blocking(move || {
        let inputs: Vec<&[u8]> = files.iter().map(|f| f.bytes.as_slice()).collect();
        ops::merge(&inputs)
    })
    .await?;
    Ok(pdf_attachment("merged.pdf".to_string(), bytes))
}

pub(super) async fn rotate(multipart: Multipart) -> HandlerResult {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.file("file")?;
    file.require_pdf()?;
    let options = RotateOptions {
        pages: form.text("pages")?.to_string(),
        angle: form.parse_or("angle", 90)?,
        include_unspecified: form.flag_or("include_unspecified", true)?,
    };

    info!("rotate {} pages '{}' by {}", file.file_name, options.pages, options.angle);
    let bytes = blocking(move || ops::rotate(&file.bytes, &options)).await?;
    Ok(pdf_attachment(format!("rotated_{}", file.file_name), bytes))
}

pub(super) async fn encrypt(multipart: Multipart) -> HandlerResult {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.file("file")?;
    file.require_pdf()?;
    let options = EncryptOptions {
        password: form.text("password")?.to_string(),
        allow_printing: form.flag_or("allow_printing", true)?,
        allow_commenting: form.flag_or("allow_commenting", true)?,
    };

    info!("encrypt {}", file.file_name);
    let bytes = blocking(move || ops::encrypt(&file.bytes, &options)).await?;
    Ok(pdf_attachment(format!("encrypted_{}", file.file_name), bytes))
}

pub(super) async fn decrypt(multipart: Multipart) -> HandlerResult {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.file("file")?;
    file.require_pdf()?;
    let password = form.text("password")?.to_string();

    info!("decrypt {}", file.file_name);
    let bytes = blocking(move || ops::decrypt(&file.bytes, &password)).await?;
    Ok(pdf_attachment(format!("decrypted_{}", file.file_name), bytes))
}

pub(super) async fn add_watermark(State(state): State<AppState>, multipart: Multipart) -> HandlerResult {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.file("file")?;
    file.require_pdf()?;

    let kind_name = form.text_or("watermark_type", "text").trim().to_ascii_lowercase();
    let kind = match kind_name.as_str() {
        "text" => WatermarkKind::Text(form.text("watermark_text")?.to_string()),
        "image" => WatermarkKind::Image(form.file("watermark_image")?.bytes),
        other => {
            return Err(Error::validation(format!(
                "Unknown watermark type '{other}' (expected text or image)"
            ))
            .into())
        }
    };
    let options = WatermarkOptions {
        kind,
        opacity: form.parse_or("opacity", 0.5)?,
        rotation: form.parse_or("rotation", 0.0)?,
        position: form.parse_or("position", Placement::Center)?,
        font_size: form.parse_or("font_size", 40.0)?,
        font_color: form.parse_or("font_color", Rgb::BLACK)?,
        bold: form.flag_or("bold", form.flag_or("font_bold", false)?)?,
        pages: form.text_or("pages", "all").to_string(),
    };

    info!("watermark {} ({}, pages '{}')", file.file_name, options.position, options.pages);
    let fonts = state.fonts();
    let bytes = blocking(move || ops::add_watermark(&file.bytes, &options, &fonts)).await?;
    Ok(pdf_attachment(format!("watermarked_{}", file.file_name), bytes))
}

pub(super) async fn edit(State(state): State<AppState>, multipart: Multipart) -> HandlerResult {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.file("file")?;
    file.require_pdf()?;
    let elements = form.text("elements")?.to_string();

    info!("edit {}", file.file_name);
    let fonts = state.fonts();
    let bytes = blocking(move || ops::edit(&file.bytes, &elements, &fonts)).await?;
    Ok(pdf_attachment(format!("edited_{}", file.file_name), bytes))
}

pub(super) async fn convert_from_pdf(State(state): State<AppState>, multipart: Multipart) -> HandlerResult {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.file("file")?;
    file.require_pdf()?;
    let target = target_format(&form)?;

    info!("convert {} to {}", file.file_name, target);
    let converters = state.converters();
    let artifact = in_session(&state, move |session| {
        ops::convert_from_pdf(&converters, session, &file.file_name, &file.bytes, target)
    })
    .await?;
    Ok(attachment(artifact))
}

/// `target_format` is docx, png or jpg; `image` defers to `image_format`
fn target_format(form: &UploadForm) -> crate::Result<TargetFormat> {
    let requested = form.text("target_format")?;
    if !requested.trim().eq_ignore_ascii_case("image") {
        return requested.parse();
    }
    let target: TargetFormat = form.text("image_format")?.parse()?;
    if !target.is_image() {
        return Err(Error::validation(format!("'{target}' is not an image format (expected jpg or png)")));
    }
    Ok(target)
}

pub(super) async fn convert_to_pdf(State(state): State<AppState>, multipart: Multipart) -> HandlerResult {
    let mut form = UploadForm::read(multipart).await?;
    let mut uploads = form.files("files");
    uploads.extend(form.files("file"));
    let files: Vec<(String, Vec<u8>)> = uploads
        .into_iter()
        .map(|upload| (upload.file_name, upload.bytes))
        .collect();
    match form.text_or("source_format", "").trim() {
        "" => {}
        declared => ops::expect_source_kind(&files, declared.parse::<SourceKind>()?)?,
    }

    info!("convert {} files to PDF", files.len());
    let fonts = state.fonts();
    let artifact = blocking(move || ops::convert_to_pdf(&files, &fonts)).await?;
    Ok(attachment(artifact))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_encoding() {
        assert_eq!(percent_encode("a b.pdf"), "a%20b.pdf");
        assert_eq!(percent_encode("é.pdf"), "%C3%A9.pdf");
        assert_eq!(percent_encode("q1~v2-final_(x).pdf"), "q1~v2-final_%28x%29.pdf");
        assert_eq!(ascii_fallback("é \"x\".pdf"), "_ _x_.pdf");
    }
}
