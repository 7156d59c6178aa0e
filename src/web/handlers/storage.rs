//! Upload and retrieval handlers.

use axum::{
    body::Body,
    extract::{
        multipart::{Field, MultipartError},
        State,
    },
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::storage::{
    normalize_mime, ByteRange, UploadKind, UploadOptions, UploadRequest,
};
use crate::web::dto::{MultipartBody, PathParam, UploadResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::StorageError;

/// Cache policy for stored files; names are unique so content never changes.
const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

/// Generate a safe inline Content-Disposition header value.
///
/// Control characters are removed, quotes and backslashes replaced in the
/// ASCII fallback, and non-ASCII names are sent RFC 5987 encoded.
fn content_disposition_header(filename: &str) -> String {
    if filename.is_ascii() && !filename.chars().any(|c| c.is_control() || c == '"' || c == '\\') {
        return format!("inline; filename=\"{}\"", filename);
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() => c,
            _ => '_',
        })
        .collect();
    let encoded = urlencoding::encode(filename);

    format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("Request body too large");
    }
    tracing::warn!("Failed to read multipart data: {}", e);
    ApiError::bad_request("Invalid multipart data")
}

/// Read a file field chunk by chunk, stopping as soon as it exceeds `max`.
async fn read_limited(field: &mut Field<'_>, max: u64) -> Result<Vec<u8>, ApiError> {
    let mut content = Vec::new();

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        let size = (content.len() + chunk.len()) as u64;
        if size > max {
            return Err(StorageError::FileTooLarge { size, max }.into());
        }
        content.extend_from_slice(&chunk);
    }

    Ok(content)
}

/// Declared type from the part header, or guessed from the filename.
fn declared_mime(field_type: Option<&str>, filename: &str) -> String {
    match field_type.map(normalize_mime) {
        Some(mime) if !mime.is_empty() && mime != "application/octet-stream" => mime,
        _ => mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}

/// POST /api/uploads/:kind - Upload a media image or PDF report.
///
/// Request body: multipart/form-data with a required "file" part and optional
/// "folder", "quality" and "generateBlur" fields.
#[utoipa::path(
    post,
    path = "/api/uploads/{kind}",
    tag = "storage",
    params(
        ("kind" = String, Path, description = "Upload kind: media or reports")
    ),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Invalid input or path"),
        (status = 404, description = "Unknown upload kind"),
        (status = 413, description = "File too large"),
        (status = 415, description = "Unsupported file type"),
        (status = 422, description = "Content does not match declared type")
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    PathParam(kind): PathParam,
    MultipartBody(mut multipart): MultipartBody,
) -> Result<Json<UploadResponse>, ApiError> {
    let kind =
        UploadKind::from_namespace(&kind).ok_or_else(|| ApiError::not_found("Unknown upload kind"))?;
    let max = state.max_upload_size();

    let mut file: Option<UploadRequest> = None;
    let mut options = UploadOptions::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let original_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::bad_request("File part has no filename"))?;
                let mime_type = declared_mime(field.content_type(), &original_name);
                let content = read_limited(&mut field, max).await?;
                file = Some(UploadRequest::new(content, mime_type, original_name));
            }
            "folder" => {
                let folder = field.text().await.map_err(multipart_error)?;
                if !folder.trim().is_empty() {
                    options.folder = Some(folder);
                }
            }
            "quality" => {
                let quality = field.text().await.map_err(multipart_error)?;
                options.quality = Some(
                    quality
                        .trim()
                        .parse()
                        .map_err(|_| ApiError::bad_request("Invalid quality"))?,
                );
            }
            "generateBlur" => {
                let flag = field.text().await.map_err(multipart_error)?;
                options.generate_blur =
                    parse_bool(&flag).ok_or_else(|| ApiError::bad_request("Invalid generateBlur"))?;
            }
            _ => {}
        }
    }

    let request = file.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let result = state.storage.upload(kind, request, options).await?;

    Ok(Json(UploadResponse::from(result)))
}

/// GET /api/storage/*path - Serve a stored file.
///
/// Honors a single `Range: bytes=...` request with 206; other range forms are
/// ignored and the whole file is served.
#[utoipa::path(
    get,
    path = "/api/storage/{path}",
    tag = "storage",
    params(
        ("path" = String, Path, description = "Stored path, e.g. reports/blood-reports/report_1_ab.pdf")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 206, description = "Partial file content"),
        (status = 400, description = "Invalid path"),
        (status = 403, description = "Path escapes storage root"),
        (status = 404, description = "File not found"),
        (status = 413, description = "File too large"),
        (status = 416, description = "Range not satisfiable")
    )
)]
pub async fn get_stored_file(
    State(state): State<Arc<AppState>>,
    PathParam(path): PathParam,
    headers: HeaderMap,
) -> Result<Response<Body>, ApiError> {
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(ByteRange::parse);

    let retrieved = state.storage.retrieve(&path, range)?;
    let meta = &retrieved.meta;

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, meta.content_type)
        .header(header::CACHE_CONTROL, IMMUTABLE_CACHE)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&meta.filename),
        )
        .header(header::CONTENT_LENGTH, retrieved.content.len());

    if let Some((start, end)) = retrieved.range {
        builder = builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", start, end, meta.size),
            );
    }

    builder.body(Body::from(retrieved.content)).map_err(|e| {
        tracing::error!("Failed to build response: {}", e);
        ApiError::internal("Internal server error")
    })
}
