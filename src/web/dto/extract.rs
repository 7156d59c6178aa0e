//! Extractors whose rejections are JSON `ApiError`s.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Request},
    http::request::Parts,
};

use crate::web::error::ApiError;

/// A single path parameter, e.g. the upload kind or the stored file path.
///
/// Undecodable parameters (bad percent-encoding, invalid UTF-8) are rejected
/// with a 400 JSON error instead of axum's plain-text body.
pub struct PathParam(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for PathParam
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                tracing::debug!("Rejected path parameter: {}", e);
                ApiError::bad_request("Invalid path")
            })?;

        Ok(PathParam(value))
    }
}

/// A multipart/form-data body.
///
/// A missing or malformed multipart content type is rejected with a 400 JSON
/// error.
pub struct MultipartBody(pub Multipart);

#[async_trait]
impl<S> FromRequest<S> for MultipartBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await.map_err(|e| {
            tracing::debug!("Rejected multipart request: {}", e);
            ApiError::bad_request("Invalid multipart data")
        })?;

        Ok(MultipartBody(multipart))
    }
}
