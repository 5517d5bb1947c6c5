//! Handler serving stored cover images back out.
//! Streams file bytes to avoid buffering whole images in memory.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

use crate::{errors::ApiError, services::product_service::ProductService};

/// GET `/uploads/{filename}` — stream a stored blob.
///
/// The content type is derived from the generated filename's extension; the
/// blob store only ever produces png/jpg/webp names.
pub async fn serve_upload(
    State(service): State<ProductService>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let (file, len) = service.blobs.open(&filename).await?;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&filename)),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&len.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );

    Ok(response)
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
