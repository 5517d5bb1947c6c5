//! HTTP handlers for the product CRUD routes.
//!
//! Write handlers walk the multipart body field by field, staging the cover
//! through the blob store as it streams in, then hand validated input to
//! `ProductService`. Status codes are decided by `ApiError::into_response`,
//! not here.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use futures::StreamExt;
use std::io;
use tracing::debug;

use crate::{
    errors::{ApiError, ApiResult},
    models::product::{NewProduct, Product, ProductPatch},
    services::{blob_store::StoredFile, product_service::ProductService},
};

/// Text fields plus the staged cover extracted from one multipart body.
#[derive(Default)]
struct ProductForm {
    name: Option<String>,
    artist_name: Option<String>,
    file: Option<StoredFile>,
}

/// Drain a multipart body, staging the `cover` field into the blob store.
///
/// The cover is streamed straight to disk, so the size cap is enforced while
/// bytes arrive rather than after buffering. A second `cover` field is
/// ignored; unknown fields are skipped.
async fn read_product_form(
    service: &ProductService,
    multipart: &mut Multipart,
) -> ApiResult<ProductForm> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        debug!("failed to read multipart field: {}", err);
        ApiError::BadRequest(format!("Failed to read multipart data: {}", err))
    })? {
        match field.name().unwrap_or("") {
            "name" => {
                form.name = Some(field.text().await.map_err(|err| {
                    ApiError::BadRequest(format!("Failed to read name field: {}", err))
                })?);
            }
            "artistName" => {
                form.artist_name = Some(field.text().await.map_err(|err| {
                    ApiError::BadRequest(format!("Failed to read artistName field: {}", err))
                })?);
            }
            "cover" => {
                if form.file.is_some() {
                    debug!("ignoring duplicate cover field");
                    continue;
                }
                let content_type = field
                    .content_type()
                    .map(|ct| ct.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let stream = field
                    .map(|chunk| chunk.map_err(|err| io::Error::new(io::ErrorKind::Other, err)));
                form.file = Some(service.blobs.save(&content_type, stream).await?);
            }
            other => {
                debug!("ignoring unknown field: {}", other);
            }
        }
    }

    Ok(form)
}

fn ensure_valid_id(id: i64) -> ApiResult<()> {
    if id <= 0 {
        return Err(ApiError::Validation("Invalid id".into()));
    }
    Ok(())
}

/// GET `/products` — full catalog, newest first.
pub async fn list_products(
    State(service): State<ProductService>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(service.list().await?))
}

/// GET `/products/{id}`
pub async fn get_product(
    State(service): State<ProductService>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    ensure_valid_id(id)?;
    Ok(Json(service.get(id).await?))
}

/// POST `/products` — multipart `name`, `artistName`, `cover`.
pub async fn create_product(
    State(service): State<ProductService>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_product_form(&service, &mut multipart).await?;
    let new = NewProduct::parse(form.name, form.artist_name)?;
    let product = service.create(new, form.file).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PATCH `/products/{id}` — any subset of `name`, `artistName`, `cover`.
pub async fn update_product(
    State(service): State<ProductService>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<Product>, ApiError> {
    ensure_valid_id(id)?;
    let form = read_product_form(&service, &mut multipart).await?;
    let patch = ProductPatch::parse(form.name, form.artist_name);
    let product = service.update(id, patch, form.file).await?;
    Ok(Json(product))
}

/// DELETE `/products/{id}`
pub async fn delete_product(
    State(service): State<ProductService>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    ensure_valid_id(id)?;
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
