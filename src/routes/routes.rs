//! Defines routes for the catalog API.
//!
//! ## Structure
//! - **Product endpoints**
//!   - `GET    /products` — list products, newest first
//!   - `POST   /products` — create product (multipart: name, artistName, cover)
//!   - `GET    /products/{id}` — fetch one product
//!   - `PATCH  /products/{id}` — partial update (multipart, any subset of fields)
//!   - `DELETE /products/{id}` — delete product
//!
//! - **Uploads**
//!   - `GET /uploads/{filename}` — stream a stored cover image
//!
//! - **Health**
//!   - `GET /healthz`, `GET /readyz`

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        product_handlers::{
            create_product, delete_product, get_product, list_products, update_product,
        },
        upload_handlers::serve_upload,
    },
    services::product_service::ProductService,
};
use axum::{Router, routing::get};

/// Build and return the router for all catalog routes.
///
/// The router carries shared state (`ProductService`) to all handlers.
pub fn routes() -> Router<ProductService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // product CRUD
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
        // stored cover images
        .route("/uploads/{filename}", get(serve_upload))
}
