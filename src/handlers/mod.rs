pub mod health_handlers;
pub mod product_handlers;
pub mod upload_handlers;
