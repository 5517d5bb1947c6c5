//! Data model for the catalog service.
//!
//! The `Product` entity maps to the `products` table via `sqlx::FromRow`
//! and serializes as camelCase JSON via `serde`. The input types next to it
//! replace a schema-validation middleware with plain parse functions.

pub mod product;
