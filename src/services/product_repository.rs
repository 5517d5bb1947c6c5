//! src/services/product_repository.rs
//!
//! ProductRepository — CRUD over the `products` table. Thin by design: it
//! maps storage-layer "not found" conditions (`RowNotFound`, zero rows
//! affected) to `ProductNotFound` and leaves every other policy decision to
//! the write service above it.

use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;

use crate::errors::{ApiError, ApiResult};
use crate::models::product::Product;

const PRODUCT_COLUMNS: &str = "id, name, artist_name, cover_url, created_at, updated_at";

/// Partial field set applied by `update`. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub artist_name: Option<String>,
    pub cover_url: Option<String>,
}

#[derive(Clone)]
pub struct ProductRepository {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl ProductRepository {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// All products, newest-created first, ties broken by id descending.
    pub async fn find_all(&self) -> ApiResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC",
        ))
        .fetch_all(&*self.db)
        .await?;
        Ok(products)
    }

    pub async fn find_by_id(&self, id: i64) -> ApiResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?",
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => ApiError::ProductNotFound(id),
            other => ApiError::Sqlx(other),
        })
    }

    /// Insert a full row. Single statement with RETURNING, so either the
    /// complete row exists afterwards or nothing was created.
    pub async fn create(&self, name: &str, artist_name: &str, cover_url: &str) -> ApiResult<Product> {
        let now = Utc::now();
        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (name, artist_name, cover_url, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {PRODUCT_COLUMNS}",
        ))
        .bind(name)
        .bind(artist_name)
        .bind(cover_url)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await?;
        Ok(product)
    }

    /// Apply only the provided fields and refresh `updated_at`.
    ///
    /// Rejecting an all-absent change set is the write service's job; this
    /// layer happily runs a timestamp-only update.
    pub async fn update(&self, id: i64, changes: ProductChanges) -> ApiResult<Product> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE products SET updated_at = ");
        builder.push_bind(Utc::now());
        if let Some(name) = &changes.name {
            builder.push(", name = ");
            builder.push_bind(name);
        }
        if let Some(artist_name) = &changes.artist_name {
            builder.push(", artist_name = ");
            builder.push_bind(artist_name);
        }
        if let Some(cover_url) = &changes.cover_url {
            builder.push(", cover_url = ");
            builder.push_bind(cover_url);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(&format!(" RETURNING {PRODUCT_COLUMNS}"));

        builder
            .build_query_as::<Product>()
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => ApiError::ProductNotFound(id),
                other => ApiError::Sqlx(other),
            })
    }

    /// Delete a row by id. Zero rows affected means the id does not exist.
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::ProductNotFound(id));
        }
        Ok(())
    }
}
