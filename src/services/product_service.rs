//! src/services/product_service.rs
//!
//! ProductService — the write-path state machine over the repository and the
//! blob store. The row write and the file write are not transactionally
//! coupled, so this layer owns the compensation rules for partial failure:
//!
//! - create: missing file fails before anything is touched; a repository
//!   failure after staging deletes the staged blob, best-effort.
//! - update: `ProductNotFound` propagates with no compensation (nothing was
//!   replaced); any other repository failure deletes the newly staged blob
//!   only. The previous cover is never reclaimed on success.
//! - delete: removes the row only; the blob stays so its URL keeps resolving.
//!
//! Compensation failures are logged and swallowed; the caller always sees
//! the original repository error.

use tracing::warn;

use crate::errors::{ApiError, ApiResult};
use crate::models::product::{NewProduct, Product, ProductPatch};
use crate::services::blob_store::{BlobStore, StoredFile};
use crate::services::product_repository::{ProductChanges, ProductRepository};

#[derive(Clone)]
pub struct ProductService {
    pub repo: ProductRepository,
    pub blobs: BlobStore,
}

impl ProductService {
    pub fn new(repo: ProductRepository, blobs: BlobStore) -> Self {
        Self { repo, blobs }
    }

    pub async fn list(&self) -> ApiResult<Vec<Product>> {
        self.repo.find_all().await
    }

    pub async fn get(&self, id: i64) -> ApiResult<Product> {
        self.repo.find_by_id(id).await
    }

    /// Create a product referencing an already-staged cover.
    ///
    /// The file was staged by the boundary before this call; from here the
    /// job is solely to persist the row referencing it, and to un-stage the
    /// blob if that persist fails.
    pub async fn create(&self, new: NewProduct, file: Option<StoredFile>) -> ApiResult<Product> {
        let file = file.ok_or(ApiError::MissingCover)?;
        let cover_url = self.blobs.url_for(&file.filename);

        match self.repo.create(&new.name, &new.artist_name, &cover_url).await {
            Ok(product) => Ok(product),
            Err(err) => {
                self.discard_blob(&file).await;
                Err(err)
            }
        }
    }

    /// Apply a partial update, optionally replacing the cover.
    pub async fn update(
        &self,
        id: i64,
        patch: ProductPatch,
        file: Option<StoredFile>,
    ) -> ApiResult<Product> {
        if patch.is_empty() && file.is_none() {
            return Err(ApiError::NoFieldsProvided);
        }

        let changes = ProductChanges {
            name: patch.name,
            artist_name: patch.artist_name,
            cover_url: file.as_ref().map(|f| self.blobs.url_for(&f.filename)),
        };

        match self.repo.update(id, changes).await {
            Ok(product) => Ok(product),
            // Nothing was replaced; the staged blob (if any) is left as-is.
            Err(err @ ApiError::ProductNotFound(_)) => Err(err),
            Err(err) => {
                if let Some(file) = &file {
                    self.discard_blob(file).await;
                }
                Err(err)
            }
        }
    }

    /// Delete the row. The referenced blob is intentionally not reclaimed.
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.repo.delete(id).await
    }

    /// Best-effort compensation: remove a staged blob after a failed
    /// persist. Errors here are logged, never propagated, so the caller
    /// still sees the repository error that triggered the cleanup.
    async fn discard_blob(&self, file: &StoredFile) {
        if let Err(err) = self.blobs.delete(&file.filename).await {
            warn!("failed to delete staged blob {}: {}", file.filename, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::{io, sync::Arc, time::Duration};

    const MIGRATION_SQL: &str = include_str!("../../migrations/0001_init.sql");

    async fn memory_pool(with_schema: bool) -> Arc<SqlitePool> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        if with_schema {
            for stmt in MIGRATION_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                sqlx::query(stmt).execute(&pool).await.unwrap();
            }
        }
        Arc::new(pool)
    }

    async fn service(with_schema: bool) -> (ProductService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let blobs = BlobStore::new(dir.path().join("uploads"), "http://localhost:3000", 1024);
        let repo = ProductRepository::new(memory_pool(with_schema).await);
        (ProductService::new(repo, blobs), dir)
    }

    async fn stage_png(blobs: &BlobStore) -> StoredFile {
        let stream =
            futures::stream::iter(vec![Ok::<_, io::Error>(Bytes::from_static(b"png bytes"))]);
        blobs.save("image/png", stream).await.unwrap()
    }

    fn new_product() -> NewProduct {
        NewProduct {
            name: "Arcane OST".into(),
            artist_name: "Riot Games Music".into(),
        }
    }

    #[tokio::test]
    async fn create_links_row_to_staged_blob() {
        let (service, _dir) = service(true).await;
        let file = stage_png(&service.blobs).await;
        let filename = file.filename.clone();

        let product = service.create(new_product(), Some(file)).await.unwrap();
        assert_eq!(
            product.cover_url,
            format!("http://localhost:3000/uploads/{filename}")
        );
        assert!(service.blobs.root.join(&filename).exists());
    }

    #[tokio::test]
    async fn create_without_file_touches_nothing() {
        let (service, _dir) = service(true).await;

        let err = service.create(new_product(), None).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingCover));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_persist_discards_staged_blob() {
        // No schema, so the INSERT fails with a real database error.
        let (service, _dir) = service(false).await;
        let file = stage_png(&service.blobs).await;
        let path = file.path.clone();
        assert!(path.exists());

        let err = service.create(new_product(), Some(file)).await.unwrap_err();
        assert!(matches!(err, ApiError::Sqlx(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn update_with_nothing_to_change_is_rejected() {
        let (service, _dir) = service(true).await;
        let file = stage_png(&service.blobs).await;
        let created = service.create(new_product(), Some(file)).await.unwrap();

        let err = service
            .update(created.id, ProductPatch::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NoFieldsProvided));

        // No storage writes happened.
        let unchanged = service.get(created.id).await.unwrap();
        assert_eq!(unchanged.updated_at, created.updated_at);
    }

    #[tokio::test]
    async fn update_missing_row_leaves_staged_blob_alone() {
        let (service, _dir) = service(true).await;
        let file = stage_png(&service.blobs).await;
        let path = file.path.clone();

        let patch = ProductPatch {
            name: Some("X".into()),
            ..Default::default()
        };
        let err = service.update(999_999, patch, Some(file)).await.unwrap_err();
        assert!(matches!(err, ApiError::ProductNotFound(999_999)));
        // Not-found is propagated without compensation.
        assert!(path.exists());
    }

    #[tokio::test]
    async fn update_failure_discards_only_the_new_blob() {
        let (service, _dir) = service(false).await;
        let old = stage_png(&service.blobs).await;
        let new = stage_png(&service.blobs).await;
        let old_path = old.path.clone();
        let new_path = new.path.clone();

        let patch = ProductPatch {
            name: Some("New Name".into()),
            ..Default::default()
        };
        let err = service.update(1, patch, Some(new)).await.unwrap_err();
        assert!(matches!(err, ApiError::Sqlx(_)));
        assert!(!new_path.exists());
        assert!(old_path.exists());
    }

    #[tokio::test]
    async fn update_without_file_keeps_existing_cover() {
        let (service, _dir) = service(true).await;
        let file = stage_png(&service.blobs).await;
        let created = service.create(new_product(), Some(file)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let patch = ProductPatch {
            name: Some("New Name".into()),
            ..Default::default()
        };
        let updated = service.update(created.id, patch, None).await.unwrap();
        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.cover_url, created.cover_url);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn update_with_new_cover_swaps_url_and_keeps_old_blob() {
        let (service, _dir) = service(true).await;
        let old = stage_png(&service.blobs).await;
        let old_path = old.path.clone();
        let created = service.create(new_product(), Some(old)).await.unwrap();

        let new = stage_png(&service.blobs).await;
        let new_filename = new.filename.clone();
        let updated = service
            .update(created.id, ProductPatch::default(), Some(new))
            .await
            .unwrap();

        assert_eq!(
            updated.cover_url,
            format!("http://localhost:3000/uploads/{new_filename}")
        );
        assert_ne!(updated.cover_url, created.cover_url);
        // The replaced cover is not reclaimed; its URL keeps resolving.
        assert!(old_path.exists());
        assert!(service.blobs.root.join(&new_filename).exists());
    }

    #[tokio::test]
    async fn delete_removes_row_but_not_blob() {
        let (service, _dir) = service(true).await;
        let file = stage_png(&service.blobs).await;
        let blob_path = file.path.clone();
        let created = service.create(new_product(), Some(file)).await.unwrap();

        service.delete(created.id).await.unwrap();
        let err = service.get(created.id).await.unwrap_err();
        assert!(matches!(err, ApiError::ProductNotFound(_)));
        // Blob reclamation is intentionally not part of delete.
        assert!(blob_path.exists());

        let err = service.delete(created.id).await.unwrap_err();
        assert!(matches!(err, ApiError::ProductNotFound(_)));
    }
}
