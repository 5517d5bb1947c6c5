//! src/services/blob_store.rs
//!
//! BlobStore — on-disk persistence for uploaded cover images beneath a
//! single root directory. Uploads stream through a temporary file and are
//! renamed into place, so a failed or oversized upload never leaves a
//! partial blob behind.

use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{ApiError, ApiResult};

/// MIME types accepted for cover uploads. Checked before any byte is written.
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/webp"];

const MAX_FILENAME_LEN: usize = 255;

/// A blob already staged to disk, pending association with a product row.
///
/// Ownership transfers to the write service for the duration of one
/// operation; on failure paths the write service decides whether the file
/// is deleted.
#[derive(Clone, Debug)]
pub struct StoredFile {
    /// Generated unique filename (storage identity).
    pub filename: String,
    /// Absolute path of the staged file.
    pub path: PathBuf,
    /// Declared MIME type of the upload.
    pub content_type: String,
    /// Size in bytes as counted while streaming.
    pub size_bytes: u64,
}

/// BlobStore provides the three blob operations the write path needs:
/// - `save`: stream an upload to disk under a generated name
/// - `delete`: remove a blob by name, idempotently
/// - `url_for`: derive the public URL of a blob without touching storage
///
/// plus `open` for the handler that serves stored covers back out.
#[derive(Clone)]
pub struct BlobStore {
    /// Root directory where blobs are stored.
    pub root: PathBuf,

    /// Public base address, without trailing slash, used by `url_for`.
    pub public_base_url: String,

    /// Maximum accepted upload size in bytes.
    pub max_bytes: u64,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
            max_bytes,
        }
    }

    /// Basic filename validation to avoid trivial path traversal vectors.
    ///
    /// Rejects empty or overlong names, anything containing a separator or
    /// `..`, control bytes, and dot-prefixed names (which would expose
    /// in-flight temp files).
    fn ensure_name_safe(&self, filename: &str) -> ApiResult<()> {
        if filename.is_empty() || filename.len() > MAX_FILENAME_LEN {
            return Err(ApiError::InvalidFilename);
        }
        if filename.starts_with('.') || filename.contains('/') || filename.contains("..") {
            return Err(ApiError::InvalidFilename);
        }
        if filename
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(ApiError::InvalidFilename);
        }
        Ok(())
    }

    /// Stream an upload into the store under a freshly generated name.
    ///
    /// - Rejects disallowed MIME types before creating any file.
    /// - Enforces the size cap while streaming; on overflow the temp file is
    ///   removed and `PayloadTooLarge` is returned.
    /// - Writes to `.tmp-{uuid}`, then fsyncs and renames into place, so the
    ///   final name only ever refers to a complete file.
    pub async fn save<S>(&self, content_type: &str, stream: S) -> ApiResult<StoredFile>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let ext = extension_for(content_type)
            .ok_or_else(|| ApiError::UnsupportedType(content_type.to_string()))?;

        fs::create_dir_all(&self.root).await?;

        let filename = format!("{}-{}.{}", Utc::now().timestamp_millis(), short_token(), ext);
        let file_path = self.root.join(&filename);
        let tmp_path = self.root.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: u64 = 0;
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(ApiError::Io(err));
                }
            };
            size_bytes += chunk.len() as u64;
            if size_bytes > self.max_bytes {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ApiError::PayloadTooLarge {
                    actual: size_bytes,
                    limit: self.max_bytes,
                });
            }
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ApiError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ApiError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ApiError::Io(err));
        }

        // Generated names are unique, so a plain rename suffices.
        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ApiError::Io(err));
        }

        debug!("stored blob {} ({} bytes)", filename, size_bytes);

        Ok(StoredFile {
            filename,
            path: file_path,
            content_type: content_type.to_string(),
            size_bytes,
        })
    }

    /// Remove a blob by name. Idempotent: deleting a name that does not
    /// exist is success, since this is a cleanup operation.
    pub async fn delete(&self, filename: &str) -> ApiResult<()> {
        self.ensure_name_safe(filename)?;
        let file_path = self.root.join(filename);
        match fs::remove_file(&file_path).await {
            Ok(()) => debug!("removed blob {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("blob {} already missing", file_path.display());
            }
            Err(err) => return Err(ApiError::Io(err)),
        }
        Ok(())
    }

    /// Derive the public URL for a stored blob. Pure: never touches storage.
    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/uploads/{}", self.public_base_url, filename)
    }

    /// Open a stored blob for reading, returning the file handle and its
    /// length, ready for streaming out.
    pub async fn open(&self, filename: &str) -> ApiResult<(File, u64)> {
        self.ensure_name_safe(filename)?;
        let file_path = self.root.join(filename);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                ApiError::BlobNotFound(filename.to_string())
            } else {
                ApiError::Io(err)
            }
        })?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }
}

/// Map an allowed MIME type to the extension used in generated names.
/// Returns None for anything outside the allow-list.
fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Short random component for generated filenames, alongside the millisecond
/// timestamp prefix.
fn short_token() -> String {
    let token = Uuid::new_v4().simple().to_string();
    token[..8].to_string()
}
