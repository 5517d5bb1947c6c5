//! The persisted product entity and its validated input types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::{ApiError, ApiResult};

/// A catalog product: a record with a name, an artist and a stored cover.
///
/// The struct holds the row as persisted; `cover_url` is always derived from
/// a stored blob plus the configured public base URL, never taken from the
/// caller.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// System-assigned positive id. Never reused after deletion.
    pub id: i64,

    /// Non-empty display name.
    pub name: String,

    /// Non-empty artist name.
    pub artist_name: String,

    /// Absolute URL of the stored cover image.
    pub cover_url: String,

    /// Set once at creation.
    pub created_at: DateTime<Utc>,

    /// Refreshed on every successful mutation.
    pub updated_at: DateTime<Utc>,
}

/// Validated input for product creation.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub artist_name: String,
}

impl NewProduct {
    /// Validate the text fields of a create request. Both are required and
    /// must be non-empty.
    pub fn parse(name: Option<String>, artist_name: Option<String>) -> ApiResult<Self> {
        let name = match name {
            Some(value) if !value.is_empty() => value,
            _ => return Err(ApiError::Validation("name is required".into())),
        };
        let artist_name = match artist_name {
            Some(value) if !value.is_empty() => value,
            _ => return Err(ApiError::Validation("artistName is required".into())),
        };
        Ok(Self { name, artist_name })
    }
}

/// Partial input for product updates. Absent fields mean "leave untouched".
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub artist_name: Option<String>,
}

impl ProductPatch {
    /// Build a patch from raw update fields. A field that is absent or empty
    /// is left out of the patch; the patch carries only attributes actually
    /// supplied.
    pub fn parse(name: Option<String>, artist_name: Option<String>) -> Self {
        Self {
            name: name.filter(|value| !value.is_empty()),
            artist_name: artist_name.filter(|value| !value.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.artist_name.is_none()
    }
}
