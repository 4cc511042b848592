//! Parcel photos: upload payloads, storage keys and persisted image rows.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::parcel::ParcelId;

/// Default upper bound for an uploaded image.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Identifier of a persisted image row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(Uuid);

impl ImageId {
    /// Generate a fresh identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reasons an upload payload is rejected before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageUploadError {
    EmptyFileName,
    EmptyPayload,
    UnsupportedContentType { content_type: String },
    TooLarge { max: usize, actual: usize },
}

impl fmt::Display for ImageUploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFileName => write!(f, "image file name must not be empty"),
            Self::EmptyPayload => write!(f, "image file must not be empty"),
            Self::UnsupportedContentType { content_type } => {
                write!(f, "unsupported image content type: {content_type}")
            }
            Self::TooLarge { max, actual } => {
                write!(f, "image is {actual} bytes; the limit is {max} bytes")
            }
        }
    }
}

impl std::error::Error for ImageUploadError {}

/// Image file supplied with a parcel submission.
///
/// ## Invariants
/// - `file_name` is non-empty after trimming.
/// - `content_type` starts with `image/`.
/// - `bytes` is non-empty and within the configured size limit.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl ImageUpload {
    /// Validate an upload against `max_bytes`.
    pub fn try_new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
        max_bytes: usize,
    ) -> Result<Self, ImageUploadError> {
        let file_name = file_name.into().trim().to_owned();
        if file_name.is_empty() {
            return Err(ImageUploadError::EmptyFileName);
        }
        let content_type = content_type.into().trim().to_ascii_lowercase();
        if !content_type.starts_with("image/") || content_type.len() == "image/".len() {
            return Err(ImageUploadError::UnsupportedContentType { content_type });
        }
        if bytes.is_empty() {
            return Err(ImageUploadError::EmptyPayload);
        }
        if bytes.len() > max_bytes {
            return Err(ImageUploadError::TooLarge {
                max: max_bytes,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Object key under which an upload is stored.
///
/// Formed as `<unix-millis>-<file name>` with every character outside
/// `[A-Za-z0-9._-]` replaced by `_`.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use parcel_market::domain::StorageKey;
///
/// let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
/// let key = StorageKey::for_upload(at, "champ nord.jpg");
/// assert_eq!(key.as_ref(), "1700000000000-champ_nord.jpg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Derive the key for a file uploaded at `at`.
    pub fn for_upload(at: DateTime<Utc>, file_name: &str) -> Self {
        let sanitised: String = file_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Self(format!("{}-{sanitised}", at.timestamp_millis()))
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Image row to insert, linked to an existing parcel.
#[derive(Debug, Clone, PartialEq)]
pub struct NewImage {
    pub parcel_id: ParcelId,
    pub url: String,
    pub caption: Option<String>,
    pub display_order: Option<i32>,
}

/// Persisted image row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub parcel_id: Option<ParcelId>,
    pub url: String,
    pub caption: Option<String>,
    pub display_order: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Image joined onto a parcel listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedImage {
    pub id: ImageId,
    pub url: String,
    pub caption: Option<String>,
}

impl From<&Image> for FeaturedImage {
    fn from(image: &Image) -> Self {
        Self {
            id: image.id,
            url: image.url.clone(),
            caption: image.caption.clone(),
        }
    }
}
