//! Reqwest-backed [`ObjectStorage`] over the hosted storage API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode, Url};

use super::dto::UploadReplyDto;
use super::http::{CallError, SupabaseHttp};
use crate::domain::StorageKey;
use crate::domain::ports::{ObjectStorage, ObjectStorageError};

/// Uploads into one public bucket.
pub struct SupabaseObjectStorage {
    http: SupabaseHttp,
    public_base: String,
    bucket: String,
}

impl SupabaseObjectStorage {
    /// Build an adapter writing to `bucket` in the project at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base: Url,
        service_key: impl Into<String>,
        bucket: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let bucket = bucket.into();
        let public_base = format!(
            "{}/storage/v1/object/public/{bucket}",
            base.as_str().trim_end_matches('/')
        );
        Ok(Self {
            http: SupabaseHttp::new(base, service_key, timeout)?,
            public_base,
            bucket,
        })
    }

    /// Object path inside the bucket from the `Key` the API echoes back.
    fn object_path<'a>(&self, echoed: &'a str) -> &'a str {
        echoed
            .strip_prefix(self.bucket.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(echoed)
    }
}

fn map_call_error(err: CallError, key: &StorageKey) -> ObjectStorageError {
    match err {
        CallError::Timeout(_) | CallError::Transport(_) => {
            ObjectStorageError::connection(err.to_string())
        }
        CallError::Status(failure)
            if failure.status == StatusCode::CONFLICT || failure.has_code(&["Duplicate"]) =>
        {
            ObjectStorageError::duplicate(key.as_ref())
        }
        other => ObjectStorageError::rejected(other.to_string()),
    }
}

#[async_trait]
impl ObjectStorage for SupabaseObjectStorage {
    async fn upload(
        &self,
        key: &StorageKey,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, ObjectStorageError> {
        let path = format!("storage/v1/object/{}/{}", self.bucket, key.as_ref());
        let url = self
            .http
            .endpoint(&path)
            .map_err(|err| map_call_error(err, key))?;
        let request = self
            .http
            .request(Method::POST, url)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes.to_vec());
        let reply: UploadReplyDto = self
            .http
            .send(request)
            .await
            .and_then(|reply| reply.json())
            .map_err(|err| map_call_error(err, key))?;
        Ok(self.object_path(&reply.key).to_owned())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base, path.trim_start_matches('/'))
    }
}
