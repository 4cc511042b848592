//! Port abstraction for the public image bucket.
use async_trait::async_trait;

use crate::domain::StorageKey;

use super::define_port_error;

define_port_error! {
    /// Errors raised by object storage adapters.
    pub enum ObjectStorageError {
        /// An object already exists under the key.
        Duplicate { key: String } => "object {key} already exists",
        /// Storage could not be reached.
        Connection { message: String } => "object storage unreachable: {message}",
        /// Storage rejected the upload.
        Rejected { message: String } => "object storage rejected the upload: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key` and return the stored object's path within
    /// the bucket.
    async fn upload(
        &self,
        key: &StorageKey,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, ObjectStorageError>;

    /// Publicly reachable URL for a stored path. Pure; no network call.
    fn public_url(&self, path: &str) -> String;
}
