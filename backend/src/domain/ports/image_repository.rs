//! Port abstraction for image rows.
use async_trait::async_trait;

use crate::domain::{Image, NewImage};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by image repository adapters.
    pub enum ImageRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "image repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "image repository query failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Insert an image row linked to its parcel and return the stored row.
    async fn insert(&self, image: &NewImage) -> Result<Image, ImageRepositoryError>;
}
