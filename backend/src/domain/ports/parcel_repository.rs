//! Port abstraction for parcel (terrain) persistence.
use async_trait::async_trait;
use pagination::Page;

use crate::domain::{ImageId, NewParcel, Parcel, ParcelId, ParcelListQuery, ParcelListing, ParcelSummary, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by parcel repository adapters.
    pub enum ParcelRepositoryError {
        /// The parcel to update does not exist.
        NotFound { id: String } => "parcel {id} not found",
        /// Repository connection could not be established.
        Connection { message: String } => "parcel repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "parcel repository query failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParcelRepository: Send + Sync {
    /// Insert a parcel with no featured image and return the stored row.
    async fn insert(&self, parcel: &NewParcel) -> Result<Parcel, ParcelRepositoryError>;

    /// Point a parcel at its featured image.
    async fn set_featured_image(
        &self,
        parcel_id: &ParcelId,
        image_id: &ImageId,
    ) -> Result<(), ParcelRepositoryError>;

    /// Return one page of parcels matching `query`, each joined with its
    /// featured image, together with the exact filtered count.
    async fn list(&self, query: &ParcelListQuery)
    -> Result<Page<ParcelListing>, ParcelRepositoryError>;

    /// Return the parcels owned by `owner`, newest first.
    async fn list_by_owner(&self, owner: &UserId)
    -> Result<Vec<ParcelSummary>, ParcelRepositoryError>;
}
