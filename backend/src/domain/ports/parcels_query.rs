//! Driving port for parcel reads.
//!
//! Inbound adapters use this port for the public listing and the owner's
//! dashboard without importing persistence concerns.

use async_trait::async_trait;
use pagination::Page;

use crate::domain::{MarketplaceError, ParcelListQuery, ParcelListing, ParcelSummary, SessionHandle};

#[async_trait]
pub trait ParcelsQuery: Send + Sync {
    /// One page of parcels with the exact filtered count.
    async fn list_parcels(
        &self,
        query: &ParcelListQuery,
    ) -> Result<Page<ParcelListing>, MarketplaceError>;

    /// Parcels owned by the caller behind `session`.
    async fn list_owned(
        &self,
        session: Option<&SessionHandle>,
    ) -> Result<Vec<ParcelSummary>, MarketplaceError>;
}
