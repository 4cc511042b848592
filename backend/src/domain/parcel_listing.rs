//! Paginated, filtered and sorted parcel listing.
//!
//! Filters are conjunctive and each applies only when provided. Sorting is
//! restricted to an allow-list of columns so no caller-controlled string ever
//! reaches the store as a column name.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use pagination::{Page, PageRequest, PageRequestError};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::domain::identity_gate::IdentityGate;
use crate::domain::marketplace_error::MarketplaceError;
use crate::domain::parcel::{ParcelListing, ParcelSummary};
use crate::domain::ports::{ParcelRepository, ParcelRepositoryError, ParcelsQuery};
use crate::domain::SessionHandle;

/// Column a listing is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    PricePerDay,
    MaxCapacity,
    #[default]
    CreatedAt,
}

impl SortField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PricePerDay => "price_per_day",
            Self::MaxCapacity => "max_capacity",
            Self::CreatedAt => "created_at",
        }
    }
}

impl FromStr for SortField {
    type Err = ListingQueryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "price_per_day" | "pricePerDay" | "prix_par_jour" => Ok(Self::PricePerDay),
            "max_capacity" | "maxCapacity" | "capacite_max" => Ok(Self::MaxCapacity),
            "created_at" | "createdAt" | "date_creation" => Ok(Self::CreatedAt),
            other => Err(ListingQueryError::UnknownSortField(other.to_owned())),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = ListingQueryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ListingQueryError::UnknownSortDirection(raw.to_owned())),
        }
    }
}

/// Single-column ordering; defaults to newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParcelSort {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Optional conjunctive filters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParcelFilters {
    max_price: Option<f64>,
    min_capacity: Option<u32>,
}

impl ParcelFilters {
    /// Validate filter bounds.
    pub fn new(max_price: Option<f64>, min_capacity: Option<u32>) -> Result<Self, ListingQueryError> {
        if let Some(price) = max_price
            && (!price.is_finite() || price < 0.0)
        {
            return Err(ListingQueryError::InvalidMaxPrice(price));
        }
        Ok(Self {
            max_price,
            min_capacity,
        })
    }

    /// Upper bound on the daily price, inclusive.
    pub fn max_price(&self) -> Option<f64> {
        self.max_price
    }

    /// Lower bound on the capacity, inclusive.
    pub fn min_capacity(&self) -> Option<u32> {
        self.min_capacity
    }

    /// Whether a row with these values passes every provided filter.
    ///
    /// A row without a capacity never satisfies a capacity filter.
    pub fn matches(&self, price_per_day: f64, max_capacity: Option<u32>) -> bool {
        let price_ok = self.max_price.is_none_or(|max| price_per_day <= max);
        let capacity_ok = self
            .min_capacity
            .is_none_or(|min| max_capacity.is_some_and(|capacity| capacity >= min));
        price_ok && capacity_ok
    }
}

/// Validation failures for listing parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ListingQueryError {
    #[error(transparent)]
    Page(#[from] PageRequestError),
    #[error("maxPrice must be a non-negative number, got {0}")]
    InvalidMaxPrice(f64),
    #[error("sortBy must be one of price_per_day, max_capacity, created_at; got {0}")]
    UnknownSortField(String),
    #[error("sortDirection must be asc or desc; got {0}")]
    UnknownSortDirection(String),
}

impl ListingQueryError {
    /// Query parameter the failure refers to.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Page(PageRequestError::ZeroPage) => "page",
            Self::Page(_) => "pageSize",
            Self::InvalidMaxPrice(_) => "maxPrice",
            Self::UnknownSortField(_) => "sortBy",
            Self::UnknownSortDirection(_) => "sortDirection",
        }
    }
}

/// Raw listing parameters as received from a caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub max_price: Option<f64>,
    pub min_capacity: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

/// Validated listing request.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParcelListQuery {
    pub page: PageRequest,
    pub filters: ParcelFilters,
    pub sort: ParcelSort,
}

impl ParcelListQuery {
    /// Validate raw parameters, applying defaults for anything omitted.
    ///
    /// # Examples
    /// ```
    /// use parcel_market::domain::{ListingParams, ParcelListQuery, SortDirection, SortField};
    ///
    /// let query = ParcelListQuery::try_from_params(ListingParams::default()).unwrap();
    /// assert_eq!(query.page.page_size(), 6);
    /// assert_eq!(query.sort.field, SortField::CreatedAt);
    /// assert_eq!(query.sort.direction, SortDirection::Desc);
    /// ```
    pub fn try_from_params(params: ListingParams) -> Result<Self, ListingQueryError> {
        let page = PageRequest::from_optional(params.page, params.page_size)?;
        let filters = ParcelFilters::new(params.max_price, params.min_capacity)?;
        let field = params
            .sort_by
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default();
        let direction = params
            .sort_direction
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            page,
            filters,
            sort: ParcelSort { field, direction },
        })
    }
}

/// Listing service implementing [`ParcelsQuery`].
#[derive(Clone)]
pub struct ParcelListingService {
    gate: IdentityGate,
    parcels: Arc<dyn ParcelRepository>,
}

impl ParcelListingService {
    pub fn new(gate: IdentityGate, parcels: Arc<dyn ParcelRepository>) -> Self {
        Self { gate, parcels }
    }

    fn unavailable(err: ParcelRepositoryError) -> MarketplaceError {
        error!(error = %err, "parcel listing query failed");
        MarketplaceError::listing_unavailable(err.to_string())
    }
}

#[async_trait]
impl ParcelsQuery for ParcelListingService {
    async fn list_parcels(
        &self,
        query: &ParcelListQuery,
    ) -> Result<Page<ParcelListing>, MarketplaceError> {
        debug!(
            page = query.page.page(),
            page_size = query.page.page_size(),
            sort = %query.sort.field,
            direction = query.sort.direction.as_str(),
            "listing parcels"
        );
        self.parcels.list(query).await.map_err(Self::unavailable)
    }

    async fn list_owned(
        &self,
        session: Option<&SessionHandle>,
    ) -> Result<Vec<ParcelSummary>, MarketplaceError> {
        let identity = self.gate.require_identity(session).await?;
        self.parcels
            .list_by_owner(identity.id())
            .await
            .map_err(Self::unavailable)
    }
}
