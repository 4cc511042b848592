//! Domain primitives, services and ports.
//!
//! Purpose: define strongly typed marketplace entities, the workflows that act
//! on them, and the ports through which those workflows reach the hosted
//! backend. Nothing here depends on HTTP or on a concrete provider.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic error envelope.
//! - MarketplaceError: workflow failure taxonomy.
//! - User, auth, parcel and image value types.
//! - Services: `IdentityGate`, `UserProvisioningService`,
//!   `ParcelSubmissionService`, `ParcelListingService`, `AccountManager`.

pub mod accounts;
pub mod amenities;
pub mod auth;
pub mod error;
pub mod identity_gate;
pub mod image;
pub mod marketplace_error;
pub mod parcel;
pub mod parcel_listing;
pub mod parcel_submission;
pub mod ports;
pub mod user;
pub mod user_provisioning;

#[cfg(test)]
pub(crate) mod test_support;

pub use self::accounts::AccountManager;
pub use self::amenities::ParcelAmenities;
pub use self::auth::{
    AccessToken, AuthCode, AuthSession, AuthValidationError, LoginCredentials, PkceChallenge,
    PkceVerifier, RefreshToken, SessionHandle, SignUpRequest,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::identity_gate::IdentityGate;
pub use self::image::{
    DEFAULT_MAX_IMAGE_BYTES, FeaturedImage, Image, ImageId, ImageUpload, ImageUploadError,
    NewImage, StorageKey,
};
pub use self::marketplace_error::{MarketplaceError, PersistedEntity};
pub use self::parcel::{
    AvailabilityWindow, Capacity, Latitude, Longitude, NewParcel, Parcel, ParcelDraft,
    ParcelField, ParcelId, ParcelListing, ParcelSummary, ParcelTitle, PricePerDay,
    ValidatedParcel, ValidationError, ValidationReason,
};
pub use self::parcel_listing::{
    ListingParams, ListingQueryError, ParcelFilters, ParcelListQuery, ParcelListingService,
    ParcelSort, SortDirection, SortField,
};
pub use self::parcel_submission::{ParcelSubmissionService, SubmissionPorts};
pub use self::user::{Email, UserId, UserIdentity, UserMetadata, UserRecord, UserValidationError};
pub use self::user_provisioning::UserProvisioningService;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use parcel_market::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
