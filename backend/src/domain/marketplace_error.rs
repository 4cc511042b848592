//! Failure taxonomy shared by the marketplace workflows.
//!
//! Workflows return these values instead of raising; adapters convert them to
//! the transport-agnostic [`Error`] envelope.

use serde_json::json;

use crate::domain::Error;
use crate::domain::parcel::ValidationError;

/// Entity a persistence failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistedEntity {
    User,
    Parcel,
    Image,
}

impl PersistedEntity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Parcel => "parcel",
            Self::Image => "image",
        }
    }
}

/// Workflow failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarketplaceError {
    /// No session, an expired session, or no resolvable identity.
    #[error("you must be signed in to perform this action")]
    Unauthenticated,
    /// The application user record could not be read or created.
    #[error("your account could not be verified or created: {message}")]
    AccountProvisioningFailed { message: String },
    #[error("{0}")]
    Validation(ValidationError),
    #[error("image upload failed: {message}")]
    ImageUploadFailed { message: String },
    #[error("could not save {}: {message}", .entity.as_str())]
    Persistence {
        entity: PersistedEntity,
        message: String,
    },
    #[error("parcels are unavailable right now: {message}")]
    ListingUnavailable { message: String },
}

impl MarketplaceError {
    /// Stable failure kind reported to submission clients.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::AccountProvisioningFailed { .. } => "account_provisioning_failed",
            Self::Validation(_) => "validation_error",
            Self::ImageUploadFailed { .. } => "image_upload_failed",
            Self::Persistence { .. } => "persistence_error",
            Self::ListingUnavailable { .. } => "listing_unavailable",
        }
    }

    pub fn account_provisioning_failed(message: impl Into<String>) -> Self {
        Self::AccountProvisioningFailed {
            message: message.into(),
        }
    }

    pub fn image_upload_failed(message: impl Into<String>) -> Self {
        Self::ImageUploadFailed {
            message: message.into(),
        }
    }

    pub fn persistence(entity: PersistedEntity, message: impl Into<String>) -> Self {
        Self::Persistence {
            entity,
            message: message.into(),
        }
    }

    pub fn listing_unavailable(message: impl Into<String>) -> Self {
        Self::ListingUnavailable {
            message: message.into(),
        }
    }
}

impl From<ValidationError> for MarketplaceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<MarketplaceError> for Error {
    fn from(value: MarketplaceError) -> Self {
        let message = value.to_string();
        let kind = value.kind();
        match value {
            MarketplaceError::Unauthenticated => Error::unauthorized(message),
            MarketplaceError::Validation(err) => {
                let mut details = json!({
                    "field": err.field.as_str(),
                    "code": err.reason.code(),
                });
                if let Some(raw) = err.value {
                    details["value"] = json!(raw);
                }
                Error::invalid_request(message).with_details(details)
            }
            MarketplaceError::Persistence { entity, .. } => Error::service_unavailable(message)
                .with_details(json!({ "kind": kind, "entity": entity.as_str() })),
            MarketplaceError::AccountProvisioningFailed { .. }
            | MarketplaceError::ImageUploadFailed { .. }
            | MarketplaceError::ListingUnavailable { .. } => {
                Error::service_unavailable(message).with_details(json!({ "kind": kind }))
            }
        }
    }
}
