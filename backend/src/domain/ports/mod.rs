//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`AuthProvider`, the repositories, `ObjectStorage`) are
//! implemented by outbound adapters. Driving ports (`AccountService`,
//! `ParcelSubmission`, `ParcelsQuery`, `UserProvisioning`) are implemented by
//! domain services and called by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod account_service;
mod auth_provider;
mod image_repository;
mod object_storage;
mod parcel_repository;
mod parcel_submission;
mod parcels_query;
mod user_provisioning;
mod user_repository;

pub use account_service::{AccountService, SignUpResult};
#[cfg(test)]
pub use auth_provider::MockAuthProvider;
pub use auth_provider::{AuthProvider, AuthProviderError, SignUpOutcome};
#[cfg(test)]
pub use image_repository::MockImageRepository;
pub use image_repository::{ImageRepository, ImageRepositoryError};
#[cfg(test)]
pub use object_storage::MockObjectStorage;
pub use object_storage::{ObjectStorage, ObjectStorageError};
#[cfg(test)]
pub use parcel_repository::MockParcelRepository;
pub use parcel_repository::{ParcelRepository, ParcelRepositoryError};
pub use parcel_submission::{ImageFile, ParcelSubmission, ParcelSubmitted, SubmitParcelRequest};
pub use parcels_query::ParcelsQuery;
pub use user_provisioning::UserProvisioning;
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserRepository, UserRepositoryError};
