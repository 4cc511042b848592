//! Parcel rental marketplace backend.
//!
//! Landlords publish parcels of land with a featured image; visitors browse
//! them with filters, sorting and pagination. Identity, rows and images live
//! in a hosted backend reached through the ports in [`domain::ports`].

pub mod client;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
