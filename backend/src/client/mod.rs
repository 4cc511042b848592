//! Typed client for the marketplace REST API and the view state built on it.
//!
//! - [`MarketplaceClient`]: reqwest wrapper over `/api/v1`, carrying the
//!   session cookie held by a [`SessionHolder`].
//! - [`SessionHolder`]: the single owner of the client's signed-in state;
//!   observers subscribe to changes instead of reading a global.
//! - [`RequestSequencer`]: monotonic tickets so only the newest response is
//!   applied.
//! - [`ParcelBrowser`]: filter, sort and page state for browsing listings.

mod api;
mod browser;
mod sequencer;
mod session;

pub use api::{ClientError, MarketplaceClient, SignUpOutcome};
pub use browser::{BrowserSnapshot, ParcelBrowser, ParcelSource, RefreshOutcome};
#[cfg(test)]
pub use browser::MockParcelSource;
pub use sequencer::{RequestSequencer, Ticket};
pub use session::{ClientSession, SessionHolder};
