//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and only ever talk to the
//! driving ports, so they can be exercised without any network I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{
    AccountService, AuthProvider, ImageRepository, ObjectStorage, ParcelRepository,
    ParcelSubmission, ParcelsQuery, UserProvisioning, UserRepository,
};
use crate::domain::{
    AccountManager, IdentityGate, ParcelListingService, ParcelSubmissionService,
    SubmissionPorts, UserProvisioningService,
};

/// Path of the inbound auth redirect endpoint.
pub const AUTH_CALLBACK_PATH: &str = "/auth/callback";

/// Parameter object bundling the driving ports used by handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub accounts: Arc<dyn AccountService>,
    pub provisioning: Arc<dyn UserProvisioning>,
    pub submission: Arc<dyn ParcelSubmission>,
    pub parcels: Arc<dyn ParcelsQuery>,
}

/// Driven adapters the domain services are built on.
#[derive(Clone)]
pub struct DrivenPorts {
    pub auth: Arc<dyn AuthProvider>,
    pub users: Arc<dyn UserRepository>,
    pub parcels: Arc<dyn ParcelRepository>,
    pub images: Arc<dyn ImageRepository>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl HttpStatePorts {
    /// Build every domain service over one set of driven adapters.
    pub fn assemble(driven: DrivenPorts, clock: Arc<dyn Clock>, max_image_bytes: usize) -> Self {
        let DrivenPorts {
            auth,
            users,
            parcels,
            images,
            storage,
        } = driven;
        let gate = IdentityGate::new(auth.clone(), clock.clone());
        let provisioning: Arc<dyn UserProvisioning> =
            Arc::new(UserProvisioningService::new(gate.clone(), users));
        let submission = ParcelSubmissionService::new(
            gate.clone(),
            provisioning.clone(),
            SubmissionPorts {
                parcels: parcels.clone(),
                images,
                storage,
            },
            clock,
        )
        .with_max_image_bytes(max_image_bytes);
        Self {
            accounts: Arc::new(AccountManager::new(auth, gate.clone())),
            provisioning,
            submission: Arc::new(submission),
            parcels: Arc::new(ParcelListingService::new(gate, parcels)),
        }
    }
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<dyn AccountService>,
    pub provisioning: Arc<dyn UserProvisioning>,
    pub submission: Arc<dyn ParcelSubmission>,
    pub parcels: Arc<dyn ParcelsQuery>,
    public_base_url: Option<String>,
}

impl HttpState {
    /// Build state from the port bundle with no public base URL.
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            accounts,
            provisioning,
            submission,
            parcels,
        } = ports;
        Self {
            accounts,
            provisioning,
            submission,
            parcels,
            public_base_url: None,
        }
    }

    /// Set the externally visible origin used to build confirmation links.
    ///
    /// Trailing slashes are dropped; blank values clear the setting.
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        let trimmed = url.trim().trim_end_matches('/');
        self.public_base_url = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self
    }

    /// Absolute URL of the auth callback, when a public origin is known.
    ///
    /// # Examples
    /// ```
    /// # use parcel_market::inbound::http::state::HttpState;
    /// # fn demo(state: HttpState) {
    /// let state = state.with_public_base_url("https://terrains.example/");
    /// assert_eq!(
    ///     state.auth_callback_url().as_deref(),
    ///     Some("https://terrains.example/auth/callback")
    /// );
    /// # }
    /// ```
    pub fn auth_callback_url(&self) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{base}{AUTH_CALLBACK_PATH}"))
    }
}
