//! Driving port for lazily provisioning application user records.

use async_trait::async_trait;

use crate::domain::{MarketplaceError, SessionHandle, UserIdentity, UserRecord};

#[async_trait]
pub trait UserProvisioning: Send + Sync {
    /// Return the record for `identity`, creating it on first use.
    async fn ensure_user_record(
        &self,
        identity: &UserIdentity,
    ) -> Result<UserRecord, MarketplaceError>;

    /// Resolve the caller behind `session`, then ensure their record.
    async fn ensure_current_user(
        &self,
        session: Option<&SessionHandle>,
    ) -> Result<UserRecord, MarketplaceError>;
}
