//! Port abstraction for the application-level user table.
use async_trait::async_trait;

use crate::domain::{UserId, UserRecord};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserRepositoryError {
        /// No row exists for the requested id.
        NotFound => "user record not found",
        /// A row with the same id already exists.
        Conflict => "user record already exists",
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch a user record by identifier.
    ///
    /// A missing row is reported as [`UserRepositoryError::NotFound`], kept
    /// distinct from every other lookup failure.
    async fn find_by_id(&self, id: &UserId) -> Result<UserRecord, UserRepositoryError>;

    /// Insert a new user record and return the stored row.
    ///
    /// A duplicate id is reported as [`UserRepositoryError::Conflict`].
    async fn insert(&self, record: &UserRecord) -> Result<UserRecord, UserRepositoryError>;
}
