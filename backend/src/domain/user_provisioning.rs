//! Lazy creation of the application-level user record.
//!
//! Create-if-absent: a distinct not-found signal triggers one insert; any
//! other lookup failure and any insert failure are fatal. An insert that loses
//! a race with a concurrent first visit reads back the winner's row. Existing
//! records are never updated.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::domain::identity_gate::IdentityGate;
use crate::domain::marketplace_error::MarketplaceError;
use crate::domain::ports::{UserProvisioning, UserRepository, UserRepositoryError};
use crate::domain::{SessionHandle, UserIdentity, UserRecord};

/// Provisioning service implementing [`UserProvisioning`].
#[derive(Clone)]
pub struct UserProvisioningService {
    gate: IdentityGate,
    users: Arc<dyn UserRepository>,
}

impl UserProvisioningService {
    pub fn new(gate: IdentityGate, users: Arc<dyn UserRepository>) -> Self {
        Self { gate, users }
    }

    fn failed(stage: &str, err: UserRepositoryError) -> MarketplaceError {
        error!(error = %err, stage, "user provisioning failed");
        MarketplaceError::account_provisioning_failed(err.to_string())
    }
}

#[async_trait]
impl UserProvisioning for UserProvisioningService {
    async fn ensure_user_record(
        &self,
        identity: &UserIdentity,
    ) -> Result<UserRecord, MarketplaceError> {
        match self.users.find_by_id(identity.id()).await {
            Ok(record) => {
                debug!(user_id = %record.id(), "user record present");
                Ok(record)
            }
            Err(UserRepositoryError::NotFound) => {
                match self.users.insert(&UserRecord::for_identity(identity)).await {
                    Ok(record) => {
                        info!(user_id = %record.id(), "user record created");
                        Ok(record)
                    }
                    Err(UserRepositoryError::Conflict) => {
                        debug!(user_id = %identity.id(), "user record created concurrently");
                        self.users
                            .find_by_id(identity.id())
                            .await
                            .map_err(|err| Self::failed("reread", err))
                    }
                    Err(err) => Err(Self::failed("insert", err)),
                }
            }
            Err(err) => Err(Self::failed("lookup", err)),
        }
    }

    async fn ensure_current_user(
        &self,
        session: Option<&SessionHandle>,
    ) -> Result<UserRecord, MarketplaceError> {
        let identity = self.gate.require_identity(session).await?;
        self.ensure_user_record(&identity).await
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for create-if-absent semantics.
    use super::*;
    use crate::domain::ports::{MockAuthProvider, MockUserRepository};
    use crate::domain::test_support::{FixedClock, sample_identity};
    use chrono::Utc;
    use rstest::rstest;
    use std::sync::Mutex;

    fn service(users: MockUserRepository) -> UserProvisioningService {
        let gate = IdentityGate::new(
            Arc::new(MockAuthProvider::new()),
            Arc::new(FixedClock(Utc::now())),
        );
        UserProvisioningService::new(gate, Arc::new(users))
    }

    /// Repository double that behaves like a real table for idempotence checks.
    #[derive(Default)]
    struct CountingRepository {
        rows: Mutex<Vec<UserRecord>>,
        inserts: Mutex<usize>,
    }

    #[async_trait]
    impl UserRepository for CountingRepository {
        async fn find_by_id(
            &self,
            id: &crate::domain::UserId,
        ) -> Result<UserRecord, UserRepositoryError> {
            let rows = self.rows.lock().expect("rows lock");
            rows.iter()
                .find(|row| row.id() == id)
                .cloned()
                .ok_or(UserRepositoryError::NotFound)
        }

        async fn insert(&self, record: &UserRecord) -> Result<UserRecord, UserRepositoryError> {
            *self.inserts.lock().expect("inserts lock") += 1;
            self.rows.lock().expect("rows lock").push(record.clone());
            Ok(record.clone())
        }
    }

    #[rstest]
    #[tokio::test]
    async fn second_call_is_a_no_op_with_one_insert() {
        let repo = Arc::new(CountingRepository::default());
        let gate = IdentityGate::new(
            Arc::new(MockAuthProvider::new()),
            Arc::new(FixedClock(Utc::now())),
        );
        let service = UserProvisioningService::new(gate, repo.clone());
        let identity = sample_identity();

        let first = service.ensure_user_record(&identity).await.expect("first");
        let second = service.ensure_user_record(&identity).await.expect("second");

        assert_eq!(first, second);
        assert_eq!(first.email(), identity.email());
        assert_eq!(*repo.inserts.lock().expect("inserts lock"), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn existing_record_is_returned_unchanged() {
        let identity = sample_identity();
        let stored = UserRecord::new(identity.id().clone(), None);
        let returned = stored.clone();
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .times(1)
            .return_once(move |_| Ok(returned));
        users.expect_insert().never();

        let record = service(users)
            .ensure_user_record(&identity)
            .await
            .expect("record");
        assert_eq!(record, stored);
    }

    #[rstest]
    #[case(UserRepositoryError::connection("refused"))]
    #[case(UserRepositoryError::query("permission denied"))]
    #[tokio::test]
    async fn lookup_failures_other_than_not_found_are_fatal(#[case] failure: UserRepositoryError) {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .times(1)
            .return_once(move |_| Err(failure));
        users.expect_insert().never();

        let err = service(users)
            .ensure_user_record(&sample_identity())
            .await
            .expect_err("lookup failure");
        assert!(matches!(err, MarketplaceError::AccountProvisioningFailed { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn insert_failure_is_fatal() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .times(1)
            .return_once(|_| Err(UserRepositoryError::NotFound));
        users
            .expect_insert()
            .times(1)
            .return_once(|_| Err(UserRepositoryError::query("duplicate key")));

        let err = service(users)
            .ensure_user_record(&sample_identity())
            .await
            .expect_err("insert failure");
        assert_eq!(
            err,
            MarketplaceError::account_provisioning_failed(
                "user repository query failed: duplicate key"
            )
        );
    }

    #[rstest]
    #[tokio::test]
    async fn losing_a_concurrent_insert_returns_the_stored_row() {
        let identity = sample_identity();
        let stored = UserRecord::for_identity(&identity);
        let reread = stored.clone();
        let mut users = MockUserRepository::new();
        let mut seq = mockall::Sequence::new();
        users
            .expect_find_by_id()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_| Err(UserRepositoryError::NotFound));
        users
            .expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_| Err(UserRepositoryError::Conflict));
        users
            .expect_find_by_id()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(move |_| Ok(reread));

        let record = service(users)
            .ensure_user_record(&identity)
            .await
            .expect("record");
        assert_eq!(record, stored);
    }

    #[rstest]
    #[tokio::test]
    async fn concurrent_first_visits_both_succeed_with_one_row() {
        let store = Arc::new(crate::outbound::memory::MemoryStore::new(Arc::new(
            FixedClock(Utc::now()),
        )));
        let gate = IdentityGate::new(
            Arc::new(MockAuthProvider::new()),
            Arc::new(FixedClock(Utc::now())),
        );
        let racing = Arc::new(RacingRepository {
            inner: store.clone(),
            lookups: tokio::sync::Barrier::new(2),
        });
        let service = UserProvisioningService::new(gate, racing);
        let identity = sample_identity();

        let (first, second) = tokio::join!(
            service.ensure_user_record(&identity),
            service.ensure_user_record(&identity)
        );

        assert_eq!(first.expect("first"), second.expect("second"));
        assert_eq!(store.user_count(), 1);
    }

    /// Holds both first lookups until each has seen the table empty.
    struct RacingRepository {
        inner: Arc<crate::outbound::memory::MemoryStore>,
        lookups: tokio::sync::Barrier,
    }

    #[async_trait]
    impl UserRepository for RacingRepository {
        async fn find_by_id(
            &self,
            id: &crate::domain::UserId,
        ) -> Result<UserRecord, UserRepositoryError> {
            let found = UserRepository::find_by_id(self.inner.as_ref(), id).await;
            if found.is_err() {
                self.lookups.wait().await;
            }
            found
        }

        async fn insert(&self, record: &UserRecord) -> Result<UserRecord, UserRepositoryError> {
            UserRepository::insert(self.inner.as_ref(), record).await
        }
    }

    #[rstest]
    #[tokio::test]
    async fn current_user_requires_a_session() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().never();

        let err = service(users)
            .ensure_current_user(None)
            .await
            .expect_err("no session");
        assert_eq!(err, MarketplaceError::Unauthenticated);
    }
}
