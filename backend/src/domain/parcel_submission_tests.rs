//! Tests for the parcel submission workflow.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    ImageRepositoryError, MockAuthProvider, MockImageRepository, MockObjectStorage,
    MockParcelRepository, MockUserRepository, ObjectStorageError, ParcelRepositoryError,
    UserRepositoryError,
};
use crate::domain::test_support::{FixedClock, sample_identity, valid_handle};
use crate::domain::user_provisioning::UserProvisioningService;
use crate::domain::{Image, ImageId, ParcelDraft, ParcelId, UserRecord};

const PUBLIC_BASE: &str = "https://store.example/storage/v1/object/public/images";

struct Doubles {
    auth: MockAuthProvider,
    users: MockUserRepository,
    parcels: MockParcelRepository,
    images: MockImageRepository,
    storage: MockObjectStorage,
}

impl Doubles {
    /// Doubles that fail the test if any collaborator is contacted.
    fn untouched() -> Self {
        let mut auth = MockAuthProvider::new();
        auth.expect_get_user().never();
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().never();
        users.expect_insert().never();
        let mut parcels = MockParcelRepository::new();
        parcels.expect_insert().never();
        parcels.expect_set_featured_image().never();
        let mut images = MockImageRepository::new();
        images.expect_insert().never();
        let mut storage = MockObjectStorage::new();
        storage.expect_upload().never();
        Self {
            auth,
            users,
            parcels,
            images,
            storage,
        }
    }

    /// Identity resolves and the user record already exists.
    fn signed_in() -> Self {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .times(1)
            .return_once(|id| Ok(UserRecord::new(id.clone(), None)));
        Self::signed_in_with(users)
    }

    /// Identity resolves; user lookups are left to `users`.
    fn signed_in_with(users: MockUserRepository) -> Self {
        let mut auth = MockAuthProvider::new();
        auth.expect_get_user()
            .times(1)
            .return_once(|_| Ok(Some(sample_identity())));
        let mut storage = MockObjectStorage::new();
        storage
            .expect_public_url()
            .returning(|path| format!("{PUBLIC_BASE}/{path}"));
        Self {
            auth,
            users,
            parcels: MockParcelRepository::new(),
            images: MockImageRepository::new(),
            storage,
        }
    }

    fn expect_parcel_insert(&mut self) {
        self.parcels.expect_insert().times(1).returning(|new_parcel| {
            Ok(Parcel {
                id: ParcelId::random(),
                owner_id: new_parcel.owner_id.clone(),
                fields: new_parcel.fields.clone(),
                featured_image_id: None,
                created_at: Utc::now(),
            })
        });
    }

    fn expect_upload(&mut self) {
        self.storage
            .expect_upload()
            .times(1)
            .returning(|key, _, _| Ok(key.as_ref().to_owned()));
    }

    fn into_service(self) -> ParcelSubmissionService {
        let clock = Arc::new(FixedClock(
            Utc.timestamp_millis_opt(1_700_000_000_000)
                .single()
                .expect("timestamp"),
        ));
        let gate = IdentityGate::new(Arc::new(self.auth), clock.clone());
        let provisioning = Arc::new(UserProvisioningService::new(
            gate.clone(),
            Arc::new(self.users),
        ));
        ParcelSubmissionService::new(
            gate,
            provisioning,
            SubmissionPorts {
                parcels: Arc::new(self.parcels),
                images: Arc::new(self.images),
                storage: Arc::new(self.storage),
            },
            clock,
        )
        .with_max_image_bytes(1024)
    }
}

#[fixture]
fn draft() -> ParcelDraft {
    ParcelDraft {
        title: "Champ Nord".into(),
        description: "...".into(),
        location: "Loire".into(),
        latitude: "48.5".into(),
        longitude: "2.1".into(),
        price_per_day: "25".into(),
        ..ParcelDraft::default()
    }
}

fn photo() -> ImageFile {
    ImageFile {
        file_name: "champ nord.jpg".into(),
        content_type: "image/jpeg".into(),
        bytes: vec![0xFF, 0xD8, 0xFF],
    }
}

async fn submit(
    service: &ParcelSubmissionService,
    draft: ParcelDraft,
    image: Option<ImageFile>,
) -> Result<ParcelSubmitted, MarketplaceError> {
    let (handle, _) = valid_handle();
    service
        .submit(Some(&handle), SubmitParcelRequest { draft, image })
        .await
}

#[rstest]
#[case("91")]
#[case("-90.01")]
#[case("abc")]
#[tokio::test]
async fn latitude_out_of_range_performs_no_writes(mut draft: ParcelDraft, #[case] raw: &str) {
    draft.latitude = raw.into();
    let service = Doubles::untouched().into_service();

    let err = submit(&service, draft, Some(photo())).await.expect_err("invalid");
    let MarketplaceError::Validation(validation) = err else {
        panic!("expected a validation error");
    };
    assert_eq!(validation.field, ParcelField::Latitude);
    assert_eq!(validation.value.as_deref(), Some(raw));
}

#[rstest]
#[case("180.5")]
#[case("-200")]
#[tokio::test]
async fn longitude_out_of_range_performs_no_writes(mut draft: ParcelDraft, #[case] raw: &str) {
    draft.longitude = raw.into();
    let service = Doubles::untouched().into_service();

    let err = submit(&service, draft, None).await.expect_err("invalid");
    assert!(matches!(
        err,
        MarketplaceError::Validation(ValidationError {
            field: ParcelField::Longitude,
            ..
        })
    ));
}

#[rstest]
#[case("")]
#[case("   ")]
#[tokio::test]
async fn blank_title_fails_before_any_network_call(mut draft: ParcelDraft, #[case] title: &str) {
    draft.title = title.into();
    let service = Doubles::untouched().into_service();

    let err = submit(&service, draft, None).await.expect_err("invalid");
    assert!(matches!(
        err,
        MarketplaceError::Validation(ValidationError {
            field: ParcelField::Title,
            reason: ValidationReason::Required,
            ..
        })
    ));
}

#[rstest]
#[tokio::test]
async fn missing_session_is_unauthenticated(draft: ParcelDraft) {
    let service = Doubles::untouched().into_service();
    let err = service
        .submit(None, SubmitParcelRequest { draft, image: None })
        .await
        .expect_err("no session");
    assert_eq!(err, MarketplaceError::Unauthenticated);
}

#[rstest]
#[tokio::test]
async fn non_image_upload_is_rejected_before_upload(draft: ParcelDraft) {
    let service = Doubles::untouched().into_service();
    let file = ImageFile {
        content_type: "application/pdf".into(),
        ..photo()
    };

    let err = submit(&service, draft, Some(file)).await.expect_err("invalid");
    assert!(matches!(
        err,
        MarketplaceError::Validation(ValidationError {
            field: ParcelField::Image,
            ..
        })
    ));
}

#[rstest]
#[tokio::test]
async fn provisioning_failure_stops_before_upload(draft: ParcelDraft) {
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .times(1)
        .return_once(|_| Err(UserRepositoryError::connection("refused")));
    let mut doubles = Doubles::signed_in_with(users);
    doubles.storage.expect_upload().never();
    doubles.parcels.expect_insert().never();

    let err = submit(&doubles.into_service(), draft, Some(photo()))
        .await
        .expect_err("provisioning");
    assert!(matches!(err, MarketplaceError::AccountProvisioningFailed { .. }));
}

#[rstest]
#[tokio::test]
async fn upload_failure_creates_no_parcel(draft: ParcelDraft) {
    let mut doubles = Doubles::signed_in();
    doubles
        .storage
        .expect_upload()
        .times(1)
        .return_once(|_, _, _| Err(ObjectStorageError::rejected("bucket full")));
    doubles.parcels.expect_insert().never();
    doubles.images.expect_insert().never();

    let err = submit(&doubles.into_service(), draft, Some(photo()))
        .await
        .expect_err("upload");
    assert_eq!(
        err,
        MarketplaceError::image_upload_failed("object storage rejected the upload: bucket full")
    );
}

#[rstest]
#[tokio::test]
async fn parcel_insert_failure_is_a_persistence_error(draft: ParcelDraft) {
    let mut doubles = Doubles::signed_in();
    doubles
        .parcels
        .expect_insert()
        .times(1)
        .return_once(|_| Err(ParcelRepositoryError::query("check constraint")));

    let err = submit(&doubles.into_service(), draft, None)
        .await
        .expect_err("insert");
    assert!(matches!(
        err,
        MarketplaceError::Persistence {
            entity: PersistedEntity::Parcel,
            ..
        }
    ));
}

#[rstest]
#[tokio::test]
async fn image_insert_failure_still_reports_success(draft: ParcelDraft) {
    let mut doubles = Doubles::signed_in();
    doubles.expect_upload();
    doubles.expect_parcel_insert();
    doubles
        .images
        .expect_insert()
        .times(1)
        .return_once(|_| Err(ImageRepositoryError::query("images offline")));
    doubles.parcels.expect_set_featured_image().never();

    let submitted = submit(&doubles.into_service(), draft, Some(photo()))
        .await
        .expect("parcel exists");
    assert!(submitted.image_url.is_some());
    assert!(submitted.link_warning.is_some());
}

#[rstest]
#[tokio::test]
async fn featured_image_update_failure_is_non_fatal(draft: ParcelDraft) {
    let mut doubles = Doubles::signed_in();
    doubles.expect_upload();
    doubles.expect_parcel_insert();
    doubles.images.expect_insert().times(1).returning(|new_image| {
        Ok(Image {
            id: ImageId::random(),
            parcel_id: Some(new_image.parcel_id),
            url: new_image.url.clone(),
            caption: new_image.caption.clone(),
            display_order: new_image.display_order,
            created_at: Utc::now(),
        })
    });
    doubles
        .parcels
        .expect_set_featured_image()
        .times(1)
        .return_once(|_, _| Err(ParcelRepositoryError::connection("reset")));

    let submitted = submit(&doubles.into_service(), draft, Some(photo()))
        .await
        .expect("parcel exists");
    assert!(
        submitted
            .link_warning
            .as_deref()
            .is_some_and(|warning| warning.contains("not set as featured"))
    );
}

#[rstest]
#[tokio::test]
async fn submission_without_image_leaves_featured_image_null(draft: ParcelDraft) {
    let mut doubles = Doubles::signed_in();
    doubles.storage.expect_upload().never();
    doubles
        .parcels
        .expect_insert()
        .withf(|new_parcel| {
            new_parcel.fields.title.as_ref() == "Champ Nord"
                && new_parcel.fields.location.as_deref() == Some("Loire")
                && new_parcel.owner_id == *sample_identity().id()
        })
        .times(1)
        .returning(|new_parcel| {
            Ok(Parcel {
                id: ParcelId::random(),
                owner_id: new_parcel.owner_id.clone(),
                fields: new_parcel.fields.clone(),
                featured_image_id: None,
                created_at: Utc::now(),
            })
        });
    doubles.images.expect_insert().never();
    doubles.parcels.expect_set_featured_image().never();

    let submitted = submit(&doubles.into_service(), draft, None)
        .await
        .expect("created");
    assert_eq!(submitted.image_url, None);
    assert_eq!(submitted.link_warning, None);
}

#[rstest]
#[tokio::test]
async fn submission_with_image_links_parcel_first(draft: ParcelDraft) {
    let mut doubles = Doubles::signed_in();
    doubles
        .storage
        .expect_upload()
        .withf(|key, content_type, bytes| {
            key.as_ref() == "1700000000000-champ_nord.jpg"
                && content_type == "image/jpeg"
                && bytes.len() == 3
        })
        .times(1)
        .returning(|key, _, _| Ok(key.as_ref().to_owned()));
    doubles.expect_parcel_insert();
    doubles
        .images
        .expect_insert()
        .withf(|new_image| {
            new_image.caption.as_deref() == Some("Champ Nord")
                && new_image.url == format!("{PUBLIC_BASE}/1700000000000-champ_nord.jpg")
        })
        .times(1)
        .returning(|new_image| {
            Ok(Image {
                id: ImageId::random(),
                parcel_id: Some(new_image.parcel_id),
                url: new_image.url.clone(),
                caption: new_image.caption.clone(),
                display_order: new_image.display_order,
                created_at: Utc::now(),
            })
        });
    doubles
        .parcels
        .expect_set_featured_image()
        .times(1)
        .returning(|_, _| Ok(()));

    let submitted = submit(&doubles.into_service(), draft, Some(photo()))
        .await
        .expect("created");
    assert_eq!(
        submitted.image_url.as_deref(),
        Some("https://store.example/storage/v1/object/public/images/1700000000000-champ_nord.jpg")
    );
    assert_eq!(submitted.link_warning, None);
}
