//! Shared fixtures for domain unit tests.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Local, Utc};
use mockable::Clock;

use crate::domain::{
    AccessToken, AvailabilityWindow, Email, ParcelAmenities, ParcelId, ParcelListing,
    ParcelTitle, Parcel, PricePerDay, RefreshToken, SessionHandle, UserId, UserIdentity,
    UserMetadata, ValidatedParcel,
};

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Clock that moves one second forward every time it is read.
pub(crate) struct SteppingClock(Mutex<DateTime<Utc>>);

impl SteppingClock {
    pub(crate) fn starting_at(start: DateTime<Utc>) -> Self {
        Self(Mutex::new(start))
    }
}

impl Clock for SteppingClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        let mut now = match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        };
        let current = *now;
        *now += Duration::seconds(1);
        current
    }
}

pub(crate) fn sample_identity() -> UserIdentity {
    UserIdentity::new(
        UserId::new("3fa85f64-5717-4562-b3fc-2c963f66afa6").expect("fixture id"),
        Some(Email::new("ada@example.com").expect("fixture email")),
        UserMetadata {
            full_name: Some("Ada Lovelace".into()),
            is_landlord: true,
            account_type: None,
        },
    )
}

/// Unexpired handle plus the identity the provider resolves it to.
pub(crate) fn valid_handle() -> (SessionHandle, UserIdentity) {
    let handle = SessionHandle::new(
        AccessToken::new("access-token").expect("token"),
        RefreshToken::new("refresh-token"),
        Utc::now() + Duration::hours(1),
    );
    (handle, sample_identity())
}

pub(crate) fn expired_handle() -> SessionHandle {
    SessionHandle::new(
        AccessToken::new("stale-token").expect("token"),
        None,
        Utc::now() - Duration::minutes(1),
    )
}

pub(crate) fn sample_fields(title: &str, price: f64) -> ValidatedParcel {
    ValidatedParcel {
        title: ParcelTitle::new(title).expect("fixture title"),
        description: None,
        location: None,
        latitude: None,
        longitude: None,
        price_per_day: PricePerDay::new(price).expect("fixture price"),
        availability: AvailabilityWindow::default(),
        max_capacity: None,
        amenities: ParcelAmenities::default(),
    }
}

pub(crate) fn sample_listing(title: &str, price: f64) -> ParcelListing {
    ParcelListing {
        parcel: Parcel {
            id: ParcelId::random(),
            owner_id: sample_identity().id().clone(),
            fields: sample_fields(title, price),
            featured_image_id: None,
            created_at: Utc::now(),
        },
        featured_image: None,
    }
}
