//! Relational store stand-in holding users, parcels and images.
//!
//! One value implements all three repository ports so the featured-image
//! join and the parcel/image link behave as they do against the hosted store.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use mockable::Clock;
use pagination::Page;

use super::POISONED;
use crate::domain::ports::{
    ImageRepository, ImageRepositoryError, ParcelRepository, ParcelRepositoryError,
    UserRepository, UserRepositoryError,
};
use crate::domain::{
    FeaturedImage, Image, ImageId, NewImage, NewParcel, Parcel, ParcelId, ParcelListQuery,
    ParcelListing, ParcelSort, ParcelSummary, SortDirection, SortField, UserId, UserRecord,
};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, UserRecord>,
    parcels: Vec<Parcel>,
    images: HashMap<ImageId, Image>,
}

/// In-memory users, parcels and images tables.
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tables: Mutex::new(Tables::default()),
        }
    }

    fn tables(&self) -> Option<MutexGuard<'_, Tables>> {
        self.tables.lock().ok()
    }

    /// Number of stored user rows.
    pub fn user_count(&self) -> usize {
        self.tables().map(|tables| tables.users.len()).unwrap_or(0)
    }

    /// Number of stored parcels.
    pub fn parcel_count(&self) -> usize {
        self.tables().map(|tables| tables.parcels.len()).unwrap_or(0)
    }

    /// Number of stored images.
    pub fn image_count(&self) -> usize {
        self.tables().map(|tables| tables.images.len()).unwrap_or(0)
    }

    /// Snapshot of a stored parcel.
    pub fn parcel(&self, id: &ParcelId) -> Option<Parcel> {
        self.tables()?
            .parcels
            .iter()
            .find(|parcel| parcel.id == *id)
            .cloned()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: &UserId) -> Result<UserRecord, UserRepositoryError> {
        let tables = self
            .tables()
            .ok_or_else(|| UserRepositoryError::connection(POISONED))?;
        tables
            .users
            .get(id)
            .cloned()
            .ok_or_else(UserRepositoryError::not_found)
    }

    async fn insert(&self, record: &UserRecord) -> Result<UserRecord, UserRepositoryError> {
        let mut tables = self
            .tables()
            .ok_or_else(|| UserRepositoryError::connection(POISONED))?;
        if tables.users.contains_key(record.id()) {
            return Err(UserRepositoryError::conflict());
        }
        tables.users.insert(record.id().clone(), record.clone());
        Ok(record.clone())
    }
}

#[async_trait]
impl ParcelRepository for MemoryStore {
    async fn insert(&self, parcel: &NewParcel) -> Result<Parcel, ParcelRepositoryError> {
        let created_at = self.clock.utc();
        let mut tables = self
            .tables()
            .ok_or_else(|| ParcelRepositoryError::connection(POISONED))?;
        if !tables.users.contains_key(&parcel.owner_id) {
            return Err(ParcelRepositoryError::query(format!(
                "owner {} has no user record",
                parcel.owner_id
            )));
        }
        let stored = Parcel {
            id: ParcelId::random(),
            owner_id: parcel.owner_id.clone(),
            fields: parcel.fields.clone(),
            featured_image_id: None,
            created_at,
        };
        tables.parcels.push(stored.clone());
        Ok(stored)
    }

    async fn set_featured_image(
        &self,
        parcel_id: &ParcelId,
        image_id: &ImageId,
    ) -> Result<(), ParcelRepositoryError> {
        let mut tables = self
            .tables()
            .ok_or_else(|| ParcelRepositoryError::connection(POISONED))?;
        if !tables.images.contains_key(image_id) {
            return Err(ParcelRepositoryError::query(format!(
                "image {image_id} does not exist"
            )));
        }
        let parcel = tables
            .parcels
            .iter_mut()
            .find(|parcel| parcel.id == *parcel_id)
            .ok_or_else(|| ParcelRepositoryError::not_found(parcel_id.to_string()))?;
        parcel.featured_image_id = Some(*image_id);
        Ok(())
    }

    async fn list(
        &self,
        query: &ParcelListQuery,
    ) -> Result<Page<ParcelListing>, ParcelRepositoryError> {
        let tables = self
            .tables()
            .ok_or_else(|| ParcelRepositoryError::connection(POISONED))?;
        let mut matching: Vec<&Parcel> = tables
            .parcels
            .iter()
            .filter(|parcel| {
                query.filters.matches(
                    parcel.fields.price_per_day.value(),
                    parcel.fields.max_capacity.map(|capacity| capacity.value()),
                )
            })
            .collect();
        matching.sort_by(|a, b| compare(a, b, query.sort));

        let total_count = matching.len() as u64;
        let window = query.page.window();
        let offset = usize::try_from(window.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(window.limit() as usize)
            .map(|parcel| ParcelListing {
                featured_image: parcel
                    .featured_image_id
                    .and_then(|id| tables.images.get(&id))
                    .map(FeaturedImage::from),
                parcel: parcel.clone(),
            })
            .collect();
        Ok(Page::new(items, total_count, query.page))
    }

    async fn list_by_owner(
        &self,
        owner: &UserId,
    ) -> Result<Vec<ParcelSummary>, ParcelRepositoryError> {
        let tables = self
            .tables()
            .ok_or_else(|| ParcelRepositoryError::connection(POISONED))?;
        let mut owned: Vec<&Parcel> = tables
            .parcels
            .iter()
            .filter(|parcel| parcel.owner_id == *owner)
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned
            .into_iter()
            .map(|parcel| ParcelSummary {
                id: parcel.id,
                title: parcel.fields.title.as_ref().to_owned(),
            })
            .collect())
    }
}

/// Order two parcels by the requested column, nulls last in both directions.
fn compare(a: &Parcel, b: &Parcel, sort: ParcelSort) -> Ordering {
    let ordering = match sort.field {
        SortField::PricePerDay => a
            .fields
            .price_per_day
            .value()
            .total_cmp(&b.fields.price_per_day.value()),
        SortField::MaxCapacity => match (a.fields.max_capacity, b.fields.max_capacity) {
            (Some(left), Some(right)) => left.value().cmp(&right.value()),
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    };
    match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl ImageRepository for MemoryStore {
    async fn insert(&self, image: &NewImage) -> Result<Image, ImageRepositoryError> {
        let created_at = self.clock.utc();
        let mut tables = self
            .tables()
            .ok_or_else(|| ImageRepositoryError::connection(POISONED))?;
        if !tables.parcels.iter().any(|parcel| parcel.id == image.parcel_id) {
            return Err(ImageRepositoryError::query(format!(
                "parcel {} does not exist",
                image.parcel_id
            )));
        }
        let stored = Image {
            id: ImageId::random(),
            parcel_id: Some(image.parcel_id),
            url: image.url.clone(),
            caption: image.caption.clone(),
            display_order: image.display_order,
            created_at,
        };
        tables.images.insert(stored.id, stored.clone());
        Ok(stored)
    }
}
