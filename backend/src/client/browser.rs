//! Parcel browsing view state.
//!
//! Every filter, sort or page change starts a fetch under a fresh ticket from
//! the [`RequestSequencer`]. A response is applied only if no newer fetch has
//! started since, so a slow answer can never overwrite a newer one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{SortDirection, SortField};
use crate::inbound::http::parcels::{ListParcelsQuery, ParcelListResponse, ParcelResponse};

use super::api::{ClientError, MarketplaceClient};
use super::sequencer::RequestSequencer;

/// Anything that can answer a listing query.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParcelSource: Send + Sync {
    async fn fetch(&self, query: &ListParcelsQuery) -> Result<ParcelListResponse, ClientError>;
}

#[async_trait]
impl ParcelSource for MarketplaceClient {
    async fn fetch(&self, query: &ListParcelsQuery) -> Result<ParcelListResponse, ClientError> {
        self.list_parcels(query).await
    }
}

/// What the view renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowserSnapshot {
    pub query: ListParcelsQuery,
    pub items: Vec<ParcelResponse>,
    pub total_count: u64,
    pub total_pages: u64,
    pub loading: bool,
    /// Generic message shown instead of partial results.
    pub error: Option<String>,
}

/// Whether a finished fetch changed the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer fetch started first; the response was dropped.
    Stale,
}

/// Filter, sort and page state over a [`ParcelSource`].
pub struct ParcelBrowser<S: ?Sized> {
    source: Arc<S>,
    sequencer: RequestSequencer,
    state: Mutex<BrowserSnapshot>,
}

impl<S: ParcelSource + ?Sized> ParcelBrowser<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            sequencer: RequestSequencer::default(),
            state: Mutex::new(BrowserSnapshot::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, BrowserSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> BrowserSnapshot {
        self.state().clone()
    }

    /// Change the price ceiling and go back to the first page.
    pub async fn set_max_price(&self, max_price: Option<f64>) -> RefreshOutcome {
        self.update(|query| {
            query.max_price = max_price;
            query.page = None;
        })
        .await
    }

    /// Change the capacity floor and go back to the first page.
    pub async fn set_min_capacity(&self, min_capacity: Option<u32>) -> RefreshOutcome {
        self.update(|query| {
            query.min_capacity = min_capacity;
            query.page = None;
        })
        .await
    }

    pub async fn set_sort(&self, field: SortField, direction: SortDirection) -> RefreshOutcome {
        self.update(|query| {
            query.sort_by = Some(field.as_str().to_owned());
            query.sort_direction = Some(direction.as_str().to_owned());
        })
        .await
    }

    pub async fn set_page(&self, page: u32) -> RefreshOutcome {
        self.update(|query| query.page = Some(page)).await
    }

    /// Re-run the current query.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.update(|_| {}).await
    }

    async fn update(&self, change: impl FnOnce(&mut ListParcelsQuery)) -> RefreshOutcome {
        let (ticket, query) = {
            let mut state = self.state();
            change(&mut state.query);
            state.loading = true;
            (self.sequencer.issue(), state.query.clone())
        };
        let result = self.source.fetch(&query).await;

        let mut state = self.state();
        if !self.sequencer.is_current(ticket) {
            debug!(?ticket, "dropping stale listing response");
            return RefreshOutcome::Stale;
        }
        state.loading = false;
        match result {
            Ok(page) => {
                state.items = page.items;
                state.total_count = page.total_count;
                state.total_pages = page.total_pages;
                state.error = None;
            }
            Err(err) => {
                debug!(error = %err, "listing fetch failed");
                state.items.clear();
                state.total_count = 0;
                state.total_pages = 0;
                state.error = Some("Parcels could not be loaded. Please try again.".to_owned());
            }
        }
        RefreshOutcome::Applied
    }
}
