//! Listing browser against a live server.
//!
//! Seeds parcels through the HTTP API, then drives `ParcelBrowser` over the
//! real client to check filtering, sorting and paging end to end.

// The shared world carries step-recording fields this suite does not read.
#[allow(dead_code)]
#[path = "support/marketplace.rs"]
mod marketplace;

use std::sync::Arc;

use marketplace::{WorldFixture, with_client, world};
use parcel_market::client::{MarketplaceClient, ParcelBrowser, RefreshOutcome};
use parcel_market::domain::{SortDirection, SortField};
use parcel_market::inbound::http::auth::SignUpPayload;
use parcel_market::inbound::http::parcels::{ParcelPayload, RawField};
use rstest::rstest;

fn parcel(title: &str, price: f64, capacity: f64) -> ParcelPayload {
    ParcelPayload {
        title: Some(RawField::Text(title.into())),
        price_per_day: Some(RawField::Number(price)),
        max_capacity: Some(RawField::Number(capacity)),
        ..ParcelPayload::default()
    }
}

async fn seed(client: Arc<MarketplaceClient>) {
    client
        .sign_up(&SignUpPayload {
            email: "louise@example.com".into(),
            password: "meadow-gate".into(),
            full_name: Some("Louise".into()),
            is_landlord: true,
            account_type: None,
        })
        .await
        .expect("sign-up");
    for payload in [
        parcel("Meadow", 12.0, 4.0),
        parcel("Riverside", 35.0, 10.0),
        parcel("Orchard", 20.0, 8.0),
        parcel("Hilltop", 18.0, 2.0),
    ] {
        let response = client.submit_parcel(&payload).await.expect("submission");
        assert!(response.success);
    }
    client.logout().await.expect("sign-out");
}

#[rstest]
fn browser_filters_and_sorts_over_http(world: WorldFixture) {
    let shared = world.world();
    with_client(&shared, |client, _| seed(client));

    let snapshot = with_client(&shared, |client, _| async move {
        let browser = ParcelBrowser::new(client);
        assert_eq!(browser.set_max_price(Some(25.0)).await, RefreshOutcome::Applied);
        assert_eq!(browser.set_min_capacity(Some(3)).await, RefreshOutcome::Applied);
        browser
            .set_sort(SortField::PricePerDay, SortDirection::Asc)
            .await;
        browser.snapshot()
    });

    assert!(snapshot.error.is_none());
    assert!(!snapshot.loading);
    assert_eq!(snapshot.total_count, 2);
    let titles: Vec<_> = snapshot.items.iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles, vec!["Meadow", "Orchard"]);
}

#[rstest]
fn paging_past_the_end_is_empty_not_an_error(world: WorldFixture) {
    let shared = world.world();
    with_client(&shared, |client, _| seed(client));

    let snapshot = with_client(&shared, |client, _| async move {
        let browser = ParcelBrowser::new(client);
        browser.set_page(5).await;
        browser.snapshot()
    });

    assert!(snapshot.error.is_none());
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.total_count, 4);
    assert_eq!(snapshot.total_pages, 1);
}
