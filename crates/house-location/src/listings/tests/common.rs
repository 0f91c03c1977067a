use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::config::ListingConfig;
use crate::listings::domain::{
    NewOffer, NewProperty, Offer, PartnerId, Property, PropertyId, UserId,
};
use crate::listings::memory::InMemoryListingStore;
use crate::listings::{listing_router, BestPricePolicy, ListingService};

pub(super) const AGENT: UserId = UserId(42);

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid date")
}

pub(super) fn build_service() -> (
    ListingService<InMemoryListingStore>,
    Arc<InMemoryListingStore>,
) {
    build_service_with(ListingConfig::default())
}

pub(super) fn build_service_with(
    config: ListingConfig,
) -> (
    ListingService<InMemoryListingStore>,
    Arc<InMemoryListingStore>,
) {
    let store = Arc::new(InMemoryListingStore::default());
    let service = ListingService::new(store.clone(), config);
    (service, store)
}

pub(super) fn resetting_config() -> ListingConfig {
    ListingConfig {
        best_price_policy: BestPricePolicy::Reset,
        ..ListingConfig::default()
    }
}

pub(super) fn canal_house() -> NewProperty {
    NewProperty {
        description: Some("Three storeys overlooking the canal".to_string()),
        postcode: Some("1015".to_string()),
        bedrooms: 3,
        living_area: 120,
        facades: 2,
        ..NewProperty::new("Canal house", 200_000.0)
    }
}

pub(super) fn create_listing(
    service: &ListingService<InMemoryListingStore>,
    draft: NewProperty,
) -> Property {
    service
        .create_property(draft, AGENT, today())
        .expect("listing created")
}

pub(super) fn create_offer(
    service: &ListingService<InMemoryListingStore>,
    property: PropertyId,
    partner: u64,
    price: f64,
) -> Offer {
    service
        .create_offer(
            NewOffer::new(property, PartnerId(partner), price).with_validity(7),
            today(),
        )
        .expect("offer created")
}

pub(super) fn reload(
    service: &ListingService<InMemoryListingStore>,
    id: PropertyId,
) -> Property {
    service.get_property(id).expect("property present").property
}

pub(super) fn router_with_service(
    service: ListingService<InMemoryListingStore>,
) -> axum::Router {
    listing_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
