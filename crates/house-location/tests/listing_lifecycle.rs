//! End-to-end listing scenarios driven through the public service facade and HTTP router.
//!
//! The offline and locked stores stand in for storage backends that refuse writes, so the error
//! mapping can be checked without touching the in-memory implementation.

mod common {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use house_location::config::ListingConfig;
    use house_location::listings::{
        InMemoryListingStore, ListingService, NewProperty, Property, Record, Repository,
        RepositoryError,
    };

    pub(super) fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid date")
    }

    pub(super) fn service() -> ListingService<InMemoryListingStore> {
        ListingService::new(
            Arc::new(InMemoryListingStore::default()),
            ListingConfig::default(),
        )
    }

    pub(super) fn canal_house() -> NewProperty {
        let mut draft = NewProperty::new("Canal house", 200_000.0);
        draft.bedrooms = 3;
        draft.living_area = 120;
        draft.facades = 2;
        draft
    }

    /// Reads succeed against an empty store; every write fails.
    pub(super) struct OfflineStore;

    fn offline() -> RepositoryError {
        RepositoryError::Unavailable("storage offline".to_string())
    }

    impl<R: Record> Repository<R> for OfflineStore {
        fn next_id(&self) -> Result<R::Id, RepositoryError> {
            Ok(R::Id::from(1))
        }

        fn find(&self, _id: R::Id) -> Result<Option<R>, RepositoryError> {
            Ok(None)
        }

        fn create(&self, _record: R) -> Result<R, RepositoryError> {
            Err(offline())
        }

        fn update(&self, _record: R) -> Result<(), RepositoryError> {
            Err(offline())
        }

        fn delete(&self, _id: R::Id) -> Result<(), RepositoryError> {
            Err(offline())
        }

        fn count_matching(&self, _predicate: &dyn Fn(&R) -> bool) -> Result<usize, RepositoryError> {
            Ok(0)
        }

        fn find_matching(
            &self,
            _predicate: &dyn Fn(&R) -> bool,
        ) -> Result<Vec<R>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    /// In-memory store whose property deletes are refused; everything else goes through.
    #[derive(Default)]
    pub(super) struct LockedListingsStore {
        inner: InMemoryListingStore,
    }

    impl<R: Record> Repository<R> for LockedListingsStore
    where
        InMemoryListingStore: Repository<R>,
    {
        fn next_id(&self) -> Result<R::Id, RepositoryError> {
            <InMemoryListingStore as Repository<R>>::next_id(&self.inner)
        }

        fn find(&self, id: R::Id) -> Result<Option<R>, RepositoryError> {
            <InMemoryListingStore as Repository<R>>::find(&self.inner, id)
        }

        fn create(&self, record: R) -> Result<R, RepositoryError> {
            <InMemoryListingStore as Repository<R>>::create(&self.inner, record)
        }

        fn update(&self, record: R) -> Result<(), RepositoryError> {
            <InMemoryListingStore as Repository<R>>::update(&self.inner, record)
        }

        fn delete(&self, id: R::Id) -> Result<(), RepositoryError> {
            if R::ENTITY == Property::ENTITY {
                return Err(RepositoryError::Unavailable("listings locked".to_string()));
            }
            <InMemoryListingStore as Repository<R>>::delete(&self.inner, id)
        }

        fn count_matching(&self, predicate: &dyn Fn(&R) -> bool) -> Result<usize, RepositoryError> {
            <InMemoryListingStore as Repository<R>>::count_matching(&self.inner, predicate)
        }

        fn find_matching(
            &self,
            predicate: &dyn Fn(&R) -> bool,
        ) -> Result<Vec<R>, RepositoryError> {
            <InMemoryListingStore as Repository<R>>::find_matching(&self.inner, predicate)
        }
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use house_location::config::ListingConfig;
use house_location::listings::{
    listing_router, BestPricePolicy, InMemoryListingStore, ListingError, ListingService,
    NewOffer, OfferStatus, PartnerId, PropertyStatus, RepositoryError, UserId,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{canal_house, service, today, LockedListingsStore, OfflineStore};

#[test]
fn accept_then_refuse_restores_the_offer_received_state() {
    let service = service();
    let property = service
        .create_property(canal_house(), UserId(7), today())
        .expect("property created");
    assert_eq!(property.total_area, 120);
    assert_eq!(property.salesperson, Some(UserId(7)));

    let first = service
        .create_offer(
            NewOffer::new(property.id, PartnerId(11), 180_000.0).with_validity(10),
            today(),
        )
        .expect("first offer");
    assert_eq!(
        first.deadline,
        today() + chrono::Duration::days(10),
        "deadline follows creation date plus validity"
    );

    let second = service
        .create_offer(NewOffer::new(property.id, PartnerId(12), 210_000.0), today())
        .expect("second offer");

    service.accept_offers(&[second.id]).expect("accepted");
    let view = service.get_property(property.id).expect("view");
    assert_eq!(view.property.status, PropertyStatus::OfferAccepted);
    assert_eq!(view.property.selling_price, Some(210_000.0));
    assert_eq!(view.property.buyer, Some(PartnerId(12)));
    assert_eq!(
        service.get_offer(second.id).expect("offer").status,
        Some(OfferStatus::Accepted)
    );

    service.refuse_offers(&[second.id]).expect("refused");
    let view = service.get_property(property.id).expect("view");
    assert_eq!(view.property.status, PropertyStatus::OfferReceived);
    assert_eq!(view.property.selling_price, None);
    assert_eq!(
        service.get_offer(second.id).expect("offer").status,
        Some(OfferStatus::Refused)
    );
    assert_eq!(view.offers.len(), 2);
}

#[test]
fn reset_policy_clears_best_price_once_offers_are_gone() {
    let service = ListingService::new(
        Arc::new(InMemoryListingStore::default()),
        ListingConfig {
            best_price_policy: BestPricePolicy::Reset,
            ..ListingConfig::default()
        },
    );
    let property = service
        .create_property(canal_house(), UserId(7), today())
        .expect("property created");
    let offer = service
        .create_offer(NewOffer::new(property.id, PartnerId(11), 190_000.0), today())
        .expect("offer");
    assert_eq!(
        service.get_property(property.id).expect("view").property.best_price,
        190_000.0
    );

    service.delete_offer(offer.id).expect("deleted");
    assert_eq!(
        service.get_property(property.id).expect("view").property.best_price,
        0.0
    );
}

#[test]
fn deleting_a_listing_removes_its_offers() {
    let service = service();
    let property = service
        .create_property(canal_house(), UserId(7), today())
        .expect("property created");
    let offer = service
        .create_offer(NewOffer::new(property.id, PartnerId(11), 190_000.0), today())
        .expect("offer");

    service.delete_property(property.id).expect("deleted");

    assert!(matches!(
        service.get_offer(offer.id),
        Err(ListingError::NotFound { .. })
    ));
}

#[test]
fn failed_listing_delete_keeps_its_offers() {
    let service = ListingService::new(
        Arc::new(LockedListingsStore::default()),
        ListingConfig::default(),
    );
    let property = service
        .create_property(canal_house(), UserId(7), today())
        .expect("property created");
    let offer = service
        .create_offer(NewOffer::new(property.id, PartnerId(11), 190_000.0), today())
        .expect("offer");

    assert!(matches!(
        service.delete_property(property.id),
        Err(ListingError::Repository(RepositoryError::Unavailable(_)))
    ));

    assert_eq!(service.get_offer(offer.id).expect("offer kept").id, offer.id);
    assert_eq!(
        service.property_offers(property.id).expect("offers").len(),
        1
    );
}

#[test]
fn storage_outages_surface_as_repository_errors() {
    let service = ListingService::new(Arc::new(OfflineStore), ListingConfig::default());

    let err = service
        .create_property(canal_house(), UserId(7), today())
        .expect_err("writes are rejected");

    assert!(matches!(
        err,
        ListingError::Repository(RepositoryError::Unavailable(_))
    ));
}

#[tokio::test]
async fn storage_outages_map_to_internal_server_error() {
    let service = Arc::new(ListingService::new(
        Arc::new(OfflineStore),
        ListingConfig::default(),
    ));
    let router = listing_router(service);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/tags")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::to_vec(&json!({ "name": "Luxury" })).expect("serialize"),
        ))
        .expect("request");

    let response = router.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let payload: Value = serde_json::from_slice(&body).expect("json payload");
    assert_eq!(payload["kind"], json!("repository_error"));
    assert!(payload["error"]
        .as_str()
        .expect("message")
        .contains("storage offline"));
}
