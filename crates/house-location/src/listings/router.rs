use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    NewOffer, NewProperty, OfferChanges, OfferId, PropertyChanges, PropertyFilter, PropertyId,
    PropertyStatus, UserId,
};
use super::repository::{ListingStore, RepositoryError};
use super::service::{ListingError, ListingService};

/// Header carrying the acting user's id.
pub const ACTING_USER_HEADER: &str = "x-user-id";
/// Acting user assumed when the header is absent.
pub const DEFAULT_ACTING_USER: UserId = UserId(1);

/// Router builder exposing the listing operations over HTTP.
pub fn listing_router<S>(service: Arc<ListingService<S>>) -> Router
where
    S: ListingStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/properties",
            post(create_property_handler::<S>).get(list_properties_handler::<S>),
        )
        .route("/api/v1/properties/sell", post(sell_handler::<S>))
        .route("/api/v1/properties/cancel", post(cancel_handler::<S>))
        .route(
            "/api/v1/properties/:property_id",
            get(property_handler::<S>)
                .patch(update_property_handler::<S>)
                .delete(delete_property_handler::<S>),
        )
        .route(
            "/api/v1/properties/:property_id/garden",
            post(garden_handler::<S>),
        )
        .route("/api/v1/offers", post(create_offer_handler::<S>))
        .route("/api/v1/offers/accept", post(accept_handler::<S>))
        .route("/api/v1/offers/refuse", post(refuse_handler::<S>))
        .route(
            "/api/v1/offers/:offer_id",
            get(offer_handler::<S>)
                .patch(update_offer_handler::<S>)
                .delete(delete_offer_handler::<S>),
        )
        .route(
            "/api/v1/tags",
            post(create_tag_handler::<S>).get(list_tags_handler::<S>),
        )
        .route(
            "/api/v1/types",
            post(create_type_handler::<S>).get(list_types_handler::<S>),
        )
        .with_state(service)
}

/// HTTP status for a listing failure.
pub fn status_for(error: &ListingError) -> StatusCode {
    match error {
        ListingError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ListingError::User(_) | ListingError::Repository(RepositoryError::Conflict) => {
            StatusCode::CONFLICT
        }
        ListingError::NotFound { .. } | ListingError::Repository(RepositoryError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        ListingError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_kind(error: &ListingError) -> &'static str {
    match error {
        ListingError::Validation { .. } => "validation_error",
        ListingError::User(_) => "user_error",
        ListingError::NotFound { .. } => "not_found",
        ListingError::Repository(_) => "repository_error",
    }
}

impl IntoResponse for ListingError {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": self.to_string(),
            "kind": error_kind(&self),
        });
        (status_for(&self), Json(payload)).into_response()
    }
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, ListingError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error.into_response(),
    }
}

fn acting_user(headers: &HeaderMap) -> Result<UserId, Response> {
    let Some(raw) = headers.get(ACTING_USER_HEADER) else {
        return Ok(DEFAULT_ACTING_USER);
    };

    raw.to_str()
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(UserId)
        .ok_or_else(|| {
            let payload = json!({
                "error": format!("{ACTING_USER_HEADER} must be a numeric user id"),
            });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        })
}

/// Query string accepted by the listing endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub status: Option<PropertyStatus>,
    pub salesperson: Option<u64>,
    pub include_inactive: bool,
}

impl From<ListQuery> for PropertyFilter {
    fn from(query: ListQuery) -> Self {
        PropertyFilter {
            status: query.status,
            salesperson: query.salesperson.map(UserId),
            include_inactive: query.include_inactive,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest<T> {
    pub ids: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct GardenToggle {
    pub garden: bool,
}

#[derive(Debug, Deserialize)]
pub struct NamePayload {
    pub name: String,
}

pub(crate) async fn create_property_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    headers: HeaderMap,
    Json(draft): Json<NewProperty>,
) -> Response
where
    S: ListingStore + 'static,
{
    let actor = match acting_user(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let today = Local::now().date_naive();
    respond(
        StatusCode::CREATED,
        service.create_property(draft, actor, today),
    )
}

pub(crate) async fn list_properties_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    S: ListingStore + 'static,
{
    let filter = PropertyFilter::from(query);
    respond(StatusCode::OK, service.list_properties(&filter))
}

pub(crate) async fn property_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Path(property_id): Path<u64>,
) -> Response
where
    S: ListingStore + 'static,
{
    respond(StatusCode::OK, service.get_property(PropertyId(property_id)))
}

pub(crate) async fn update_property_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Path(property_id): Path<u64>,
    Json(changes): Json<PropertyChanges>,
) -> Response
where
    S: ListingStore + 'static,
{
    respond(
        StatusCode::OK,
        service.update_property(PropertyId(property_id), changes),
    )
}

pub(crate) async fn delete_property_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Path(property_id): Path<u64>,
) -> Response
where
    S: ListingStore + 'static,
{
    match service.delete_property(PropertyId(property_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn garden_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Path(property_id): Path<u64>,
    Json(toggle): Json<GardenToggle>,
) -> Response
where
    S: ListingStore + 'static,
{
    respond(
        StatusCode::OK,
        service.toggle_garden(PropertyId(property_id), toggle.garden),
    )
}

pub(crate) async fn sell_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Json(batch): Json<BatchRequest<PropertyId>>,
) -> Response
where
    S: ListingStore + 'static,
{
    respond(StatusCode::OK, service.sell(&batch.ids))
}

pub(crate) async fn cancel_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Json(batch): Json<BatchRequest<PropertyId>>,
) -> Response
where
    S: ListingStore + 'static,
{
    respond(StatusCode::OK, service.cancel(&batch.ids))
}

pub(crate) async fn create_offer_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Json(draft): Json<NewOffer>,
) -> Response
where
    S: ListingStore + 'static,
{
    let today = Local::now().date_naive();
    respond(StatusCode::CREATED, service.create_offer(draft, today))
}

pub(crate) async fn offer_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Path(offer_id): Path<u64>,
) -> Response
where
    S: ListingStore + 'static,
{
    respond(StatusCode::OK, service.get_offer(OfferId(offer_id)))
}

pub(crate) async fn update_offer_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Path(offer_id): Path<u64>,
    Json(changes): Json<OfferChanges>,
) -> Response
where
    S: ListingStore + 'static,
{
    respond(
        StatusCode::OK,
        service.update_offer(OfferId(offer_id), changes),
    )
}

pub(crate) async fn delete_offer_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Path(offer_id): Path<u64>,
) -> Response
where
    S: ListingStore + 'static,
{
    match service.delete_offer(OfferId(offer_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn accept_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Json(batch): Json<BatchRequest<OfferId>>,
) -> Response
where
    S: ListingStore + 'static,
{
    respond(StatusCode::OK, service.accept_offers(&batch.ids))
}

pub(crate) async fn refuse_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Json(batch): Json<BatchRequest<OfferId>>,
) -> Response
where
    S: ListingStore + 'static,
{
    respond(StatusCode::OK, service.refuse_offers(&batch.ids))
}

pub(crate) async fn create_tag_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Json(payload): Json<NamePayload>,
) -> Response
where
    S: ListingStore + 'static,
{
    respond(StatusCode::CREATED, service.create_tag(&payload.name))
}

pub(crate) async fn list_tags_handler<S>(State(service): State<Arc<ListingService<S>>>) -> Response
where
    S: ListingStore + 'static,
{
    respond(StatusCode::OK, service.list_tags())
}

pub(crate) async fn create_type_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Json(payload): Json<NamePayload>,
) -> Response
where
    S: ListingStore + 'static,
{
    respond(StatusCode::CREATED, service.create_type(&payload.name))
}

pub(crate) async fn list_types_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
) -> Response
where
    S: ListingStore + 'static,
{
    respond(StatusCode::OK, service.list_types())
}
