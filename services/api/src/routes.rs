use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use house_location::listings::{listing_router, ListingService, ListingStore};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_listing_routes<S>(service: Arc<ListingService<S>>) -> axum::Router
where
    S: ListingStore + 'static,
{
    listing_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use house_location::config::ListingConfig;
    use house_location::listings::InMemoryListingStore;
    use tower::ServiceExt;

    fn service() -> Arc<ListingService<InMemoryListingStore>> {
        Arc::new(ListingService::new(
            Arc::new(InMemoryListingStore::default()),
            ListingConfig::default(),
        ))
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let response = with_listing_routes(service())
            .oneshot(
                Request::get("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn listing_routes_are_mounted_alongside_probes() {
        let response = with_listing_routes(service())
            .oneshot(
                Request::get("/api/v1/tags")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .expect("read body");
        let tags: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(tags, json!([]));
    }
}
