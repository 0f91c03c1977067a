use crate::cli::ServeArgs;
use crate::infra::{seed_reference_data, AppState};
use crate::routes::with_listing_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use house_location::config::AppConfig;
use house_location::error::AppError;
use house_location::listings::{InMemoryListingStore, ListingService};
use house_location::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryListingStore::default());
    let listing_service = ListingService::new(store, config.listing.clone());
    if args.seed {
        seed_reference_data(&listing_service)?;
    }

    let app = with_listing_routes(Arc::new(listing_service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        best_price_policy = %config.listing.best_price_policy,
        "listing service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
