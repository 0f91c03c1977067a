use chrono::NaiveDate;
use house_location::listings::{InMemoryListingStore, ListingError, ListingService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) const SAMPLE_TAGS: [&str; 4] = ["Luxury", "Cozy", "Renovated", "Waterfront"];
pub(crate) const SAMPLE_TYPES: [&str; 3] = ["House", "Apartment", "Penthouse"];

/// Loads the reference entities an empty deployment usually starts with.
pub(crate) fn seed_reference_data(
    service: &ListingService<InMemoryListingStore>,
) -> Result<(), ListingError> {
    for name in SAMPLE_TAGS {
        service.create_tag(name)?;
    }
    for name in SAMPLE_TYPES {
        service.create_type(name)?;
    }
    info!(
        tags = SAMPLE_TAGS.len(),
        types = SAMPLE_TYPES.len(),
        "seeded reference data"
    );
    Ok(())
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
