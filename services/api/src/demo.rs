use chrono::{Local, NaiveDate};
use clap::Args;
use house_location::config::ListingConfig;
use house_location::error::AppError;
use house_location::listings::{
    InMemoryListingStore, ListingService, NewOffer, NewProperty, Offer, PartnerId, Property,
    UserId,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the creation date used for listings and offers (defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

const DEMO_SALESPERSON: UserId = UserId(1);

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let service = ListingService::new(
        Arc::new(InMemoryListingStore::default()),
        ListingConfig::default(),
    );

    println!("House location demo ({today})");

    let mut draft = NewProperty::new("Canal house", 200_000.0);
    draft.bedrooms = 3;
    draft.living_area = 120;
    draft.facades = 2;
    let property = service.create_property(draft, DEMO_SALESPERSON, today)?;
    render_property("Listed", &property);

    let low = service.create_offer(
        NewOffer::new(property.id, PartnerId(11), 180_000.0).with_validity(10),
        today,
    )?;
    render_offer("Offer received", &low);

    let high = service.create_offer(NewOffer::new(property.id, PartnerId(12), 210_000.0), today)?;
    render_offer("Offer received", &high);
    render_property("After offers", &service.get_property(property.id)?.property);

    service.accept_offers(&[high.id])?;
    render_offer("Accepted", &service.get_offer(high.id)?);
    render_property("After acceptance", &service.get_property(property.id)?.property);

    service.refuse_offers(&[high.id])?;
    render_offer("Refused", &service.get_offer(high.id)?);
    render_property("After refusal", &service.get_property(property.id)?.property);

    Ok(())
}

fn render_property(heading: &str, property: &Property) {
    println!("\n{heading}: #{} {}", property.id, property.title);
    println!(
        "- status {} | expected {:.0} | best offer {:.0}",
        property.status, property.expected_price, property.best_price
    );
    println!(
        "- total area {} m2 | available from {}",
        property.total_area, property.available_from
    );
    match (property.selling_price, property.buyer) {
        (Some(price), Some(buyer)) => println!("- sold to partner {buyer} for {price:.0}"),
        _ => println!("- no selling price set"),
    }
}

fn render_offer(heading: &str, offer: &Offer) {
    let status = offer
        .status
        .map(|status| format!("{status:?}").to_lowercase())
        .unwrap_or_else(|| "pending".to_string());
    println!(
        "{heading}: offer #{} from partner {} at {:.0} ({status}, deadline {})",
        offer.id, offer.partner, offer.price, offer.deadline
    );
}
