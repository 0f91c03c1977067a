//! Write-time constraints, derived-field recomputation, and workflow guards.
//!
//! Every function here works on in-memory records only; the service decides
//! when each one fires and persists the result.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{
    GardenOrientation, Offer, OfferId, OfferStatus, Property, PropertyField, PropertyId,
    PropertyStatus,
};

pub const GARDEN_DEFAULT_AREA: i32 = 10;
pub const GARDEN_DEFAULT_ORIENTATION: GardenOrientation = GardenOrientation::North;

/// Data invariant violations. These always block the write.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("{field} must be positive (found {value})")]
    Negative { field: &'static str, value: f64 },
    #[error("bedrooms must be at least 1 (found {found})")]
    TooFewBedrooms { found: i32 },
    #[error("an offer with price {price} already exists")]
    DuplicateOfferPrice { price: f64 },
    #[error("{entity} {name} already exists")]
    DuplicateName { entity: &'static str, name: String },
    #[error("deadline {deadline} is before creation date {created_on}")]
    DeadlineBeforeCreation {
        deadline: NaiveDate,
        created_on: NaiveDate,
    },
    #[error("{field} falls outside the supported calendar range")]
    DateOutOfRange { field: &'static str },
    #[error("{entity} {id} does not exist")]
    UnknownReference { entity: &'static str, id: u64 },
}

/// Workflow guard violations. The caller can recover by choosing another action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserError {
    #[error("property {property} is {status}: only new and canceled properties can be deleted")]
    DeleteNotAllowed {
        property: PropertyId,
        status: PropertyStatus,
    },
    #[error("Canceled property can't be sold (property {property})")]
    SellCanceled { property: PropertyId },
    #[error("Sold property can't be canceled (property {property})")]
    CancelSold { property: PropertyId },
    #[error("offer {offer}: property {property} already has an accepted offer")]
    OfferAlreadyAccepted {
        offer: OfferId,
        property: PropertyId,
    },
}

/// What the derived best price does once a property has no offers left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BestPricePolicy {
    /// Keep the last computed value.
    #[default]
    Retain,
    /// Drop back to zero.
    Reset,
}

impl FromStr for BestPricePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "retain" | "keep" => Ok(Self::Retain),
            "reset" | "zero" => Ok(Self::Reset),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for BestPricePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BestPricePolicy::Retain => f.write_str("retain"),
            BestPricePolicy::Reset => f.write_str("reset"),
        }
    }
}

/// Checks the constraints attached to `fields`. Creation passes [`PropertyField::ALL`].
pub fn validate_property(
    property: &Property,
    fields: &[PropertyField],
) -> Result<(), ValidationError> {
    for field in fields {
        match field {
            PropertyField::Title => {
                if property.title.trim().is_empty() {
                    return Err(ValidationError::Required {
                        field: field.label(),
                    });
                }
            }
            PropertyField::ExpectedPrice => non_negative(*field, property.expected_price)?,
            PropertyField::SellingPrice => {
                if let Some(price) = property.selling_price {
                    non_negative(*field, price)?;
                }
            }
            PropertyField::Bedrooms => {
                if property.bedrooms < 1 {
                    return Err(ValidationError::TooFewBedrooms {
                        found: property.bedrooms,
                    });
                }
            }
            PropertyField::LivingArea => non_negative(*field, f64::from(property.living_area))?,
            PropertyField::Facades => non_negative(*field, f64::from(property.facades))?,
            PropertyField::GardenArea => non_negative(*field, f64::from(property.garden_area))?,
        }
    }
    Ok(())
}

fn non_negative(field: PropertyField, value: f64) -> Result<(), ValidationError> {
    if value < 0.0 {
        return Err(ValidationError::Negative {
            field: field.label(),
            value,
        });
    }
    Ok(())
}

/// Trigger set: living area, garden area.
pub fn recompute_total_area(property: &mut Property) {
    property.total_area = property.living_area.saturating_add(property.garden_area);
}

/// Trigger set: the property's offers (created, deleted, or re-priced).
pub fn recompute_best_price<'a, I>(property: &mut Property, offers: I, policy: BestPricePolicy)
where
    I: IntoIterator<Item = &'a Offer>,
{
    let best = offers
        .into_iter()
        .map(|offer| offer.price)
        .fold(None, |best: Option<f64>, price| {
            Some(best.map_or(price, |current| current.max(price)))
        });

    match (best, policy) {
        (Some(price), _) => property.best_price = price,
        (None, BestPricePolicy::Retain) => {}
        (None, BestPricePolicy::Reset) => property.best_price = 0.0,
    }
}

/// Form reaction to the garden checkbox. Plain writes of `garden` do not call this.
pub fn apply_garden_toggle(property: &mut Property, garden: bool) {
    property.garden = garden;
    if garden {
        property.garden_area = GARDEN_DEFAULT_AREA;
        property.garden_orientation = Some(GARDEN_DEFAULT_ORIENTATION);
    } else {
        property.garden_area = 0;
        property.garden_orientation = None;
    }
    recompute_total_area(property);
}

pub fn ensure_deletable(property: &Property) -> Result<(), UserError> {
    match property.status {
        PropertyStatus::New | PropertyStatus::Canceled => Ok(()),
        status => Err(UserError::DeleteNotAllowed {
            property: property.id,
            status,
        }),
    }
}

/// Any status other than canceled may be sold, including `new`.
pub fn sell(property: &mut Property) -> Result<(), UserError> {
    if property.status == PropertyStatus::Canceled {
        return Err(UserError::SellCanceled {
            property: property.id,
        });
    }
    property.status = PropertyStatus::Sold;
    Ok(())
}

pub fn cancel(property: &mut Property) -> Result<(), UserError> {
    if property.status == PropertyStatus::Sold {
        return Err(UserError::CancelSold {
            property: property.id,
        });
    }
    property.status = PropertyStatus::Canceled;
    Ok(())
}

pub fn validate_offer_price(price: f64) -> Result<(), ValidationError> {
    if price < 0.0 {
        return Err(ValidationError::Negative {
            field: "offer price",
            value: price,
        });
    }
    Ok(())
}

pub fn validate_validity(validity: i32) -> Result<(), ValidationError> {
    if validity < 0 {
        return Err(ValidationError::Negative {
            field: "validity",
            value: f64::from(validity),
        });
    }
    Ok(())
}

pub fn validate_deadline(created_on: NaiveDate, deadline: NaiveDate) -> Result<(), ValidationError> {
    if deadline < created_on {
        return Err(ValidationError::DeadlineBeforeCreation {
            deadline,
            created_on,
        });
    }
    Ok(())
}

/// `created_on + validity` days.
pub fn compute_deadline(created_on: NaiveDate, validity: i32) -> Result<NaiveDate, ValidationError> {
    created_on
        .checked_add_signed(Duration::days(i64::from(validity)))
        .ok_or(ValidationError::DateOutOfRange { field: "deadline" })
}

/// Inverse of [`compute_deadline`]: whole days between creation and deadline.
pub fn validity_from_deadline(
    created_on: NaiveDate,
    deadline: NaiveDate,
) -> Result<i32, ValidationError> {
    i32::try_from((deadline - created_on).num_days())
        .map_err(|_| ValidationError::DateOutOfRange { field: "deadline" })
}

/// Runs the offer-level checks over a fully populated offer.
pub fn validate_offer(offer: &Offer) -> Result<(), ValidationError> {
    validate_offer_price(offer.price)?;
    validate_validity(offer.validity)?;
    validate_deadline(offer.created_on, offer.deadline)
}

/// Best offer seen during one accept/refuse call.
///
/// Starts at zero for every call and writes through to whichever property
/// receives a new maximum. The value written can differ from the
/// offer-derived best price of that property.
#[derive(Debug, Default)]
pub struct BatchBestOffer {
    best: f64,
}

impl BatchBestOffer {
    pub fn observe(&mut self, offer: &Offer, property: &mut Property) {
        if offer.price > self.best {
            self.best = offer.price;
            property.best_price = offer.price;
        }
    }
}

pub fn accept_offer(offer: &mut Offer, property: &mut Property) -> Result<(), UserError> {
    if property.status == PropertyStatus::OfferAccepted {
        return Err(UserError::OfferAlreadyAccepted {
            offer: offer.id,
            property: property.id,
        });
    }

    offer.status = Some(OfferStatus::Accepted);
    property.status = PropertyStatus::OfferAccepted;
    property.selling_price = Some(offer.price);
    property.buyer = Some(offer.partner);
    Ok(())
}

/// Refusing a previously accepted offer rolls the property back to `offer_received`.
pub fn refuse_offer(offer: &mut Offer, property: &mut Property) {
    if offer.status == Some(OfferStatus::Accepted) {
        property.status = PropertyStatus::OfferReceived;
        property.selling_price = None;
        property.buyer = None;
    }
    offer.status = Some(OfferStatus::Refused);
}
