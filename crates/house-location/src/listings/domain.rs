use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Bedroom count assigned when a draft does not provide one.
pub const DEFAULT_BEDROOMS: i32 = 2;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

record_id!(
    /// Identifier of a property listing.
    PropertyId
);
record_id!(
    /// Identifier of an offer made against a property.
    OfferId
);
record_id!(
    /// Identifier of a property tag.
    TagId
);
record_id!(
    /// Identifier of a property type.
    PropertyTypeId
);
record_id!(
    /// Opaque reference to a partner (buyer or bidder) owned by the host.
    PartnerId
);
record_id!(
    /// Opaque reference to a host user acting as salesperson.
    UserId
);

/// Lifecycle status of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    New,
    OfferReceived,
    OfferAccepted,
    Sold,
    Canceled,
}

impl PropertyStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PropertyStatus::New => "new",
            PropertyStatus::OfferReceived => "offer_received",
            PropertyStatus::OfferAccepted => "offer_accepted",
            PropertyStatus::Sold => "sold",
            PropertyStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome recorded on an offer. An offer without a status is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Accepted,
    Refused,
}

impl OfferStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OfferStatus::Accepted => "accepted",
            OfferStatus::Refused => "refused",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GardenOrientation {
    North,
    South,
    East,
    West,
}

/// A real-estate listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub title: String,
    pub description: Option<String>,
    pub postcode: Option<String>,
    pub available_from: NaiveDate,
    pub expected_price: f64,
    pub selling_price: Option<f64>,
    pub bedrooms: i32,
    pub living_area: i32,
    pub facades: i32,
    pub garage: bool,
    pub garden: bool,
    pub garden_area: i32,
    pub garden_orientation: Option<GardenOrientation>,
    pub active: bool,
    pub status: PropertyStatus,
    /// Derived: living area plus garden area.
    pub total_area: i32,
    /// Derived from the offer set, and also overwritten by accept/refuse batches.
    pub best_price: f64,
    pub property_type: Option<PropertyTypeId>,
    pub tags: BTreeSet<TagId>,
    pub salesperson: Option<UserId>,
    pub buyer: Option<PartnerId>,
}

/// Field values supplied when creating a listing. Title and expected price are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    /// Defaults to the creation date plus the configured lead time.
    #[serde(default)]
    pub available_from: Option<NaiveDate>,
    pub expected_price: f64,
    #[serde(default = "default_bedrooms")]
    pub bedrooms: i32,
    #[serde(default)]
    pub living_area: i32,
    #[serde(default)]
    pub facades: i32,
    #[serde(default)]
    pub garage: bool,
    #[serde(default)]
    pub garden: bool,
    #[serde(default)]
    pub garden_area: i32,
    #[serde(default)]
    pub garden_orientation: Option<GardenOrientation>,
    #[serde(default = "listed_active")]
    pub active: bool,
    #[serde(default)]
    pub property_type: Option<PropertyTypeId>,
    #[serde(default)]
    pub tags: Vec<TagId>,
    /// Defaults to the acting user.
    #[serde(default)]
    pub salesperson: Option<UserId>,
}

fn default_bedrooms() -> i32 {
    DEFAULT_BEDROOMS
}

fn listed_active() -> bool {
    true
}

impl NewProperty {
    pub fn new(title: impl Into<String>, expected_price: f64) -> Self {
        Self {
            title: title.into(),
            expected_price,
            ..Self::default()
        }
    }
}

impl Default for NewProperty {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            postcode: None,
            available_from: None,
            expected_price: 0.0,
            bedrooms: default_bedrooms(),
            living_area: 0,
            facades: 0,
            garage: false,
            garden: false,
            garden_area: 0,
            garden_orientation: None,
            active: listed_active(),
            property_type: None,
            tags: Vec::new(),
            salesperson: None,
        }
    }
}

/// Fields of a listing that carry a write-time constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyField {
    Title,
    ExpectedPrice,
    SellingPrice,
    Bedrooms,
    LivingArea,
    Facades,
    GardenArea,
}

impl PropertyField {
    pub const ALL: [PropertyField; 7] = [
        PropertyField::Title,
        PropertyField::ExpectedPrice,
        PropertyField::SellingPrice,
        PropertyField::Bedrooms,
        PropertyField::LivingArea,
        PropertyField::Facades,
        PropertyField::GardenArea,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            PropertyField::Title => "title",
            PropertyField::ExpectedPrice => "expected price",
            PropertyField::SellingPrice => "selling price",
            PropertyField::Bedrooms => "bedrooms",
            PropertyField::LivingArea => "living area",
            PropertyField::Facades => "facades",
            PropertyField::GardenArea => "garden area",
        }
    }
}

/// Partial update of a listing's editable fields.
///
/// Nullable fields use a nested option: absent leaves the value untouched,
/// `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyChanges {
    pub title: Option<String>,
    #[serde(deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub postcode: Option<Option<String>>,
    pub available_from: Option<NaiveDate>,
    pub expected_price: Option<f64>,
    pub bedrooms: Option<i32>,
    pub living_area: Option<i32>,
    pub facades: Option<i32>,
    pub garage: Option<bool>,
    pub garden: Option<bool>,
    pub garden_area: Option<i32>,
    #[serde(deserialize_with = "present")]
    pub garden_orientation: Option<Option<GardenOrientation>>,
    pub active: Option<bool>,
    #[serde(deserialize_with = "present")]
    pub property_type: Option<Option<PropertyTypeId>>,
    pub tags: Option<Vec<TagId>>,
    #[serde(deserialize_with = "present")]
    pub salesperson: Option<Option<UserId>>,
}

impl PropertyChanges {
    /// Writes the changes onto `property` and returns the constrained fields that were touched.
    ///
    /// This is a plain write: toggling `garden` here does not run the garden reaction.
    pub fn apply_to(self, property: &mut Property) -> Vec<PropertyField> {
        let mut touched = Vec::new();

        if let Some(title) = self.title {
            property.title = title;
            touched.push(PropertyField::Title);
        }
        if let Some(description) = self.description {
            property.description = description;
        }
        if let Some(postcode) = self.postcode {
            property.postcode = postcode;
        }
        if let Some(available_from) = self.available_from {
            property.available_from = available_from;
        }
        if let Some(expected_price) = self.expected_price {
            property.expected_price = expected_price;
            touched.push(PropertyField::ExpectedPrice);
        }
        if let Some(bedrooms) = self.bedrooms {
            property.bedrooms = bedrooms;
            touched.push(PropertyField::Bedrooms);
        }
        if let Some(living_area) = self.living_area {
            property.living_area = living_area;
            touched.push(PropertyField::LivingArea);
        }
        if let Some(facades) = self.facades {
            property.facades = facades;
            touched.push(PropertyField::Facades);
        }
        if let Some(garage) = self.garage {
            property.garage = garage;
        }
        if let Some(garden) = self.garden {
            property.garden = garden;
        }
        if let Some(garden_area) = self.garden_area {
            property.garden_area = garden_area;
            touched.push(PropertyField::GardenArea);
        }
        if let Some(orientation) = self.garden_orientation {
            property.garden_orientation = orientation;
        }
        if let Some(active) = self.active {
            property.active = active;
        }
        if let Some(property_type) = self.property_type {
            property.property_type = property_type;
        }
        if let Some(tags) = self.tags {
            property.tags = tags.into_iter().collect();
        }
        if let Some(salesperson) = self.salesperson {
            property.salesperson = salesperson;
        }

        touched
    }

    pub fn touches_references(&self) -> bool {
        matches!(self.property_type, Some(Some(_))) || self.tags.is_some()
    }
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A bid made by a partner against a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub price: f64,
    pub status: Option<OfferStatus>,
    pub partner: PartnerId,
    pub property: PropertyId,
    pub created_on: NaiveDate,
    pub validity: i32,
    /// Derived: `created_on + validity` days.
    pub deadline: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOffer {
    pub property: PropertyId,
    pub partner: PartnerId,
    pub price: f64,
    #[serde(default)]
    pub validity: i32,
    /// When present, takes precedence over `validity` and derives it.
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

impl NewOffer {
    pub fn new(property: PropertyId, partner: PartnerId, price: f64) -> Self {
        Self {
            property,
            partner,
            price,
            validity: 0,
            deadline: None,
        }
    }

    pub fn with_validity(mut self, validity: i32) -> Self {
        self.validity = validity;
        self
    }
}

/// Amendment of an existing offer. The property reference is read-only.
///
/// `validity` is applied before `deadline`, so a deadline in the same change set wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfferChanges {
    pub price: Option<f64>,
    pub validity: Option<i32>,
    pub deadline: Option<NaiveDate>,
    pub partner: Option<PartnerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyTag {
    pub id: TagId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyType {
    pub id: PropertyTypeId,
    pub name: String,
}

/// Listing query. Inactive listings are hidden unless requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyFilter {
    pub status: Option<PropertyStatus>,
    pub salesperson: Option<UserId>,
    pub include_inactive: bool,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        (self.include_inactive || property.active)
            && self.status.map_or(true, |status| property.status == status)
            && self
                .salesperson
                .map_or(true, |user| property.salesperson == Some(user))
    }
}

/// A listing together with its offers, as returned to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyView {
    #[serde(flatten)]
    pub property: Property,
    pub offers: Vec<Offer>,
}
