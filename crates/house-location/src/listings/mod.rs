//! Property listings, offers, and their reference entities.
//!
//! The service owns the write path: it runs the constraints in [`rules`]
//! for the fields each operation touches, recomputes derived fields, and
//! persists through an injected [`repository::ListingStore`].

pub mod domain;
pub mod memory;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    GardenOrientation, NewOffer, NewProperty, Offer, OfferChanges, OfferId, OfferStatus,
    PartnerId, Property, PropertyChanges, PropertyField, PropertyFilter, PropertyId,
    PropertyStatus, PropertyTag, PropertyType, PropertyTypeId, PropertyView, TagId, UserId,
};
pub use memory::InMemoryListingStore;
pub use repository::{ListingStore, Record, Repository, RepositoryError};
pub use router::listing_router;
pub use rules::{BestPricePolicy, UserError, ValidationError};
pub use service::{ListingError, ListingService, RecordRef};
