use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

use super::domain::{
    NewOffer, NewProperty, Offer, OfferChanges, OfferId, Property, PropertyChanges,
    PropertyField, PropertyFilter, PropertyId, PropertyStatus, PropertyTag, PropertyType,
    PropertyTypeId, PropertyView, TagId, UserId,
};
use super::repository::{ListingStore, Record, Repository, RepositoryError};
use super::rules::{self, BatchBestOffer, UserError, ValidationError};
use crate::config::ListingConfig;

/// Record a validation failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRef {
    NewProperty,
    Property(PropertyId),
    NewOffer,
    Offer(OfferId),
    NewTag,
    NewType,
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRef::NewProperty => f.write_str("new property"),
            RecordRef::Property(id) => write!(f, "property {id}"),
            RecordRef::NewOffer => f.write_str("new offer"),
            RecordRef::Offer(id) => write!(f, "offer {id}"),
            RecordRef::NewTag => f.write_str("new tag"),
            RecordRef::NewType => f.write_str("new type"),
        }
    }
}

/// Error raised by the listing service.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("{record}: {source}")]
    Validation {
        record: RecordRef,
        #[source]
        source: ValidationError,
    },
    #[error(transparent)]
    User(#[from] UserError),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ListingError {
    fn invalid(record: RecordRef) -> impl FnOnce(ValidationError) -> ListingError {
        move |source| ListingError::Validation { record, source }
    }

    fn not_found<R: Record>(id: R::Id) -> ListingError {
        ListingError::NotFound {
            entity: R::ENTITY,
            id: id.to_string(),
        }
    }

    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            ListingError::Validation { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Listing lifecycle operations over an injected store.
///
/// The service acts as the transaction boundary: every operation loads what
/// it needs, applies the rules to working copies, and writes back only once
/// all of them passed.
pub struct ListingService<S> {
    store: Arc<S>,
    config: ListingConfig,
}

impl<S> ListingService<S>
where
    S: ListingStore + 'static,
{
    pub fn new(store: Arc<S>, config: ListingConfig) -> Self {
        Self { store, config }
    }

    fn properties(&self) -> &dyn Repository<Property> {
        &*self.store
    }

    fn offers(&self) -> &dyn Repository<Offer> {
        &*self.store
    }

    fn tags(&self) -> &dyn Repository<PropertyTag> {
        &*self.store
    }

    fn types(&self) -> &dyn Repository<PropertyType> {
        &*self.store
    }

    fn load<R: Record>(repository: &dyn Repository<R>, id: R::Id) -> Result<R, ListingError> {
        repository
            .find(id)?
            .ok_or_else(|| ListingError::not_found::<R>(id))
    }

    // Properties

    /// Create a listing on behalf of `actor`, who becomes the default salesperson.
    pub fn create_property(
        &self,
        draft: NewProperty,
        actor: UserId,
        today: NaiveDate,
    ) -> Result<Property, ListingError> {
        let invalid = ListingError::invalid(RecordRef::NewProperty);

        self.check_references(RecordRef::NewProperty, draft.property_type, &draft.tags)?;

        let available_from = match draft.available_from {
            Some(date) => date,
            None => Duration::try_days(self.config.availability_lead_days)
                .and_then(|lead| today.checked_add_signed(lead))
                .ok_or(ValidationError::DateOutOfRange {
                    field: "availability date",
                })
                .map_err(ListingError::invalid(RecordRef::NewProperty))?,
        };

        let mut property = Property {
            id: self.properties().next_id()?,
            title: draft.title,
            description: draft.description,
            postcode: draft.postcode,
            available_from,
            expected_price: draft.expected_price,
            selling_price: None,
            bedrooms: draft.bedrooms,
            living_area: draft.living_area,
            facades: draft.facades,
            garage: draft.garage,
            garden: draft.garden,
            garden_area: draft.garden_area,
            garden_orientation: draft.garden_orientation,
            active: draft.active,
            status: PropertyStatus::New,
            total_area: 0,
            best_price: 0.0,
            property_type: draft.property_type,
            tags: draft.tags.into_iter().collect(),
            salesperson: draft.salesperson.or(Some(actor)),
            buyer: None,
        };
        rules::recompute_total_area(&mut property);
        rules::validate_property(&property, &PropertyField::ALL).map_err(invalid)?;

        let stored = self.properties().create(property)?;
        info!(property_id = %stored.id, salesperson = ?stored.salesperson, "property created");
        Ok(stored)
    }

    /// Plain field write. Only the constraints of the touched fields are checked.
    pub fn update_property(
        &self,
        id: PropertyId,
        changes: PropertyChanges,
    ) -> Result<Property, ListingError> {
        let mut property = Self::load(self.properties(), id)?;

        if changes.touches_references() {
            let property_type = changes.property_type.flatten();
            let tags = changes.tags.clone().unwrap_or_default();
            self.check_references(RecordRef::Property(id), property_type, &tags)?;
        }

        let touched = changes.apply_to(&mut property);
        if touched
            .iter()
            .any(|field| matches!(field, PropertyField::LivingArea | PropertyField::GardenArea))
        {
            rules::recompute_total_area(&mut property);
        }
        rules::validate_property(&property, &touched)
            .map_err(ListingError::invalid(RecordRef::Property(id)))?;

        self.properties().update(property.clone())?;
        debug!(property_id = %id, fields = ?touched, "property updated");
        Ok(property)
    }

    /// Editing-context reaction to the garden checkbox.
    pub fn toggle_garden(&self, id: PropertyId, garden: bool) -> Result<Property, ListingError> {
        let mut property = Self::load(self.properties(), id)?;
        rules::apply_garden_toggle(&mut property, garden);
        rules::validate_property(&property, &[PropertyField::GardenArea])
            .map_err(ListingError::invalid(RecordRef::Property(id)))?;

        self.properties().update(property.clone())?;
        debug!(property_id = %id, garden, "garden toggled");
        Ok(property)
    }

    /// Delete a new or canceled listing together with its offers.
    pub fn delete_property(&self, id: PropertyId) -> Result<(), ListingError> {
        let property = Self::load(self.properties(), id)?;
        if let Err(err) = rules::ensure_deletable(&property) {
            warn!(property_id = %id, status = %property.status, "property deletion refused");
            return Err(err.into());
        }

        let offers = self.offers().find_matching(&|offer| offer.property == id)?;
        self.properties().delete(id)?;

        for (removed, offer) in offers.iter().enumerate() {
            if let Err(err) = self.offers().delete(offer.id) {
                warn!(
                    property_id = %id,
                    offer_id = %offer.id,
                    removed,
                    remaining = offers.len() - removed,
                    error = %err,
                    "property deleted but offer cleanup stopped"
                );
                return Err(err.into());
            }
        }
        info!(property_id = %id, removed_offers = offers.len(), "property deleted");
        Ok(())
    }

    pub fn sell(&self, ids: &[PropertyId]) -> Result<Vec<Property>, ListingError> {
        self.run_property_batch("sell", ids, rules::sell)
    }

    pub fn cancel(&self, ids: &[PropertyId]) -> Result<Vec<Property>, ListingError> {
        self.run_property_batch("cancel", ids, rules::cancel)
    }

    fn run_property_batch(
        &self,
        action: &'static str,
        ids: &[PropertyId],
        step: fn(&mut Property) -> Result<(), UserError>,
    ) -> Result<Vec<Property>, ListingError> {
        let mut staged: BTreeMap<PropertyId, Property> = BTreeMap::new();

        for &id in ids {
            if !staged.contains_key(&id) {
                staged.insert(id, Self::load(self.properties(), id)?);
            }
            if let Some(property) = staged.get_mut(&id) {
                if let Err(err) = step(property) {
                    warn!(action, property_id = %id, error = %err, "batch action refused");
                    return Err(err.into());
                }
            }
        }

        for property in staged.values() {
            self.properties().update(property.clone())?;
            info!(action, property_id = %property.id, status = %property.status, "property status changed");
        }
        Ok(ordered(ids, &staged))
    }

    pub fn get_property(&self, id: PropertyId) -> Result<PropertyView, ListingError> {
        let property = Self::load(self.properties(), id)?;
        let offers = self.offers().find_matching(&|offer| offer.property == id)?;
        Ok(PropertyView { property, offers })
    }

    pub fn list_properties(&self, filter: &PropertyFilter) -> Result<Vec<Property>, ListingError> {
        Ok(self
            .properties()
            .find_matching(&|property| filter.matches(property))?)
    }

    /// Active listings handled by `user`.
    pub fn salesperson_properties(&self, user: UserId) -> Result<Vec<Property>, ListingError> {
        self.list_properties(&PropertyFilter {
            salesperson: Some(user),
            ..PropertyFilter::default()
        })
    }

    fn check_references(
        &self,
        record: RecordRef,
        property_type: Option<PropertyTypeId>,
        tags: &[TagId],
    ) -> Result<(), ListingError> {
        if let Some(type_id) = property_type {
            if self.types().find(type_id)?.is_none() {
                return Err(ListingError::invalid(record)(
                    ValidationError::UnknownReference {
                        entity: PropertyType::ENTITY,
                        id: type_id.0,
                    },
                ));
            }
        }
        for &tag_id in tags {
            if self.tags().find(tag_id)?.is_none() {
                return Err(ListingError::invalid(record)(
                    ValidationError::UnknownReference {
                        entity: PropertyTag::ENTITY,
                        id: tag_id.0,
                    },
                ));
            }
        }
        Ok(())
    }

    fn refresh_best_price(&self, property_id: PropertyId) -> Result<(), ListingError> {
        let Some(mut property) = self.properties().find(property_id)? else {
            return Ok(());
        };
        let offers = self
            .offers()
            .find_matching(&|offer| offer.property == property_id)?;
        let previous = property.best_price;
        rules::recompute_best_price(&mut property, &offers, self.config.best_price_policy);

        if property.best_price != previous {
            debug!(property_id = %property_id, best_price = property.best_price, "best price recomputed");
            self.properties().update(property)?;
        }
        Ok(())
    }

    // Offers

    /// Register an offer dated `today`. Prices are unique across every property.
    pub fn create_offer(&self, draft: NewOffer, today: NaiveDate) -> Result<Offer, ListingError> {
        let invalid = ListingError::invalid(RecordRef::NewOffer);

        if self.properties().find(draft.property)?.is_none() {
            return Err(invalid(ValidationError::UnknownReference {
                entity: Property::ENTITY,
                id: draft.property.0,
            }));
        }

        let price = draft.price;
        if self.offers().count_matching(&|offer| offer.price == price)? > 0 {
            warn!(property_id = %draft.property, price, "duplicate offer price rejected");
            return Err(invalid(ValidationError::DuplicateOfferPrice { price }));
        }

        let (validity, deadline) = match draft.deadline {
            Some(deadline) => (
                rules::validity_from_deadline(today, deadline)
                    .map_err(ListingError::invalid(RecordRef::NewOffer))?,
                deadline,
            ),
            None => (
                draft.validity,
                rules::compute_deadline(today, draft.validity)
                    .map_err(ListingError::invalid(RecordRef::NewOffer))?,
            ),
        };

        let offer = Offer {
            id: self.offers().next_id()?,
            price,
            status: None,
            partner: draft.partner,
            property: draft.property,
            created_on: today,
            validity,
            deadline,
        };
        rules::validate_offer(&offer).map_err(invalid)?;

        let stored = self.offers().create(offer)?;
        if self.offers().count_matching(&|offer| offer.price == price)? > 1 {
            self.offers().delete(stored.id)?;
            warn!(offer_id = %stored.id, price, "concurrent duplicate offer price rolled back");
            return Err(ListingError::Validation {
                record: RecordRef::Offer(stored.id),
                source: ValidationError::DuplicateOfferPrice { price },
            });
        }

        self.refresh_best_price(stored.property)?;
        info!(offer_id = %stored.id, property_id = %stored.property, price, "offer created");
        Ok(stored)
    }

    pub fn update_offer(&self, id: OfferId, changes: OfferChanges) -> Result<Offer, ListingError> {
        let invalid = || ListingError::invalid(RecordRef::Offer(id));
        let mut offer = Self::load(self.offers(), id)?;

        if let Some(price) = changes.price {
            rules::validate_offer_price(price).map_err(invalid())?;
            let clashes = self
                .offers()
                .count_matching(&|other| other.id != id && other.price == price)?;
            if clashes > 0 {
                return Err(invalid()(ValidationError::DuplicateOfferPrice { price }));
            }
            offer.price = price;
        }
        if let Some(validity) = changes.validity {
            offer.validity = validity;
            offer.deadline = rules::compute_deadline(offer.created_on, validity).map_err(invalid())?;
        }
        if let Some(deadline) = changes.deadline {
            offer.validity =
                rules::validity_from_deadline(offer.created_on, deadline).map_err(invalid())?;
            offer.deadline = deadline;
        }
        if let Some(partner) = changes.partner {
            offer.partner = partner;
        }
        rules::validate_offer(&offer).map_err(invalid())?;

        self.offers().update(offer.clone())?;
        if changes.price.is_some() {
            self.refresh_best_price(offer.property)?;
        }
        debug!(offer_id = %id, validity = offer.validity, deadline = %offer.deadline, "offer updated");
        Ok(offer)
    }

    pub fn delete_offer(&self, id: OfferId) -> Result<(), ListingError> {
        let offer = Self::load(self.offers(), id)?;
        self.offers().delete(id)?;
        self.refresh_best_price(offer.property)?;
        info!(offer_id = %id, property_id = %offer.property, "offer deleted");
        Ok(())
    }

    pub fn get_offer(&self, id: OfferId) -> Result<Offer, ListingError> {
        Self::load(self.offers(), id)
    }

    pub fn property_offers(&self, id: PropertyId) -> Result<Vec<Offer>, ListingError> {
        Self::load(self.properties(), id)?;
        Ok(self.offers().find_matching(&|offer| offer.property == id)?)
    }

    /// Accept each offer in order. Fails on the first property that already
    /// has an accepted offer, leaving every record of the batch untouched.
    pub fn accept_offers(&self, ids: &[OfferId]) -> Result<Vec<Offer>, ListingError> {
        self.run_offer_batch("accept", ids, rules::accept_offer)
    }

    /// Refuse each offer in order, rolling back properties whose accepted offer is refused.
    pub fn refuse_offers(&self, ids: &[OfferId]) -> Result<Vec<Offer>, ListingError> {
        self.run_offer_batch("refuse", ids, |offer, property| {
            rules::refuse_offer(offer, property);
            Ok(())
        })
    }

    fn run_offer_batch<F>(
        &self,
        action: &'static str,
        ids: &[OfferId],
        mut step: F,
    ) -> Result<Vec<Offer>, ListingError>
    where
        F: FnMut(&mut Offer, &mut Property) -> Result<(), UserError>,
    {
        let mut offers: BTreeMap<OfferId, Offer> = BTreeMap::new();
        let mut properties: BTreeMap<PropertyId, Property> = BTreeMap::new();
        let mut best_offer = BatchBestOffer::default();

        for &id in ids {
            if !offers.contains_key(&id) {
                offers.insert(id, Self::load(self.offers(), id)?);
            }
            let Some(offer) = offers.get_mut(&id) else {
                continue;
            };
            if !properties.contains_key(&offer.property) {
                properties.insert(offer.property, Self::load(self.properties(), offer.property)?);
            }
            let Some(property) = properties.get_mut(&offer.property) else {
                continue;
            };

            if let Err(err) = step(offer, property) {
                warn!(action, offer_id = %id, property_id = %property.id, error = %err, "offer action refused");
                return Err(err.into());
            }
            best_offer.observe(offer, property);
        }

        for offer in offers.values() {
            self.offers().update(offer.clone())?;
            info!(action, offer_id = %offer.id, property_id = %offer.property, "offer status changed");
        }
        for property in properties.values() {
            self.properties().update(property.clone())?;
            debug!(property_id = %property.id, status = %property.status, best_price = property.best_price, "property updated by offer action");
        }
        Ok(ordered(ids, &offers))
    }

    // Tags and types

    /// Create a tag. Names are unique, compared exactly.
    pub fn create_tag(&self, name: &str) -> Result<PropertyTag, ListingError> {
        let invalid = ListingError::invalid(RecordRef::NewTag);
        ensure_named(PropertyTag::ENTITY, name).map_err(ListingError::invalid(RecordRef::NewTag))?;
        if self.tags().count_matching(&|tag| tag.name == name)? > 0 {
            return Err(invalid(ValidationError::DuplicateName {
                entity: PropertyTag::ENTITY,
                name: name.to_string(),
            }));
        }

        let tag = self.tags().create(PropertyTag {
            id: self.tags().next_id()?,
            name: name.to_string(),
        })?;
        info!(tag_id = %tag.id, name = %tag.name, "tag created");
        Ok(tag)
    }

    /// Create a property type. Names are unique, compared exactly.
    pub fn create_type(&self, name: &str) -> Result<PropertyType, ListingError> {
        let invalid = ListingError::invalid(RecordRef::NewType);
        ensure_named(PropertyType::ENTITY, name)
            .map_err(ListingError::invalid(RecordRef::NewType))?;
        if self.types().count_matching(&|kind| kind.name == name)? > 0 {
            return Err(invalid(ValidationError::DuplicateName {
                entity: PropertyType::ENTITY,
                name: name.to_string(),
            }));
        }

        let kind = self.types().create(PropertyType {
            id: self.types().next_id()?,
            name: name.to_string(),
        })?;
        info!(type_id = %kind.id, name = %kind.name, "property type created");
        Ok(kind)
    }

    pub fn list_tags(&self) -> Result<Vec<PropertyTag>, ListingError> {
        Ok(self.tags().find_matching(&|_| true)?)
    }

    pub fn list_types(&self) -> Result<Vec<PropertyType>, ListingError> {
        Ok(self.types().find_matching(&|_| true)?)
    }
}

fn ensure_named(entity: &'static str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required { field: entity });
    }
    Ok(())
}

fn ordered<K: Ord + Copy, V: Clone>(ids: &[K], staged: &BTreeMap<K, V>) -> Vec<V> {
    let mut seen = Vec::with_capacity(ids.len());
    let mut records = Vec::with_capacity(staged.len());
    for id in ids {
        if seen.contains(id) {
            continue;
        }
        seen.push(*id);
        if let Some(record) = staged.get(id) {
            records.push(record.clone());
        }
    }
    records
}
