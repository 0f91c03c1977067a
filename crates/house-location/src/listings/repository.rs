use std::fmt;
use std::hash::Hash;

use super::domain::{
    Offer, OfferId, Property, PropertyId, PropertyTag, PropertyType, PropertyTypeId, TagId,
};

/// A persisted entity with a typed identifier.
pub trait Record: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Ord + Hash + fmt::Display + From<u64> + Send + Sync + 'static;

    /// Entity name used in log lines and error messages.
    const ENTITY: &'static str;

    fn id(&self) -> Self::Id;
}

impl Record for Property {
    type Id = PropertyId;
    const ENTITY: &'static str = "property";

    fn id(&self) -> PropertyId {
        self.id
    }
}

impl Record for Offer {
    type Id = OfferId;
    const ENTITY: &'static str = "offer";

    fn id(&self) -> OfferId {
        self.id
    }
}

impl Record for PropertyTag {
    type Id = TagId;
    const ENTITY: &'static str = "tag";

    fn id(&self) -> TagId {
        self.id
    }
}

impl Record for PropertyType {
    type Id = PropertyTypeId;
    const ENTITY: &'static str = "type";

    fn id(&self) -> PropertyTypeId {
        self.id
    }
}

/// Storage abstraction so the listing service can be exercised in isolation.
///
/// Each call is independent; nothing here makes a count-then-create sequence atomic.
pub trait Repository<R: Record>: Send + Sync {
    /// Reserves the identifier for the next record of this entity.
    fn next_id(&self) -> Result<R::Id, RepositoryError>;
    fn find(&self, id: R::Id) -> Result<Option<R>, RepositoryError>;
    fn create(&self, record: R) -> Result<R, RepositoryError>;
    fn update(&self, record: R) -> Result<(), RepositoryError>;
    fn delete(&self, id: R::Id) -> Result<(), RepositoryError>;
    fn count_matching(&self, predicate: &dyn Fn(&R) -> bool) -> Result<usize, RepositoryError>;
    /// Matching records in identifier order.
    fn find_matching(&self, predicate: &dyn Fn(&R) -> bool) -> Result<Vec<R>, RepositoryError>;
}

/// Every repository the listing service needs, implemented by one store.
pub trait ListingStore:
    Repository<Property> + Repository<Offer> + Repository<PropertyTag> + Repository<PropertyType>
{
}

impl<S> ListingStore for S where
    S: Repository<Property>
        + Repository<Offer>
        + Repository<PropertyTag>
        + Repository<PropertyType>
{
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
