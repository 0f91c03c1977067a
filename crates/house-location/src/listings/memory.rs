use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{Offer, Property, PropertyTag, PropertyType};
use super::repository::{Record, Repository, RepositoryError};

/// Process-local store backing every listing entity. Clones share the same tables.
#[derive(Default, Clone)]
pub struct InMemoryListingStore {
    properties: Table<Property>,
    offers: Table<Offer>,
    tags: Table<PropertyTag>,
    types: Table<PropertyType>,
}

struct Table<R: Record> {
    rows: Arc<Mutex<BTreeMap<R::Id, R>>>,
    sequence: Arc<AtomicU64>,
}

impl<R: Record> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: Arc::new(Mutex::new(BTreeMap::new())),
            sequence: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl<R: Record> Clone for Table<R> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            sequence: Arc::clone(&self.sequence),
        }
    }
}

impl<R: Record> Table<R> {
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<R::Id, R>>, RepositoryError> {
        self.rows
            .lock()
            .map_err(|_| RepositoryError::Unavailable(format!("{} table poisoned", R::ENTITY)))
    }

    fn next_id(&self) -> R::Id {
        R::Id::from(self.sequence.fetch_add(1, Ordering::Relaxed))
    }

    fn find(&self, id: R::Id) -> Result<Option<R>, RepositoryError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    fn create(&self, record: R) -> Result<R, RepositoryError> {
        let mut rows = self.lock()?;
        if rows.contains_key(&record.id()) {
            return Err(RepositoryError::Conflict);
        }
        rows.insert(record.id(), record.clone());
        Ok(record)
    }

    fn update(&self, record: R) -> Result<(), RepositoryError> {
        let mut rows = self.lock()?;
        match rows.get_mut(&record.id()) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete(&self, id: R::Id) -> Result<(), RepositoryError> {
        let mut rows = self.lock()?;
        rows.remove(&id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn count_matching(&self, predicate: &dyn Fn(&R) -> bool) -> Result<usize, RepositoryError> {
        let rows = self.lock()?;
        Ok(rows.values().filter(|record| predicate(record)).count())
    }

    fn find_matching(&self, predicate: &dyn Fn(&R) -> bool) -> Result<Vec<R>, RepositoryError> {
        let rows = self.lock()?;
        Ok(rows
            .values()
            .filter(|record| predicate(record))
            .cloned()
            .collect())
    }
}

macro_rules! table_repository {
    ($record:ty, $table:ident) => {
        impl Repository<$record> for InMemoryListingStore {
            fn next_id(&self) -> Result<<$record as Record>::Id, RepositoryError> {
                Ok(self.$table.next_id())
            }

            fn find(
                &self,
                id: <$record as Record>::Id,
            ) -> Result<Option<$record>, RepositoryError> {
                self.$table.find(id)
            }

            fn create(&self, record: $record) -> Result<$record, RepositoryError> {
                self.$table.create(record)
            }

            fn update(&self, record: $record) -> Result<(), RepositoryError> {
                self.$table.update(record)
            }

            fn delete(&self, id: <$record as Record>::Id) -> Result<(), RepositoryError> {
                self.$table.delete(id)
            }

            fn count_matching(
                &self,
                predicate: &dyn Fn(&$record) -> bool,
            ) -> Result<usize, RepositoryError> {
                self.$table.count_matching(predicate)
            }

            fn find_matching(
                &self,
                predicate: &dyn Fn(&$record) -> bool,
            ) -> Result<Vec<$record>, RepositoryError> {
                self.$table.find_matching(predicate)
            }
        }
    };
}

table_repository!(Property, properties);
table_repository!(Offer, offers);
table_repository!(PropertyTag, tags);
table_repository!(PropertyType, types);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::domain::{PropertyTag, TagId};

    #[test]
    fn sequences_are_per_entity() {
        let store = InMemoryListingStore::default();
        let first_tag: TagId = Repository::<PropertyTag>::next_id(&store).expect("id");
        let second_tag: TagId = Repository::<PropertyTag>::next_id(&store).expect("id");
        let first_type = Repository::<PropertyType>::next_id(&store).expect("id");

        assert_eq!(first_tag, TagId(1));
        assert_eq!(second_tag, TagId(2));
        assert_eq!(first_type.0, 1);
    }

    #[test]
    fn create_rejects_existing_ids_and_update_requires_one() {
        let store = InMemoryListingStore::default();
        let tag = PropertyTag {
            id: TagId(4),
            name: "Luxury".to_string(),
        };

        store.create(tag.clone()).expect("insert");
        assert!(matches!(
            store.create(tag.clone()),
            Err(RepositoryError::Conflict)
        ));

        let missing = PropertyTag {
            id: TagId(9),
            name: "Missing".to_string(),
        };
        assert!(matches!(
            store.update(missing),
            Err(RepositoryError::NotFound)
        ));
    }

    #[test]
    fn clones_share_tables() {
        let store = InMemoryListingStore::default();
        let handle = store.clone();
        store
            .create(PropertyTag {
                id: TagId(1),
                name: "Cozy".to_string(),
            })
            .expect("insert");

        let count = Repository::<PropertyTag>::count_matching(&handle, &|tag| tag.name == "Cozy")
            .expect("count");
        assert_eq!(count, 1);
    }
}
