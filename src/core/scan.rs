//! Purpose: Materialize a whole table by listing ids and reading each record.
//! Exports: `Store::select_all` (inherent method).
//! Role: The only read path the query and aggregation layers build on.
//! Invariants: Not atomic; each id is read under its own lock acquisition.
//! Invariants: A record deleted after listing reads as `T::default()` (soft miss).
use std::collections::BTreeMap;

use crate::core::error::Error;
use crate::core::location::Location;
use crate::core::record::Record;
use crate::core::store::Store;

impl Store {
    pub fn select_all<T: Record>(&self, location: &Location) -> Result<BTreeMap<String, T>, Error> {
        let ids = self.select_ids::<T>(location)?;
        let records = self.read_listed::<T>(ids, location)?;
        tracing::debug!(table = %T::table_name(), count = records.len(), "select_all");
        Ok(records)
    }

    // Ids come from an earlier listing; each one is read independently.
    fn read_listed<T: Record>(
        &self,
        ids: Vec<String>,
        location: &Location,
    ) -> Result<BTreeMap<String, T>, Error> {
        let mut records = BTreeMap::new();
        for id in ids {
            let record = self.select::<T>(&id, location)?;
            records.insert(id, record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::location::Location;
    use crate::core::record::Record;
    use crate::core::store::Store;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
    struct Animal {
        name: String,
        legs: i64,
    }

    impl Record for Animal {}

    #[test]
    fn select_all_keys_records_by_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::new();
        let location = Location::from(dir.path());
        for (id, name, legs) in [("cat", "Watson", 3), ("dog", "Wallander", 4)] {
            let animal = Animal {
                name: name.to_string(),
                legs,
            };
            store.insert(id, &animal, &location).expect("insert");
        }

        let all = store.select_all::<Animal>(&location).expect("select_all");
        let ids: Vec<_> = all.keys().cloned().collect();
        assert_eq!(ids, vec!["cat", "dog"]);
        assert_eq!(all["dog"].legs, 4);
    }

    #[test]
    fn record_deleted_after_listing_reads_as_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::new();
        let location = Location::from(dir.path());
        for (id, legs) in [("cat", 3), ("dog", 4)] {
            let animal = Animal {
                name: id.to_string(),
                legs,
            };
            store.insert(id, &animal, &location).expect("insert");
        }

        let ids = store.select_ids::<Animal>(&location).expect("ids");
        store.delete::<Animal>("dog", &location).expect("delete");

        let all = store
            .read_listed::<Animal>(ids, &location)
            .expect("read_listed");
        assert_eq!(all.len(), 2);
        assert_eq!(all["dog"], Animal::default());
        assert_eq!(all["cat"].legs, 3);
    }

    #[test]
    fn empty_table_scans_to_empty_map() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::new();
        let location = Location::from(dir.path());
        store
            .insert("tmp", &Animal::default(), &location)
            .expect("insert");
        store.delete::<Animal>("tmp", &location).expect("delete");

        let all = store.select_all::<Animal>(&location).expect("select_all");
        assert!(all.is_empty());
    }
}
