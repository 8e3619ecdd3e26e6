//! Purpose: WHERE-style filtering over a full table scan.
//! Exports: `FieldFilter`; `Store::{select_where, select_id_where, select_filter}`.
//! Role: Predicate filters are native closures; field filters are declarative equality maps.
//! Invariants: Field filters compare trimmed, lowercased string renderings.
//! Invariants: Filter keys unknown to a closed record shape fail before any file is read.
//! Invariants: For open shapes, a record lacking a filtered field does not match.
use std::collections::{BTreeMap, HashMap};

use crate::core::error::{Error, ErrorKind};
use crate::core::location::Location;
use crate::core::record::{Record, RecordShape, normalize};
use crate::core::store::Store;

/// Field-name to expected-value equality filter (`Name = "jonas" AND Age = "44"`).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldFilter {
    fields: BTreeMap<String, String>,
}

impl FieldFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_eq(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.fields.insert(name.into(), value.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Check every filter key against the record type's shape.
    pub fn validate<T: Record>(&self) -> Result<(), Error> {
        let shape = T::shape()?;
        for name in self.fields.keys() {
            if !shape.allows(name) {
                return Err(unknown_field::<T>(name, &shape));
            }
        }
        Ok(())
    }

    pub fn matches<T: Record>(&self, record: &T) -> Result<bool, Error> {
        for (name, expected) in &self.fields {
            match record.field(name)? {
                Some(actual) if actual.normalized() == normalize(expected) => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldFilter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for FieldFilter {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }
}

impl From<HashMap<String, String>> for FieldFilter {
    fn from(fields: HashMap<String, String>) -> Self {
        fields.into_iter().collect()
    }
}

impl Store {
    /// Records for which `predicate` returns true.
    pub fn select_where<T, P>(
        &self,
        mut predicate: P,
        location: &Location,
    ) -> Result<BTreeMap<String, T>, Error>
    where
        T: Record,
        P: FnMut(&T) -> bool,
    {
        let records = self.select_matching(|record: &T| Ok(predicate(record)), location)?;
        tracing::debug!(table = %T::table_name(), count = records.len(), "select_where");
        Ok(records)
    }

    /// Ids of the records for which `predicate` returns true, in scan order.
    pub fn select_id_where<T, P>(&self, predicate: P, location: &Location) -> Result<Vec<String>, Error>
    where
        T: Record,
        P: FnMut(&T) -> bool,
    {
        let ids: Vec<String> = self
            .select_where(predicate, location)?
            .into_keys()
            .collect();
        tracing::debug!(table = %T::table_name(), count = ids.len(), "select_id_where");
        Ok(ids)
    }

    /// Records whose fields equal every value in `filter` (after normalization).
    pub fn select_filter<T: Record>(
        &self,
        filter: &FieldFilter,
        location: &Location,
    ) -> Result<BTreeMap<String, T>, Error> {
        filter.validate::<T>()?;
        let records = self.select_matching(|record: &T| filter.matches(record), location)?;
        tracing::debug!(
            table = %T::table_name(),
            fields = filter.len(),
            count = records.len(),
            "select_filter"
        );
        Ok(records)
    }

    /// Shared scan-and-filter loop; a failing predicate aborts the scan.
    pub(crate) fn select_matching<T, P>(
        &self,
        mut predicate: P,
        location: &Location,
    ) -> Result<BTreeMap<String, T>, Error>
    where
        T: Record,
        P: FnMut(&T) -> Result<bool, Error>,
    {
        let mut kept = BTreeMap::new();
        for (id, record) in self.select_all::<T>(location)? {
            if predicate(&record).map_err(|err| err.with_id(&id))? {
                kept.insert(id, record);
            }
        }
        Ok(kept)
    }
}

fn unknown_field<T: Record>(name: &str, shape: &RecordShape) -> Error {
    let err = Error::new(ErrorKind::Field).with_message(format!(
        "unknown field `{name}` for table `{}`",
        T::table_name()
    ));
    match shape {
        RecordShape::Closed(names) => {
            let known = names.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
            err.with_hint(format!("Known fields (case-sensitive): {known}"))
        }
        RecordShape::Open => err,
    }
}
