//! Purpose: Fold-style aggregation over filtered scans (counts, sums, custom accumulators).
//! Exports: `Store::{select_where_aggreg, select_aggreg, count_where_aggreg, count_aggreg,
//!          count_where, count, count_filter, sum, sum_where, sum_filter}`.
//! Role: Top layer; everything here is a scan from `query`/`scan` plus a fold.
//! Invariants: Accumulators are called exactly once per surviving record, in ascending id order.
//! Invariants: Sums only accept integer fields; anything else is a `Field` error.
use std::collections::BTreeMap;

use crate::core::error::{Error, ErrorKind};
use crate::core::location::Location;
use crate::core::query::FieldFilter;
use crate::core::record::Record;
use crate::core::store::Store;

impl Store {
    /// Filtered scan that also feeds each surviving record to `aggregate`,
    /// threading the caller-owned accumulator `acc` through every call.
    pub fn select_where_aggreg<T, A, P, F>(
        &self,
        predicate: P,
        acc: &mut A,
        aggregate: F,
        location: &Location,
    ) -> Result<BTreeMap<String, T>, Error>
    where
        T: Record,
        P: FnMut(&T) -> bool,
        F: FnMut(&mut A, &str, &T),
    {
        let records = self.select_where(predicate, location)?;
        fold_into(&records, acc, aggregate);
        tracing::debug!(table = %T::table_name(), count = records.len(), "select_where_aggreg");
        Ok(records)
    }

    pub fn select_aggreg<T, A, F>(
        &self,
        acc: &mut A,
        aggregate: F,
        location: &Location,
    ) -> Result<BTreeMap<String, T>, Error>
    where
        T: Record,
        F: FnMut(&mut A, &str, &T),
    {
        let records = self.select_all::<T>(location)?;
        fold_into(&records, acc, aggregate);
        tracing::debug!(table = %T::table_name(), count = records.len(), "select_aggreg");
        Ok(records)
    }

    /// Like [`Store::select_where_aggreg`], returning the number of matches.
    pub fn count_where_aggreg<T, A, P, F>(
        &self,
        predicate: P,
        acc: &mut A,
        aggregate: F,
        location: &Location,
    ) -> Result<usize, Error>
    where
        T: Record,
        P: FnMut(&T) -> bool,
        F: FnMut(&mut A, &str, &T),
    {
        let records = self.select_where(predicate, location)?;
        let count = fold_into(&records, acc, aggregate);
        tracing::debug!(table = %T::table_name(), count, "count_where_aggreg");
        Ok(count)
    }

    pub fn count_aggreg<T, A, F>(&self, acc: &mut A, aggregate: F, location: &Location) -> Result<usize, Error>
    where
        T: Record,
        F: FnMut(&mut A, &str, &T),
    {
        let records = self.select_all::<T>(location)?;
        let count = fold_into(&records, acc, aggregate);
        tracing::debug!(table = %T::table_name(), count, "count_aggreg");
        Ok(count)
    }

    pub fn count_where<T, P>(&self, predicate: P, location: &Location) -> Result<usize, Error>
    where
        T: Record,
        P: FnMut(&T) -> bool,
    {
        let count = self.select_where(predicate, location)?.len();
        tracing::debug!(table = %T::table_name(), count, "count_where");
        Ok(count)
    }

    pub fn count<T: Record>(&self, location: &Location) -> Result<usize, Error> {
        let count = self.select_all::<T>(location)?.len();
        tracing::debug!(table = %T::table_name(), count, "count");
        Ok(count)
    }

    pub fn count_filter<T: Record>(&self, filter: &FieldFilter, location: &Location) -> Result<usize, Error> {
        let count = self.select_filter::<T>(filter, location)?.len();
        tracing::debug!(table = %T::table_name(), count, "count_filter");
        Ok(count)
    }

    /// Sum of the integer field `field` over every record in the table.
    ///
    /// Only integer values are summed. A float, string, bool, or null value,
    /// a record lacking the field, or an `i64` overflow is an
    /// `ErrorKind::Field` error naming the offending record id.
    pub fn sum<T: Record>(&self, field: &str, location: &Location) -> Result<i64, Error> {
        check_sum_field::<T>(field)?;
        let records = self.select_all::<T>(location)?;
        let total = sum_field(&records, field)?;
        tracing::debug!(table = %T::table_name(), field, total, "sum");
        Ok(total)
    }

    /// [`Store::sum`] restricted to records for which `predicate` returns true.
    pub fn sum_where<T, P>(&self, field: &str, predicate: P, location: &Location) -> Result<i64, Error>
    where
        T: Record,
        P: FnMut(&T) -> bool,
    {
        check_sum_field::<T>(field)?;
        let records = self.select_where(predicate, location)?;
        let total = sum_field(&records, field)?;
        tracing::debug!(table = %T::table_name(), field, total, "sum_where");
        Ok(total)
    }

    pub fn sum_filter<T: Record>(
        &self,
        field: &str,
        filter: &FieldFilter,
        location: &Location,
    ) -> Result<i64, Error> {
        check_sum_field::<T>(field)?;
        let records = self.select_filter::<T>(filter, location)?;
        let total = sum_field(&records, field)?;
        tracing::debug!(table = %T::table_name(), field, total, "sum_filter");
        Ok(total)
    }
}

fn fold_into<T, A, F>(records: &BTreeMap<String, T>, acc: &mut A, mut aggregate: F) -> usize
where
    F: FnMut(&mut A, &str, &T),
{
    for (id, record) in records {
        aggregate(acc, id, record);
    }
    records.len()
}

fn check_sum_field<T: Record>(field: &str) -> Result<(), Error> {
    if !T::shape()?.allows(field) {
        return Err(Error::new(ErrorKind::Field).with_message(format!(
            "unknown field `{field}` for table `{}`",
            T::table_name()
        )));
    }
    Ok(())
}

fn sum_field<T: Record>(records: &BTreeMap<String, T>, field: &str) -> Result<i64, Error> {
    let mut total: i64 = 0;
    for (id, record) in records {
        let value = match record.field(field)? {
            Some(value) => value,
            None => {
                return Err(Error::new(ErrorKind::Field)
                    .with_message(format!("record has no field `{field}`"))
                    .with_id(id));
            }
        };
        let Some(number) = value.as_i64() else {
            return Err(Error::new(ErrorKind::Field)
                .with_message(format!("field `{field}` is not an integer (got {value})"))
                .with_id(id)
                .with_hint("Sums are defined for integer fields only."));
        };
        total = total.checked_add(number).ok_or_else(|| {
            Error::new(ErrorKind::Field)
                .with_message(format!("sum of field `{field}` overflows a 64-bit integer"))
                .with_id(id)
        })?;
    }
    Ok(total)
}
