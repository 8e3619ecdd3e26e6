//! Purpose: File-backed record primitives: insert, select, list ids, delete.
//! Exports: `Store`, `StoreOptions`, `Durability`.
//! Role: Lowest stateful layer; scans, queries, and aggregates compose these calls.
//! Invariants: One record per `<table dir>/<id>.json`; the file is the only durable copy.
//! Invariants: The four primitives are mutually exclusive within one `Store`.
//! Invariants: A missing record on `select` is a soft miss (default value), not an error.
//! Notes: No cross-process locking; two processes sharing a directory can race.
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::envelope::{self, RECORD_EXTENSION};
use crate::core::error::{Error, ErrorKind};
use crate::core::location::{Location, resolve_table_path};
use crate::core::record::Record;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Durability {
    #[default]
    Fast,
    /// `fsync` each record file after writing it.
    Flush,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StoreOptions {
    pub durability: Durability,
}

impl StoreOptions {
    pub fn new(durability: Durability) -> Self {
        Self { durability }
    }
}

/// Handle to a set of tables. Each handle owns its lock, so independent
/// stores never contend with each other.
#[derive(Debug, Default)]
pub struct Store {
    options: StoreOptions,
    lock: Mutex<()>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            options,
            lock: Mutex::new(()),
        }
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    pub fn table_path<T: Record>(&self, location: &Location) -> PathBuf {
        resolve_table_path(&T::table_name(), location)
    }

    pub fn record_path<T: Record>(&self, id: &str, location: &Location) -> Result<PathBuf, Error> {
        validate_id(id)?;
        Ok(record_file(&self.table_path::<T>(location), id))
    }

    /// Write `record` under `id`, creating the table directory if needed.
    /// An existing record with the same id is replaced wholesale.
    pub fn insert<T: Record>(&self, id: &str, record: &T, location: &Location) -> Result<(), Error> {
        validate_id(id)?;
        let bytes = envelope::encode(id, record)?;
        let table = self.table_path::<T>(location);
        let path = record_file(&table, id);

        let _guard = self.guard();
        fs::create_dir_all(&table).map_err(|err| {
            Error::from_io(err, &table).with_message("failed to create table directory")
        })?;
        write_record(&path, &bytes, self.options.durability).map_err(|err| {
            Error::from_io(err, &path)
                .with_message("failed to write record")
                .with_id(id)
        })?;
        tracing::debug!(table = %table.display(), id, bytes = bytes.len(), "insert");
        Ok(())
    }

    /// Read one record, returning `T::default()` when it does not exist.
    pub fn select<T: Record>(&self, id: &str, location: &Location) -> Result<T, Error> {
        self.select_or(id, T::default(), location)
    }

    /// Read one record, returning `zero` unchanged when it does not exist.
    pub fn select_or<T: Record>(&self, id: &str, zero: T, location: &Location) -> Result<T, Error> {
        Ok(self.get(id, location)?.unwrap_or(zero))
    }

    /// Presence-checking read: `Ok(None)` when the record file does not exist.
    pub fn get<T: Record>(&self, id: &str, location: &Location) -> Result<Option<T>, Error> {
        validate_id(id)?;
        let table = self.table_path::<T>(location);
        let path = record_file(&table, id);

        let bytes = {
            let _guard = self.guard();
            match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), id, miss = true, "select");
                    return Ok(None);
                }
                Err(err) => {
                    return Err(Error::from_io(err, &path)
                        .with_message("failed to read record")
                        .with_id(id));
                }
            }
        };

        let (stored_id, record) = envelope::decode::<T>(&bytes)
            .map_err(|err| err.with_path(&path).with_id(id))?;
        if stored_id != id {
            tracing::warn!(
                path = %path.display(),
                id,
                stored_id = %stored_id,
                "record id does not match file name"
            );
        }
        tracing::debug!(path = %path.display(), id, "select");
        Ok(Some(record))
    }

    pub fn contains<T: Record>(&self, id: &str, location: &Location) -> Result<bool, Error> {
        let path = self.record_path::<T>(id, location)?;
        let _guard = self.guard();
        path.try_exists()
            .map_err(|err| Error::from_io(err, &path).with_message("failed to stat record"))
    }

    /// Ids of every `<id>.json` regular file in the table directory, in directory order.
    /// Subdirectories and names that are not valid ids are skipped.
    /// A table that was never written is a `NotFound` error.
    pub fn select_ids<T: Record>(&self, location: &Location) -> Result<Vec<String>, Error> {
        let table = self.table_path::<T>(location);

        let _guard = self.guard();
        let entries = fs::read_dir(&table).map_err(|err| {
            Error::from_io(err, &table).with_message("failed to read table directory")
        })?;

        let suffix = format!(".{RECORD_EXTENSION}");
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read table directory entry")
                    .with_path(&table)
                    .with_source(err)
            })?;
            if !is_record_entry(&entry) {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(id) = name.strip_suffix(suffix.as_str()) else {
                continue;
            };
            if validate_id(id).is_err() {
                tracing::debug!(table = %table.display(), name, "skipping unaddressable entry");
                continue;
            }
            ids.push(id.to_string());
        }
        tracing::debug!(table = %table.display(), count = ids.len(), "select_ids");
        Ok(ids)
    }

    /// Remove one record. Deleting a record that does not exist is a `NotFound` error.
    pub fn delete<T: Record>(&self, id: &str, location: &Location) -> Result<(), Error> {
        let path = self.record_path::<T>(id, location)?;

        let _guard = self.guard();
        fs::remove_file(&path).map_err(|err| {
            Error::from_io(err, &path)
                .with_message("failed to delete record")
                .with_id(id)
        })?;
        tracing::debug!(path = %path.display(), id, "delete");
        Ok(())
    }

    // The lock guards file access only, never in-memory state, so a poisoned
    // lock is safe to reuse.
    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn record_file(table: &Path, id: &str) -> PathBuf {
    table.join(format!("{id}.{RECORD_EXTENSION}"))
}

// Only regular files (or symlinks to them) can hold a record.
fn is_record_entry(entry: &fs::DirEntry) -> bool {
    match entry.file_type() {
        Ok(file_type) if file_type.is_symlink() => entry.path().is_file(),
        Ok(file_type) => file_type.is_file(),
        Err(_) => false,
    }
}

fn write_record(path: &Path, bytes: &[u8], durability: Durability) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    if durability == Durability::Flush {
        file.sync_all()?;
    }
    Ok(())
}

fn validate_id(id: &str) -> Result<(), Error> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("invalid record id")
            .with_id(id)
            .with_hint("Record ids must be non-empty and cannot be `.` or `..`."));
    }
    if id.contains(['/', '\\']) {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("record id must not contain path separators")
            .with_id(id)
            .with_hint("Use a flat id such as `p0926`; tables are chosen with a location."));
    }
    Ok(())
}
