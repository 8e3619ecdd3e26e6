//! Purpose: Define the stable public Rust API boundary for docshelf.
//! Exports: Store handle, locations, record capability, filters, and errors.
//! Role: Public, additive-only surface; applications import from here.
//! Invariants: Everything callers need is re-exported; `core` paths may move.

mod document;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::location::{Location, resolve_table_path};
pub use crate::core::query::FieldFilter;
pub use crate::core::record::{FieldValue, Record, RecordShape, type_table_name};
pub use crate::core::store::{Durability, Store, StoreOptions};
pub use document::Document;

pub type ApiResult<T> = Result<T, Error>;
