//! Purpose: Embedded document store keeping typed records as one JSON file per record.
//! Exports: `api` (stable surface), `core` (store layers, errors, record capability).
//! Role: Library backing the `docshelf` CLI and any application that defines record types.
//! Invariants: Tables are directories; records are `<id>.json` envelopes inside them.
//! Invariants: Layers only call downward: location, store, scan, query, aggregate.
pub mod api;
pub mod core;
mod json;
