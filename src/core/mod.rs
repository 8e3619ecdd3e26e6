// Core modules implementing path resolution, record encoding, storage, and queries.
pub mod aggregate;
pub mod envelope;
pub mod error;
pub mod location;
pub mod query;
pub mod record;
pub mod scan;
pub mod store;
