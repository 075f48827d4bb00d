//! TTL-bounded persistent caching.
//!
//! [`store`] implements the generic expiring envelope over a
//! [`crate::storage::KeyValueStore`]; [`catalog`] adds the typed domain
//! adapters (products, barcodes, categories, stores) with their fixed key
//! namespaces.

pub mod catalog;
pub mod keys;
pub mod store;

pub use catalog::CatalogCache;
pub use store::{CacheStore, DEFAULT_TTL};
