//! Kirana Core - Shared types library.
//!
//! This crate provides common types used across all Kirana components:
//! - `client` - Commerce client core (cache, cart ledger, checkout)
//! - `cli` - Command-line tools for cache maintenance and diagnostics
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients,
//! no storage access. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, phone numbers, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
