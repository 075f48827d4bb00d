//! CLI command implementations.

pub mod cache;
pub mod net;
pub mod receipt;
