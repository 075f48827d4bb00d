//! Kirana commerce client core.
//!
//! This crate implements the device-local half of the Kirana retail shopping
//! app: the expiring key-value cache, the typed catalog cache adapters, the
//! network reachability tracker, the cart ledger with derived totals, and the
//! order submission pipeline that turns a local cart into a paid remote order
//! with a scannable receipt.
//!
//! # Architecture
//!
//! - [`storage`] - persistent string key-value stores (filesystem, in-memory)
//! - [`cache`] - TTL-bounded cache envelope plus typed catalog adapters
//! - [`net`] - connectivity state tracking and the online/offline branch point
//! - [`cart`] - pure cart ledger, snapshot persistence, and the shared handle
//! - [`backend`] - typed contracts for the hosted REST backend and OTP auth
//! - [`catalog`] - offline-aware catalog fetchers (network first, cache fallback)
//! - [`payment`] - payment gateway contract and error translation
//! - [`checkout`] - sequential order submission flow and QR receipt tokens
//!
//! Remote collaborators (the hosted backend, the OTP auth service, the
//! payment gateway) are consumed through traits so the whole pipeline can be
//! exercised against in-memory fakes.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cache;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod net;
pub mod payment;
pub mod storage;

pub use config::AppConfig;
pub use error::{AppError, Result};
