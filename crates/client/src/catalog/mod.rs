//! Offline-aware catalog access.
//!
//! [`Catalog`] is the facade the UI layer reads products, categories and
//! stores through. Every accessor applies the same policy:
//!
//! - online: fetch from the backend and write through to the cache;
//! - the fetch fails for outage-shaped reasons: fall back to the cache and
//!   only rethrow on a double miss;
//! - offline: serve from the cache, or fail with
//!   [`AppError::NoCachedData`] naming the missing resource.
//!
//! A remote "not found" is an authoritative answer and is returned as
//! `Ok(None)` without consulting the cache.

use std::sync::Arc;

use tracing::{instrument, warn};

use kirana_core::{Barcode, ProductId, StoreId};

use crate::backend::CommerceBackend;
use crate::backend::types::{Product, Store};
use crate::cache::CatalogCache;
use crate::error::{AppError, Result};
use crate::net::ReachabilityTracker;
use crate::storage::KeyValueStore;

/// Catalog reads with cache write-through and offline fallback.
#[derive(Debug, Clone)]
pub struct Catalog<S, B> {
    backend: B,
    cache: CatalogCache<S>,
    net: ReachabilityTracker,
}

impl<S: KeyValueStore, B: CommerceBackend> Catalog<S, B> {
    pub fn new(backend: B, store: Arc<S>, net: ReachabilityTracker) -> Self {
        Self {
            backend,
            cache: CatalogCache::new(store),
            net,
        }
    }

    /// The typed cache, for maintenance actions (clear, size).
    #[must_use]
    pub const fn cache(&self) -> &CatalogCache<S> {
        &self.cache
    }

    /// Products available at `store_id`.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn get_products(&self, store_id: StoreId) -> Result<Vec<Product>> {
        if !self.net.is_online() {
            return self
                .cache
                .get_products()
                .await
                .ok_or(AppError::NoCachedData("products"));
        }

        match self.backend.fetch_products(store_id).await {
            Ok(products) => {
                self.cache.set_products(&products).await;
                Ok(products)
            }
            Err(e) => {
                if !e.is_fallback_worthy() {
                    return Err(e.into());
                }
                warn!(error = %e, "product list fetch failed, trying cache");
                self.cache
                    .get_products()
                    .await
                    .ok_or(AppError::NoCachedData("products"))
            }
        }
    }

    /// A product by id; `Ok(None)` when it does not exist anywhere.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        if !self.net.is_online() {
            return Ok(self.cache.get_product(id).await);
        }

        match self.backend.fetch_product(id).await {
            Ok(Some(product)) => {
                self.cache.set_product(&product).await;
                Ok(Some(product))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                if !e.is_fallback_worthy() {
                    return Err(e.into());
                }
                warn!(error = %e, "product fetch failed, trying cache");
                Ok(self.cache.get_product(id).await)
            }
        }
    }

    /// A product by scanned barcode; `Ok(None)` for an unknown code.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn get_product_by_barcode(&self, code: &Barcode) -> Result<Option<Product>> {
        if !self.net.is_online() {
            return Ok(self.cache.get_product_by_barcode(code).await);
        }

        match self.backend.fetch_product_by_barcode(code).await {
            Ok(Some(product)) => {
                self.cache.set_product(&product).await;
                Ok(Some(product))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                if !e.is_fallback_worthy() {
                    return Err(e.into());
                }
                warn!(error = %e, "barcode fetch failed, trying cache");
                Ok(self.cache.get_product_by_barcode(code).await)
            }
        }
    }

    /// Category names for the browse screen.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Vec<String>> {
        if !self.net.is_online() {
            return self
                .cache
                .get_categories()
                .await
                .ok_or(AppError::NoCachedData("categories"));
        }

        match self.backend.fetch_categories().await {
            Ok(categories) => {
                self.cache.set_categories(&categories).await;
                Ok(categories)
            }
            Err(e) => {
                if !e.is_fallback_worthy() {
                    return Err(e.into());
                }
                warn!(error = %e, "category fetch failed, trying cache");
                self.cache
                    .get_categories()
                    .await
                    .ok_or(AppError::NoCachedData("categories"))
            }
        }
    }

    /// Active stores.
    #[instrument(skip(self))]
    pub async fn get_stores(&self) -> Result<Vec<Store>> {
        if !self.net.is_online() {
            return self
                .cache
                .get_stores()
                .await
                .ok_or(AppError::NoCachedData("stores"));
        }

        match self.backend.fetch_stores().await {
            Ok(stores) => {
                self.cache.set_stores(&stores).await;
                Ok(stores)
            }
            Err(e) => {
                if !e.is_fallback_worthy() {
                    return Err(e.into());
                }
                warn!(error = %e, "store fetch failed, trying cache");
                self.cache
                    .get_stores()
                    .await
                    .ok_or(AppError::NoCachedData("stores"))
            }
        }
    }

}
