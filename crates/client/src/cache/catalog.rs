//! Typed cache adapters for catalog data.
//!
//! Thin wrappers over [`CacheStore`] with the fixed key namespaces from
//! [`super::keys`] and the 24-hour default TTL. The interesting part is the
//! secondary index: products are cached by id AND by barcode, and both
//! indices are written together so a barcode lookup succeeds even when only
//! the product list was ever fetched.

use std::sync::Arc;
use std::time::Duration;

use kirana_core::{Barcode, ProductId};

use super::keys;
use super::store::{CacheStore, DEFAULT_TTL};
use crate::backend::types::{Product, Store};
use crate::storage::KeyValueStore;

/// Typed catalog cache: products, barcodes, categories, stores.
#[derive(Debug)]
pub struct CatalogCache<S> {
    cache: CacheStore<S>,
    ttl: Duration,
}

impl<S> Clone for CatalogCache<S> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            ttl: self.ttl,
        }
    }
}

impl<S: KeyValueStore> CatalogCache<S> {
    /// Create a catalog cache with the default 24-hour TTL.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            cache: CacheStore::new(store),
            ttl: DEFAULT_TTL,
        }
    }

    /// Override the TTL (tests and short-lived kiosk sessions).
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Cache the product list, fanning each product out under its id key and
    /// barcode key so both indices stay consistent with the list.
    pub async fn set_products(&self, products: &[Product]) {
        self.cache.set(keys::PRODUCTS, &products, self.ttl).await;
        for product in products {
            self.index_product(product).await;
        }
    }

    /// Cached product list, if present and fresh.
    pub async fn get_products(&self) -> Option<Vec<Product>> {
        self.cache.get(keys::PRODUCTS).await
    }

    /// Cache a single product under its id key and, when barcoded, its
    /// barcode key.
    pub async fn set_product(&self, product: &Product) {
        self.index_product(product).await;
    }

    /// Cached product by id.
    pub async fn get_product(&self, id: ProductId) -> Option<Product> {
        self.cache.get(&keys::product(id)).await
    }

    /// Cached product by barcode (secondary index).
    pub async fn get_product_by_barcode(&self, code: &Barcode) -> Option<Product> {
        self.cache.get(&keys::barcode(code)).await
    }

    async fn index_product(&self, product: &Product) {
        self.cache
            .set(&keys::product(product.id), product, self.ttl)
            .await;
        if let Some(code) = &product.barcode {
            self.cache.set(&keys::barcode(code), product, self.ttl).await;
        }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Cache the category list.
    pub async fn set_categories(&self, categories: &[String]) {
        self.cache.set(keys::CATEGORIES, &categories, self.ttl).await;
    }

    /// Cached categories.
    ///
    /// When no explicit category cache exists, falls back to deriving the
    /// list from the cached products by deduplicating their `category`
    /// fields, so a stale-but-present product list still yields a browsable
    /// category screen.
    pub async fn get_categories(&self) -> Option<Vec<String>> {
        if let Some(categories) = self.cache.get::<Vec<String>>(keys::CATEGORIES).await {
            return Some(categories);
        }

        let products = self.get_products().await?;
        let mut categories: Vec<String> = Vec::new();
        for product in products {
            if let Some(category) = product.category
                && !categories.contains(&category)
            {
                categories.push(category);
            }
        }
        if categories.is_empty() {
            None
        } else {
            Some(categories)
        }
    }

    // =========================================================================
    // Stores
    // =========================================================================

    /// Cache the store list.
    pub async fn set_stores(&self, stores: &[Store]) {
        self.cache.set(keys::STORES, &stores, self.ttl).await;
    }

    /// Cached stores.
    pub async fn get_stores(&self) -> Option<Vec<Store>> {
        self.cache.get(keys::STORES).await
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Clear every cached catalog entry ("clear cache" user action).
    ///
    /// Returns the number of entries removed.
    pub async fn clear_all(&self) -> usize {
        self.cache.clear_prefix(keys::CACHE_PREFIX).await
    }

    /// Total serialized size of the catalog cache in bytes.
    pub async fn cache_size(&self) -> u64 {
        self.cache.size_of_prefix(keys::CACHE_PREFIX).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use kirana_core::StoreId;
    use rust_decimal::dec;

    fn product(id: i64, barcode: Option<&str>, category: &str) -> Product {
        Product {
            id: ProductId::new(id),
            sku: format!("SKU-{id}"),
            barcode: barcode.map(Barcode::new),
            name: format!("Product {id}"),
            mrp: dec!(100),
            tax_rate: dec!(5),
            category: Some(category.to_string()),
            attributes: crate::backend::types::ProductAttributes::default(),
            image_url: None,
        }
    }

    fn cache() -> CatalogCache<MemoryStore> {
        CatalogCache::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_dual_index_consistency() {
        let cache = cache();
        let p = product(1, Some("8901234567890"), "Dairy");
        cache.set_product(&p).await;

        assert_eq!(cache.get_product(p.id).await.as_ref(), Some(&p));
        assert_eq!(
            cache
                .get_product_by_barcode(&Barcode::new("8901234567890"))
                .await
                .as_ref(),
            Some(&p)
        );
    }

    #[tokio::test]
    async fn test_product_without_barcode_only_indexed_by_id() {
        let cache = cache();
        let p = product(2, None, "Dairy");
        cache.set_product(&p).await;

        assert!(cache.get_product(p.id).await.is_some());
        assert!(
            cache
                .get_product_by_barcode(&Barcode::new("anything"))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_list_write_fans_out_to_both_indices() {
        let cache = cache();
        let products = vec![
            product(1, Some("111"), "Dairy"),
            product(2, None, "Snacks"),
            product(3, Some("333"), "Snacks"),
        ];
        cache.set_products(&products).await;

        assert_eq!(cache.get_products().await.unwrap().len(), 3);
        // Barcode lookup works even though only the list was cached.
        assert_eq!(
            cache
                .get_product_by_barcode(&Barcode::new("333"))
                .await
                .unwrap()
                .id,
            ProductId::new(3)
        );
        assert_eq!(
            cache.get_product(ProductId::new(2)).await.unwrap().id,
            ProductId::new(2)
        );
    }

    #[tokio::test]
    async fn test_categories_derived_from_cached_products() {
        let cache = cache();
        cache
            .set_products(&[
                product(1, None, "Dairy"),
                product(2, None, "Snacks"),
                product(3, None, "Dairy"),
            ])
            .await;

        // No explicit category cache: derive by dedup, order of first sight.
        let categories = cache.get_categories().await.unwrap();
        assert_eq!(categories, vec!["Dairy".to_string(), "Snacks".to_string()]);
    }

    #[tokio::test]
    async fn test_explicit_categories_win_over_derivation() {
        let cache = cache();
        cache.set_products(&[product(1, None, "Dairy")]).await;
        cache.set_categories(&["Everything".to_string()]).await;

        assert_eq!(
            cache.get_categories().await.unwrap(),
            vec!["Everything".to_string()]
        );
    }

    #[tokio::test]
    async fn test_categories_miss_when_nothing_cached() {
        let cache = cache();
        assert!(cache.get_categories().await.is_none());
    }

    #[tokio::test]
    async fn test_stores_roundtrip() {
        let cache = cache();
        let stores = vec![Store {
            id: StoreId::new(1),
            name: "Indiranagar".to_string(),
            address: Some("100 Feet Rd".to_string()),
            city: Some("Bengaluru".to_string()),
            is_active: true,
        }];
        cache.set_stores(&stores).await;
        assert_eq!(cache.get_stores().await.unwrap(), stores);
    }

    #[tokio::test]
    async fn test_clear_all_and_size() {
        let cache = cache();
        cache.set_products(&[product(1, Some("111"), "Dairy")]).await;
        assert!(cache.cache_size().await > 0);

        let removed = cache.clear_all().await;
        // list + id index + barcode index
        assert_eq!(removed, 3);
        assert!(cache.get_products().await.is_none());
        assert_eq!(cache.cache_size().await, 0);
    }
}
