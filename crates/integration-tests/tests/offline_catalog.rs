//! Offline catalog behavior against real on-disk storage.
//!
//! These run the catalog facade over [`FsStore`] in a temp directory, so the
//! cache survives a simulated app restart the way it does on a device.
//!
//! Run with: cargo test -p kirana-integration-tests

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal::dec;

use kirana_client::AppError;
use kirana_client::catalog::Catalog;
use kirana_client::net::ReachabilityTracker;
use kirana_client::storage::FsStore;
use kirana_core::{Barcode, ConnectionType, StoreId};

use kirana_integration_tests::{FailPoint, FakeBackend, product, store};

fn online_tracker() -> ReachabilityTracker {
    let tracker = ReachabilityTracker::new("http://127.0.0.1:1/generate_204").unwrap();
    tracker.update(true, Some(true), ConnectionType::Wifi);
    tracker
}

fn seeded_backend() -> FakeBackend {
    FakeBackend::with_catalog(
        vec![product(1, dec!(60), dec!(5)), product(2, dec!(30), dec!(18))],
        vec![store(1)],
    )
}

#[tokio::test]
async fn test_cache_survives_restart_and_serves_offline() {
    let dir = tempfile::tempdir().unwrap();
    let backend = seeded_backend();
    let net = online_tracker();

    // First run: online fetch populates the on-disk cache.
    {
        let fs = Arc::new(FsStore::open(dir.path()).await.unwrap());
        let catalog = Catalog::new(&backend, fs, net.clone());
        assert_eq!(catalog.get_products(StoreId::new(1)).await.unwrap().len(), 2);
        assert_eq!(catalog.get_stores().await.unwrap().len(), 1);
    }

    // Second run: fresh catalog over the same directory, fully offline.
    net.update(false, Some(false), ConnectionType::None);
    let fs = Arc::new(FsStore::open(dir.path()).await.unwrap());
    let catalog = Catalog::new(&backend, fs, net);

    let products = catalog.get_products(StoreId::new(1)).await.unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(catalog.get_stores().await.unwrap().len(), 1);

    // The barcode index was fanned out by the list write and also survives.
    let barcode = products[0].barcode.clone().unwrap();
    assert!(
        catalog
            .get_product_by_barcode(&barcode)
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_remote_outage_serves_cached_products() {
    let dir = tempfile::tempdir().unwrap();
    let backend = seeded_backend();
    let fs = Arc::new(FsStore::open(dir.path()).await.unwrap());
    let catalog = Catalog::new(&backend, fs, online_tracker());

    catalog.get_products(StoreId::new(1)).await.unwrap();

    // Still "online", but the backend starts failing.
    backend.fail_on(FailPoint::FetchProducts);
    assert_eq!(catalog.get_products(StoreId::new(1)).await.unwrap().len(), 2);

    // Recovery resumes remote fetches.
    backend.heal();
    assert_eq!(catalog.get_products(StoreId::new(1)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_offline_cold_cache_reports_missing_resource() {
    let dir = tempfile::tempdir().unwrap();
    let backend = seeded_backend();
    let net = online_tracker();
    net.update(false, Some(false), ConnectionType::None);
    let fs = Arc::new(FsStore::open(dir.path()).await.unwrap());
    let catalog = Catalog::new(&backend, fs, net);

    let err = catalog.get_products(StoreId::new(1)).await.unwrap_err();
    assert!(matches!(err, AppError::NoCachedData("products")));
    assert!(err.user_message().contains("offline"));

    // Unknown barcode offline is a miss, not an error.
    assert!(
        catalog
            .get_product_by_barcode(&Barcode::new("000"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_categories_offline_derive_from_cached_products() {
    let dir = tempfile::tempdir().unwrap();
    let backend = seeded_backend();
    let net = online_tracker();
    let fs = Arc::new(FsStore::open(dir.path()).await.unwrap());
    let catalog = Catalog::new(&backend, fs, net.clone());

    // Only the product list was ever fetched.
    catalog.get_products(StoreId::new(1)).await.unwrap();

    net.update(false, Some(false), ConnectionType::None);
    assert_eq!(
        catalog.get_categories().await.unwrap(),
        vec!["Grocery".to_string()]
    );
}

#[tokio::test]
async fn test_clear_cache_forgets_everything() {
    let dir = tempfile::tempdir().unwrap();
    let backend = seeded_backend();
    let net = online_tracker();
    let fs = Arc::new(FsStore::open(dir.path()).await.unwrap());
    let catalog = Catalog::new(&backend, fs, net.clone());

    catalog.get_products(StoreId::new(1)).await.unwrap();
    assert!(catalog.cache().cache_size().await > 0);

    let removed = catalog.cache().clear_all().await;
    assert!(removed > 0);

    net.update(false, Some(false), ConnectionType::None);
    let err = catalog.get_products(StoreId::new(1)).await.unwrap_err();
    assert!(matches!(err, AppError::NoCachedData("products")));
}
