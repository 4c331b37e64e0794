mod common;

use common::{InMemoryObjectStore, TSV};
use event_pipeline::services::catalog::ObjectCatalog;
use std::sync::Arc;

fn keys(objects: impl Iterator<Item = event_pipeline::models::StorageObject>) -> Vec<String> {
    objects.map(|o| o.key).collect()
}

#[tokio::test]
async fn test_catalog_applies_size_and_key_gates() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.put_with_size("events/2021-06-01.tsv", TSV, 100, vec![]);
    store.put_with_size("events/2021-06-02.tsv", TSV, 0, vec![]);
    store.put_with_size("events/2021-06-03.tsv", TSV, 1001, vec![]);
    store.put_with_size("events/2021-06-04.tsv", TSV, 1000, vec![]);
    store.put_with_size("events/readme.txt", "text/plain", 10, vec![]);
    store.put_with_size("events/2021-06-05.csv", TSV, 10, vec![]);
    store.put_with_size("events/", "application/x-directory", 0, vec![]);

    let catalog = ObjectCatalog::new(store.clone(), 1000);
    let candidates = catalog.list_candidates("events/").await.unwrap();

    assert_eq!(
        keys(candidates),
        vec!["events/2021-06-01.tsv", "events/2021-06-04.tsv"]
    );
}

#[tokio::test]
async fn test_catalog_keeps_listing_order() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.put_with_size("events/2021-06-03.tsv", TSV, 10, vec![]);
    store.put_with_size("events/bad.tsv", TSV, 10, vec![]);
    store.put_with_size("events/2021-06-01.tsv", TSV, 10, vec![]);
    store.put_with_size("events/2021-06-02.tsv", TSV, 0, vec![]);

    let catalog = ObjectCatalog::new(store.clone(), 1000);
    let candidates = catalog.list_candidates("events/").await.unwrap();

    assert_eq!(
        keys(candidates),
        vec!["events/2021-06-03.tsv", "events/2021-06-01.tsv"]
    );
}

#[tokio::test]
async fn test_catalog_accepts_prefixed_daily_exports() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.put_with_size("events/export_2021-06-01.tsv", TSV, 10, vec![]);
    store.put_with_size("events/backup-2021-06-02.tsv", TSV, 10, vec![]);
    store.put_with_size("events/export_2021-06-03.tsv.gz", TSV, 10, vec![]);

    let catalog = ObjectCatalog::new(store.clone(), 1000);
    let candidates = catalog.list_candidates("events/").await.unwrap();

    assert_eq!(
        keys(candidates),
        vec!["events/export_2021-06-01.tsv", "events/backup-2021-06-02.tsv"]
    );
}

#[tokio::test]
async fn test_catalog_only_lists_prefix() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.put_with_size("events/2021-06-01.tsv", TSV, 10, vec![]);
    store.put_with_size("archive/2021-05-01.tsv", TSV, 10, vec![]);

    let catalog = ObjectCatalog::new(store.clone(), 1000);

    let first = keys(catalog.list_candidates("events/").await.unwrap());
    assert_eq!(first, vec!["events/2021-06-01.tsv"]);

    // A fresh call lists again
    let second = keys(catalog.list_candidates("events/").await.unwrap());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_catalog_propagates_listing_failure() {
    let store = Arc::new(InMemoryObjectStore::failing());
    let catalog = ObjectCatalog::new(store, 1000);
    assert!(catalog.list_candidates("events/").await.is_err());
}
