mod common;

use common::Recording;
use queryset::{bson::doc, config::StoreConfig, prelude::*};
use std::time::Duration;

fn impatient(backend: Recording) -> DocumentStore<Recording> {
    DocumentStore::with_config(
        backend,
        StoreConfig::new().with_operation_timeout(Duration::from_millis(20)),
    )
}

#[tokio::test]
async fn slow_operations_time_out() {
    let store = impatient(Recording::new().delayed(Duration::from_millis(500)));
    let users = store.collection("users");

    let err = users.get_document(&QuerySet::new()).await.unwrap_err();
    assert!(err.is_timeout());
    assert!(matches!(err, DocumentStoreError::Timeout(d) if d == Duration::from_millis(20)));

    assert!(users.insert_document(doc! { "name": "late" }).await.unwrap_err().is_timeout());
    assert!(users.count_documents(&QuerySet::new()).await.unwrap_err().is_timeout());
}

#[tokio::test]
async fn fast_operations_finish_within_the_deadline() {
    let store = impatient(Recording::new());
    let users = store.collection("users");

    users.insert_document(doc! { "name": "quick" }).await.unwrap();

    assert_eq!(users.count_documents(&QuerySet::new()).await.unwrap(), 1);
}

#[test]
fn default_deadlines_are_fifteen_minutes() {
    let config = StoreConfig::default();

    assert_eq!(config.operation_timeout, Duration::from_secs(900));
    assert_eq!(config.join_timeout, Duration::from_secs(900));
}
