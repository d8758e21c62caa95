use queryset::{bson::doc, memory::InMemoryStore, prelude::*};

#[tokio::test]
async fn compound_unique_index_is_idempotent_and_enforced() {
    let store = DocumentStore::new(InMemoryStore::new());
    let slots = store.collection("slots");

    let keys = [("room", SortDirection::Asc), ("hour", SortDirection::Desc)];

    assert_eq!(slots.create_indexes(keys).await.unwrap(), "room_1_hour_-1");
    assert_eq!(slots.create_indexes(keys).await.unwrap(), "room_1_hour_-1");

    slots.insert_document(doc! { "room": "a", "hour": 9 }).await.unwrap();
    slots.insert_document(doc! { "room": "a", "hour": 10 }).await.unwrap();

    let err = slots
        .insert_document(doc! { "room": "a", "hour": 9 })
        .await
        .unwrap_err();
    assert!(err.is_duplicate_key());
}

#[tokio::test]
async fn unique_index_over_conflicting_data_fails() {
    let store = DocumentStore::new(InMemoryStore::new());
    let slots = store.collection("slots");

    slots
        .insert_documents(vec![doc! { "room": "a", "hour": 9 }, doc! { "room": "a", "hour": 9 }])
        .await
        .unwrap();

    let err = slots
        .create_indexes([("room", SortDirection::Asc), ("hour", SortDirection::Asc)])
        .await
        .unwrap_err();
    assert!(err.is_duplicate_key());

    assert!(slots.create_index("hour", SortDirection::Asc).await.unwrap_err().is_duplicate_key());
}

#[tokio::test]
async fn index_needs_at_least_one_key() {
    let store = DocumentStore::new(InMemoryStore::new());

    let err = store
        .collection("slots")
        .create_indexes(Vec::<(String, SortDirection)>::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::InvalidQuery(_)));
}

#[tokio::test]
async fn single_field_index_rejects_duplicate_updates() {
    let store = DocumentStore::new(InMemoryStore::new());
    let users = store.collection("users");

    users.create_index("email", SortDirection::Asc).await.unwrap();
    users.insert_document(doc! { "email": "a@example.com" }).await.unwrap();
    users.insert_document(doc! { "email": "b@example.com" }).await.unwrap();

    let err = users
        .update_document(
            &QuerySet::with_filters([Filter::eq("email", "b@example.com")]),
            doc! { "$set": { "email": "a@example.com" } },
        )
        .await
        .unwrap_err();
    assert!(err.is_duplicate_key());
}
