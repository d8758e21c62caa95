mod common;

use common::Recording;
use futures::TryStreamExt;
use queryset::{
    bson::{Document, doc},
    config::StoreConfig,
    join::resolve_filter,
    prelude::*,
};
use std::time::Duration;

async fn seed<B: StoreBackend>(store: &DocumentStore<B>) {
    store
        .collection("authors")
        .insert_documents(vec![
            doc! { "_id": 1, "name": "Ann", "active": true },
            doc! { "_id": 2, "name": "Ben", "active": false },
            doc! { "_id": 3, "name": "Cat", "active": true },
        ])
        .await
        .unwrap();

    store
        .collection("posts")
        .insert_documents(vec![
            doc! { "_id": 10, "author_id": 1 },
            doc! { "_id": 11, "author_id": 2 },
            doc! { "_id": 12, "author_id": 3 },
            doc! { "_id": 13, "author_id": 2 },
        ])
        .await
        .unwrap();
}

async fn post_ids<B: StoreBackend>(store: &DocumentStore<B>, query: &QuerySet) -> Vec<i32> {
    store
        .collection("posts")
        .get_documents(query)
        .await
        .unwrap()
        .try_collect::<Vec<Document>>()
        .await
        .unwrap()
        .iter()
        .filter_map(|document| document.get_i32("_id").ok())
        .collect()
}

fn posts_by(authors: QuerySet) -> QuerySet {
    let mut query = QuerySet::new();
    query
        .join("author_id", "_id", "authors", authors)
        .order_by("_id", SortDirection::Asc);
    query
}

#[tokio::test]
async fn join_restricts_to_foreign_matches() {
    let store = DocumentStore::new(Recording::new());
    seed(&store).await;

    let query = posts_by(QuerySet::with_filters([Filter::eq("active", true)]));

    assert_eq!(post_ids(&store, &query).await, vec![10, 12]);
}

#[tokio::test]
async fn join_without_foreign_matches_yields_nothing() {
    let store = DocumentStore::new(Recording::new());
    seed(&store).await;

    let query = posts_by(QuerySet::with_filters([Filter::eq("name", "Zed")]));

    assert!(post_ids(&store, &query).await.is_empty());
}

#[tokio::test]
async fn joins_combine_with_filters_and_nest() {
    let store = DocumentStore::new(Recording::new());
    seed(&store).await;

    store
        .collection("teams")
        .insert_documents(vec![doc! { "lead": 2 }, doc! { "lead": 3 }])
        .await
        .unwrap();

    let mut leads = QuerySet::new();
    leads.join("_id", "lead", "teams", QuerySet::new());

    let mut query = posts_by(leads);
    query.exclude([Filter::eq("_id", 13)]);

    assert_eq!(post_ids(&store, &query).await, vec![11, 12]);
}

#[tokio::test]
async fn failed_join_lookup_is_ignored() {
    let backend = Recording::new().unreachable("authors");
    let store = DocumentStore::new(backend.clone());
    seed(&DocumentStore::new(backend.inner().clone())).await;

    let query = posts_by(QuerySet::with_filters([Filter::eq("active", true)]));

    assert_eq!(post_ids(&store, &query).await, vec![10, 11, 12, 13]);
    assert_eq!(backend.count("find"), 2);
}

#[tokio::test]
async fn slow_join_lookup_is_ignored() {
    let backend = Recording::new().delayed(Duration::from_millis(200));
    seed(&DocumentStore::new(backend.inner().clone())).await;

    let config = StoreConfig::new()
        .with_operation_timeout(Duration::from_secs(10))
        .with_join_timeout(Duration::from_millis(20));
    let store = DocumentStore::with_config(backend, config);

    let query = posts_by(QuerySet::with_filters([Filter::eq("active", true)]));

    assert_eq!(post_ids(&store, &query).await, vec![10, 11, 12, 13]);
}

#[tokio::test]
async fn sibling_joins_each_add_their_own_constraint() {
    let store = DocumentStore::new(Recording::new());
    seed(&store).await;

    store
        .collection("reviews")
        .insert_documents(vec![
            doc! { "post": 10, "approved": true },
            doc! { "post": 12, "approved": false },
            doc! { "post": 11, "approved": true },
        ])
        .await
        .unwrap();

    let mut query = QuerySet::with_filters([Filter::exists("author_id")]);
    query
        .join("author_id", "_id", "authors", QuerySet::with_filters([Filter::eq("active", true)]))
        .join("_id", "post", "reviews", QuerySet::with_filters([Filter::eq("approved", true)]))
        .order_by("_id", SortDirection::Asc);

    let filter = resolve_filter(&query, store.backend(), Duration::from_secs(10)).await;
    assert_eq!(
        filter,
        doc! {
            "$and": [
                Filter::exists("author_id"),
                { "author_id": { "$in": [1, 3] } },
                { "_id": { "$in": [10, 11] } },
            ]
        },
    );

    assert_eq!(post_ids(&store, &query).await, vec![10]);
}

#[tokio::test]
async fn nested_joins_share_the_declaring_join_deadline() {
    let backend = Recording::new().delayed(Duration::from_millis(40));
    let seeded = DocumentStore::new(backend.inner().clone());
    seed(&seeded).await;

    seeded
        .collection("teams")
        .insert_documents(vec![doc! { "lead": 1 }])
        .await
        .unwrap();

    let config = StoreConfig::new()
        .with_operation_timeout(Duration::from_secs(10))
        .with_join_timeout(Duration::from_millis(60));
    let store = DocumentStore::with_config(backend, config);

    // Each lookup alone fits the deadline; the nested lookup plus the
    // authors lookup together do not.
    let mut leads = QuerySet::new();
    leads.join("_id", "lead", "teams", QuerySet::new());

    assert_eq!(post_ids(&store, &posts_by(leads)).await, vec![10, 11, 12, 13]);
}
