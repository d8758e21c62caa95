//! In-memory storage implementation.
//!
//! Collections are kept as insertion-ordered document lists behind an
//! async-aware read-write lock. Every collection carries the implicit unique
//! `_id` index plus any unique compound indexes created on it.

use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use futures::{StreamExt, stream};
use log::debug;
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};

use queryset_core::{
    backend::{
        DeleteResult, DocumentStream, InsertManyResult, InsertOneResult, StoreBackend, StoreBackendBuilder,
        UpdateResult,
    },
    document::get_path,
    error::{DocumentStoreError, DocumentStoreResult},
    options::{DeleteOptions, FindOptions, IndexSpec, UpdateOptions},
};

use crate::{
    evaluator::{DocumentEvaluator, apply_projection, sort_documents, values_equal},
    update::{apply_update, seed_from_filter},
};

#[derive(Debug, Default)]
struct CollectionState {
    documents: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

impl CollectionState {
    fn index_key(document: &Document, index: &IndexSpec) -> Vec<Bson> {
        index
            .keys
            .iter()
            .map(|(field, _)| get_path(document, field).cloned().unwrap_or(Bson::Null))
            .collect()
    }

    fn keys_equal(left: &[Bson], right: &[Bson]) -> bool {
        left.len() == right.len() && left.iter().zip(right).all(|(a, b)| values_equal(a, b))
    }

    /// Rejects `candidate` if it collides with any document other than the one at `skip`.
    fn check_unique(&self, collection: &str, candidate: &Document, skip: Option<usize>) -> DocumentStoreResult<()> {
        let others = || {
            self.documents
                .iter()
                .enumerate()
                .filter(move |(position, _)| Some(*position) != skip)
                .map(|(_, document)| document)
        };

        if let Some(id) = candidate.get("_id") {
            if others().any(|document| document.get("_id").is_some_and(|other| values_equal(other, id))) {
                return Err(DocumentStoreError::DuplicateKey(format!(
                    "collection: {} index: _id_ dup key: {{ _id: {} }}",
                    collection, id,
                )));
            }
        }

        for index in self.indexes.iter().filter(|index| index.unique) {
            let key = Self::index_key(candidate, index);

            if others().any(|document| Self::keys_equal(&Self::index_key(document, index), &key)) {
                return Err(DocumentStoreError::DuplicateKey(format!(
                    "collection: {} index: {} dup key: {:?}",
                    collection,
                    index.default_name(),
                    key,
                )));
            }
        }

        Ok(())
    }

    fn insert(&mut self, collection: &str, document: Document) -> DocumentStoreResult<Bson> {
        let document = with_id(document);
        self.check_unique(collection, &document, None)?;

        let id = document.get("_id").cloned().unwrap_or(Bson::Null);
        self.documents.push(document);

        Ok(id)
    }

    fn matching_positions(&self, filter: &Document) -> DocumentStoreResult<Vec<usize>> {
        let mut positions = Vec::new();

        for (position, document) in self.documents.iter().enumerate() {
            if DocumentEvaluator::new(document).evaluate(filter)? {
                positions.push(position);
            }
        }

        Ok(positions)
    }
}

/// Puts a generated `_id` first when the document has none.
fn with_id(document: Document) -> Document {
    if document.contains_key("_id") {
        return document;
    }

    let mut identified = doc! { "_id": ObjectId::new() };
    for (key, value) in document {
        identified.insert(key, value);
    }
    identified
}

fn find_documents(
    state: Option<&CollectionState>,
    filter: &Document,
    options: Option<FindOptions>,
) -> DocumentStoreResult<Vec<Document>> {
    let Some(state) = state else {
        return Ok(Vec::new());
    };

    let mut documents = DocumentEvaluator::filter_documents(&state.documents, filter)?;
    let options = options.unwrap_or_default();

    if let Some(sort) = &options.sort {
        sort_documents(&mut documents, sort)?;
    }

    let skip = options.skip.unwrap_or(0) as usize;
    let limit = match options.limit {
        Some(limit) if limit != 0 => limit.unsigned_abs() as usize,
        _ => usize::MAX,
    };

    let projection = options.projection.map(|projection| projection.to_document());

    documents
        .into_iter()
        .skip(skip)
        .take(limit)
        .map(|document| match &projection {
            Some(projection) => apply_projection(&document, projection),
            None => Ok(document),
        })
        .collect()
}

fn stage_number(stage: &str, value: &Bson) -> DocumentStoreResult<usize> {
    match value {
        Bson::Int32(n) if *n >= 0 => Ok(*n as usize),
        Bson::Int64(n) if *n >= 0 => Ok(*n as usize),
        Bson::Double(n) if *n >= 0.0 && n.fract() == 0.0 => Ok(*n as usize),
        other => Err(DocumentStoreError::InvalidQuery(format!(
            "{} needs a non-negative integer, got {}",
            stage, other,
        ))),
    }
}

fn stage_document<'a>(stage: &str, value: &'a Bson) -> DocumentStoreResult<&'a Document> {
    value
        .as_document()
        .ok_or_else(|| DocumentStoreError::InvalidQuery(format!("{} needs a document", stage)))
}

fn run_pipeline(mut documents: Vec<Document>, pipeline: &[Document]) -> DocumentStoreResult<Vec<Document>> {
    for stage in pipeline {
        let mut entries = stage.iter();

        let (name, value) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(DocumentStoreError::InvalidQuery(
                    "a pipeline stage must have exactly one field".into(),
                ));
            }
        };

        documents = match name.as_str() {
            "$match" => DocumentEvaluator::filter_documents(&documents, stage_document(name, value)?)?,
            "$sort" => {
                sort_documents(&mut documents, stage_document(name, value)?)?;
                documents
            }
            "$skip" => documents
                .into_iter()
                .skip(stage_number(name, value)?)
                .collect(),
            "$limit" => match stage_number(name, value)? {
                0 => return Err(DocumentStoreError::InvalidQuery("$limit must be positive".into())),
                limit => documents.into_iter().take(limit).collect(),
            },
            "$project" => {
                let projection = stage_document(name, value)?;
                documents
                    .iter()
                    .map(|document| apply_projection(document, projection))
                    .collect::<DocumentStoreResult<Vec<_>>>()?
            }
            "$count" => {
                let field = value.as_str().ok_or_else(|| {
                    DocumentStoreError::InvalidQuery("$count needs a field name".into())
                })?;
                // Nothing to count yields no document at all.
                match documents.len() {
                    0 => Vec::new(),
                    count => vec![doc! { field: count as i64 }],
                }
            }
            other => {
                return Err(DocumentStoreError::InvalidQuery(format!(
                    "unsupported pipeline stage {}",
                    other,
                )));
            }
        };
    }

    Ok(documents)
}

fn into_stream(documents: Vec<Document>) -> DocumentStream {
    stream::iter(documents.into_iter().map(Ok)).boxed()
}

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so
/// clones share the same data. Queries scan every document of a collection;
/// this is meant for development, tests and small datasets.
///
/// # Example
///
/// ```ignore
/// use queryset_memory::InMemoryStore;
/// use queryset_core::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.insert_one("users", doc! { "name": "Alice" }).await?;
/// assert_eq!(store.count_documents("users", doc! {}).await?, 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> collection state
    store: Arc<RwLock<HashMap<String, CollectionState>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    async fn update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
        multi: bool,
    ) -> DocumentStoreResult<UpdateResult> {
        let options = options.unwrap_or_default();

        if options.array_filters.is_some() {
            return Err(DocumentStoreError::InvalidQuery(
                "array filters are not supported by the in-memory store".into(),
            ));
        }

        let mut store = self.store.write().await;

        let mut positions = match store.get(collection) {
            Some(state) => state.matching_positions(&filter)?,
            None => Vec::new(),
        };

        if !multi {
            positions.truncate(1);
        }

        if positions.is_empty() {
            if !options.upsert.unwrap_or(false) {
                return Ok(UpdateResult { matched_count: 0, modified_count: 0, upserted_id: None });
            }

            let mut document = seed_from_filter(&filter);
            apply_update(&mut document, &update)?;

            let id = store
                .entry(collection.to_string())
                .or_default()
                .insert(collection, document)?;

            return Ok(UpdateResult { matched_count: 0, modified_count: 0, upserted_id: Some(id) });
        }

        let state = store
            .get_mut(collection)
            .ok_or_else(|| DocumentStoreError::Backend(format!("collection {} vanished", collection)))?;

        let matched_count = positions.len() as u64;
        let mut modified_count = 0;

        for position in positions {
            let mut document = state.documents[position].clone();

            if apply_update(&mut document, &update)? {
                state.check_unique(collection, &document, Some(position))?;
                state.documents[position] = document;
                modified_count += 1;
            }
        }

        Ok(UpdateResult { matched_count, modified_count, upserted_id: None })
    }

    async fn delete(&self, collection: &str, filter: Document, multi: bool) -> DocumentStoreResult<DeleteResult> {
        let mut store = self.store.write().await;

        let Some(state) = store.get_mut(collection) else {
            return Ok(DeleteResult { deleted_count: 0 });
        };

        let mut positions = state.matching_positions(&filter)?;

        if !multi {
            positions.truncate(1);
        }

        for position in positions.iter().rev() {
            state.documents.remove(*position);
        }

        Ok(DeleteResult { deleted_count: positions.len() as u64 })
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<InsertOneResult> {
        let inserted_id = self
            .store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(collection, document)?;

        Ok(InsertOneResult { inserted_id })
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> DocumentStoreResult<InsertManyResult> {
        let mut store = self.store.write().await;
        let state = store.entry(collection.to_string()).or_default();

        // Ordered insert: documents before a failing one stay inserted.
        let inserted_ids = documents
            .into_iter()
            .map(|document| state.insert(collection, document))
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        Ok(InsertManyResult { inserted_ids })
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> DocumentStoreResult<Option<Document>> {
        let mut options = options.unwrap_or_default();
        options.limit = Some(1);

        let store = self.store.read().await;

        Ok(find_documents(store.get(collection), &filter, Some(options))?
            .into_iter()
            .next())
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> DocumentStoreResult<DocumentStream> {
        let store = self.store.read().await;
        let documents = find_documents(store.get(collection), &filter, options)?;

        debug!("in-memory find on {} matched {} documents", collection, documents.len());

        Ok(into_stream(documents))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> DocumentStoreResult<UpdateResult> {
        self.update(collection, filter, update, options, false).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> DocumentStoreResult<UpdateResult> {
        self.update(collection, filter, update, options, true).await
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
        _options: Option<DeleteOptions>,
    ) -> DocumentStoreResult<DeleteResult> {
        // Index hints have no meaning without indexes to scan (no-op)
        self.delete(collection, filter, false).await
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: Document,
        _options: Option<DeleteOptions>,
    ) -> DocumentStoreResult<DeleteResult> {
        self.delete(collection, filter, true).await
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        let store = self.store.read().await;

        Ok(match store.get(collection) {
            Some(state) => state.matching_positions(&filter)?.len() as u64,
            None => 0,
        })
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> DocumentStoreResult<DocumentStream> {
        let documents = self
            .store
            .read()
            .await
            .get(collection)
            .map(|state| state.documents.clone())
            .unwrap_or_default();

        Ok(into_stream(run_pipeline(documents, &pipeline)?))
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> DocumentStoreResult<String> {
        let mut store = self.store.write().await;
        let state = store.entry(collection.to_string()).or_default();
        let name = index.default_name();

        if let Some(existing) = state.indexes.iter().find(|existing| existing.keys == index.keys) {
            if existing.unique == index.unique {
                return Ok(name);
            }

            return Err(DocumentStoreError::InvalidQuery(format!(
                "an index named {} already exists with different options",
                name,
            )));
        }

        if index.unique {
            for (position, document) in state.documents.iter().enumerate() {
                let key = CollectionState::index_key(document, &index);

                let duplicated = state.documents[position + 1..]
                    .iter()
                    .any(|other| CollectionState::keys_equal(&CollectionState::index_key(other, &index), &key));

                if duplicated {
                    return Err(DocumentStoreError::DuplicateKey(format!(
                        "collection: {} index: {} dup key: {:?}",
                        collection, name, key,
                    )));
                }
            }
        }

        state.indexes.push(index);

        Ok(name)
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self
            .store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();

        names.sort();

        Ok(names)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new, empty [`InMemoryStore`].
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use queryset_core::options::{Projection, SortDirection};

    #[tokio::test]
    async fn insert_generates_identity_and_rejects_duplicates() {
        let store = InMemoryStore::new();

        let inserted = store.insert_one("users", doc! { "name": "Alice" }).await.unwrap();
        let id = inserted.inserted_id.as_object_id().unwrap();

        let duplicate = store.insert_one("users", doc! { "_id": id, "name": "Bob" }).await;
        assert!(duplicate.unwrap_err().is_duplicate_key());
    }

    #[tokio::test]
    async fn find_applies_options_in_order() {
        let store = InMemoryStore::new();
        store
            .insert_many("n", (0..6).map(|i| doc! { "_id": i, "v": i % 3 }).collect())
            .await
            .unwrap();

        let options = FindOptions {
            limit: Some(2),
            skip: Some(1),
            sort: Some(doc! { "v": -1, "_id": 1 }),
            projection: Some(Projection::Include(vec!["v".into()])),
        };

        let documents = store
            .find("n", doc! { "v": { "$gt": 0 } }, Some(options))
            .await
            .unwrap()
            .try_collect::<Vec<_>>()
            .await
            .unwrap();

        assert_eq!(documents, vec![doc! { "_id": 5, "v": 2 }, doc! { "_id": 1, "v": 1 }]);
    }

    #[tokio::test]
    async fn upsert_creates_document_from_filter() {
        let store = InMemoryStore::new();

        let result = store
            .update_one(
                "c",
                doc! { "$and": [{ "key": "k" }] },
                doc! { "$set": { "v": 1 } },
                Some(UpdateOptions { upsert: Some(true), array_filters: None }),
            )
            .await
            .unwrap();

        assert!(result.upserted_id.is_some());
        assert_eq!(store.count_documents("c", doc! { "key": "k", "v": 1 }).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unique_index_is_enforced_on_writes() {
        let store = InMemoryStore::new();
        store
            .create_index("c", IndexSpec::unique([("a", SortDirection::Asc), ("b", SortDirection::Desc)]))
            .await
            .unwrap();

        store.insert_one("c", doc! { "a": 1, "b": 1 }).await.unwrap();
        store.insert_one("c", doc! { "a": 1, "b": 2 }).await.unwrap();

        assert!(store.insert_one("c", doc! { "a": 1, "b": 1 }).await.unwrap_err().is_duplicate_key());

        let conflict = store
            .update_one("c", doc! { "b": 2 }, doc! { "$set": { "b": 1 } }, None)
            .await;
        assert!(conflict.unwrap_err().is_duplicate_key());
    }

    #[tokio::test]
    async fn aggregate_runs_supported_stages() {
        let store = InMemoryStore::new();
        store
            .insert_many("c", (1..=5).map(|i| doc! { "_id": i, "even": i % 2 == 0 }).collect())
            .await
            .unwrap();

        let counted = store
            .aggregate("c", vec![doc! { "$match": { "even": false } }, doc! { "$count": "total" }])
            .await
            .unwrap()
            .try_collect::<Vec<_>>()
            .await
            .unwrap();
        assert_eq!(counted, vec![doc! { "total": 3_i64 }]);

        let unsupported = store.aggregate("c", vec![doc! { "$group": { "_id": null } }]).await;
        assert!(unsupported.is_err());
    }

    #[tokio::test]
    async fn count_and_limit_stages_follow_server_rules() {
        let store = InMemoryStore::new();
        store.insert_one("c", doc! { "even": true }).await.unwrap();

        let empty = store
            .aggregate("c", vec![doc! { "$match": { "even": false } }, doc! { "$count": "total" }])
            .await
            .unwrap()
            .try_collect::<Vec<_>>()
            .await
            .unwrap();
        assert!(empty.is_empty());

        assert!(store.aggregate("c", vec![doc! { "$limit": 0 }]).await.is_err());
    }

    #[tokio::test]
    async fn large_integer_identities_stay_distinct() {
        let store = InMemoryStore::new();

        store.insert_one("c", doc! { "_id": 9_007_199_254_740_992_i64 }).await.unwrap();
        store.insert_one("c", doc! { "_id": 9_007_199_254_740_993_i64 }).await.unwrap();

        let count = store
            .count_documents("c", doc! { "_id": 9_007_199_254_740_993_i64 })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn inc_overflow_leaves_the_document_untouched() {
        let store = InMemoryStore::new();
        store.insert_one("c", doc! { "n": i64::MAX }).await.unwrap();

        let overflow = store
            .update_one("c", doc! {}, doc! { "$inc": { "n": 1_i64 } }, None)
            .await;
        assert!(matches!(overflow, Err(DocumentStoreError::InvalidQuery(_))));
        assert_eq!(store.count_documents("c", doc! { "n": i64::MAX }).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_one_removes_a_single_match() {
        let store = InMemoryStore::new();
        store
            .insert_many("c", vec![doc! { "k": 1 }, doc! { "k": 1 }, doc! { "k": 2 }])
            .await
            .unwrap();

        assert_eq!(store.delete_one("c", doc! { "k": 1 }, None).await.unwrap().deleted_count, 1);
        assert_eq!(store.delete_many("c", doc! {}, None).await.unwrap().deleted_count, 2);
        assert_eq!(store.list_collections().await.unwrap(), vec!["c".to_string()]);
    }
}
