#![allow(dead_code)]

use async_trait::async_trait;
use queryset::{
    backend::{DeleteResult, DocumentStream, InsertManyResult, InsertOneResult, StoreBackend, UpdateResult},
    bson::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    memory::InMemoryStore,
    options::{DeleteOptions, FindOptions, IndexSpec, UpdateOptions},
};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

/// Wraps an [`InMemoryStore`], recording every call and optionally failing
/// or stalling calls on selected collections.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    inner: InMemoryStore,
    calls: Arc<Mutex<Vec<String>>>,
    unreachable: HashSet<String>,
    delay: Option<Duration>,
}

impl Recording {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable(mut self, collection: &str) -> Self {
        self.unreachable.insert(collection.to_string());
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split(':').next() == Some(operation))
            .count()
    }

    async fn enter(&self, operation: &str, collection: &str) -> DocumentStoreResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}", operation, collection));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.unreachable.contains(collection) {
            return Err(DocumentStoreError::Backend(format!("{} is unreachable", collection)));
        }

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for Recording {
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<InsertOneResult> {
        self.enter("insert_one", collection).await?;
        self.inner.insert_one(collection, document).await
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> DocumentStoreResult<InsertManyResult> {
        self.enter("insert_many", collection).await?;
        self.inner.insert_many(collection, documents).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> DocumentStoreResult<Option<Document>> {
        self.enter("find_one", collection).await?;
        self.inner.find_one(collection, filter, options).await
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> DocumentStoreResult<DocumentStream> {
        self.enter("find", collection).await?;
        self.inner.find(collection, filter, options).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> DocumentStoreResult<UpdateResult> {
        self.enter("update_one", collection).await?;
        self.inner.update_one(collection, filter, update, options).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> DocumentStoreResult<UpdateResult> {
        self.enter("update_many", collection).await?;
        self.inner.update_many(collection, filter, update, options).await
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> DocumentStoreResult<DeleteResult> {
        self.enter("delete_one", collection).await?;
        self.inner.delete_one(collection, filter, options).await
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> DocumentStoreResult<DeleteResult> {
        self.enter("delete_many", collection).await?;
        self.inner.delete_many(collection, filter, options).await
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        self.enter("count_documents", collection).await?;
        self.inner.count_documents(collection, filter).await
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> DocumentStoreResult<DocumentStream> {
        self.enter("aggregate", collection).await?;
        self.inner.aggregate(collection, pipeline).await
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> DocumentStoreResult<String> {
        self.enter("create_index", collection).await?;
        self.inner.create_index(collection, index).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.inner.list_collections().await
    }
}
