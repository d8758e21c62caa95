//! Storage backend abstraction.
//!
//! The [`StoreBackend`] trait is the single seam between the query-set layer
//! and a concrete document store. Every method maps 1:1 onto a primitive of
//! the store: filters arrive already materialized in the store's native
//! syntax and option bags arrive as `None` when the caller never set them.
//!
//! Implementations are expected to report failures as they happen. Deadlines
//! are applied by the caller ([`Collection`](crate::collection::Collection)),
//! so backends do not need to implement their own.

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::stream::BoxStream;
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    options::{DeleteOptions, FindOptions, IndexSpec, UpdateOptions},
};

/// A lazy, forward-only sequence of documents.
///
/// The stream is finite and cannot be restarted; each item may carry an error
/// reported while fetching further batches.
pub type DocumentStream = BoxStream<'static, DocumentStoreResult<Document>>;

/// Result of inserting one document.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneResult {
    /// The `_id` of the new document, generated by the store when absent.
    pub inserted_id: Bson,
}

/// Result of inserting several documents.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertManyResult {
    /// The `_id` of every new document, in input order.
    pub inserted_ids: Vec<Bson>,
}

/// Result of an update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResult {
    /// Number of documents matched by the filter.
    pub matched_count: u64,
    /// Number of documents actually changed.
    pub modified_count: u64,
    /// The `_id` of the document created by an upsert.
    pub upserted_id: Option<Bson>,
}

/// Result of a delete.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteResult {
    /// Number of documents removed.
    pub deleted_count: u64,
}

/// Abstract interface for document storage backends.
///
/// All implementations must be thread-safe; a backend is shared by reference
/// between every collection handle of a [`DocumentStore`](crate::store::DocumentStore).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts one document, generating its `_id` when missing.
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<InsertOneResult>;

    /// Inserts several documents, generating missing `_id`s.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> DocumentStoreResult<InsertManyResult>;

    /// Returns the first matching document, or `None` when nothing matches.
    ///
    /// `limit` in the options is ignored; `skip`, `sort` and `projection` apply.
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Streams every matching document.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> DocumentStoreResult<DocumentStream>;

    /// Applies `update` to the first matching document.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> DocumentStoreResult<UpdateResult>;

    /// Applies `update` to every matching document.
    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> DocumentStoreResult<UpdateResult>;

    /// Removes the first matching document.
    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> DocumentStoreResult<DeleteResult>;

    /// Removes every matching document.
    async fn delete_many(
        &self,
        collection: &str,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> DocumentStoreResult<DeleteResult>;

    /// Counts matching documents.
    async fn count_documents(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64>;

    /// Runs an aggregation pipeline, passed through unmodified.
    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> DocumentStoreResult<DocumentStream>;

    /// Creates an index and returns its name.
    ///
    /// Creating a unique index over data that already violates it fails.
    async fn create_index(&self, collection: &str, index: IndexSpec) -> DocumentStoreResult<String>;

    /// Lists the names of all collections.
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Releases backend resources. The default implementation does nothing.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<InsertOneResult> {
        (*self).insert_one(collection, document).await
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> DocumentStoreResult<InsertManyResult> {
        (*self).insert_many(collection, documents).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> DocumentStoreResult<Option<Document>> {
        (*self).find_one(collection, filter, options).await
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> DocumentStoreResult<DocumentStream> {
        (*self).find(collection, filter, options).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> DocumentStoreResult<UpdateResult> {
        (*self).update_one(collection, filter, update, options).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> DocumentStoreResult<UpdateResult> {
        (*self).update_many(collection, filter, update, options).await
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> DocumentStoreResult<DeleteResult> {
        (*self).delete_one(collection, filter, options).await
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> DocumentStoreResult<DeleteResult> {
        (*self).delete_many(collection, filter, options).await
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        (*self).count_documents(collection, filter).await
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> DocumentStoreResult<DocumentStream> {
        (*self).aggregate(collection, pipeline).await
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> DocumentStoreResult<String> {
        (*self).create_index(collection, index).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        (*self).list_collections().await
    }
}

/// Factory trait for creating backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
