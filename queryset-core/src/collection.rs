//! Data-access helpers bound to one collection.
//!
//! Every helper is a thin forwarding call: the [`QuerySet`] is resolved into
//! a filter (running its joins first), the matching option bag is handed over
//! when one was set, and the backend call runs under the store's operation
//! deadline. Backend errors are returned unchanged; an elapsed deadline
//! becomes [`DocumentStoreError::Timeout`]. Nothing is retried.
//!
//! # Example
//!
//! ```ignore
//! use queryset::prelude::*;
//!
//! let users = store.collection("users");
//!
//! let mut query = QuerySet::new();
//! query.filter([Filter::eq("active", true)]).limit(20);
//!
//! let count = users.count_documents(&query).await?;
//! let first = users.get_document(&query).await?;
//! ```

use bson::{Document, de::deserialize_from_document, doc};
use futures::TryStreamExt;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::future::Future;

use crate::{
    backend::{DeleteResult, DocumentStream, InsertManyResult, InsertOneResult, StoreBackend, UpdateResult},
    config::StoreConfig,
    error::{DocumentStoreError, DocumentStoreResult},
    filter::Filter,
    join::resolve_filter,
    model::{Model, model_fields},
    options::{IndexSpec, SortDirection},
    query::QuerySet,
};

/// A named collection with a reference to a storage backend.
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
    config: StoreConfig,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(name: String, backend: &'a B, config: StoreConfig) -> Self {
        Self { name, backend, config }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn with_deadline<T>(
        &self,
        operation: &str,
        future: impl Future<Output = DocumentStoreResult<T>>,
    ) -> DocumentStoreResult<T> {
        debug!("{} on collection {}", operation, self.name);

        match tokio::time::timeout(self.config.operation_timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} on collection {} exceeded {:?}",
                    operation, self.name, self.config.operation_timeout,
                );
                Err(DocumentStoreError::Timeout(self.config.operation_timeout))
            }
        }
    }

    async fn resolve(&self, query: &QuerySet) -> Document {
        resolve_filter(query, self.backend, self.config.join_timeout).await
    }

    /// Inserts one document.
    pub async fn insert_document(&self, document: Document) -> DocumentStoreResult<InsertOneResult> {
        self.with_deadline("insert_one", self.backend.insert_one(&self.name, document))
            .await
    }

    /// Inserts several documents.
    pub async fn insert_documents(&self, documents: Vec<Document>) -> DocumentStoreResult<InsertManyResult> {
        self.with_deadline("insert_many", self.backend.insert_many(&self.name, documents))
            .await
    }

    /// Returns the first matching document.
    ///
    /// `Ok(None)` means nothing matched; any failure is an `Err`.
    pub async fn get_document(&self, query: &QuerySet) -> DocumentStoreResult<Option<Document>> {
        let filter = self.resolve(query).await;

        self.with_deadline(
            "find_one",
            self.backend
                .find_one(&self.name, filter, query.find_options().cloned()),
        )
        .await
    }

    /// Streams every matching document, honoring the find options when set.
    ///
    /// The deadline bounds opening the cursor, not consuming it.
    pub async fn get_documents(&self, query: &QuerySet) -> DocumentStoreResult<DocumentStream> {
        let filter = self.resolve(query).await;

        self.with_deadline(
            "find",
            self.backend
                .find(&self.name, filter, query.find_options().cloned()),
        )
        .await
    }

    /// Returns the first matching document deserialized as `M`.
    pub async fn get_model<M: DeserializeOwned>(&self, query: &QuerySet) -> DocumentStoreResult<Option<M>> {
        match self.get_document(query).await? {
            Some(document) => Ok(Some(deserialize_from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Collects every matching document deserialized as `M`.
    pub async fn get_models<M: DeserializeOwned>(&self, query: &QuerySet) -> DocumentStoreResult<Vec<M>> {
        self.get_documents(query)
            .await?
            .try_collect::<Vec<Document>>()
            .await?
            .into_iter()
            .map(|document| deserialize_from_document(document).map_err(DocumentStoreError::from))
            .collect()
    }

    /// Applies `update` to the first matching document.
    pub async fn update_document(&self, query: &QuerySet, update: Document) -> DocumentStoreResult<UpdateResult> {
        let filter = self.resolve(query).await;

        self.with_deadline(
            "update_one",
            self.backend
                .update_one(&self.name, filter, update, query.update_options().cloned()),
        )
        .await
    }

    /// Applies `update` to every matching document.
    pub async fn update_documents(&self, query: &QuerySet, update: Document) -> DocumentStoreResult<UpdateResult> {
        let filter = self.resolve(query).await;

        self.with_deadline(
            "update_many",
            self.backend
                .update_many(&self.name, filter, update, query.update_options().cloned()),
        )
        .await
    }

    /// Removes the first matching document.
    pub async fn delete_document(&self, query: &QuerySet) -> DocumentStoreResult<DeleteResult> {
        let filter = self.resolve(query).await;

        self.with_deadline(
            "delete_one",
            self.backend
                .delete_one(&self.name, filter, query.delete_options().cloned()),
        )
        .await
    }

    /// Removes every matching document.
    pub async fn delete_documents(&self, query: &QuerySet) -> DocumentStoreResult<DeleteResult> {
        let filter = self.resolve(query).await;

        self.with_deadline(
            "delete_many",
            self.backend
                .delete_many(&self.name, filter, query.delete_options().cloned()),
        )
        .await
    }

    /// Counts matching documents.
    pub async fn count_documents(&self, query: &QuerySet) -> DocumentStoreResult<u64> {
        let filter = self.resolve(query).await;

        self.with_deadline("count_documents", self.backend.count_documents(&self.name, filter))
            .await
    }

    /// Runs an aggregation pipeline as given.
    pub async fn aggregate_documents(&self, pipeline: Vec<Document>) -> DocumentStoreResult<DocumentStream> {
        self.with_deadline("aggregate", self.backend.aggregate(&self.name, pipeline))
            .await
    }

    /// Creates a unique index on a single field.
    pub async fn create_index(&self, field: &str, direction: SortDirection) -> DocumentStoreResult<String> {
        self.create_indexes([(field, direction)]).await
    }

    /// Creates one unique compound index over `keys`, in order.
    ///
    /// Existing documents that share a key combination make this fail with
    /// [`DocumentStoreError::DuplicateKey`].
    pub async fn create_indexes<F: Into<String>>(
        &self,
        keys: impl IntoIterator<Item = (F, SortDirection)>,
    ) -> DocumentStoreResult<String> {
        let index = IndexSpec::unique(keys);

        if index.keys.is_empty() {
            return Err(DocumentStoreError::InvalidQuery("an index needs at least one key".into()));
        }

        self.with_deadline("create_index", self.backend.create_index(&self.name, index))
            .await
    }

    /// Inserts the model when it has no identity yet, otherwise `$set`s its
    /// fields on the document with the same `_id`.
    ///
    /// After an insert the store-assigned identity is written back to the model.
    pub async fn save_model<M: Model>(&self, model: &mut M) -> DocumentStoreResult<()> {
        let fields = model_fields(model)?;

        if !model.has_id() {
            let inserted = self.insert_document(fields).await?;
            let id = inserted.inserted_id.as_object_id().ok_or_else(|| {
                DocumentStoreError::InvalidDocument(format!(
                    "expected an ObjectId identity, got {}",
                    inserted.inserted_id,
                ))
            })?;

            model.set_id(id);

            return Ok(());
        }

        self.update_document(&QuerySet::with_filters([Filter::id(model.id())]), doc! { "$set": fields })
            .await?;

        Ok(())
    }

    /// Deletes the document with the model's identity.
    ///
    /// A model without identity was never stored: nothing is sent and the
    /// call succeeds.
    pub async fn delete_model<M: Model>(&self, model: &M) -> DocumentStoreResult<()> {
        if !model.has_id() {
            return Ok(());
        }

        self.delete_document(&QuerySet::with_filters([Filter::id(model.id())]))
            .await?;

        Ok(())
    }
}
