use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use bson::Document;
use log::debug;
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{
        ClientOptions, DeleteOptions as MongoDeleteOptions, FindOneOptions, FindOptions as MongoFindOptions, Hint,
        IndexOptions, UpdateOptions as MongoUpdateOptions,
    },
};
use queryset_core::{
    backend::{
        DeleteResult, DocumentStream, InsertManyResult, InsertOneResult, StoreBackend, StoreBackendBuilder,
        UpdateResult,
    },
    error::{DocumentStoreError, DocumentStoreResult},
    options::{DeleteOptions, FindOptions, IndexSpec, UpdateOptions},
};

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Maps driver errors, singling out unique-index violations.
fn map_error(err: MongoError) -> DocumentStoreError {
    let duplicate = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
        ErrorKind::InsertMany(e) => e
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY_CODE)),
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY_CODE,
        _ => false,
    };

    if duplicate {
        DocumentStoreError::DuplicateKey(err.to_string())
    } else {
        DocumentStoreError::Backend(err.to_string())
    }
}

fn find_options(options: Option<FindOptions>) -> MongoFindOptions {
    let mut mongo_options = MongoFindOptions::default();

    if let Some(options) = options {
        mongo_options.limit = options.limit;
        mongo_options.skip = options.skip;
        mongo_options.sort = options.sort;
        mongo_options.projection = options.projection.map(|projection| projection.to_document());
    }

    mongo_options
}

fn find_one_options(options: Option<FindOptions>) -> FindOneOptions {
    let mut mongo_options = FindOneOptions::default();

    if let Some(options) = options {
        mongo_options.skip = options.skip;
        mongo_options.sort = options.sort;
        mongo_options.projection = options.projection.map(|projection| projection.to_document());
    }

    mongo_options
}

fn update_options(options: Option<UpdateOptions>) -> MongoUpdateOptions {
    let mut mongo_options = MongoUpdateOptions::default();

    if let Some(options) = options {
        mongo_options.upsert = options.upsert;
        mongo_options.array_filters = options.array_filters;
    }

    mongo_options
}

fn delete_options(options: Option<DeleteOptions>) -> MongoDeleteOptions {
    let mut mongo_options = MongoDeleteOptions::default();

    if let Some(hint) = options.and_then(|options| options.hint) {
        mongo_options.hint = Some(Hint::Keys(hint));
    }

    mongo_options
}

/// MongoDB storage backend bound to one logical database.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<InsertOneResult> {
        let result = self
            .get_collection(collection)
            .insert_one(document)
            .await
            .map_err(map_error)?;

        Ok(InsertOneResult { inserted_id: result.inserted_id })
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> DocumentStoreResult<InsertManyResult> {
        let result = self
            .get_collection(collection)
            .insert_many(documents)
            .await
            .map_err(map_error)?;

        // The driver keys generated ids by input position.
        let mut inserted_ids = result.inserted_ids.into_iter().collect::<Vec<_>>();
        inserted_ids.sort_by_key(|(position, _)| *position);

        Ok(InsertManyResult {
            inserted_ids: inserted_ids.into_iter().map(|(_, id)| id).collect(),
        })
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(filter)
            .with_options(find_one_options(options))
            .await
            .map_err(map_error)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> DocumentStoreResult<DocumentStream> {
        Ok(
            self.get_collection(collection)
                .find(filter)
                .with_options(find_options(options))
                .await
                .map_err(map_error)?
                .map_err(map_error)
                .boxed()
        )
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> DocumentStoreResult<UpdateResult> {
        let result = self
            .get_collection(collection)
            .update_one(filter, update)
            .with_options(update_options(options))
            .await
            .map_err(map_error)?;

        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> DocumentStoreResult<UpdateResult> {
        let result = self
            .get_collection(collection)
            .update_many(filter, update)
            .with_options(update_options(options))
            .await
            .map_err(map_error)?;

        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> DocumentStoreResult<DeleteResult> {
        let result = self
            .get_collection(collection)
            .delete_one(filter)
            .with_options(delete_options(options))
            .await
            .map_err(map_error)?;

        Ok(DeleteResult { deleted_count: result.deleted_count })
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> DocumentStoreResult<DeleteResult> {
        let result = self
            .get_collection(collection)
            .delete_many(filter)
            .with_options(delete_options(options))
            .await
            .map_err(map_error)?;

        Ok(DeleteResult { deleted_count: result.deleted_count })
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(filter)
            .await
            .map_err(map_error)
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> DocumentStoreResult<DocumentStream> {
        Ok(
            self.get_collection(collection)
                .aggregate(pipeline)
                .await
                .map_err(map_error)?
                .map_err(map_error)
                .boxed()
        )
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> DocumentStoreResult<String> {
        let result = self
            .get_collection(collection)
            .create_index(
                IndexModel::builder()
                .keys(index.key_document())
                .options(
                    IndexOptions::builder()
                    .unique(index.unique)
                    .build()
                )
                .build()
            )
            .await
            .map_err(map_error)?;

        debug!("created index {} on {}", result.index_name, collection);

        Ok(result.index_name)
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(map_error)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

/// Builder for connecting a [`MongoDbStore`] from a connection string.
pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        debug!("connecting to database {}", self.database);

        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
