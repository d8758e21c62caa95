//! MongoDB backend implementation for queryset.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Filters, updates, sort specifications and pipelines are already store-native
//! documents, so the backend forwards them to the driver unchanged.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! queryset = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Data is persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Option forwarding** - Limit, skip, sort, projection, upsert, array filters and delete hints
//! - **Unique indexes** - Duplicate-key server errors surface as `DocumentStoreError::DuplicateKey`
//!
//! # Example
//!
//! ```ignore
//! use queryset::{backend::StoreBackendBuilder, mongodb::MongoDbStore, store::DocumentStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MongoDbStore::builder("mongodb://localhost:27017", "my_database")
//!         .build()
//!         .await?;
//!     let store = DocumentStore::new(backend);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as queryset_mongodb;

pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
