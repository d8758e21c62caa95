//! In-memory document storage backend for queryset.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It evaluates the same store-native filter documents a server would, which makes it
//! the natural backend for development and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Filter evaluation** - `$and`, `$or`, `$nor`, comparisons, `$in`/`$nin`, `$exists`, `$not`
//! - **Updates** - `$set`, `$unset` and `$inc`, with upserts seeded from the filter
//! - **Unique indexes** - Duplicate keys surface as `DocumentStoreError::DuplicateKey`
//! - **Pipelines** - `$match`, `$sort`, `$skip`, `$limit`, `$project` and `$count`
//!
//! # Quick Start
//!
//! ```ignore
//! use queryset::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let users = store.collection("users");
//!
//!     users.insert_document(doc! { "name": "Alice" }).await?;
//!
//!     let mut query = QuerySet::new();
//!     query.filter([Filter::eq("name", "Alice")]);
//!
//!     assert!(users.get_document(&query).await?.is_some());
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as queryset_memory;

pub mod store;
mod evaluator;
mod update;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
