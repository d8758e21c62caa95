//! Main queryset crate providing a unified interface for document stores.
//!
//! This crate is the primary entry point for users of queryset. It re-exports
//! the core types from the sub-crates and gives access to the storage backends.
//!
//! # Features
//!
//! - **Query sets** - Accumulate filter fragments, exclusions and per-operation options
//! - **Joins** - Restrict a query by membership in another collection's results
//! - **Collection helpers** - Uniform create/read/update/delete/count/aggregate calls with deadlines
//! - **Models** - `#[derive(Model)]` plus insert-or-update persistence
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use queryset::{prelude::*, memory::InMemoryStore, Model, bson::{doc, oid::ObjectId}};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Model)]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub name: String,
//!     pub active: bool,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let users = store.collection("users");
//!
//!     let mut user = User { id: NIL_OBJECT_ID, name: "Alice".into(), active: true };
//!     users.save_model(&mut user).await?;
//!
//!     let mut query = QuerySet::new();
//!     query
//!         .filter([Filter::eq("active", true)])
//!         .exclude([doc! { "name": "Bob" }])
//!         .order_by("name", SortDirection::Asc)
//!         .paginate(Some(0), Some(20));
//!
//!     let active: Vec<User> = users.get_models(&query).await?;
//!     println!("Active users: {:?}", active);
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires the `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as queryset;

pub mod prelude;

pub use queryset_core::{backend, collection, config, document, error, filter, join, model, options, query, store};
pub use queryset_macros::Model;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use queryset_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use queryset_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
