//! A fluent query-set builder and document access layer for document stores.
//!
//! This crate is the core of the queryset project and provides:
//!
//! - **Query sets** ([`query`]) - AND-ed filter fragments, exclusions, option bags and joins
//! - **Filter helpers** ([`filter`]) - Store-native filter fragments
//! - **Option bags** ([`options`]) - Find, update and delete settings, sort and index specs
//! - **Join resolution** ([`join`]) - Two-step cross-collection membership lookups
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Collections interface** ([`collection`]) - Uniform data-access helpers with deadlines
//! - **Models** ([`model`]) - Identity capability and insert-or-update persistence
//! - **Document store** ([`store`]) - Main interface holding a backend and its configuration
//! - **Configuration** ([`config`]) - Operation and join deadlines
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use queryset::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//! let posts = store.collection("posts");
//!
//! let mut active_authors = QuerySet::new();
//! active_authors.filter([Filter::eq("active", true)]);
//!
//! let mut query = QuerySet::new();
//! query
//!     .exclude([doc! { "draft": true }])
//!     .join("author_id", "_id", "authors", active_authors)
//!     .order_by("published_at", SortDirection::Desc)
//!     .limit(10);
//!
//! let recent = posts.get_documents(&query).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as queryset_core;

pub mod backend;
pub mod collection;
pub mod config;
pub mod document;
pub mod error;
pub mod filter;
pub mod join;
pub mod model;
pub mod options;
pub mod query;
pub mod store;
