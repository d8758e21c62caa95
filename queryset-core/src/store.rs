//! Main entry point for working with a backend.
//!
//! A [`DocumentStore`] owns one backend (already connected and pointed at a
//! logical database) together with the [`StoreConfig`] deadlines, and hands
//! out [`Collection`] handles that share both.
//!
//! # Example
//!
//! ```ignore
//! use queryset::{prelude::*, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//! let users = store.collection("users");
//! ```

use log::debug;

use crate::{
    backend::StoreBackend,
    collection::Collection,
    config::StoreConfig,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// A document store bound to a specific backend implementation.
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
    config: StoreConfig,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the default deadlines.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    /// Creates a new document store with explicit deadlines.
    pub fn with_config(backend: B, config: StoreConfig) -> Self {
        Self { backend, config }
    }

    /// The deadlines applied to every call.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets a collection handle with the given name.
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, B> {
        Collection::new(name.to_string(), &self.backend, self.config)
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        debug!("list_collections");

        tokio::time::timeout(self.config.operation_timeout, self.backend.list_collections())
            .await
            .map_err(|_| DocumentStoreError::Timeout(self.config.operation_timeout))?
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await?;

        Ok(())
    }
}
