//! Convenient re-exports of commonly used types from queryset.
//!
//! ```ignore
//! use queryset::prelude::*;
//! ```

pub use queryset_core::{
    backend::{DocumentStream, StoreBackend, StoreBackendBuilder},
    collection::Collection,
    config::StoreConfig,
    error::{DocumentStoreError, DocumentStoreResult},
    filter::Filter,
    model::{Model, NIL_OBJECT_ID},
    options::{DeleteOptions, FindOptions, IndexSpec, Projection, SortDirection, UpdateOptions},
    query::{Join, QuerySet, paginate_query},
    store::DocumentStore,
};
