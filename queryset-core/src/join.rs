//! Join resolution.
//!
//! A [`Join`] is emulated with two sequential queries: the foreign collection
//! is searched first, the foreign-field values of every match are collected,
//! and the outer query is constrained to `{ local_field: { "$in": values } }`.
//!
//! Resolution fails open. When the foreign lookup errors or exceeds its
//! deadline the join contributes no constraint at all, so the outer query
//! returns a wider result set than intended instead of failing. Every such
//! case is logged at `warn` level. The foreign lookup is neither paginated
//! nor streamed: all matching foreign keys are held in memory.

use bson::{Bson, Document, doc};
use futures::{TryStreamExt, future::BoxFuture};
use log::{debug, warn};
use std::time::Duration;

use crate::{
    backend::StoreBackend,
    document::get_path,
    error::DocumentStoreResult,
    options::Projection,
    query::{Join, QuerySet},
};

/// Materializes `query`'s filter, including a membership fragment for every
/// join that resolved.
///
/// Joins are evaluated one after another, each under its own `timeout`, and
/// their fragments are appended after the query's own fragments. A nested
/// join runs inside the deadline of the join that declared it.
pub fn resolve_filter<'a, B>(
    query: &'a QuerySet,
    backend: &'a B,
    timeout: Duration,
) -> BoxFuture<'a, Document>
where
    B: StoreBackend,
{
    Box::pin(async move {
        let mut fragments = Vec::with_capacity(query.joins().len());

        for join in query.joins() {
            if let Some(fragment) = evaluate_join(join, backend, timeout).await {
                fragments.push(fragment);
            }
        }

        query.build_with(fragments)
    })
}

/// Resolves a single join into its membership fragment.
///
/// Returns `None` when the foreign lookup failed. `timeout` covers the whole
/// join, including the resolution of the foreign query's own joins.
pub async fn evaluate_join<B>(join: &Join, backend: &B, timeout: Duration) -> Option<Document>
where
    B: StoreBackend,
{
    let mut options = join.query.find_options().cloned().unwrap_or_default();
    options.projection = Some(Projection::Include(vec![join.foreign_field.clone()]));

    let lookup = async {
        let filter = resolve_filter(&join.query, backend, timeout).await;

        backend
            .find(&join.foreign_collection, filter, Some(options))
            .await?
            .try_collect::<Vec<Document>>()
            .await
    };

    let documents: DocumentStoreResult<Vec<Document>> = match tokio::time::timeout(timeout, lookup).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                "join on {}.{} timed out after {:?}; ignoring join constraint",
                join.foreign_collection, join.foreign_field, timeout,
            );
            return None;
        }
    };

    let documents = match documents {
        Ok(documents) => documents,
        Err(err) => {
            warn!(
                "join on {}.{} failed: {}; ignoring join constraint",
                join.foreign_collection, join.foreign_field, err,
            );
            return None;
        }
    };

    let values = documents
        .iter()
        .filter_map(|document| get_path(document, &join.foreign_field).cloned())
        .collect::<Vec<Bson>>();

    debug!(
        "join on {}.{} matched {} values for {}",
        join.foreign_collection,
        join.foreign_field,
        values.len(),
        join.local_field,
    );

    let local_field = join.local_field.clone();

    Some(doc! { local_field: { "$in": values } })
}
