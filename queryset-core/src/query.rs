//! The query-set builder.
//!
//! A [`QuerySet`] accumulates AND-ed filter fragments, optional per-operation
//! settings and join declarations for one request. It is a single-owner
//! builder: every method takes `&mut self` and returns the same instance so
//! calls chain, and [`QuerySet::build`] materializes the filter without
//! touching the builder.
//!
//! ```ignore
//! use queryset::{query::QuerySet, filter::Filter, options::SortDirection};
//! use bson::doc;
//!
//! let mut query = QuerySet::new();
//! query
//!     .filter([Filter::eq("status", "active")])
//!     .exclude([doc! { "role": "admin" }, doc! { "banned": true }])
//!     .order_by("created_at", SortDirection::Desc)
//!     .limit(10);
//!
//! let filter = query.build();
//! ```

use bson::{Document, doc};

use crate::options::{
    DeleteOptions, FindOptions, Projection, SortDirection, UpdateOptions, sort_by,
};

/// A pending retrieval or mutation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySet {
    filters: Vec<Document>,
    find_options: Option<FindOptions>,
    update_options: Option<UpdateOptions>,
    delete_options: Option<DeleteOptions>,
    joins: Vec<Join>,
}

/// A planned cross-collection membership lookup.
///
/// When resolved, the documents of `foreign_collection` matching `query` are
/// fetched, their `foreign_field` values collected, and the outer query is
/// constrained to `{ local_field: { "$in": [values...] } }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Field of the outer documents that must be a member of the collected values.
    pub local_field: String,
    /// Field read from every matching foreign document.
    pub foreign_field: String,
    /// Collection the foreign lookup runs against.
    pub foreign_collection: String,
    /// Which foreign documents qualify.
    pub query: QuerySet,
}

impl QuerySet {
    /// Creates an empty query set, which matches every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query set from an initial set of fragments.
    pub fn with_filters(fragments: impl IntoIterator<Item = Document>) -> Self {
        let mut query = Self::new();
        query.filter(fragments);
        query
    }

    /// Appends fragments unchanged; they are AND-ed with the existing ones.
    ///
    /// Fragments are not validated. A malformed fragment surfaces as an error
    /// only when the store evaluates it.
    pub fn filter(&mut self, fragments: impl IntoIterator<Item = Document>) -> &mut Self {
        self.filters.extend(fragments);
        self
    }

    /// Appends a single fragment requiring that none of `fragments` match.
    ///
    /// Each call adds one `$nor` fragment; two calls produce two independent
    /// negations AND-ed together. An empty argument list adds nothing.
    pub fn exclude(&mut self, fragments: impl IntoIterator<Item = Document>) -> &mut Self {
        let fragments = fragments.into_iter().collect::<Vec<_>>();

        if !fragments.is_empty() {
            self.filters.push(doc! { "$nor": fragments });
        }

        self
    }

    /// Declares a join whose membership filter is added when the query is resolved.
    pub fn join(
        &mut self,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
        foreign_collection: impl Into<String>,
        query: QuerySet,
    ) -> &mut Self {
        self.joins.push(Join {
            local_field: local_field.into(),
            foreign_field: foreign_field.into(),
            foreign_collection: foreign_collection.into(),
            query,
        });
        self
    }

    fn find_options_mut(&mut self) -> &mut FindOptions {
        self.find_options.get_or_insert_with(FindOptions::default)
    }

    fn update_options_mut(&mut self) -> &mut UpdateOptions {
        self.update_options.get_or_insert_with(UpdateOptions::default)
    }

    fn delete_options_mut(&mut self) -> &mut DeleteOptions {
        self.delete_options.get_or_insert_with(DeleteOptions::default)
    }

    /// Sets the maximum number of documents a find returns.
    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.find_options_mut().limit = Some(limit);
        self
    }

    /// Sets the number of matching documents a find skips.
    pub fn skip(&mut self, skip: u64) -> &mut Self {
        self.find_options_mut().skip = Some(skip);
        self
    }

    /// Sets the ordering specification, replacing any previous one.
    pub fn sort(&mut self, sort: Document) -> &mut Self {
        self.find_options_mut().sort = Some(sort);
        self
    }

    /// Orders by a single field.
    pub fn order_by(&mut self, field: impl Into<String>, direction: SortDirection) -> &mut Self {
        self.sort(sort_by(field, direction))
    }

    /// Returns only the named fields.
    pub fn fields<F: Into<String>>(&mut self, names: impl IntoIterator<Item = F>) -> &mut Self {
        self.find_options_mut().projection = Some(Projection::Include(
            names.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Returns every field except the named ones.
    pub fn exclude_fields<F: Into<String>>(&mut self, names: impl IntoIterator<Item = F>) -> &mut Self {
        self.find_options_mut().projection = Some(Projection::Exclude(
            names.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Applies `skip` and then `limit`, each only when given.
    pub fn paginate(&mut self, skip: Option<u64>, limit: Option<i64>) -> &mut Self {
        if let Some(skip) = skip {
            self.skip(skip);
        }

        if let Some(limit) = limit {
            self.limit(limit);
        }

        self
    }

    /// Inserts a document when an update matches nothing.
    pub fn upsert(&mut self, upsert: bool) -> &mut Self {
        self.update_options_mut().upsert = Some(upsert);
        self
    }

    /// Sets the array filters used by positional updates.
    pub fn array_filters(&mut self, filters: impl IntoIterator<Item = Document>) -> &mut Self {
        self.update_options_mut().array_filters = Some(filters.into_iter().collect());
        self
    }

    /// Sets the index hint used by deletes.
    pub fn delete_hint(&mut self, hint: Document) -> &mut Self {
        self.delete_options_mut().hint = Some(hint);
        self
    }

    /// The accumulated fragments in insertion order.
    pub fn filters(&self) -> &[Document] {
        &self.filters
    }

    /// The declared joins in insertion order.
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Find settings, if any were set.
    pub fn find_options(&self) -> Option<&FindOptions> {
        self.find_options.as_ref()
    }

    /// Update settings, if any were set.
    pub fn update_options(&self) -> Option<&UpdateOptions> {
        self.update_options.as_ref()
    }

    /// Delete settings, if any were set.
    pub fn delete_options(&self) -> Option<&DeleteOptions> {
        self.delete_options.as_ref()
    }

    /// Materializes the filter: the AND of every fragment in order.
    ///
    /// Joins are not part of this filter; they need the store and are added
    /// by [`resolve_filter`](crate::join::resolve_filter). An empty query set
    /// builds `{}`, which matches every document.
    pub fn build(&self) -> Document {
        self.build_with(Vec::new())
    }

    /// Materializes the filter with extra fragments appended after the accumulated ones.
    pub(crate) fn build_with(&self, extra: Vec<Document>) -> Document {
        let fragments = self
            .filters
            .iter()
            .cloned()
            .chain(extra)
            .collect::<Vec<_>>();

        if fragments.is_empty() {
            doc! {}
        } else {
            doc! { "$and": fragments }
        }
    }
}

/// Applies `skip` and then `limit` to `query`, each only when given.
pub fn paginate_query(query: &mut QuerySet, skip: Option<u64>, limit: Option<i64>) {
    query.paginate(skip, limit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;

    #[test]
    fn build_ands_fragments_in_order() {
        let mut query = QuerySet::new();
        query
            .filter([doc! { "a": 1 }])
            .filter([doc! { "b": 2 }, doc! { "c": 3 }]);

        assert_eq!(
            query.build(),
            doc! { "$and": [{ "a": 1 }, { "b": 2 }, { "c": 3 }] },
        );
    }

    #[test]
    fn build_is_idempotent() {
        let query = QuerySet::with_filters([Filter::gt("age", 18)]);

        assert_eq!(query.build(), query.build());
        assert_eq!(query.filters().len(), 1);
    }

    #[test]
    fn empty_query_builds_universal_filter() {
        assert_eq!(QuerySet::new().build(), doc! {});
    }

    #[test]
    fn exclude_adds_one_negation_per_call() {
        let mut query = QuerySet::with_filters([doc! { "x": 0 }]);
        query
            .exclude([doc! { "a": 1 }, doc! { "b": 2 }])
            .exclude([doc! { "c": 3 }]);

        assert_eq!(
            query.build(),
            doc! {
                "$and": [
                    { "x": 0 },
                    { "$nor": [{ "a": 1 }, { "b": 2 }] },
                    { "$nor": [{ "c": 3 }] },
                ]
            },
        );
    }

    #[test]
    fn exclude_without_fragments_is_noop() {
        let mut query = QuerySet::new();
        query.exclude(Vec::new());

        assert!(query.filters().is_empty());
    }

    #[test]
    fn options_are_created_lazily() {
        let mut query = QuerySet::new();
        assert!(query.find_options().is_none());
        assert!(query.update_options().is_none());
        assert!(query.delete_options().is_none());

        query.limit(5);
        assert_eq!(query.find_options().and_then(|o| o.limit), Some(5));
        assert!(query.update_options().is_none());
    }

    #[test]
    fn options_overwrite_previous_values() {
        let mut query = QuerySet::new();
        query
            .limit(5)
            .limit(7)
            .order_by("a", SortDirection::Asc)
            .sort(doc! { "b": -1 })
            .fields(["a"])
            .exclude_fields(["b"]);

        let options = query.find_options().unwrap();
        assert_eq!(options.limit, Some(7));
        assert_eq!(options.sort, Some(doc! { "b": -1 }));
        assert_eq!(options.projection, Some(Projection::Exclude(vec!["b".into()])));
    }

    #[test]
    fn paginate_without_values_leaves_options_untouched() {
        let mut query = QuerySet::new();
        paginate_query(&mut query, None, None);

        assert!(query.find_options().is_none());
    }

    #[test]
    fn paginate_with_skip_only_leaves_limit_default() {
        let mut query = QuerySet::new();
        paginate_query(&mut query, Some(5), None);

        let options = query.find_options().unwrap();
        assert_eq!(options.skip, Some(5));
        assert_eq!(options.limit, None);
    }

    #[test]
    fn update_and_delete_settings_use_their_own_bags() {
        let mut query = QuerySet::new();
        query.upsert(true).delete_hint(doc! { "a": 1 });

        assert_eq!(query.update_options().and_then(|o| o.upsert), Some(true));
        assert_eq!(
            query.delete_options().and_then(|o| o.hint.clone()),
            Some(doc! { "a": 1 }),
        );
        assert!(query.find_options().is_none());
    }

    #[test]
    fn joins_are_kept_out_of_the_plain_build() {
        let mut query = QuerySet::with_filters([doc! { "a": 1 }]);
        query.join("author_id", "_id", "authors", QuerySet::with_filters([doc! { "active": true }]));

        assert_eq!(query.joins().len(), 1);
        assert_eq!(query.joins()[0].foreign_collection, "authors");
        assert_eq!(query.build(), doc! { "$and": [{ "a": 1 }] });
    }
}
