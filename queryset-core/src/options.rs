//! Per-operation option bags.
//!
//! A [`QuerySet`](crate::query::QuerySet) carries one optional bag per
//! operation kind. A bag that was never created means "use the store's
//! defaults"; inside a bag, every `None` setting is likewise left to the store.

use bson::{Bson, Document, doc};
use serde::{Deserialize, Serialize};

/// Sort (and index key) direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// The store-native direction value (`1` or `-1`).
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

impl From<SortDirection> for Bson {
    fn from(direction: SortDirection) -> Self {
        Bson::Int32(direction.as_i32())
    }
}

/// Which fields a retrieval returns.
///
/// The store forbids mixing inclusion and exclusion of non-identity fields;
/// this type only holds one mode at a time but nothing prevents a caller from
/// passing a hand-written mixed document through a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Return only the named fields (plus `_id`).
    Include(Vec<String>),
    /// Return everything except the named fields.
    Exclude(Vec<String>),
}

impl Projection {
    /// Renders the projection in the store's native syntax.
    pub fn to_document(&self) -> Document {
        match self {
            Projection::Include(fields) => fields
                .iter()
                .map(|field| (field.clone(), Bson::Int32(1)))
                .collect(),
            Projection::Exclude(fields) => fields
                .iter()
                .map(|field| (field.clone(), Bson::Int32(0)))
                .collect(),
        }
    }
}

/// Settings for find operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Maximum number of documents to return.
    pub limit: Option<i64>,
    /// Number of matching documents to skip.
    pub skip: Option<u64>,
    /// Ordering specification (field to `1`/`-1`), passed to the store as is.
    pub sort: Option<Document>,
    /// Field projection.
    pub projection: Option<Projection>,
}

/// Settings for update operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOptions {
    /// Insert a new document when nothing matches.
    pub upsert: Option<bool>,
    /// Filters selecting array elements for positional `$[<id>]` updates.
    pub array_filters: Option<Vec<Document>>,
}

/// Settings for delete operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteOptions {
    /// Index key pattern the store should use to locate matches.
    pub hint: Option<Document>,
}

/// A single compound index over one or more fields.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    /// Indexed fields in key order.
    pub keys: Vec<(String, SortDirection)>,
    /// Reject documents sharing the same key combination.
    pub unique: bool,
}

impl IndexSpec {
    /// Creates a unique compound index over the given keys.
    pub fn unique<F: Into<String>>(keys: impl IntoIterator<Item = (F, SortDirection)>) -> Self {
        Self {
            keys: keys
                .into_iter()
                .map(|(field, direction)| (field.into(), direction))
                .collect(),
            unique: true,
        }
    }

    /// Renders the key pattern, e.g. `{ "a": 1, "b": -1 }`.
    pub fn key_document(&self) -> Document {
        self.keys
            .iter()
            .map(|(field, direction)| (field.clone(), Bson::from(*direction)))
            .collect()
    }

    /// The store's default index name, e.g. `a_1_b_-1`.
    pub fn default_name(&self) -> String {
        self.keys
            .iter()
            .map(|(field, direction)| format!("{}_{}", field, direction.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Builds a single-field sort specification.
pub fn sort_by(field: impl Into<String>, direction: SortDirection) -> Document {
    let field: String = field.into();

    doc! { field: direction }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_renders_native_flags() {
        assert_eq!(
            Projection::Include(vec!["a".into(), "b".into()]).to_document(),
            doc! { "a": 1, "b": 1 },
        );
        assert_eq!(
            Projection::Exclude(vec!["secret".into()]).to_document(),
            doc! { "secret": 0 },
        );
    }

    #[test]
    fn index_spec_keeps_key_order() {
        let spec = IndexSpec::unique([("a", SortDirection::Asc), ("b", SortDirection::Desc)]);

        assert!(spec.unique);
        assert_eq!(spec.key_document(), doc! { "a": 1, "b": -1 });
        assert_eq!(spec.default_name(), "a_1_b_-1");
    }
}
