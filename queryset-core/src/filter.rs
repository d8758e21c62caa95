//! Filter fragment helpers.
//!
//! A filter fragment is a BSON document in the store's native query syntax,
//! such as `{ "age": { "$gt": 18 } }`. [`QuerySet`](crate::query::QuerySet)
//! accepts any fragment unchanged, so fragments may be written by hand with
//! [`bson::doc!`] or produced by the [`Filter`] helpers below.
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - Membership: `any_of`, `none_of`
//! - Existence: `exists`, `not_exists`
//! - Logical: `and`, `or`, `nor`, `not`
//! - Identity: `id`
//!
//! ```ignore
//! use queryset::filter::Filter;
//!
//! let fragment = Filter::or([
//!     Filter::eq("status", "active"),
//!     Filter::gte("age", 18),
//! ]);
//! ```

use bson::{Bson, Document, doc, oid::ObjectId};

/// Helper struct for constructing filter fragments.
///
/// All methods accept field names and values as `Into<String>` and `Into<Bson>`.
pub struct Filter;

impl Filter {
    fn field_op(field: impl Into<String>, op: &str, value: impl Into<Bson>) -> Document {
        let field: String = field.into();
        let value: Bson = value.into();

        doc! { field: { op: value } }
    }

    /// Matches documents where the field equals the value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::field_op(field, "$eq", value)
    }

    /// Matches documents where the field does not equal the value (or is missing).
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::field_op(field, "$ne", value)
    }

    /// Matches documents where the field is greater than the value.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::field_op(field, "$gt", value)
    }

    /// Matches documents where the field is greater than or equal to the value.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::field_op(field, "$gte", value)
    }

    /// Matches documents where the field is less than the value.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::field_op(field, "$lt", value)
    }

    /// Matches documents where the field is less than or equal to the value.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::field_op(field, "$lte", value)
    }

    /// Matches documents where the field equals any of the values.
    pub fn any_of<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Document {
        Self::field_op(field, "$in", values.into_iter().map(Into::into).collect::<Vec<Bson>>())
    }

    /// Matches documents where the field equals none of the values.
    pub fn none_of<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Document {
        Self::field_op(field, "$nin", values.into_iter().map(Into::into).collect::<Vec<Bson>>())
    }

    /// Matches documents that contain the field.
    pub fn exists(field: impl Into<String>) -> Document {
        Self::field_op(field, "$exists", true)
    }

    /// Matches documents that do not contain the field.
    pub fn not_exists(field: impl Into<String>) -> Document {
        Self::field_op(field, "$exists", false)
    }

    /// All fragments must match.
    pub fn and(fragments: impl IntoIterator<Item = Document>) -> Document {
        doc! { "$and": fragments.into_iter().collect::<Vec<_>>() }
    }

    /// At least one fragment must match.
    pub fn or(fragments: impl IntoIterator<Item = Document>) -> Document {
        doc! { "$or": fragments.into_iter().collect::<Vec<_>>() }
    }

    /// None of the fragments may match.
    pub fn nor(fragments: impl IntoIterator<Item = Document>) -> Document {
        doc! { "$nor": fragments.into_iter().collect::<Vec<_>>() }
    }

    /// Negates a single fragment.
    ///
    /// The store's `$not` only applies to operator expressions on one field, so
    /// a whole fragment is negated as a single-element `$nor`.
    pub fn not(fragment: Document) -> Document {
        Self::nor([fragment])
    }

    /// Matches the document with the given identity.
    pub fn id(id: ObjectId) -> Document {
        doc! { "_id": id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_helpers_use_native_operators() {
        assert_eq!(Filter::eq("name", "Alice"), doc! { "name": { "$eq": "Alice" } });
        assert_eq!(Filter::gte("age", 18), doc! { "age": { "$gte": 18 } });
        assert_eq!(Filter::not_exists("deleted_at"), doc! { "deleted_at": { "$exists": false } });
    }

    #[test]
    fn membership_helpers_collect_values() {
        assert_eq!(
            Filter::any_of("tag", ["a", "b"]),
            doc! { "tag": { "$in": ["a", "b"] } },
        );
        assert_eq!(
            Filter::none_of("n", Vec::<i32>::new()),
            doc! { "n": { "$nin": [] } },
        );
    }

    #[test]
    fn not_wraps_fragment_in_nor() {
        assert_eq!(
            Filter::not(doc! { "a": 1 }),
            doc! { "$nor": [{ "a": 1 }] },
        );
    }
}
