//! Filter, sort and projection evaluation for in-memory documents.
//!
//! Filters are evaluated in the same native syntax the MongoDB backend sends
//! to the server, so a [`QuerySet`](queryset_core::query::QuerySet) behaves
//! the same against both backends for the supported operators:
//!
//! - Logical: `$and`, `$or`, `$nor` (non-empty arrays)
//! - Field: implicit equality, `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`,
//!   `$in`, `$nin`, `$exists`, `$not`
//!
//! Equality and comparison against an array field also consider each element.

use bson::{Bson, DateTime, Document, oid::ObjectId};
use std::cmp::Ordering;

use queryset_core::{
    document::{get_path, remove_path, set_path},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Comparable view of a BSON value.
///
/// Integers compare exactly; a comparison involving a double goes through
/// `f64`. Values of different kinds are ordered by kind, following the
/// store's cross-type sort order.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Integer(i64),
    Number(f64),
    String(&'a str),
    Map(Vec<(&'a str, Comparable<'a>)>),
    Array(Vec<Comparable<'a>>),
    ObjectId(ObjectId),
    Bool(bool),
    DateTime(DateTime),
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Int32(value) => Comparable::Integer(*value as i64),
            Bson::Int64(value) => Comparable::Integer(*value),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            other => Comparable::Other(other),
        }
    }
}

impl<'a> Comparable<'a> {
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 1,
            Comparable::Integer(_) | Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Map(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::ObjectId(_) => 7,
            Comparable::Bool(_) => 8,
            Comparable::DateTime(_) => 9,
            Comparable::Other(_) => 10,
        }
    }

    /// Orders any two values, falling back to the kind order across kinds.
    pub(crate) fn total_cmp(&self, other: &Self) -> Ordering {
        match self.rank().cmp(&other.rank()) {
            Ordering::Equal => self.partial_cmp(other).unwrap_or(Ordering::Equal),
            ordering => ordering,
        }
    }
}

fn lexicographic<T>(
    left: &[T],
    right: &[T],
    cmp: impl Fn(&T, &T) -> Option<Ordering>,
) -> Option<Ordering> {
    for (a, b) in left.iter().zip(right.iter()) {
        match cmp(a, b)? {
            Ordering::Equal => continue,
            ordering => return Some(ordering),
        }
    }

    Some(left.len().cmp(&right.len()))
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Integer(a), Comparable::Integer(b)) => Some(a.cmp(b)),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::Integer(a), Comparable::Number(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Number(a), Comparable::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::String(a), Comparable::String(b)) => Some(a.cmp(b)),
            (Comparable::Map(a), Comparable::Map(b)) => lexicographic(a, b, |(ka, va), (kb, vb)| {
                match ka.cmp(kb) {
                    Ordering::Equal => va.partial_cmp(vb),
                    ordering => Some(ordering),
                }
            }),
            (Comparable::Array(a), Comparable::Array(b)) => lexicographic(a, b, |x, y| x.partial_cmp(y)),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => Some(a.bytes().cmp(&b.bytes())),
            (Comparable::Bool(a), Comparable::Bool(b)) => Some(a.cmp(b)),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => {
                Some(a.timestamp_millis().cmp(&b.timestamp_millis()))
            }
            (Comparable::Other(a), Comparable::Other(b)) if a == b => Some(Ordering::Equal),
            _ => None,
        }
    }
}

/// Interprets a flag value the way the store does (`true`, non-zero numbers).
pub(crate) fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(flag) => *flag,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

/// Equality between two values, including numeric cross-width equality.
pub(crate) fn values_equal(left: &Bson, right: &Bson) -> bool {
    Comparable::from(left) == Comparable::from(right)
}

fn is_operator_document(document: &Document) -> bool {
    document
        .keys()
        .next()
        .map(|key| key.starts_with('$'))
        .unwrap_or(false)
}

fn matches_eq(value: Option<&Bson>, target: &Bson) -> bool {
    match value {
        None => matches!(target, Bson::Null),
        Some(value) => {
            values_equal(value, target)
                || match value {
                    Bson::Array(items) => items.iter().any(|item| values_equal(item, target)),
                    _ => false,
                }
        }
    }
}

fn matches_cmp(value: Option<&Bson>, target: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let target = Comparable::from(target);
    let check = |candidate: &Bson| {
        Comparable::from(candidate)
            .partial_cmp(&target)
            .map(&accept)
            .unwrap_or(false)
    };

    match value {
        None => false,
        Some(Bson::Array(items)) => items.iter().any(check),
        Some(value) => check(value),
    }
}

fn membership_operands<'b>(op: &str, arg: &'b Bson) -> DocumentStoreResult<&'b Vec<Bson>> {
    arg.as_array()
        .ok_or_else(|| DocumentStoreError::InvalidQuery(format!("{} needs an array", op)))
}

/// Evaluates store-native filters against one document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns whether the document satisfies every entry of `filter`.
    pub fn evaluate(&self, filter: &Document) -> DocumentStoreResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => {
                    let mut all = true;
                    for clause in Self::logical_operands(key, condition)? {
                        if !self.evaluate(clause)? {
                            all = false;
                            break;
                        }
                    }
                    all
                }
                "$or" => self.any_clause(key, condition)?,
                "$nor" => !self.any_clause(key, condition)?,
                operator if operator.starts_with('$') => {
                    return Err(DocumentStoreError::InvalidQuery(format!(
                        "unsupported top-level operator {}",
                        operator,
                    )));
                }
                field => self.evaluate_field(field, condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Keeps the documents that satisfy `filter`, preserving their order.
    pub fn filter_documents<'d>(
        documents: impl IntoIterator<Item = &'d Document>,
        filter: &Document,
    ) -> DocumentStoreResult<Vec<Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).evaluate(filter)? {
                matched.push(document.clone());
            }
        }

        Ok(matched)
    }

    fn logical_operands<'b>(op: &str, condition: &'b Bson) -> DocumentStoreResult<Vec<&'b Document>> {
        let invalid = || DocumentStoreError::InvalidQuery(format!("{} must be a nonempty array of documents", op));

        let clauses = condition
            .as_array()
            .filter(|clauses| !clauses.is_empty())
            .ok_or_else(invalid)?;

        clauses
            .iter()
            .map(|clause| clause.as_document().ok_or_else(invalid))
            .collect()
    }

    fn any_clause(&self, op: &str, condition: &Bson) -> DocumentStoreResult<bool> {
        for clause in Self::logical_operands(op, condition)? {
            if self.evaluate(clause)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn evaluate_field(&self, field: &str, condition: &Bson) -> DocumentStoreResult<bool> {
        let value = get_path(self.document, field);

        match condition {
            Bson::Document(operators) if is_operator_document(operators) => {
                Self::evaluate_operators(value, operators)
            }
            _ => Ok(matches_eq(value, condition)),
        }
    }

    fn evaluate_operators(value: Option<&Bson>, operators: &Document) -> DocumentStoreResult<bool> {
        for (op, arg) in operators {
            let matched = match op.as_str() {
                "$eq" => matches_eq(value, arg),
                "$ne" => !matches_eq(value, arg),
                "$gt" => matches_cmp(value, arg, |o| o == Ordering::Greater),
                "$gte" => matches_cmp(value, arg, |o| o != Ordering::Less),
                "$lt" => matches_cmp(value, arg, |o| o == Ordering::Less),
                "$lte" => matches_cmp(value, arg, |o| o != Ordering::Greater),
                "$in" => membership_operands(op, arg)?
                    .iter()
                    .any(|candidate| matches_eq(value, candidate)),
                "$nin" => !membership_operands(op, arg)?
                    .iter()
                    .any(|candidate| matches_eq(value, candidate)),
                "$exists" => value.is_some() == truthy(arg),
                "$not" => match arg {
                    Bson::Document(inner) if is_operator_document(inner) => {
                        !Self::evaluate_operators(value, inner)?
                    }
                    _ => {
                        return Err(DocumentStoreError::InvalidQuery(
                            "$not needs an operator expression".into(),
                        ));
                    }
                },
                other => {
                    return Err(DocumentStoreError::InvalidQuery(format!(
                        "unsupported query operator {}",
                        other,
                    )));
                }
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Sorts documents in place by a `{ field: 1 | -1, ... }` specification.
pub(crate) fn sort_documents(documents: &mut [Document], sort: &Document) -> DocumentStoreResult<()> {
    let keys = sort
        .iter()
        .map(|(field, direction)| match direction {
            Bson::Int32(1) | Bson::Int64(1) => Ok((field.as_str(), false)),
            Bson::Int32(-1) | Bson::Int64(-1) => Ok((field.as_str(), true)),
            Bson::Double(d) if *d == 1.0 => Ok((field.as_str(), false)),
            Bson::Double(d) if *d == -1.0 => Ok((field.as_str(), true)),
            other => Err(DocumentStoreError::InvalidQuery(format!(
                "invalid sort direction {} for {}",
                other, field,
            ))),
        })
        .collect::<DocumentStoreResult<Vec<_>>>()?;

    documents.sort_by(|a, b| {
        for (field, descending) in &keys {
            let left = get_path(a, field).map(Comparable::from).unwrap_or(Comparable::Null);
            let right = get_path(b, field).map(Comparable::from).unwrap_or(Comparable::Null);

            let ordering = if *descending {
                right.total_cmp(&left)
            } else {
                left.total_cmp(&right)
            };

            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        Ordering::Equal
    });

    Ok(())
}

/// Applies an inclusion or exclusion projection.
///
/// `_id` is kept unless explicitly excluded. Mixing inclusion and exclusion
/// of other fields is rejected.
pub(crate) fn apply_projection(document: &Document, projection: &Document) -> DocumentStoreResult<Document> {
    let keep_id = projection.get("_id").map(truthy).unwrap_or(true);
    let (included, excluded): (Vec<_>, Vec<_>) = projection
        .iter()
        .filter(|(field, _)| field.as_str() != "_id")
        .partition(|(_, flag)| truthy(flag));

    if !included.is_empty() && !excluded.is_empty() {
        return Err(DocumentStoreError::InvalidQuery(
            "cannot mix inclusion and exclusion in a projection".into(),
        ));
    }

    if !included.is_empty() {
        let mut projected = Document::new();

        if keep_id {
            if let Some(id) = document.get("_id") {
                projected.insert("_id", id.clone());
            }
        }

        for (field, _) in included {
            if let Some(value) = get_path(document, field) {
                set_path(&mut projected, field, value.clone());
            }
        }

        return Ok(projected);
    }

    let mut projected = document.clone();

    for (field, _) in excluded {
        remove_path(&mut projected, field);
    }

    if !keep_id {
        projected.remove("_id");
    }

    Ok(projected)
}
