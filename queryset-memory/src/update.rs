//! Update operators for in-memory documents.
//!
//! Supports `$set`, `$unset` and `$inc`. Replacement-style updates (a
//! document without operators) are rejected, as the store does for
//! update-one and update-many.

use bson::{Bson, Document};

use queryset_core::{
    document::{get_path, remove_path, set_path},
    error::{DocumentStoreError, DocumentStoreResult},
};

use crate::evaluator::values_equal;

fn invalid(message: impl Into<String>) -> DocumentStoreError {
    DocumentStoreError::InvalidQuery(message.into())
}

fn increment(path: &str, current: &Bson, by: &Bson) -> DocumentStoreResult<Bson> {
    let overflow = || invalid(format!("incrementing {} would overflow", path));

    Ok(match (current, by) {
        (Bson::Int32(a), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(*a as i64 + *b as i64),
        },
        (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64((*a as i64).checked_add(*b).ok_or_else(overflow)?),
        (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(a.checked_add(*b as i64).ok_or_else(overflow)?),
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a.checked_add(*b).ok_or_else(overflow)?),
        (Bson::Double(a), Bson::Double(b)) => Bson::Double(a + b),
        (Bson::Double(a), Bson::Int32(b)) => Bson::Double(a + *b as f64),
        (Bson::Double(a), Bson::Int64(b)) => Bson::Double(a + *b as f64),
        (Bson::Int32(a), Bson::Double(b)) => Bson::Double(*a as f64 + b),
        (Bson::Int64(a), Bson::Double(b)) => Bson::Double(*a as f64 + b),
        _ => return Err(invalid(format!("cannot increment {} with non-numeric operands", path))),
    })
}

fn operator_fields<'a>(op: &str, fields: &'a Bson) -> DocumentStoreResult<&'a Document> {
    fields
        .as_document()
        .ok_or_else(|| invalid(format!("{} needs a document of fields", op)))
}

/// Applies `update` to `document`, returning whether anything changed.
pub(crate) fn apply_update(document: &mut Document, update: &Document) -> DocumentStoreResult<bool> {
    if update.is_empty() || update.keys().any(|key| !key.starts_with('$')) {
        return Err(invalid("update document requires atomic operators"));
    }

    let mut modified = false;

    for (op, fields) in update {
        let fields = operator_fields(op, fields)?;

        for (path, value) in fields {
            match op.as_str() {
                "$set" => {
                    if let Some(current) = get_path(document, path) {
                        if values_equal(current, value) && current.element_type() == value.element_type() {
                            continue;
                        }
                        if path == "_id" {
                            return Err(invalid("the _id field is immutable"));
                        }
                    }

                    if !set_path(document, path, value.clone()) {
                        return Err(invalid(format!("cannot create field {} in a non-document value", path)));
                    }
                    modified = true;
                }
                "$unset" => {
                    if path == "_id" {
                        return Err(invalid("the _id field is immutable"));
                    }
                    modified |= remove_path(document, path).is_some();
                }
                "$inc" => {
                    let next = match get_path(document, path) {
                        None => match value {
                            Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => value.clone(),
                            _ => return Err(invalid(format!("cannot increment {} by a non-numeric value", path))),
                        },
                        Some(current) => increment(path, current, value)?,
                    };

                    if !set_path(document, path, next) {
                        return Err(invalid(format!("cannot create field {} in a non-document value", path)));
                    }
                    modified = true;
                }
                other => return Err(invalid(format!("unsupported update operator {}", other))),
            }
        }
    }

    Ok(modified)
}

/// Seeds an upserted document from the equality conditions of `filter`.
pub(crate) fn seed_from_filter(filter: &Document) -> Document {
    let mut seed = Document::new();
    collect_equalities(filter, &mut seed);
    seed
}

fn collect_equalities(filter: &Document, seed: &mut Document) {
    for (key, condition) in filter {
        if key == "$and" {
            for clause in condition.as_array().into_iter().flatten() {
                if let Some(clause) = clause.as_document() {
                    collect_equalities(clause, seed);
                }
            }
            continue;
        }

        if key.starts_with('$') {
            continue;
        }

        match condition {
            Bson::Document(operators) if operators.keys().next().is_some_and(|k| k.starts_with('$')) => {
                if let Some(value) = operators.get("$eq") {
                    set_path(seed, key, value.clone());
                }
            }
            value => {
                set_path(seed, key, value.clone());
            }
        }
    }
}
