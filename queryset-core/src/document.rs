//! Dotted-path access into BSON documents.
//!
//! Paths such as `"address.city"` descend through embedded documents. Arrays
//! are not traversed; a path segment that lands on a non-document value ends
//! the lookup.

use bson::{Bson, Document};

/// Returns the value at `path`, if every segment exists.
pub fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Sets the value at `path`, creating intermediate documents as needed.
///
/// Returns `false` when an intermediate segment holds a non-document value.
pub fn set_path(document: &mut Document, path: &str, value: Bson) -> bool {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            true
        }
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, Document::new());
            }

            match document.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                _ => false,
            }
        }
    }
}

/// Removes and returns the value at `path`.
pub fn remove_path(document: &mut Document, path: &str) -> Option<Bson> {
    match path.split_once('.') {
        None => document.remove(path),
        Some((head, rest)) => match document.get_mut(head) {
            Some(Bson::Document(inner)) => remove_path(inner, rest),
            _ => None,
        },
    }
}
