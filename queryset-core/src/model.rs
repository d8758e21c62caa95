//! Identity capability for persisted models.
//!
//! A model is any serializable record that can report and accept its `_id`.
//! The all-zero [`ObjectId`] marks a model that has not been stored yet, which
//! is how [`Collection::save_model`](crate::collection::Collection::save_model)
//! decides between insert and update.
//!
//! ```ignore
//! use queryset::{Model, bson::oid::ObjectId};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Model)]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub name: String,
//! }
//! ```

use bson::{Document, oid::ObjectId, ser::serialize_to_document};
use serde::Serialize;

use crate::error::DocumentStoreResult;

/// The identity of a model that has not been inserted yet.
pub const NIL_OBJECT_ID: ObjectId = ObjectId::from_bytes([0; 12]);

/// A record with a store-assigned identity.
pub trait Model: Serialize + Send + Sync {
    /// Returns the model's identity, [`NIL_OBJECT_ID`] when unsaved.
    fn id(&self) -> ObjectId;

    /// Replaces the model's identity.
    fn set_id(&mut self, id: ObjectId);

    /// Returns true once the model carries a real identity.
    fn has_id(&self) -> bool {
        self.id() != NIL_OBJECT_ID
    }
}

/// Serializes a model without its `_id` field.
///
/// Used both for inserts, where the store assigns the identity, and for
/// `$set` updates, where the identity only appears in the filter.
pub fn model_fields<M: Model>(model: &M) -> DocumentStoreResult<Document> {
    let mut document = serialize_to_document(model)?;
    document.remove("_id");

    Ok(document)
}
