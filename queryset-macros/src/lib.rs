//! Procedural macros for the queryset project.
//!
//! This crate provides compile-time code generation for queryset, currently
//! the [`Model`] derive.

#[allow(unused_extern_crates)]
extern crate self as queryset_macros;

mod model;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `queryset::model::Model` for a struct.
///
/// The identity field is the one marked `#[model(id)]`, or else the field
/// named `id`. It must be a `bson::oid::ObjectId`, usually serialized as
/// `_id`:
///
/// ```ignore
/// use queryset::{Model, bson::oid::ObjectId};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Serialize, Deserialize, Model)]
/// struct Post {
///     #[serde(rename = "_id")]
///     #[model(id)]
///     key: ObjectId,
///     title: String,
/// }
/// ```
#[proc_macro_derive(Model, attributes(model))]
pub fn model_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    model::model_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
