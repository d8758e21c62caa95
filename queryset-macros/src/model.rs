//! Implementation of the `#[derive(Model)]` macro.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Field, Fields, Result, spanned::Spanned};

/// Returns true for fields carrying `#[model(id)]`.
fn is_marked_id(field: &Field) -> Result<bool> {
    let mut marked = false;

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                marked = true;
                Ok(())
            } else {
                Err(meta.error("unsupported model attribute, expected `id`"))
            }
        })?;
    }

    Ok(marked)
}

/// Main implementation of the Model derive macro.
pub fn model_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new(
                    input.span(),
                    "Model can only be derived for structs with named fields",
                ));
            }
        },
        _ => return Err(Error::new(input.span(), "Model can only be derived for structs")),
    };

    let mut marked = Vec::new();
    for field in fields.iter() {
        if is_marked_id(field)? {
            marked.push(field);
        }
    }

    let id_field = match marked.as_slice() {
        [field] => *field,
        [] => fields
            .iter()
            .find(|field| field.ident.as_ref().is_some_and(|ident| ident == "id"))
            .ok_or_else(|| {
                Error::new(
                    input.span(),
                    "Model needs a field named `id` or a field marked `#[model(id)]`",
                )
            })?,
        [_, second, ..] => {
            return Err(Error::new(second.span(), "only one field can be marked `#[model(id)]`"));
        }
    };

    let id_ident = id_field
        .ident
        .as_ref()
        .ok_or_else(|| Error::new(id_field.span(), "expected named field"))?;

    Ok(quote! {
        impl #impl_generics ::queryset::model::Model for #struct_name #ty_generics #where_clause {
            fn id(&self) -> ::queryset::bson::oid::ObjectId {
                self.#id_ident
            }

            fn set_id(&mut self, id: ::queryset::bson::oid::ObjectId) {
                self.#id_ident = id;
            }
        }
    })
}
