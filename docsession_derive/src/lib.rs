use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Type, parse_macro_input, spanned::Spanned};

/// Implements `docsession::Document` for a struct with named fields.
///
/// Exactly one field must carry `#[document(key)]`. The struct may carry
/// `#[document(collection = "...")]`; without it the collection name is the
/// snake_case struct name. When the key field is renamed for serde, repeat
/// the serialized name with `#[document(key, field = "...")]`.
#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_document(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct KeyField {
    ident: Ident,
    ty: Type,
    serialized_name: String,
}

fn expand_document(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;
    let collection = parse_collection_option(&input.attrs)?
        .unwrap_or_else(|| to_snake_case(&struct_name.to_string()));

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Document can only be derived for structs",
            ));
        }
    };

    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Document requires named fields",
            ));
        }
    };

    let mut key_field: Option<KeyField> = None;
    for field in named_fields.named {
        let Some(serialized_override) = parse_key_field_options(&field.attrs)? else {
            continue;
        };
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Document requires named fields"))?;

        if key_field.is_some() {
            return Err(syn::Error::new(
                field.span(),
                "Duplicate #[document(key)] field; a document has exactly one key",
            ));
        }

        let serialized_name = serialized_override.unwrap_or_else(|| ident.to_string());
        key_field = Some(KeyField {
            ident,
            ty: field.ty,
            serialized_name,
        });
    }

    let Some(key_field) = key_field else {
        return Err(syn::Error::new(
            struct_name.span(),
            "Document requires one field marked #[document(key)]",
        ));
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let key_ident = key_field.ident;
    let key_ty = key_field.ty;
    let key_name = key_field.serialized_name;

    Ok(quote! {
        impl #impl_generics ::docsession::Document for #struct_name #ty_generics #where_clause {
            type Key = #key_ty;

            const KEY_FIELD: &'static str = #key_name;
            const COLLECTION: &'static str = #collection;

            fn key(&self) -> Self::Key {
                ::core::clone::Clone::clone(&self.#key_ident)
            }
        }
    })
}

fn parse_collection_option(attrs: &[syn::Attribute]) -> syn::Result<Option<String>> {
    let mut collection = None;

    for attr in attrs {
        if !attr.path().is_ident("document") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                if lit.value().trim().is_empty() {
                    return Err(meta.error("collection name must not be empty"));
                }
                collection = Some(lit.value());
                return Ok(());
            }

            Err(meta.error("Unsupported document attribute. Supported: collection = \"...\""))
        })?;
    }

    Ok(collection)
}

/// Returns `None` for non-key fields, `Some(None)` for a key field using its
/// Rust name, and `Some(Some(name))` for a key field with an explicit name.
fn parse_key_field_options(attrs: &[syn::Attribute]) -> syn::Result<Option<Option<String>>> {
    let mut is_key = false;
    let mut field_name = None;

    for attr in attrs {
        if !attr.path().is_ident("document") {
            continue;
        }

        match &attr.meta {
            syn::Meta::List(list) => {
                list.parse_nested_meta(|meta| {
                    if meta.path.is_ident("key") {
                        is_key = true;
                        return Ok(());
                    }

                    if meta.path.is_ident("field") {
                        let value = meta.value()?;
                        let lit: LitStr = value.parse()?;
                        field_name = Some(lit.value());
                        return Ok(());
                    }

                    Err(meta.error(
                        "Unsupported #[document(...)] field option. Supported: key, field = \"...\"",
                    ))
                })?;
            }
            _ => {
                return Err(syn::Error::new(
                    attr.span(),
                    "Use #[document(key)] or #[document(key, field = \"...\")]",
                ));
            }
        }
    }

    if field_name.is_some() && !is_key {
        return Err(syn::Error::new(
            attrs
                .first()
                .map(|attr| attr.span())
                .unwrap_or_else(proc_macro2::Span::call_site),
            "#[document(field = \"...\")] is only valid together with `key`",
        ));
    }

    Ok(is_key.then_some(field_name))
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (idx, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if idx > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
