//! Derive macro for slinpin
//!
//! `#[derive(Construct)]` implements `slinpin::Constructible` for a struct
//! with named fields. Field names become the constructor's parameter names,
//! in declaration order, so each field is injected from the registry key of
//! the same name unless an override says otherwise.
//!
//! # Example
//!
//! ```rust,ignore
//! use slinpin::{ClassRef, Construct, Container, Injection};
//! use std::sync::Arc;
//!
//! struct Pool;
//!
//! #[derive(Construct)]
//! #[construct(name = "UserRepository")]
//! struct Users {
//!     // Injected from "primary_pool" instead of "pool"
//!     #[inject(key = "primary_pool")]
//!     pool: Arc<Pool>,
//!     // Cloned out of the registry
//!     table: String,
//!     // None when nothing is registered under "cache_ttl"
//!     cache_ttl: Option<u64>,
//! }
//!
//! let container = Container::new();
//! container.constant("primary_pool", Pool);
//! container.constant("table", String::from("users"));
//! container.service("users", ClassRef::of::<Users>(), Injection::none());
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, LitStr, Type};

/// Derive macro for `slinpin::Constructible`.
///
/// # Field attributes
///
/// - `#[inject("key")]` or `#[inject(key = "key")]` - Inject the field from
///   `key` instead of the field name.
///
/// # Struct attributes
///
/// - `#[construct(name = "Name")]` - Declare the class under `Name` instead
///   of the struct's identifier.
///
/// # Field types
///
/// | Field type        | Empty slot        |
/// |-------------------|-------------------|
/// | `Arc<T>`          | `MissingArgument` |
/// | `Option<Arc<T>>`  | `None`            |
/// | `Option<T>`       | `None`            |
/// | `T: Clone`        | `MissingArgument` |
#[proc_macro_derive(Construct, attributes(inject, construct))]
pub fn derive_construct(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_construct(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_construct(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Only structs with named fields have parameter names to declare
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unit => return Ok(expand_unit(input)),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Construct can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(input, "Construct can only be derived for structs"));
        }
    };

    let class_name = class_name(input)?;

    let mut parameters = Vec::new();
    let mut annotations = Vec::new();
    let mut field_inits = Vec::new();

    for (position, field) in fields.iter().enumerate() {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let param = field_name.to_string();

        if let Some(key) = inject_key(&field.attrs)? {
            annotations.push(quote! {
                .named(#param, ::std::string::String::from(#key))
            });
        }

        let extract = extract_field(&field.ty, position);
        field_inits.push(quote! { #field_name: #extract });
        parameters.push(param);
    }

    Ok(quote! {
        impl #impl_generics ::slinpin::Constructible for #name #ty_generics #where_clause {
            fn class_name() -> &'static str {
                #class_name
            }

            fn parameters() -> ::std::vec::Vec<::slinpin::Key> {
                ::std::vec![#(::std::string::String::from(#parameters)),*]
            }

            fn annotations() -> ::slinpin::OverrideMap<::slinpin::Key> {
                ::slinpin::OverrideMap::new()
                    #(#annotations)*
            }

            fn construct(args: ::slinpin::Arguments) -> ::slinpin::Result<Self> {
                ::std::result::Result::Ok(Self {
                    #(#field_inits),*
                })
            }
        }
    })
}

/// Unit structs construct with no arguments
fn expand_unit(input: &DeriveInput) -> proc_macro2::TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let class_name = match class_name(input) {
        Ok(class_name) => class_name,
        Err(err) => return err.into_compile_error(),
    };

    quote! {
        impl #impl_generics ::slinpin::Constructible for #name #ty_generics #where_clause {
            fn class_name() -> &'static str {
                #class_name
            }

            fn construct(_: ::slinpin::Arguments) -> ::slinpin::Result<Self> {
                ::std::result::Result::Ok(Self)
            }
        }
    }
}

/// `#[construct(name = "...")]`, else the struct identifier
fn class_name(input: &DeriveInput) -> syn::Result<String> {
    let mut name = input.ident.to_string();

    for attr in &input.attrs {
        if !attr.path().is_ident("construct") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                name = value.value();
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
    }

    Ok(name)
}

/// Parse `#[inject("key")]` / `#[inject(key = "key")]`; bare `#[inject]` adds nothing
fn inject_key(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    for attr in attrs {
        if !attr.path().is_ident("inject") {
            continue;
        }

        if attr.meta.require_path_only().is_ok() {
            return Ok(None);
        }

        if let Ok(lit) = attr.parse_args::<LitStr>() {
            return Ok(Some(lit.value()));
        }

        let mut key = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("key") {
                let value: LitStr = meta.value()?.parse()?;
                key = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `key = \"...\"`"))
            }
        })?;

        return match key {
            Some(key) => Ok(Some(key)),
            None => Err(syn::Error::new_spanned(attr, "expected #[inject(\"key\")] or #[inject(key = \"key\")]")),
        };
    }
    Ok(None)
}

/// Argument accessor matching the field's type
fn extract_field(ty: &Type, position: usize) -> proc_macro2::TokenStream {
    if let Some(inner) = extract_option_inner_type(ty) {
        return match extract_arc_inner_type(inner) {
            Some(arc_inner) => quote! { args.optional_arc::<#arc_inner>(#position)? },
            None => quote! { args.optional::<#inner>(#position)? },
        };
    }

    match extract_arc_inner_type(ty) {
        Some(inner) => quote! { args.arc::<#inner>(#position)? },
        None => quote! { args.get::<#ty>(#position)? },
    }
}

/// Extract T from Arc<T>
fn extract_arc_inner_type(ty: &Type) -> Option<&Type> {
    single_generic_argument(ty, "Arc")
}

/// Extract T from Option<T>
fn extract_option_inner_type(ty: &Type) -> Option<&Type> {
    single_generic_argument(ty, "Option")
}

fn single_generic_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    if let Type::Path(type_path) = ty {
        let segment = type_path.path.segments.last()?;
        if segment.ident == wrapper {
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                    return Some(inner);
                }
            }
        }
    }
    None
}
