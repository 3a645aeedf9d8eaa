// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Proc macros for stagehand.
//!
//! Provides `#[derive(ConfigTree)]`, which generates the schema description
//! the nested-config discovery walker visits at initialization time.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, Fields, GenericArgument, Index, PathArguments, Type, parse_macro_input,
    spanned::Spanned,
};

/// Suffix (compared case-insensitively) that marks a type as a config record.
const CONFIG_SUFFIX: &str = "config";

/// Derives `stagehand::config::ConfigTree` for a struct.
///
/// A field is treated as a nested config record when its type name ends with
/// `Config` (any case) or when it carries `#[config(nested)]`. Such fields must
/// themselves implement `ConfigTree` and `Clone`.
///
/// `Box<T>`, `Arc<T>`, `Option<Box<T>>` and `Option<Arc<T>>` fields are
/// pointer fields whenever `T` implements `ConfigTree` and `Clone`, whatever
/// its name; any other pointee is reported as a plain field. `#[config(skip)]`
/// hides a field from the walker.
///
/// # Example
///
/// ```ignore
/// use stagehand::ConfigTree;
///
/// #[derive(Clone, Default, ConfigTree)]
/// struct AppConfig {
///     http: HttpConfig,
///     cache: Option<Box<CacheConfig>>,
///     port: u16,
/// }
/// ```
#[proc_macro_derive(ConfigTree, attributes(config))]
pub fn derive_config_tree(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);

    match generate_config_tree(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wrapper {
    /// `Option<Box<T>>` / `Option<Arc<T>>`
    Optional,
    /// `Box<T>` / `Arc<T>`
    Owned,
}

enum FieldShape<'a> {
    Record(&'a Type),
    Pointer(Wrapper, &'a Type),
    Other,
}

#[derive(Default)]
struct FieldAttrs {
    nested: bool,
    skip: bool,
}

fn generate_config_tree(input: DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "#[derive(ConfigTree)] only works with structs",
        ));
    };

    let mut schema = Vec::new();
    let mut extractors = Vec::new();

    let members: Vec<(syn::Member, String, &syn::Field)> = match &data.fields {
        Fields::Named(named) => named
            .named
            .iter()
            .filter_map(|f| {
                let name = f.ident.clone()?;
                Some((syn::Member::Named(name.clone()), name.to_string(), f))
            })
            .collect(),
        Fields::Unnamed(unnamed) => unnamed
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, f)| (syn::Member::Unnamed(Index::from(i)), i.to_string(), f))
            .collect(),
        Fields::Unit => Vec::new(),
    };

    for (index, (member, name, field)) in members.iter().enumerate() {
        let attrs = parse_field_attrs(&field.attrs)?;
        let ty = &field.ty;

        let shape = if attrs.skip {
            FieldShape::Other
        } else {
            classify(ty, attrs.nested)
        };

        match shape {
            FieldShape::Record(record) => {
                schema.push(quote! {
                    ::stagehand::config::ConfigField {
                        name: #name,
                        type_name: ::std::any::type_name::<#record>(),
                        node: ::stagehand::config::FieldNode::Record(&self.#member),
                    }
                });
                extractors.push(quote! {
                    #index => ::std::option::Option::Some(
                        ::stagehand::config::ConfigHandle::new(::std::clone::Clone::clone(&self.#member)),
                    ),
                });
            }
            FieldShape::Pointer(wrapper, pointee) => {
                let access = pointer_access(member, wrapper);
                schema.push(quote! {
                    {
                        #[allow(unused_imports)]
                        use ::stagehand::config::__private::{PlainField as _, TreeField as _};
                        let probe = ::stagehand::config::__private::TreeProbe::<#pointee>::new();
                        ::stagehand::config::ConfigField {
                            name: #name,
                            type_name: ::std::any::type_name::<#pointee>(),
                            node: if (&probe).is_tree() {
                                ::stagehand::config::FieldNode::Pointer(
                                    #access.and_then(|v| (&probe).view(v)),
                                )
                            } else {
                                ::stagehand::config::FieldNode::Other
                            },
                        }
                    }
                });
                extractors.push(quote! {
                    #index => {
                        #[allow(unused_imports)]
                        use ::stagehand::config::__private::{PlainField as _, TreeField as _};
                        let probe = ::stagehand::config::__private::TreeProbe::<#pointee>::new();
                        #access.and_then(|v| (&probe).handle(v))
                    }
                });
            }
            FieldShape::Other => {
                schema.push(quote! {
                    ::stagehand::config::ConfigField {
                        name: #name,
                        type_name: ::std::any::type_name::<#ty>(),
                        node: ::stagehand::config::FieldNode::Other,
                    }
                });
            }
        }
    }

    Ok(quote! {
        impl #impl_generics ::stagehand::config::ConfigTree for #ident #ty_generics #where_clause {
            fn type_name(&self) -> &'static str {
                ::std::any::type_name::<Self>()
            }

            fn fields(&self) -> ::std::vec::Vec<::stagehand::config::ConfigField<'_>> {
                ::std::vec![#(#schema),*]
            }

            fn field_value(
                &self,
                index: usize,
            ) -> ::std::option::Option<::stagehand::config::ConfigHandle> {
                match index {
                    #(#extractors)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    })
}

fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("config") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("nested") {
                parsed.nested = true;
                Ok(())
            } else if meta.path.is_ident("skip") {
                parsed.skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `nested` or `skip`"))
            }
        })?;
    }
    Ok(parsed)
}

/// Expression yielding `Option<&Pointee>` for a pointer field.
fn pointer_access(member: &syn::Member, wrapper: Wrapper) -> TokenStream2 {
    match wrapper {
        Wrapper::Optional => quote! { self.#member.as_deref() },
        Wrapper::Owned => {
            quote! { ::std::option::Option::Some(::std::ops::Deref::deref(&self.#member)) }
        }
    }
}

fn classify(ty: &Type, nested: bool) -> FieldShape<'_> {
    if let Some(inner) = generic_inner(ty, "Option") {
        return match smart_pointer_inner(inner) {
            Some(pointee) if is_path(pointee) => FieldShape::Pointer(Wrapper::Optional, pointee),
            _ => FieldShape::Other,
        };
    }

    if let Some(pointee) = smart_pointer_inner(ty) {
        if is_path(pointee) {
            return FieldShape::Pointer(Wrapper::Owned, pointee);
        }
        return FieldShape::Other;
    }

    if is_record(ty, nested) {
        FieldShape::Record(ty)
    } else {
        FieldShape::Other
    }
}

/// Pointees are resolved at compile time of the generated code, so anything
/// nameable is a candidate. Trait objects, slices and the like are not.
fn is_path(ty: &Type) -> bool {
    matches!(ty, Type::Path(_))
}

fn smart_pointer_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Box").or_else(|| generic_inner(ty, "Arc"))
}

fn is_record(ty: &Type, nested: bool) -> bool {
    if nested {
        return true;
    }
    last_segment_ident(ty)
        .map(|ident| ident.to_lowercase().ends_with(CONFIG_SUFFIX))
        .unwrap_or(false)
}

fn last_segment_ident(ty: &Type) -> Option<String> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    type_path
        .path
        .segments
        .last()
        .map(|segment| segment.ident.to_string())
}

/// Returns `T` when `ty` is `<wrapper><T>` (matched on the last path segment).
fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) => Some(inner),
        _ => None,
    }
}
