//! Procedural macros for Qalib.
//!
//! `#[derive(Component)]` turns a struct with named fields into a
//! component: its fields become constructor parameters in declaration
//! order, and the type is registered for lookup by name.
//!
//! Field types decide how each parameter is satisfied:
//!
//! | Field type          | Parameter                         |
//! |---------------------|-----------------------------------|
//! | `Arc<T>`            | dependency on component `T`       |
//! | `Option<Arc<T>>`    | dependency, absent when unbuildable |
//! | `Option<X>`         | plain data, absent allowed        |
//! | anything else       | plain data                        |
//!
//! ```rust,ignore
//! #[derive(Component)]
//! #[component(name = "Button")]
//! pub struct Button {
//!     pub text: String,
//!     #[component(default = "default_style")]
//!     pub style: String,
//!     #[component(default)]
//!     pub disabled: bool,
//!     pub icon: Option<Arc<Icon>>,
//! }
//! ```

use darling::util::Override;
use darling::{FromDeriveInput, FromField, ast};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{DeriveInput, GenericArgument, Ident, Path, PathArguments, Type, parse_macro_input};

#[derive(FromDeriveInput)]
#[darling(attributes(component), supports(struct_named))]
struct ComponentInput {
    ident: Ident,
    generics: syn::Generics,
    data: ast::Data<(), ComponentField>,
    /// Display name; defaults to the struct's name.
    #[darling(default)]
    name: Option<String>,
}

#[derive(FromField)]
#[darling(attributes(component))]
struct ComponentField {
    ident: Option<Ident>,
    ty: Type,
    /// `default` uses `Default::default()`, `default = "path"` calls `path()`.
    #[darling(default)]
    default: Option<Override<Path>>,
}

/// How a field maps onto a constructor parameter.
#[derive(Clone, Copy)]
enum FieldKind<'a> {
    Dependency(&'a Type),
    OptionalDependency(&'a Type),
    Optional,
    Data,
}

#[proc_macro_derive(Component, attributes(component))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match ComponentInput::from_derive_input(&input).and_then(expand) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.write_errors().into(),
    }
}

fn expand(input: ComponentInput) -> darling::Result<TokenStream2> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let display_name = input.name.clone().unwrap_or_else(|| ident.unraw().to_string());

    let fields = input
        .data
        .as_ref()
        .take_struct()
        .ok_or_else(|| darling::Error::unsupported_shape("only structs with named fields"))?
        .fields;

    let mut errors = darling::Error::accumulator();
    let mut parameters = Vec::new();
    let mut readers = Vec::new();
    let mut snapshots = Vec::new();

    for field in fields {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let name = field_ident.unraw().to_string();
        let ty = &field.ty;
        let kind = classify(ty);

        if field.default.is_some() && matches!(kind, FieldKind::Dependency(_) | FieldKind::OptionalDependency(_)) {
            errors.push(
                darling::Error::custom("dependencies are resolved by the container and cannot declare a default")
                    .with_span(field_ident),
            );
            continue;
        }

        let parameter = match kind {
            FieldKind::Dependency(inner) => quote! {
                ::qalib::component::Parameter::dependency::<#inner>(#name)
            },
            FieldKind::OptionalDependency(inner) => quote! {
                ::qalib::component::Parameter::dependency::<#inner>(#name).nullable()
            },
            FieldKind::Optional => quote! {
                ::qalib::component::Parameter::primitive::<#ty>(#name).nullable()
            },
            FieldKind::Data => quote! {
                ::qalib::component::Parameter::primitive::<#ty>(#name)
            },
        };
        let parameter = match &field.default {
            None => parameter,
            Some(Override::Inherit) => quote! {
                #parameter.with_default(|| {
                    ::qalib::value::Value::data(&<#ty as ::core::default::Default>::default())
                })
            },
            Some(Override::Explicit(path)) => quote! {
                #parameter.with_default(|| {
                    let value: #ty = #path();
                    ::qalib::value::Value::data(&value)
                })
            },
        };
        parameters.push(parameter);

        let (reader, snapshot) = match kind {
            FieldKind::Dependency(_) => (
                quote! { args.instance(#name)? },
                quote! { ::qalib::value::Value::instance(::std::sync::Arc::clone(&self.#field_ident)) },
            ),
            FieldKind::OptionalDependency(_) => (
                quote! { args.optional_instance(#name)? },
                quote! { ::qalib::value::Value::optional_instance(self.#field_ident.clone()) },
            ),
            FieldKind::Optional | FieldKind::Data => (
                quote! { args.data(#name)? },
                quote! { ::qalib::value::Value::data(&self.#field_ident)? },
            ),
        };
        readers.push(quote! { #field_ident: #reader });
        snapshots.push(quote! { .with(#name, #snapshot) });
    }

    errors.finish()?;

    // Generic components have no single descriptor to submit.
    let submission = input.generics.params.is_empty().then(|| {
        quote! {
            ::qalib::__private::inventory::submit! {
                ::qalib::__private::ComponentEntry::new(<#ident as ::qalib::Component>::descriptor)
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::qalib::Component for #ident #ty_generics #where_clause {
            fn name() -> &'static str {
                #display_name
            }

            fn parameters() -> ::std::vec::Vec<::qalib::component::Parameter> {
                ::std::vec![#(#parameters),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn construct(mut args: ::qalib::component::Arguments) -> ::qalib::Result<Self> {
                ::core::result::Result::Ok(Self {
                    #(#readers,)*
                })
            }

            fn fields(&self) -> ::qalib::Result<::qalib::value::FieldMap> {
                ::core::result::Result::Ok(::qalib::value::FieldMap::new() #(#snapshots)*)
            }
        }

        #submission
    })
}

fn classify(ty: &Type) -> FieldKind<'_> {
    if let Some(inner) = single_argument(ty, "Arc") {
        return FieldKind::Dependency(inner);
    }
    if let Some(inner) = single_argument(ty, "Option") {
        if let Some(component) = single_argument(inner, "Arc") {
            return FieldKind::OptionalDependency(component);
        }
        return FieldKind::Optional;
    }
    FieldKind::Data
}

/// `Wrapper<Inner>` → `Inner`, matching on the last path segment.
fn single_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    match arguments.args.iter().collect::<Vec<_>>().as_slice() {
        [GenericArgument::Type(inner)] => Some(inner),
        _ => None,
    }
}
