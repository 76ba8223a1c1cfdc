//! Procedural macros for Khazina.
//!
//! - `#[factory]` turns an inherent `impl` block into a `Factory`: every
//!   `&self` method becomes an entry point and its parameters become the
//!   descriptor table the container resolves arguments from.
//! - `#[derive(Invokable)]` registers a `Default` type as an invokable.
//!
//! Both submit the type to the compile-time catalog under
//! `module_path!()::TypeName` unless told otherwise.

use darling::ast::NestedMeta;
use darling::{FromDeriveInput, FromMeta};
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    Attribute, DeriveInput, FnArg, GenericArgument, Ident, ImplItem, ItemImpl, LitStr, Pat,
    PathArguments, ReturnType, Type, parse_macro_input,
};

#[derive(Debug, Default, FromMeta)]
struct FactoryArgs {
    /// Name used in configuration. Defaults to `module_path!()::Type`.
    #[darling(default)]
    name: Option<String>,
    /// Skip compile-time registration.
    #[darling(default)]
    no_register: bool,
}

/// Implements `Factory` for the type of an inherent `impl` block.
///
/// Parameter rules:
/// - `x: Arc<T>` resolves the service named by `T`'s type name
/// - `x: Service` resolves the service named `x`, untyped
/// - `#[named] x: Arc<T>` resolves the service named `x`, downcast to `T`
/// - `#[service("id")] x: Arc<T>` resolves the service `id`
///
/// A method returning `Result<T, E>` reports `E` as a construction failure.
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct MailerFactory;
///
/// #[factory(name = "app.MailerFactory")]
/// impl MailerFactory {
///     fn invoke(&self, transport: Arc<Transport>, #[named] config: Arc<Value>) -> Mailer {
///         Mailer::new(transport, &config)
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn factory(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = match NestedMeta::parse_meta_list(args.into()) {
        Ok(args) => args,
        Err(e) => return darling::Error::from(e).write_errors().into(),
    };
    let args = match FactoryArgs::from_list(&args) {
        Ok(args) => args,
        Err(e) => return e.write_errors().into(),
    };
    let item = parse_macro_input!(input as ItemImpl);

    match expand_factory(args, item) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(invokable), supports(struct_any, enum_any))]
struct InvokableArgs {
    ident: Ident,
    generics: syn::Generics,
    #[darling(default)]
    name: Option<String>,
}

/// Registers a `Default` type as an invokable in the compile-time catalog.
///
/// ```rust,ignore
/// #[derive(Default, Invokable)]
/// #[invokable(name = "app.Clock")]
/// struct Clock;
/// ```
#[proc_macro_derive(Invokable, attributes(invokable))]
pub fn derive_invokable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let args = match InvokableArgs::from_derive_input(&input) {
        Ok(args) => args,
        Err(e) => return e.write_errors().into(),
    };

    if !args.generics.params.is_empty() {
        return syn::Error::new_spanned(&args.generics, "invokable types cannot be generic")
            .to_compile_error()
            .into();
    }

    let ident = &args.ident;
    let name = registration_name(args.name.as_deref(), ident);

    quote! {
        ::khazina::__private::inventory::submit! {
            ::khazina::InvokableType::named::<#ident>(#name)
        }
    }
    .into()
}

// ── expansion ──

/// How one parameter is described and fetched.
struct Parameter {
    descriptor: TokenStream2,
    fetch: TokenStream2,
}

struct EntryPointDef {
    name: String,
    method: Ident,
    parameters: Vec<Parameter>,
    fallible: bool,
}

fn expand_factory(args: FactoryArgs, mut item: ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[factory] goes on an inherent impl block",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "factory types cannot be generic",
        ));
    }

    let self_ty = item.self_ty.clone();
    let type_ident = match self_ty.as_ref() {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.clone())
            .ok_or_else(|| syn::Error::new_spanned(&self_ty, "expected a type path"))?,
        other => return Err(syn::Error::new_spanned(other, "expected a type path")),
    };

    let mut entry_points = Vec::new();
    for impl_item in &mut item.items {
        if let ImplItem::Fn(method) = impl_item
            && takes_shared_self(&method.sig.inputs)
        {
            entry_points.push(entry_point(method)?);
        }
    }

    if entry_points.is_empty() {
        return Err(syn::Error::new(
            Span::call_site(),
            "#[factory] needs at least one `&self` method to use as an entry point",
        ));
    }

    let table = entry_points.iter().map(|ep| {
        let name = &ep.name;
        let descriptors = ep.parameters.iter().map(|p| &p.descriptor);
        quote! {
            ::khazina::EntryPoint::new(#name, ::std::vec![#(#descriptors),*])
        }
    });

    let arms = entry_points.iter().map(|ep| {
        let name = &ep.name;
        let method = &ep.method;
        let bindings: Vec<Ident> = (0..ep.parameters.len())
            .map(|i| format_ident!("__arg{}", i))
            .collect();
        let fetches = ep.parameters.iter().map(|p| &p.fetch);
        let question = ep.fallible.then(|| quote!(?));
        quote! {
            #name => {
                #( let #bindings = #fetches; )*
                let value = self.#method(#(#bindings),*) #question;
                ::std::result::Result::Ok(::khazina::into_service(value))
            }
        }
    });

    let names: Vec<&String> = entry_points.iter().map(|ep| &ep.name).collect();

    let registration = if args.no_register {
        quote!()
    } else {
        let name = registration_name(args.name.as_deref(), &type_ident);
        quote! {
            ::khazina::__private::inventory::submit! {
                ::khazina::FactoryType::named::<#self_ty>(#name)
            }
        }
    };

    Ok(quote! {
        #item

        impl ::khazina::Factory for #self_ty {
            fn entry_points() -> ::std::vec::Vec<::khazina::EntryPoint> {
                ::std::vec![#(#table),*]
            }

            #[allow(unused_variables)]
            fn call(
                &self,
                entry_point: &str,
                args: ::khazina::Arguments,
            ) -> ::std::result::Result<::khazina::Service, ::khazina::BoxError> {
                match entry_point {
                    #(#arms)*
                    other => ::std::result::Result::Err(::std::boxed::Box::new(
                        ::khazina::KhazinaError::NoSuchEntryPoint(
                            ::khazina::error::NoSuchEntryPointError {
                                type_name: ::std::any::type_name::<Self>().to_string(),
                                entry_point: other.to_string(),
                                available: ::std::vec![#(#names.to_string()),*],
                            },
                        ),
                    )),
                }
            }
        }

        #registration
    })
}

fn registration_name(explicit: Option<&str>, ident: &Ident) -> TokenStream2 {
    match explicit {
        Some(name) => quote!(#name),
        None => quote!(concat!(module_path!(), "::", stringify!(#ident))),
    }
}

fn takes_shared_self(inputs: &syn::punctuated::Punctuated<FnArg, syn::Token![,]>) -> bool {
    matches!(
        inputs.first(),
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_none()
    )
}

fn entry_point(method: &mut syn::ImplItemFn) -> syn::Result<EntryPointDef> {
    let mut parameters = Vec::new();

    for (index, input) in method.sig.inputs.iter_mut().skip(1).enumerate() {
        let FnArg::Typed(pat_type) = input else {
            continue;
        };
        let name = match pat_type.pat.as_ref() {
            Pat::Ident(pat) => pat.ident.to_string(),
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "factory parameters must be plain identifiers",
                ));
            }
        };
        let lookup = take_lookup_attr(&mut pat_type.attrs)?;
        parameters.push(parameter(index, name, lookup, &pat_type.ty)?);
    }

    Ok(EntryPointDef {
        name: method.sig.ident.to_string(),
        method: method.sig.ident.clone(),
        parameters,
        fallible: returns_result(&method.sig.output),
    })
}

/// Lookup override taken from a parameter attribute.
enum Lookup {
    DeclaredType,
    Name,
    Explicit(String),
}

/// Removes `#[named]` / `#[service("id")]` from `attrs` and reports which,
/// if any, was present.
fn take_lookup_attr(attrs: &mut Vec<Attribute>) -> syn::Result<Lookup> {
    let mut lookup = Lookup::DeclaredType;
    let mut error = None;

    attrs.retain(|attr| {
        if attr.path().is_ident("named") {
            lookup = Lookup::Name;
            false
        } else if attr.path().is_ident("service") {
            match attr.parse_args::<LitStr>() {
                Ok(id) => lookup = Lookup::Explicit(id.value()),
                Err(_) => {
                    error = Some(syn::Error::new_spanned(
                        attr,
                        "expected #[service(\"identifier\")]",
                    ))
                }
            }
            false
        } else {
            true
        }
    });

    match error {
        Some(e) => Err(e),
        None => Ok(lookup),
    }
}

fn parameter(position: usize, name: String, lookup: Lookup, ty: &Type) -> syn::Result<Parameter> {
    if is_untyped_service(ty) {
        let descriptor = match lookup {
            Lookup::Explicit(id) => quote! {
                ::khazina::ParameterDescriptor::typed(#name, ::khazina::ServiceId::from_static(#id))
            },
            Lookup::DeclaredType | Lookup::Name => quote! {
                ::khazina::ParameterDescriptor::named(#name)
            },
        };
        return Ok(Parameter {
            descriptor,
            fetch: quote!(args.raw(#position)?),
        });
    }

    let inner = arc_inner(ty).ok_or_else(|| {
        syn::Error::new_spanned(ty, "factory parameters must be `Arc<T>` or `Service`")
    })?;

    let descriptor = match lookup {
        Lookup::DeclaredType => quote! {
            ::khazina::ParameterDescriptor::typed(#name, ::khazina::ServiceId::of::<#inner>())
        },
        Lookup::Name => quote! {
            ::khazina::ParameterDescriptor::named(#name)
        },
        Lookup::Explicit(id) => quote! {
            ::khazina::ParameterDescriptor::typed(#name, ::khazina::ServiceId::from_static(#id))
        },
    };

    Ok(Parameter {
        descriptor,
        fetch: quote!(args.get::<#inner>(#position)?),
    })
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        _ => None,
    }
}

fn is_untyped_service(ty: &Type) -> bool {
    last_segment(ty)
        .is_some_and(|s| s.ident == "Service" && matches!(s.arguments, PathArguments::None))
}

fn arc_inner(ty: &Type) -> Option<&Type> {
    let segment = last_segment(ty)?;
    if segment.ident != "Arc" {
        return None;
    }
    let PathArguments::AngleBracketed(generics) = &segment.arguments else {
        return None;
    };
    match generics.args.first() {
        Some(GenericArgument::Type(inner)) if generics.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => last_segment(ty).is_some_and(|s| s.ident == "Result"),
    }
}
