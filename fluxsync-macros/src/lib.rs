//! Procedural macros for fluxsync

use darling::{FromDeriveInput, FromField, FromVariant};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any))]
struct ActionOpts {
    ident: syn::Ident,
    vis: syn::Visibility,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Namespace of the generated types; defaults to the snake_cased enum
    /// name without its `Action` suffix
    #[darling(default)]
    domain: Option<String>,

    /// The enum wraps other action enums, one per variant
    #[darling(default)]
    compose: bool,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,
    fields: darling::ast::Fields<VariantField>,

    #[darling(default)]
    request: bool,

    #[darling(default)]
    response: bool,

    #[darling(default)]
    local: bool,
}

#[derive(Debug, FromField)]
struct VariantField {
    ty: syn::Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Request,
    Response,
    Local,
}

impl Kind {
    fn tokens(self) -> TokenStream2 {
        match self {
            Kind::Request => quote! { ::fluxsync::ActionKind::Request },
            Kind::Response => quote! { ::fluxsync::ActionKind::Response },
            Kind::Local => quote! { ::fluxsync::ActionKind::Local },
        }
    }
}

/// Leading verbs of actions that only touch local state
const LOCAL_VERBS: &[&str] = &["Update", "Remove", "Sign", "Cancel", "Set", "Clear"];

/// Split a PascalCase string into parts
fn split_pascal_case(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for ch in s.chars() {
        if ch.is_uppercase() && !current.is_empty() {
            parts.push(current);
            current = String::new();
        }
        current.push(ch);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Convert PascalCase to snake_case
fn to_snake_case(s: &str) -> String {
    split_pascal_case(s)
        .iter()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// `PostAction` -> `post`, `WcProductAction` -> `wc_product`
fn default_domain(enum_name: &str) -> String {
    let base = enum_name.strip_suffix("Action").unwrap_or(enum_name);
    let base = if base.is_empty() { enum_name } else { base };
    to_snake_case(base)
}

/// Infer the kind from the variant's leading verb
///
/// - past tense (`FetchedPosts`, `PushedUsername`) is a response
/// - `Update*`, `Remove*`, `SignOut`, ... only touch local state
/// - anything else asks for remote work
fn infer_kind(name: &str) -> Kind {
    let parts = split_pascal_case(name);
    let Some(verb) = parts.first() else {
        return Kind::Request;
    };

    if verb.len() > 2 && verb.ends_with("ed") {
        Kind::Response
    } else if LOCAL_VERBS.contains(&verb.as_str()) {
        Kind::Local
    } else {
        Kind::Request
    }
}

fn variant_kind(v: &ActionVariant) -> Result<Kind, syn::Error> {
    let explicit: Vec<Kind> = [
        (v.request, Kind::Request),
        (v.response, Kind::Response),
        (v.local, Kind::Local),
    ]
    .into_iter()
    .filter_map(|(set, kind)| set.then_some(kind))
    .collect();

    match explicit.as_slice() {
        [] => Ok(infer_kind(&v.ident.to_string())),
        [kind] => Ok(*kind),
        _ => Err(syn::Error::new_spanned(
            &v.ident,
            "only one of `request`, `response` or `local` may be given",
        )),
    }
}

/// Derive macro for the Action trait
///
/// Generates a `{Name}Type` tag enum with one fieldless variant per action
/// variant, implements `fluxsync::ActionType` for it and `fluxsync::Action`
/// for the enum.
///
/// Kinds are inferred from the leading verb and can be overridden per
/// variant with `#[action(request)]`, `#[action(response)]` or
/// `#[action(local)]`.
///
/// With `#[action(compose)]` every variant must wrap another action enum.
/// The tag enum then nests the inner tags, and `From` conversions plus
/// `fluxsync::Nested` impls are generated so domain stores can pick their
/// actions out of the composed stream.
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// #[action(domain = "post")]
/// enum PostAction {
///     FetchPosts(FetchPostsPayload),
///     FetchedPosts(FetchedPostsPayload),
///     UpdatePost(Post),
/// }
///
/// #[derive(Action, Clone, Debug)]
/// #[action(compose)]
/// enum AppAction {
///     Post(PostAction),
///     Media(MediaAction),
/// }
///
/// let action: AppAction = PostAction::UpdatePost(post).into();
/// assert_eq!(action.action_type(), AppActionType::Post(PostActionType::UpdatePost));
/// assert_eq!(action.kind(), ActionKind::Local);
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let variants = match &opts.data {
        darling::ast::Data::Enum(variants) => variants,
        _ => {
            return syn::Error::new_spanned(&input, "Action can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    let expanded = if opts.compose {
        expand_composed(&opts, variants)
    } else {
        expand_domain(&opts, variants)
    };

    match expanded {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_domain(opts: &ActionOpts, variants: &[ActionVariant]) -> Result<TokenStream2, syn::Error> {
    let name = &opts.ident;
    let vis = &opts.vis;
    let type_name = format_ident!("{}Type", name);
    let domain = opts
        .domain
        .clone()
        .unwrap_or_else(|| default_domain(&name.to_string()));

    let idents: Vec<_> = variants.iter().map(|v| &v.ident).collect();
    let names: Vec<_> = idents.iter().map(|v| v.to_string()).collect();
    let kinds = variants
        .iter()
        .map(|v| variant_kind(v).map(Kind::tokens))
        .collect::<Result<Vec<_>, _>>()?;

    let type_doc = format!("Action types of [`{}`], namespaced `{}`.", name, domain);

    Ok(quote! {
        #[doc = #type_doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #vis enum #type_name {
            #(#idents,)*
        }

        impl #type_name {
            /// Every type, in declaration order
            pub const ALL: &'static [Self] = &[#(Self::#idents,)*];

            pub const DOMAIN: &'static str = #domain;
        }

        impl ::fluxsync::ActionType for #type_name {
            fn domain(&self) -> &'static str {
                #domain
            }

            fn name(&self) -> &'static str {
                match self {
                    #(Self::#idents => #names,)*
                }
            }

            fn kind(&self) -> ::fluxsync::ActionKind {
                match self {
                    #(Self::#idents => #kinds,)*
                }
            }
        }

        impl ::fluxsync::Action for #name {
            type Type = #type_name;

            fn action_type(&self) -> #type_name {
                match self {
                    #(#name::#idents { .. } => #type_name::#idents,)*
                }
            }
        }
    })
}

fn expand_composed(opts: &ActionOpts, variants: &[ActionVariant]) -> Result<TokenStream2, syn::Error> {
    let name = &opts.ident;
    let vis = &opts.vis;
    let type_name = format_ident!("{}Type", name);

    let mut idents = Vec::new();
    let mut inner_types = Vec::new();
    for v in variants {
        match (v.fields.style, v.fields.fields.as_slice()) {
            (darling::ast::Style::Tuple, [field]) => {
                idents.push(&v.ident);
                inner_types.push(&field.ty);
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    &v.ident,
                    "composed actions must wrap exactly one action enum, e.g. `Post(PostAction)`",
                ))
            }
        }
    }

    let type_doc = format!("Action types of [`{}`].", name);

    let nested_impls = idents.iter().zip(&inner_types).map(|(ident, inner)| {
        quote! {
            impl ::core::convert::From<#inner> for #name {
                fn from(action: #inner) -> Self {
                    #name::#ident(action)
                }
            }

            impl ::core::convert::From<<#inner as ::fluxsync::Action>::Type> for #type_name {
                fn from(ty: <#inner as ::fluxsync::Action>::Type) -> Self {
                    #type_name::#ident(ty)
                }
            }

            impl ::fluxsync::Nested<#name> for #inner {
                #[allow(unreachable_patterns)]
                fn project(action: &#name) -> ::core::option::Option<&Self> {
                    match action {
                        #name::#ident(inner) => ::core::option::Option::Some(inner),
                        _ => ::core::option::Option::None,
                    }
                }

                fn lift_type(ty: <#inner as ::fluxsync::Action>::Type) -> #type_name {
                    #type_name::#ident(ty)
                }
            }
        }
    });

    Ok(quote! {
        #[doc = #type_doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #vis enum #type_name {
            #(#idents(<#inner_types as ::fluxsync::Action>::Type),)*
        }

        impl ::fluxsync::ActionType for #type_name {
            fn domain(&self) -> &'static str {
                match self {
                    #(Self::#idents(ty) => ::fluxsync::ActionType::domain(ty),)*
                }
            }

            fn name(&self) -> &'static str {
                match self {
                    #(Self::#idents(ty) => ::fluxsync::ActionType::name(ty),)*
                }
            }

            fn kind(&self) -> ::fluxsync::ActionKind {
                match self {
                    #(Self::#idents(ty) => ::fluxsync::ActionType::kind(ty),)*
                }
            }
        }

        impl ::fluxsync::Action for #name {
            type Type = #type_name;

            fn action_type(&self) -> #type_name {
                match self {
                    #(#name::#idents(inner) => #type_name::#idents(::fluxsync::Action::action_type(inner)),)*
                }
            }
        }

        #(#nested_impls)*
    })
}
