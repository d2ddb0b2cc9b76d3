use crate::entry::{leveled_impl, Entry, EntryEnum};
use proc_macro::TokenStream;
use quote::quote;
use syn::parse_macro_input;

fn variant_tokens(entry: &Entry) -> proc_macro2::TokenStream {
    let variant = &entry.name;
    let message = &entry.message;
    let docs = entry.docs();
    let fields = entry.field_definitions();

    match (entry.has_flag("no_source"), fields.is_empty()) {
        (true, true) => quote! {
            #(#docs)*
            #[error(#message)]
            #variant
        },
        (true, false) => quote! {
            #(#docs)*
            #[error(#message)]
            #variant { #(#fields,)* }
        },
        (false, _) => quote! {
            #(#docs)*
            #[error(#message)]
            #variant { #(#fields,)* err: String }
        },
    }
}

// Unit variants already own their name as a constructor.
fn constructor_tokens(entry: &Entry) -> Option<proc_macro2::TokenStream> {
    let no_source = entry.has_flag("no_source");
    if no_source && entry.fields.is_empty() {
        return None;
    }

    let variant = &entry.name;
    let params = entry
        .fields
        .iter()
        .map(|(name, ty)| quote! { #name: impl Into<#ty> });
    let assignments = entry
        .fields
        .iter()
        .map(|(name, _)| quote! { #name: #name.into() });

    if no_source {
        Some(quote! {
            #[allow(non_snake_case)]
            pub fn #variant(#(#params),*) -> Self {
                Self::#variant { #(#assignments,)* }
            }
        })
    } else {
        Some(quote! {
            #[allow(non_snake_case)]
            pub fn #variant(#(#params,)* source: impl std::fmt::Display) -> Self {
                Self::#variant {
                    #(#assignments,)*
                    err: source.to_string()
                }
            }
        })
    }
}

pub fn traceable_impl(input: TokenStream) -> TokenStream {
    let EntryEnum { name, entries } = parse_macro_input!(input as EntryEnum);

    let variants = entries.iter().map(variant_tokens);
    let constructors = entries.iter().filter_map(constructor_tokens);

    let arms = entries
        .iter()
        .map(|entry| {
            let variant = &entry.name;
            let level = &entry.level;
            if entry.has_flag("no_source") && entry.fields.is_empty() {
                quote! { Self::#variant => #level }
            } else {
                quote! { Self::#variant { .. } => #level }
            }
        })
        .collect();

    let source_arms = entries.iter().map(|entry| {
        let variant = &entry.name;
        if entry.has_flag("no_source") {
            if entry.fields.is_empty() {
                quote! { Self::#variant => None }
            } else {
                quote! { Self::#variant { .. } => None }
            }
        } else {
            quote! { Self::#variant { err, .. } => Some(err.as_str()) }
        }
    });

    let leveled = leveled_impl(&name, arms);

    quote! {
        #[allow(dead_code)]
        #[derive(Debug, Clone, thiserror::Error, serde::Serialize, serde::Deserialize)]
        pub enum #name {
            #(#variants,)*
        }

        #leveled

        impl #name {
            /// Rendered source error, when the variant captured one.
            #[allow(dead_code)]
            pub fn cause(&self) -> Option<&str> {
                match self {
                    #(#source_arms,)*
                }
            }

            #(#constructors)*
        }
    }
    .into()
}
