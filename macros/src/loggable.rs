use crate::entry::{leveled_impl, EntryEnum};
use proc_macro::TokenStream;
use quote::quote;
use syn::parse_macro_input;

pub fn loggable_impl(input: TokenStream) -> TokenStream {
    let EntryEnum { name, entries } = parse_macro_input!(input as EntryEnum);

    let variants = entries.iter().map(|entry| {
        let variant = &entry.name;
        let message = &entry.message;
        let docs = entry.docs();
        if entry.fields.is_empty() {
            quote! {
                #(#docs)*
                #[error(#message)]
                #variant
            }
        } else {
            let fields = entry.field_definitions();
            quote! {
                #(#docs)*
                #[error(#message)]
                #variant { #(#fields,)* }
            }
        }
    });

    let arms = entries
        .iter()
        .map(|entry| {
            let variant = &entry.name;
            let level = &entry.level;
            if entry.fields.is_empty() {
                quote! { Self::#variant => #level }
            } else {
                quote! { Self::#variant { .. } => #level }
            }
        })
        .collect();

    let leveled = leveled_impl(&name, arms);

    quote! {
        #[allow(dead_code)]
        #[derive(Debug, Clone, thiserror::Error, serde::Serialize, serde::Deserialize)]
        pub enum #name {
            #(#variants,)*
        }

        #leveled
    }
    .into()
}
