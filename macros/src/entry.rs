use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{braced, Attribute, Error, Expr, Ident, LitStr, Result, Token, Type};

pub struct EntryEnum {
    pub name: Ident,
    pub entries: Vec<Entry>,
}

pub struct Entry {
    pub attributes: Vec<Attribute>,
    pub message: LitStr,
    pub name: Ident,
    pub fields: Vec<(Ident, Type)>,
    pub level: Expr,
}

impl Entry {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.attributes.iter().any(|attr| attr.path().is_ident(flag))
    }

    pub fn docs(&self) -> Vec<&Attribute> {
        self.attributes
            .iter()
            .filter(|attr| attr.path().is_ident("doc"))
            .collect()
    }

    pub fn field_definitions(&self) -> Vec<TokenStream> {
        self.fields
            .iter()
            .map(|(name, ty)| quote! { #name: #ty })
            .collect()
    }
}

impl Parse for Entry {
    fn parse(input: ParseStream) -> Result<Self> {
        let attributes = input.call(Attribute::parse_outer)?;

        let message = attributes
            .iter()
            .find(|attr| attr.path().is_ident("error"))
            .ok_or_else(|| Error::new(input.span(), "Missing #[error(...)] attribute"))?
            .parse_args::<LitStr>()?;

        let name = input.parse::<Ident>()?;

        let mut fields = Vec::new();
        if input.peek(syn::token::Brace) {
            let content;
            braced!(content in input);
            while !content.is_empty() {
                let field_name = content.parse::<Ident>()?;
                content.parse::<Token![:]>()?;
                let field_type = content.parse::<Type>()?;
                fields.push((field_name, field_type));
                if !content.is_empty() {
                    content.parse::<Token![,]>()?;
                }
            }
        }

        input.parse::<Token![=>]>()?;
        let level = input.parse::<Expr>()?;

        Ok(Entry {
            attributes,
            message,
            name,
            fields,
            level,
        })
    }
}

impl Parse for EntryEnum {
    fn parse(input: ParseStream) -> Result<Self> {
        let name = input.parse::<Ident>()?;

        let content;
        braced!(content in input);

        let mut entries = Vec::new();
        while !content.is_empty() {
            entries.push(content.parse::<Entry>()?);
            if content.peek(Token![,]) {
                content.parse::<Token![,]>()?;
            }
        }

        Ok(EntryEnum { name, entries })
    }
}

/// `level()` and `log()` shared by every generated enum. `arms` maps each
/// variant pattern to its level.
pub fn leveled_impl(name: &Ident, arms: Vec<TokenStream>) -> TokenStream {
    quote! {
        impl #name {
            #[allow(dead_code)]
            pub fn level(&self) -> tracing::Level {
                match self {
                    #(#arms,)*
                }
            }

            #[allow(dead_code)]
            pub fn log(&self) {
                let message = self.to_string();
                match self.level() {
                    tracing::Level::ERROR => tracing::error!("{}", message),
                    tracing::Level::WARN => tracing::warn!("{}", message),
                    tracing::Level::INFO => tracing::info!("{}", message),
                    tracing::Level::DEBUG => tracing::debug!("{}", message),
                    tracing::Level::TRACE => tracing::trace!("{}", message),
                }
            }
        }
    }
}
