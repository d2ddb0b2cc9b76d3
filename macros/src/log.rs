use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{parse_macro_input, Expr, Token};

struct LogInput {
    entry: Expr,
    context: Option<Expr>,
}

impl Parse for LogInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let entry = input.parse::<Expr>()?;
        let context = if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            Some(input.parse::<Expr>()?)
        } else {
            None
        };
        Ok(LogInput { entry, context })
    }
}

pub fn log_impl(input: TokenStream) -> TokenStream {
    let LogInput { entry, context } = parse_macro_input!(input as LogInput);

    let emit = match context {
        Some(context) => quote! {
            let __log_context = &#context;
            match __log_level {
                tracing::Level::ERROR => tracing::error!(context = %__log_context, "{}", __log_message),
                tracing::Level::WARN => tracing::warn!(context = %__log_context, "{}", __log_message),
                tracing::Level::INFO => tracing::info!(context = %__log_context, "{}", __log_message),
                tracing::Level::DEBUG => tracing::debug!(context = %__log_context, "{}", __log_message),
                tracing::Level::TRACE => tracing::trace!(context = %__log_context, "{}", __log_message),
            }
        },
        None => quote! {
            match __log_level {
                tracing::Level::ERROR => tracing::error!("{}", __log_message),
                tracing::Level::WARN => tracing::warn!("{}", __log_message),
                tracing::Level::INFO => tracing::info!("{}", __log_message),
                tracing::Level::DEBUG => tracing::debug!("{}", __log_message),
                tracing::Level::TRACE => tracing::trace!("{}", __log_message),
            }
        },
    };

    quote! {
        {
            let __log_entry = &#entry;
            let __log_level = __log_entry.level();
            let __log_message = __log_entry.to_string();
            #emit
        }
    }
    .into()
}
