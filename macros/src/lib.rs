mod entry;
mod log;
mod loggable;
mod traceable;

use proc_macro::TokenStream;

/// Emits an entry through `tracing` at the level the entry declares.
///
/// `log!(entry)` or `log!(entry, context)`; the context is recorded as a
/// display field next to the message.
#[proc_macro]
pub fn log(input: TokenStream) -> TokenStream {
    log::log_impl(input)
}

/// Declares a leveled enum of plain log entries.
#[proc_macro]
pub fn loggable(input: TokenStream) -> TokenStream {
    loggable::loggable_impl(input)
}

/// Declares a leveled error enum. Variants keep the rendered source error
/// unless marked `#[no_source]`.
#[proc_macro]
pub fn traceable(input: TokenStream) -> TokenStream {
    traceable::traceable_impl(input)
}
