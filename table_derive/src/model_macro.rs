use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Error};

/// Convenience attribute macro that adds all necessary derives for a database model
///
/// Usage:
/// ```ignore
/// use dbhelper::prelude::*;
///
/// #[model]
/// #[table(name = "t_student")]
/// pub struct Student {
///     #[primary_key]
///     #[auto_increment]
///     pub id: Option<i64>,
///     pub name: String,
/// }
/// ```
pub fn model_attribute(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);

    if !matches!(input.data, Data::Struct(_)) {
        return Error::new(input.ident.span(), "model can only be used on structs")
            .to_compile_error()
            .into();
    }

    // Add all the necessary derives to the struct
    let expanded = quote! {
        #[derive(Debug, Clone, ::dbhelper::TableMetadata)]
        #input
    };

    TokenStream::from(expanded)
}
