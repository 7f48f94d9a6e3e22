//! Procedural macros for generating entity metadata and row mapping
//!
//! This crate provides the `#[model]` macro and the `TableMetadata` / `JoinedEntity`
//! derives. Table, column and alias names are validated at compile time with the same rules
//! the runtime registry applies.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod generation;
mod model_macro;
mod parsing;

use generation::{generate_joined_entity_impl, generate_table_metadata_impl};
use model_macro::model_attribute;
use parsing::{parse_field_attributes, parse_join_fields, parse_table_attributes};

/// Derive macro for the TableMetadata trait
///
/// Note: It's recommended to use the `#[model]` attribute macro instead,
/// which automatically includes this derive along with `Debug` and `Clone`.
///
/// ```ignore
/// #[derive(Debug, Clone, TableMetadata)]
/// #[table(name = "t_student")]
/// pub struct Student {
///     #[primary_key]
///     #[auto_increment]
///     pub id: Option<i64>,
///
///     pub name: String,
///
///     #[field(name = "school_snapshot")]
///     pub school: Option<Json<School>>,
///
///     #[field(readonly)]
///     pub create_time: Option<DateTime<Utc>>,
///
///     #[field(skip)]
///     pub cached: Option<String>,
///
///     #[soft_delete]
///     pub deleted: bool,
/// }
/// ```
#[proc_macro_derive(
    TableMetadata,
    attributes(table, primary_key, field, soft_delete, auto_increment, readonly)
)]
pub fn derive_table_metadata(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let table_info = match parse_table_attributes(&input) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    let field_info = match parse_field_attributes(&input, &table_info) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    match generate_table_metadata_impl(&input.ident, &input.generics, &table_info, &field_info) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derive macro for composite results of a joined query
///
/// The first field is the join root; every other field names a joined entity with its
/// alias and `ON` condition. `Option<T>` fields are optional members, `Vec<T>` fields
/// collect every distinct member row.
///
/// ```ignore
/// #[derive(Debug, JoinedEntity)]
/// pub struct StudentWithSchool {
///     #[join(alias = "t1")]
///     pub student: Student,
///     #[join(alias = "t2", on = "t1.school_id = t2.id", kind = "left")]
///     pub school: Option<School>,
/// }
/// ```
#[proc_macro_derive(JoinedEntity, attributes(join))]
pub fn derive_joined_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match parse_join_fields(&input) {
        Ok(members) => generate_joined_entity_impl(&input.ident, &input.generics, &members).into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Convenience attribute macro that adds `Debug`, `Clone` and `TableMetadata` derives
#[proc_macro_attribute]
pub fn model(attr: TokenStream, item: TokenStream) -> TokenStream {
    model_attribute(attr, item)
}
