//! Unified value and type mapping between Rust types and the relational store
//! This crate provides the value model, row access and the JSON/date codec used across the
//! dbhelper workspace

pub mod convert;
pub mod errors;
pub mod json;
pub mod row;
pub mod sql;
pub mod temporal;
pub mod types;

pub use convert::{FromSqlValue, ToSqlValue};
pub use errors::{CodecError, TemporalError, ValueError};
pub use json::Json;
pub use row::{Row, RowView};
pub use sql::{is_optional_type, rust_type_to_logical_type};
pub use types::{LogicalType, SqlValue, ValueKey};

/// Build a positional parameter list from anything convertible into [`SqlValue`]
///
/// ```
/// use type_mapping::{params, SqlValue};
///
/// let params = params!["wu", 18, true];
/// assert_eq!(params[1], SqlValue::Int(18));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::SqlValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::SqlValue::from($value)),+]
    };
}
