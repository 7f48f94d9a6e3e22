//! Trait definitions
//!
//! This module defines the per-entity metadata contract.

use crate::metadata::EntityDescriptor;
use type_mapping::{RowView, SqlValue, ValueError};

/// Metadata and row mapping for one entity type.
///
/// This trait should be derived using the `#[model]` attribute macro (or
/// `#[derive(TableMetadata)]`), which generates the descriptor at build time.
///
/// Recommended usage:
/// ```ignore
/// use dbhelper::prelude::*;
///
/// #[model]
/// #[table(name = "t_student")]
/// pub struct Student {
///     #[primary_key]
///     #[auto_increment]
///     pub id: Option<i64>,
///
///     pub name: String,
///
///     #[field(readonly)]
///     pub create_time: Option<DateTime<Utc>>,
///
///     #[soft_delete]
///     pub deleted: bool,
/// }
/// ```
pub trait TableMetadata: Sized + Send + Sync + 'static {
    /// Table and column description, validated by the registry on first use
    fn descriptor() -> EntityDescriptor;

    /// Values of the mapped columns, in descriptor order
    fn column_values(&self) -> Result<Vec<SqlValue>, ValueError>;

    /// Materialize an entity from a (possibly alias-prefixed) row
    fn from_row(row: &RowView<'_>) -> Result<Self, ValueError>;

    /// Store the key generated by the database on insert
    fn set_generated_key(&mut self, key: &SqlValue) -> Result<(), ValueError>;
}
