//! Entity metadata
//!
//! [`EntityDescriptor`] is what the derive macros (or hand-written impls) produce;
//! [`EntityMetadata`] is the validated, immutable form the SQL builder works from.

use crate::errors::MappingError;
use crate::validation::validate_identifier;
use std::collections::HashSet;
use type_mapping::LogicalType;

/// One mapped column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Name of the struct field the column is bound to
    pub field: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub soft_delete: bool,
    pub insertable: bool,
    pub updatable: bool,
}

impl ColumnDescriptor {
    pub fn new(
        name: impl Into<String>,
        field: impl Into<String>,
        logical_type: LogicalType,
    ) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            logical_type,
            nullable: false,
            primary_key: false,
            auto_increment: false,
            soft_delete: false,
            insertable: true,
            updatable: true,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn soft_delete(mut self) -> Self {
        self.soft_delete = true;
        self
    }

    /// Column is read back but never written by insert or update
    pub fn readonly(mut self) -> Self {
        self.insertable = false;
        self.updatable = false;
        self
    }
}

/// Unvalidated description of an entity's table
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl EntityDescriptor {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }
}

/// SQL literals for the two states of a soft-delete flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftDeleteFlag<'a> {
    pub column: &'a str,
    pub live: &'static str,
    pub deleted: &'static str,
}

/// Validated metadata of one entity shape
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMetadata {
    table: String,
    columns: Vec<ColumnDescriptor>,
    primary_key: usize,
    soft_delete: Option<usize>,
}

impl EntityMetadata {
    pub fn build(descriptor: EntityDescriptor) -> Result<Self, MappingError> {
        let EntityDescriptor { table, columns } = descriptor;
        validate_identifier(&table)?;

        let mut names = HashSet::new();
        let mut fields = HashSet::new();
        for column in &columns {
            validate_identifier(&column.name)?;
            if !names.insert(column.name.to_ascii_lowercase()) {
                return Err(MappingError::DuplicateColumn {
                    table,
                    column: column.name.clone(),
                });
            }
            if !fields.insert(column.field.as_str()) {
                return Err(MappingError::DuplicateField {
                    table,
                    field: column.field.clone(),
                });
            }
        }

        let keys: Vec<usize> = positions(&columns, |c| c.primary_key);
        let primary_key = match keys.as_slice() {
            [] => return Err(MappingError::MissingPrimaryKey { table }),
            [single] => *single,
            many => {
                return Err(MappingError::MultiplePrimaryKeys {
                    columns: many.iter().map(|&i| columns[i].name.clone()).collect(),
                    table,
                })
            }
        };

        let flags: Vec<usize> = positions(&columns, |c| c.soft_delete);
        let soft_delete = match flags.as_slice() {
            [] => None,
            [single] => {
                let column = &columns[*single];
                if column.primary_key {
                    return Err(MappingError::SoftDeleteOnPrimaryKey {
                        table,
                        column: column.name.clone(),
                    });
                }
                if !matches!(
                    column.logical_type,
                    LogicalType::Boolean | LogicalType::Number
                ) {
                    return Err(MappingError::InvalidSoftDeleteType {
                        table,
                        column: column.name.clone(),
                        found: column.logical_type.as_str(),
                    });
                }
                Some(*single)
            }
            many => {
                return Err(MappingError::MultipleSoftDeleteColumns {
                    columns: many.iter().map(|&i| columns[i].name.clone()).collect(),
                    table,
                })
            }
        };

        Ok(Self {
            table,
            columns,
            primary_key,
            soft_delete,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_key(&self) -> &ColumnDescriptor {
        &self.columns[self.primary_key]
    }

    pub fn primary_key_index(&self) -> usize {
        self.primary_key
    }

    pub fn soft_delete(&self) -> Option<&ColumnDescriptor> {
        self.soft_delete.map(|i| &self.columns[i])
    }

    pub fn soft_delete_index(&self) -> Option<usize> {
        self.soft_delete
    }

    pub fn soft_delete_flag(&self) -> Option<SoftDeleteFlag<'_>> {
        self.soft_delete().map(|column| {
            let (live, deleted) = match column.logical_type {
                LogicalType::Number => ("0", "1"),
                _ => ("false", "true"),
            };
            SoftDeleteFlag {
                column: &column.name,
                live,
                deleted,
            }
        })
    }

    /// Comma separated column list in metadata order
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn positions(columns: &[ColumnDescriptor], pred: impl Fn(&ColumnDescriptor) -> bool) -> Vec<usize> {
    columns
        .iter()
        .enumerate()
        .filter(|(_, c)| pred(c))
        .map(|(i, _)| i)
        .collect()
}
