use crate::errors::StoreError;
use crate::metadata::EntityMetadata;
use type_mapping::SqlValue;

/// Type of update operation to perform on a column
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// column = ?
    Set(SqlValue),

    /// column = column + ?
    Increment(SqlValue),

    /// column = column - ?
    Decrement(SqlValue),

    /// column = column * ?
    Multiply(SqlValue),

    /// column = column / ?
    Divide(SqlValue),

    /// column = <expression>, the expression carrying its own `?` placeholders
    Expression {
        expression: String,
        params: Vec<SqlValue>,
    },
}

impl UpdateOperation {
    /// SQL assignment for this operation with `?` placeholders
    pub fn to_sql(&self, column: &str) -> String {
        match self {
            UpdateOperation::Set(_) => format!("{} = ?", column),
            UpdateOperation::Increment(_) => format!("{} = {} + ?", column, column),
            UpdateOperation::Decrement(_) => format!("{} = {} - ?", column, column),
            UpdateOperation::Multiply(_) => format!("{} = {} * ?", column, column),
            UpdateOperation::Divide(_) => format!("{} = {} / ?", column, column),
            UpdateOperation::Expression { expression, .. } => {
                format!("{} = {}", column, expression.trim())
            }
        }
    }

    /// Values to bind, in placeholder order
    pub fn params(&self) -> &[SqlValue] {
        match self {
            UpdateOperation::Set(v)
            | UpdateOperation::Increment(v)
            | UpdateOperation::Decrement(v)
            | UpdateOperation::Multiply(v)
            | UpdateOperation::Divide(v) => std::slice::from_ref(v),
            UpdateOperation::Expression { params, .. } => params,
        }
    }
}

/// Ordered SET list for `update_where`; assigning a column twice keeps the last operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSet {
    operations: Vec<(String, UpdateOperation)>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, column: impl Into<String>, operation: UpdateOperation) -> Self {
        let column = column.into();
        match self.operations.iter_mut().find(|(c, _)| *c == column) {
            Some((_, existing)) => *existing = operation,
            None => self.operations.push((column, operation)),
        }
        self
    }

    pub fn set(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, UpdateOperation::Set(value.into()))
    }

    pub fn increment(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, UpdateOperation::Increment(value.into()))
    }

    pub fn decrement(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, UpdateOperation::Decrement(value.into()))
    }

    pub fn multiply(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, UpdateOperation::Multiply(value.into()))
    }

    pub fn divide(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, UpdateOperation::Divide(value.into()))
    }

    pub fn expression(
        self,
        column: impl Into<String>,
        expression: impl Into<String>,
        params: Vec<SqlValue>,
    ) -> Self {
        self.push(
            column,
            UpdateOperation::Expression {
                expression: expression.into(),
                params,
            },
        )
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn operations(&self) -> &[(String, UpdateOperation)] {
        &self.operations
    }

    /// Render `SET` assignments for an entity; every column must be mapped and updatable
    pub(crate) fn render(&self, meta: &EntityMetadata) -> Result<(String, Vec<SqlValue>), StoreError> {
        let mut assignments = Vec::with_capacity(self.operations.len());
        let mut params = Vec::new();

        for (column, operation) in &self.operations {
            let descriptor = meta.column(column).ok_or_else(|| {
                StoreError::invalid(format!(
                    "column '{}' is not mapped on '{}'",
                    column,
                    meta.table()
                ))
            })?;
            if !descriptor.updatable || descriptor.primary_key {
                return Err(StoreError::invalid(format!(
                    "column '{}.{}' is not updatable",
                    meta.table(),
                    descriptor.name
                )));
            }
            assignments.push(operation.to_sql(&descriptor.name));
            params.extend(operation.params().iter().cloned());
        }

        Ok((assignments.join(", "), params))
    }
}
