//! Result rows as returned by a database session

use crate::convert::FromSqlValue;
use crate::errors::ValueError;
use crate::types::SqlValue;

/// Separator between a join alias and the column name in projected labels (`t1__id`)
pub const ALIAS_SEPARATOR: &str = "__";

/// Label under which a joined member's column is projected
pub fn aliased_column(alias: &str, column: &str) -> String {
    format!("{}{}{}", alias, ALIAS_SEPARATOR, column)
}

/// One ordered result row: column labels with their cell values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Builder form of [`Row::push`]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Look a column up by label, falling back to a case-insensitive match
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        let position = self
            .columns
            .iter()
            .position(|c| c == column)
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(column))
            })?;
        self.values.get(position)
    }

    pub fn view(&self) -> RowView<'_> {
        RowView {
            row: self,
            prefix: None,
        }
    }

    /// View of the columns projected for one join alias
    pub fn view_prefixed<'a>(&'a self, alias: &'a str) -> RowView<'a> {
        RowView {
            row: self,
            prefix: Some(alias),
        }
    }

    pub fn decode<T: FromSqlValue>(&self, column: &str) -> Result<T, ValueError> {
        self.view().decode(column)
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.push(column, value);
        }
        row
    }
}

/// Borrowed view over a [`Row`], optionally scoped to one join alias
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    row: &'a Row,
    prefix: Option<&'a str>,
}

impl<'a> RowView<'a> {
    pub fn prefix(&self) -> Option<&'a str> {
        self.prefix
    }

    pub fn row(&self) -> &'a Row {
        self.row
    }

    pub fn get(&self, column: &str) -> Option<&'a SqlValue> {
        match self.prefix {
            Some(alias) => self.row.get(&aliased_column(alias, column)),
            None => self.row.get(column),
        }
    }

    pub fn value(&self, column: &str) -> Result<&'a SqlValue, ValueError> {
        self.get(column).ok_or_else(|| {
            ValueError::MissingColumn(match self.prefix {
                Some(alias) => aliased_column(alias, column),
                None => column.to_string(),
            })
        })
    }

    pub fn decode<T: FromSqlValue>(&self, column: &str) -> Result<T, ValueError> {
        let value = self.value(column)?;
        T::from_sql_value(value).map_err(|e| e.in_column(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        Row::new()
            .with("id", 1i64)
            .with("t1__id", 1i64)
            .with("t2__id", SqlValue::Null)
            .with("Name", "wu")
    }

    #[test]
    fn test_prefixed_lookup() {
        let row = sample();
        assert_eq!(row.view_prefixed("t1").decode::<i64>("id").unwrap(), 1);
        assert_eq!(
            row.view_prefixed("t2").decode::<Option<i64>>("id").unwrap(),
            None
        );
    }

    #[test]
    fn test_case_insensitive_fallback() {
        let row = sample();
        assert_eq!(row.decode::<String>("name").unwrap(), "wu");
    }

    #[test]
    fn test_missing_column_names_full_label() {
        let row = sample();
        let err = row.view_prefixed("t3").decode::<i64>("id").unwrap_err();
        assert_eq!(err, ValueError::MissingColumn("t3__id".into()));
    }

    #[test]
    fn test_conversion_error_carries_column() {
        let row = sample();
        let err = row.decode::<bool>("Name").unwrap_err();
        assert!(matches!(err, ValueError::Column { ref column, .. } if column == "Name"));
    }
}
