//! Structured conditions
//!
//! [`ConditionNode`] is the typed alternative to raw condition text. Nodes render to SQL
//! with `?` placeholders so they can be mixed freely with caller post-SQL.

use crate::errors::StoreError;
use crate::validation::validate_column_reference;
use type_mapping::SqlValue;

/// Query condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    Eq,        // =
    Ne,        // !=
    Gt,        // >
    Gte,       // >=
    Lt,        // <
    Lte,       // <=
    Like,      // LIKE
    ILike,     // ILIKE (case insensitive)
    In,        // IN
    NotIn,     // NOT IN
    IsNull,    // IS NULL
    IsNotNull, // IS NOT NULL
}

impl ConditionOperator {
    pub fn to_sql(&self) -> &'static str {
        match self {
            ConditionOperator::Eq => "=",
            ConditionOperator::Ne => "!=",
            ConditionOperator::Gt => ">",
            ConditionOperator::Gte => ">=",
            ConditionOperator::Lt => "<",
            ConditionOperator::Lte => "<=",
            ConditionOperator::Like => "LIKE",
            ConditionOperator::ILike => "ILIKE",
            ConditionOperator::In => "IN",
            ConditionOperator::NotIn => "NOT IN",
            ConditionOperator::IsNull => "IS NULL",
            ConditionOperator::IsNotNull => "IS NOT NULL",
        }
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Single(SqlValue),
    List(Vec<SqlValue>),
}

/// Boolean expression node
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    Comparison {
        column: String,
        operator: ConditionOperator,
        operand: Operand,
    },
    And(Box<ConditionNode>, Box<ConditionNode>),
    Or(Box<ConditionNode>, Box<ConditionNode>),
    /// Opaque fragment with its own `?` placeholders
    Raw {
        fragment: String,
        params: Vec<SqlValue>,
    },
}

impl ConditionNode {
    pub fn comparison(column: &str, operator: ConditionOperator, operand: Operand) -> Self {
        Self::Comparison {
            column: column.to_string(),
            operator,
            operand,
        }
    }

    pub fn eq(column: &str, value: impl Into<SqlValue>) -> Self {
        Self::comparison(column, ConditionOperator::Eq, Operand::Single(value.into()))
    }

    pub fn ne(column: &str, value: impl Into<SqlValue>) -> Self {
        Self::comparison(column, ConditionOperator::Ne, Operand::Single(value.into()))
    }

    pub fn gt(column: &str, value: impl Into<SqlValue>) -> Self {
        Self::comparison(column, ConditionOperator::Gt, Operand::Single(value.into()))
    }

    pub fn gte(column: &str, value: impl Into<SqlValue>) -> Self {
        Self::comparison(column, ConditionOperator::Gte, Operand::Single(value.into()))
    }

    pub fn lt(column: &str, value: impl Into<SqlValue>) -> Self {
        Self::comparison(column, ConditionOperator::Lt, Operand::Single(value.into()))
    }

    pub fn lte(column: &str, value: impl Into<SqlValue>) -> Self {
        Self::comparison(column, ConditionOperator::Lte, Operand::Single(value.into()))
    }

    pub fn like(column: &str, pattern: &str) -> Self {
        Self::comparison(column, ConditionOperator::Like, Operand::Single(pattern.into()))
    }

    pub fn ilike(column: &str, pattern: &str) -> Self {
        Self::comparison(column, ConditionOperator::ILike, Operand::Single(pattern.into()))
    }

    pub fn in_values<V: Into<SqlValue>>(column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        Self::comparison(column, ConditionOperator::In, Operand::List(values))
    }

    pub fn not_in_values<V: Into<SqlValue>>(
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        Self::comparison(column, ConditionOperator::NotIn, Operand::List(values))
    }

    pub fn is_null(column: &str) -> Self {
        Self::comparison(column, ConditionOperator::IsNull, Operand::None)
    }

    pub fn is_not_null(column: &str) -> Self {
        Self::comparison(column, ConditionOperator::IsNotNull, Operand::None)
    }

    pub fn raw(fragment: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self::Raw {
            fragment: fragment.into(),
            params,
        }
    }

    pub fn and(self, other: ConditionNode) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: ConditionNode) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Conjunction of every node, `None` when empty
    pub fn all(nodes: impl IntoIterator<Item = ConditionNode>) -> Option<Self> {
        nodes.into_iter().reduce(ConditionNode::and)
    }

    /// Disjunction of every node, `None` when empty
    pub fn any(nodes: impl IntoIterator<Item = ConditionNode>) -> Option<Self> {
        nodes.into_iter().reduce(ConditionNode::or)
    }

    /// Render to SQL text with `?` placeholders, appending bound values to `params`
    pub fn render(&self, params: &mut Vec<SqlValue>) -> Result<String, StoreError> {
        match self {
            ConditionNode::Comparison {
                column,
                operator,
                operand,
            } => render_comparison(column, *operator, operand, params),
            ConditionNode::And(left, right) => Ok(format!(
                "({} AND {})",
                left.render(params)?,
                right.render(params)?
            )),
            ConditionNode::Or(left, right) => Ok(format!(
                "({} OR {})",
                left.render(params)?,
                right.render(params)?
            )),
            ConditionNode::Raw { fragment, params: own } => {
                params.extend(own.iter().cloned());
                Ok(format!("({})", fragment.trim()))
            }
        }
    }
}

fn render_comparison(
    column: &str,
    operator: ConditionOperator,
    operand: &Operand,
    params: &mut Vec<SqlValue>,
) -> Result<String, StoreError> {
    validate_column_reference(column)?;

    match (operator, operand) {
        (ConditionOperator::IsNull | ConditionOperator::IsNotNull, _) => {
            Ok(format!("{} {}", column, operator.to_sql()))
        }
        // comparing with NULL through = / != means IS [NOT] NULL
        (ConditionOperator::Eq, Operand::Single(SqlValue::Null)) => {
            Ok(format!("{} IS NULL", column))
        }
        (ConditionOperator::Ne, Operand::Single(SqlValue::Null)) => {
            Ok(format!("{} IS NOT NULL", column))
        }
        (ConditionOperator::In, Operand::List(values)) if values.is_empty() => Ok("1=0".to_string()),
        (ConditionOperator::NotIn, Operand::List(values)) if values.is_empty() => {
            Ok("1=1".to_string())
        }
        (ConditionOperator::In | ConditionOperator::NotIn, Operand::List(values)) => {
            params.extend(values.iter().cloned());
            let placeholders = vec!["?"; values.len()].join(", ");
            Ok(format!("{} {} ({})", column, operator.to_sql(), placeholders))
        }
        (ConditionOperator::In | ConditionOperator::NotIn, _) => Err(StoreError::invalid(format!(
            "{} on '{}' needs a list operand",
            operator.to_sql(),
            column
        ))),
        (_, Operand::Single(value)) => {
            params.push(value.clone());
            Ok(format!("{} {} ?", column, operator.to_sql()))
        }
        (_, _) => Err(StoreError::invalid(format!(
            "{} on '{}' needs a single operand",
            operator.to_sql(),
            column
        ))),
    }
}
