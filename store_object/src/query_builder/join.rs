//! Join resolution
//!
//! A [`JoinSpec`] names the entities of a composite result by alias. Once resolved
//! against the registry it becomes a [`JoinPlan`], which drives the generated join and
//! folds the flat result rows back into one [`JoinGroup`] per root entity.

use crate::errors::{MappingError, StoreError};
use crate::metadata::EntityMetadata;
use crate::registry::{EntityRegistry, EntityShape};
use crate::traits::TableMetadata;
use crate::validation::validate_alias;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use type_mapping::row::aliased_column;
use type_mapping::{Row, ValueError, ValueKey};

/// Represents the type of SQL JOIN operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN - returns records that have matching values in both tables
    Inner,
    /// LEFT JOIN - returns all records from the left table and matched records from the right table
    Left,
    /// RIGHT JOIN - returns all records from the right table and matched records from the left table
    Right,
    /// FULL OUTER JOIN - returns all records when there is a match in either left or right table
    Full,
}

impl JoinType {
    /// Convert JoinType to SQL string
    pub fn to_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL OUTER JOIN",
        }
    }

    /// Parse the `kind` attribute value used by `#[join(...)]`
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.to_ascii_lowercase().as_str() {
            "inner" => Some(JoinType::Inner),
            "left" => Some(JoinType::Left),
            "right" => Some(JoinType::Right),
            "full" => Some(JoinType::Full),
            _ => None,
        }
    }
}

/// How a joined member attaches to the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    pub join_type: JoinType,
    /// ON condition, written against member aliases (`t1.id = t2.student_id`)
    pub on: String,
}

#[derive(Debug, Clone)]
pub struct JoinMember {
    pub alias: String,
    pub shape: EntityShape,
    /// `None` for the root member
    pub clause: Option<JoinClause>,
}

/// Declarative description of a composite result
#[derive(Debug, Clone)]
pub struct JoinSpec {
    members: Vec<JoinMember>,
}

impl JoinSpec {
    pub fn root<T: TableMetadata>(alias: &str) -> Self {
        Self {
            members: vec![JoinMember {
                alias: alias.to_string(),
                shape: EntityShape::of::<T>(),
                clause: None,
            }],
        }
    }

    pub fn join<T: TableMetadata>(mut self, join_type: JoinType, alias: &str, on: impl Into<String>) -> Self {
        self.members.push(JoinMember {
            alias: alias.to_string(),
            shape: EntityShape::of::<T>(),
            clause: Some(JoinClause {
                join_type,
                on: on.into(),
            }),
        });
        self
    }

    pub fn members(&self) -> &[JoinMember] {
        &self.members
    }

    /// Resolve every member's metadata and validate aliases
    pub fn resolve(&self, registry: &EntityRegistry) -> Result<JoinPlan, StoreError> {
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(self.members.len());

        for (i, member) in self.members.iter().enumerate() {
            validate_alias(&member.alias).map_err(MappingError::from)?;
            if !seen.insert(member.alias.to_ascii_lowercase()) {
                return Err(MappingError::DuplicateJoinAlias(member.alias.clone()).into());
            }
            if i > 0 && member.clause.as_ref().is_none_or(|c| c.on.trim().is_empty()) {
                return Err(MappingError::MissingJoinCondition(member.alias.clone()).into());
            }
            members.push(ResolvedMember {
                alias: member.alias.clone(),
                metadata: registry.resolve_shape(member.shape)?,
                clause: member.clause.clone(),
            });
        }

        Ok(JoinPlan { members })
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedMember {
    pub alias: String,
    pub metadata: Arc<EntityMetadata>,
    pub clause: Option<JoinClause>,
}

impl ResolvedMember {
    /// Projection label of this member's primary key
    pub fn key_label(&self) -> String {
        aliased_column(&self.alias, &self.metadata.primary_key().name)
    }
}

/// Resolved join: root first, then joined members in declaration order
#[derive(Debug, Clone)]
pub struct JoinPlan {
    members: Vec<ResolvedMember>,
}

impl JoinPlan {
    pub fn root(&self) -> &ResolvedMember {
        &self.members[0]
    }

    pub fn members(&self) -> &[ResolvedMember] {
        &self.members
    }

    pub fn joined(&self) -> &[ResolvedMember] {
        &self.members[1..]
    }

    pub fn member(&self, alias: &str) -> Result<&ResolvedMember, MappingError> {
        self.members
            .iter()
            .find(|m| m.alias.eq_ignore_ascii_case(alias))
            .ok_or_else(|| MappingError::UnknownJoinAlias(alias.to_string()))
    }

    /// Group rows by root primary key, keeping first-seen order. Rows without a root
    /// (outer joins that matched no root row) are skipped.
    pub fn fold<'a>(&'a self, rows: &'a [Row]) -> Result<Vec<JoinGroup<'a>>, StoreError> {
        let key_label = self.root().key_label();
        let mut index: HashMap<ValueKey, usize> = HashMap::new();
        let mut groups: Vec<JoinGroup<'a>> = Vec::new();

        for row in rows {
            let key = row
                .get(&key_label)
                .ok_or_else(|| ValueError::MissingColumn(key_label.clone()))?;
            if key.is_null() {
                crate::trace_log!("Skipping joined row without root key");
                continue;
            }
            match index.get(&key.key()) {
                Some(&slot) => groups[slot].rows.push(row),
                None => {
                    index.insert(key.key(), groups.len());
                    groups.push(JoinGroup {
                        plan: self,
                        rows: vec![row],
                    });
                }
            }
        }

        Ok(groups)
    }
}

/// Rows sharing one root primary key
#[derive(Debug)]
pub struct JoinGroup<'a> {
    plan: &'a JoinPlan,
    rows: Vec<&'a Row>,
}

impl<'a> JoinGroup<'a> {
    pub fn rows(&self) -> &[&'a Row] {
        &self.rows
    }

    /// The root entity
    pub fn root<T: TableMetadata>(&self, alias: &str) -> Result<T, StoreError> {
        self.plan.member(alias)?;
        let first = self.rows[0];
        Ok(T::from_row(&first.view_prefixed(alias))?)
    }

    /// A member that must be present
    pub fn required<T: TableMetadata>(&self, alias: &str) -> Result<T, StoreError> {
        self.optional(alias)?
            .ok_or_else(|| MappingError::MissingJoinedRow(alias.to_string()).into())
    }

    /// A member that may be absent (its key column is NULL in every row)
    pub fn optional<T: TableMetadata>(&self, alias: &str) -> Result<Option<T>, StoreError> {
        let label = self.plan.member(alias)?.key_label();
        for row in &self.rows {
            match row.get(&label) {
                Some(key) if !key.is_null() => {
                    return Ok(Some(T::from_row(&row.view_prefixed(alias))?));
                }
                Some(_) => continue,
                None => return Err(ValueError::MissingColumn(label).into()),
            }
        }
        Ok(None)
    }

    /// Every distinct member row, de-duplicated by the member's key in first-seen order
    pub fn many<T: TableMetadata>(&self, alias: &str) -> Result<Vec<T>, StoreError> {
        let label = self.plan.member(alias)?.key_label();
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for row in &self.rows {
            let key = row
                .get(&label)
                .ok_or_else(|| ValueError::MissingColumn(label.clone()))?;
            if key.is_null() || !seen.insert(key.key()) {
                continue;
            }
            items.push(T::from_row(&row.view_prefixed(alias))?);
        }
        Ok(items)
    }
}
