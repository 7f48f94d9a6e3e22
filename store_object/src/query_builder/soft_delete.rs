//! Soft-delete condition rewriter
//!
//! The caller's condition is parsed into a minimal tree that only knows top-level AND/OR
//! combinators; everything else (comparisons, parenthesized groups, sub-selects) is an
//! opaque leaf left for the database to validate. A condition with a top-level OR is
//! parenthesized before the live-row predicate is conjoined, so
//! `a OR b` becomes `(a OR b) AND deleted = false` and never `a OR b AND deleted = false`.

use crate::query_builder::lexer::{references_column, tokenize, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionAst<'a> {
    Leaf(&'a str),
    And(Vec<ConditionAst<'a>>),
    Or(Vec<ConditionAst<'a>>),
}

impl ConditionAst<'_> {
    pub fn has_top_level_or(&self) -> bool {
        matches!(self, ConditionAst::Or(_))
    }
}

pub fn parse_condition(text: &str) -> ConditionAst<'_> {
    let mut alternatives: Vec<ConditionAst<'_>> = split_top_level(text, "or")
        .into_iter()
        .map(|part| {
            let mut conjuncts: Vec<ConditionAst<'_>> = split_top_level(part, "and")
                .into_iter()
                .map(ConditionAst::Leaf)
                .collect();
            if conjuncts.len() == 1 {
                conjuncts.remove(0)
            } else {
                ConditionAst::And(conjuncts)
            }
        })
        .collect();

    if alternatives.len() == 1 {
        alternatives.remove(0)
    } else {
        ConditionAst::Or(alternatives)
    }
}

/// Split on a depth-0 keyword; the AND of `BETWEEN x AND y` is not a combinator
fn split_top_level<'a>(text: &'a str, keyword: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut segment_start = 0;
    let mut pending_between = false;

    for token in tokenize(text) {
        if token.depth != 0 || token.kind != TokenKind::Word {
            continue;
        }
        if token.is_word("between") {
            pending_between = true;
            continue;
        }
        if token.is_word("and") && pending_between {
            pending_between = false;
            continue;
        }
        if token.is_word(keyword) {
            parts.push(text[segment_start..token.start].trim());
            segment_start = token.end();
        }
    }
    parts.push(text[segment_start..].trim());
    parts
}

/// Conjoin `predicate` to `condition` without changing the condition's meaning
pub fn conjoin(condition: &str, predicate: &str) -> String {
    let condition = condition.trim();
    if condition.is_empty() {
        return predicate.to_string();
    }
    if parse_condition(condition).has_top_level_or() {
        format!("({}) AND {}", condition, predicate)
    } else {
        format!("{} AND {}", condition, predicate)
    }
}

/// Inject the live-row predicate for a soft-delete column.
///
/// `qualifier` is the join alias when the column belongs to a join member. The condition
/// is returned unchanged when it already refers to the column.
pub fn inject_soft_delete(
    condition: Option<&str>,
    column: &str,
    qualifier: Option<&str>,
    live: &str,
) -> String {
    let condition = condition.unwrap_or("");
    if references_column(condition, column, qualifier) {
        return condition.trim().to_string();
    }
    let target = match qualifier {
        Some(alias) => format!("{}.{}", alias, column),
        None => column.to_string(),
    };
    conjoin(condition, &format!("{} = {}", target, live))
}
