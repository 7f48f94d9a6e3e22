//! Splitting of caller-supplied post-SQL
//!
//! Post-SQL is everything after `FROM <table>`: an optional `WHERE` condition followed by
//! optional tail clauses. The condition and the tail are separated so the soft-delete
//! predicate can be conjoined to the condition before the tail is re-attached.

use crate::errors::StoreError;
use crate::query_builder::lexer::{count_placeholders, tokenize, Token, TokenKind};
use type_mapping::SqlValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
    Fetch,
    /// FOR UPDATE / FOR SHARE ...
    Locking,
}

impl ClauseKind {
    pub fn is_grouping(self) -> bool {
        matches!(self, ClauseKind::GroupBy | ClauseKind::Having)
    }

    pub fn is_row_limit(self) -> bool {
        matches!(self, ClauseKind::Limit | ClauseKind::Offset | ClauseKind::Fetch)
    }
}

/// One tail clause with the parameters its placeholders consume
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub kind: ClauseKind,
    pub text: String,
    pub params: Vec<SqlValue>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SplitPostSql {
    pub condition: Option<String>,
    pub condition_params: Vec<SqlValue>,
    pub clauses: Vec<Clause>,
}

/// Split post-SQL text into condition and tail clauses, distributing `params` in
/// placeholder order
pub fn split_post_sql(text: &str, params: Vec<SqlValue>) -> Result<SplitPostSql, StoreError> {
    let expected = count_placeholders(text);
    if expected != params.len() {
        return Err(StoreError::invalid(format!(
            "post-SQL has {} placeholder(s) but {} parameter(s) were supplied",
            expected,
            params.len()
        )));
    }

    let tokens = tokenize(text);
    let significant: Vec<&Token<'_>> = tokens.iter().filter(|t| !t.is_trivia()).collect();

    let mut condition_start = 0;
    if let Some(first) = significant.first() {
        if first.is_word("where") {
            condition_start = first.end();
        }
    }

    let mut boundaries: Vec<(usize, ClauseKind)> = Vec::new();
    for (idx, token) in significant.iter().enumerate() {
        if token.depth != 0 || token.kind != TokenKind::Word || token.start < condition_start {
            continue;
        }
        let next = significant.get(idx + 1);
        let followed_by = |word: &str| next.is_some_and(|n| n.is_word(word));
        let kind = if token.is_word("group") && followed_by("by") {
            Some(ClauseKind::GroupBy)
        } else if token.is_word("order") && followed_by("by") {
            Some(ClauseKind::OrderBy)
        } else if token.is_word("having") {
            Some(ClauseKind::Having)
        } else if token.is_word("limit") {
            Some(ClauseKind::Limit)
        } else if token.is_word("offset") {
            Some(ClauseKind::Offset)
        } else if token.is_word("fetch") {
            Some(ClauseKind::Fetch)
        } else if token.is_word("for")
            && (followed_by("update") || followed_by("share") || followed_by("no") || followed_by("key"))
        {
            Some(ClauseKind::Locking)
        } else {
            None
        };
        if let Some(kind) = kind {
            boundaries.push((token.start, kind));
        }
    }

    let mut params = params.into_iter();
    let mut take = |segment: &str| -> Vec<SqlValue> {
        params.by_ref().take(count_placeholders(segment)).collect()
    };

    let condition_end = boundaries.first().map_or(text.len(), |(start, _)| *start);
    let condition_text = text[condition_start..condition_end].trim();
    let mut split = SplitPostSql::default();
    if !condition_text.is_empty() {
        split.condition_params = take(condition_text);
        split.condition = Some(condition_text.to_string());
    }

    for (i, (start, kind)) in boundaries.iter().enumerate() {
        let end = boundaries.get(i + 1).map_or(text.len(), |(next, _)| *next);
        let clause_text = text[*start..end].trim();
        split.clauses.push(Clause {
            kind: *kind,
            params: take(clause_text),
            text: clause_text.to_string(),
        });
    }

    Ok(split)
}

/// Join clauses back into one tail with their parameters
pub fn render_clauses<'a>(clauses: impl IntoIterator<Item = &'a Clause>) -> (String, Vec<SqlValue>) {
    let mut sql = String::new();
    let mut params = Vec::new();
    for clause in clauses {
        if !sql.is_empty() {
            sql.push(' ');
        }
        sql.push_str(&clause.text);
        params.extend(clause.params.iter().cloned());
    }
    (sql, params)
}
