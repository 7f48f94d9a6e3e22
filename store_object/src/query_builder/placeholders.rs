use crate::errors::StoreError;
use crate::query_builder::lexer::{tokenize, TokenKind};
use std::fmt::Write;

/// Rewrite `?` placeholders to PostgreSQL's `$1..$n` in textual order (`??` becomes `?`)
/// and check the count against the parameter list
pub fn number_placeholders(sql: &str, param_count: usize) -> Result<String, StoreError> {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut seen = 0usize;

    for token in tokenize(sql) {
        match token.kind {
            TokenKind::Placeholder => {
                seen += 1;
                let _ = write!(out, "${}", seen);
            }
            TokenKind::EscapedQuestion => out.push('?'),
            _ => out.push_str(token.text),
        }
    }

    if seen != param_count {
        return Err(StoreError::invalid(format!(
            "statement has {} placeholder(s) but {} parameter(s): {}",
            seen, param_count, sql
        )));
    }
    Ok(out)
}
