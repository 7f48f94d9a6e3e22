//! Tokenizer for caller-supplied SQL fragments
//!
//! Only as much structure as the rewriter needs: words, quoted runs (never inspected),
//! placeholders, parentheses with their nesting depth, and everything else as symbols.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier, keyword or number; may be qualified (`t1.deleted`)
    Word,
    /// '...' string, $tag$...$tag$ string, "..." or `...` identifier
    Quoted,
    /// `?` positional placeholder
    Placeholder,
    /// `??`, a literal question mark
    EscapedQuestion,
    LParen,
    RParen,
    Comment,
    Whitespace,
    Symbol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of the token in the source
    pub start: usize,
    /// Parenthesis depth the token sits at (an opening paren sits at the outer depth)
    pub depth: usize,
}

impl Token<'_> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    pub fn is_word(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }
}

pub fn tokenize(sql: &str) -> Vec<Token<'_>> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        let b = bytes[i];
        let (kind, end) = match b {
            b'\'' | b'"' | b'`' => (TokenKind::Quoted, scan_quoted(bytes, i, b)),
            b'$' if dollar_tag_len(bytes, i).is_some() => {
                (TokenKind::Quoted, scan_dollar_quoted(sql, i))
            }
            b'?' if bytes.get(i + 1) == Some(&b'?') => (TokenKind::EscapedQuestion, i + 2),
            b'?' => (TokenKind::Placeholder, i + 1),
            b'(' => (TokenKind::LParen, i + 1),
            b')' => (TokenKind::RParen, i + 1),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = bytes[i..]
                    .iter()
                    .position(|&c| c == b'\n')
                    .map_or(bytes.len(), |p| i + p);
                (TokenKind::Comment, end)
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = sql[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
                (TokenKind::Comment, end)
            }
            c if c.is_ascii_whitespace() => {
                let mut end = i + 1;
                while end < bytes.len() && bytes[end].is_ascii_whitespace() {
                    end += 1;
                }
                (TokenKind::Whitespace, end)
            }
            c if is_word_byte(c) => {
                let mut end = i + 1;
                while end < bytes.len() && (is_word_byte(bytes[end]) || bytes[end] == b'.') {
                    end += 1;
                }
                (TokenKind::Word, end)
            }
            _ => {
                let len = sql[i..].chars().next().map_or(1, char::len_utf8);
                (TokenKind::Symbol, i + len)
            }
        };

        let token_depth = if kind == TokenKind::RParen {
            depth = depth.saturating_sub(1);
            depth
        } else {
            depth
        };
        if kind == TokenKind::LParen {
            depth += 1;
        }

        tokens.push(Token {
            kind,
            text: &sql[start..end],
            start,
            depth: token_depth,
        });
        i = end;
    }

    tokens
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || !b.is_ascii()
}

/// End of a quoted run; a doubled quote character is an escaped quote
fn scan_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Length of the `$tag$` opener at `start`, if one starts there. `$1` is not an opener.
fn dollar_tag_len(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if bytes.get(i).is_some_and(|c| c.is_ascii_alphabetic() || *c == b'_') {
        while bytes.get(i).is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_') {
            i += 1;
        }
    }
    (bytes.get(i) == Some(&b'$')).then_some(i + 1 - start)
}

/// End of a dollar-quoted run; unterminated runs extend to the end of the input
fn scan_dollar_quoted(sql: &str, start: usize) -> usize {
    let Some(len) = dollar_tag_len(sql.as_bytes(), start) else {
        return start + 1;
    };
    let tag = &sql[start..start + len];
    sql[start + len..]
        .find(tag)
        .map_or(sql.len(), |p| start + len + p + len)
}

/// Number of `?` placeholders outside quoted runs and comments
pub fn count_placeholders(sql: &str) -> usize {
    tokenize(sql)
        .iter()
        .filter(|t| t.kind == TokenKind::Placeholder)
        .count()
}

/// Whether the fragment refers to `column`, either bare or qualified by `qualifier`.
///
/// With a qualifier only `qualifier.column` counts. Without one, a bare `column` or any
/// `x.column` counts. Double-quoted identifiers are compared without their quotes.
pub fn references_column(sql: &str, column: &str, qualifier: Option<&str>) -> bool {
    tokenize(sql).iter().any(|token| {
        let text = match token.kind {
            TokenKind::Word => token.text,
            TokenKind::Quoted if token.text.starts_with('"') => token.text.trim_matches('"'),
            _ => return false,
        };
        match qualifier {
            Some(q) => text
                .split_once('.')
                .is_some_and(|(a, c)| a.eq_ignore_ascii_case(q) && c.eq_ignore_ascii_case(column)),
            None => {
                let bare = text.rsplit('.').next().unwrap_or(text);
                bare.eq_ignore_ascii_case(column)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<TokenKind> {
        tokenize(sql)
            .into_iter()
            .filter(|t| !t.is_trivia())
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_quoted_runs_are_opaque() {
        let tokens = tokenize("name = 'it''s ? or' and x = ?");
        let quoted: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Quoted)
            .map(|t| t.text)
            .collect();
        assert_eq!(quoted, vec!["'it''s ? or'"]);
        assert_eq!(count_placeholders("name = 'it''s ? or' and x = ?"), 1);
    }

    #[test]
    fn test_dollar_quoted_runs_are_opaque() {
        assert_eq!(count_placeholders("body = $$ it's ? or $$ and id = ?"), 1);
        assert_eq!(count_placeholders("body = $fn$ ? $$ ? $fn$ and id = ?"), 1);

        let quoted: Vec<_> = tokenize("x = $a$ or $a$ or y")
            .into_iter()
            .filter(|t| t.kind == TokenKind::Quoted)
            .map(|t| t.text)
            .collect();
        assert_eq!(quoted, vec!["$a$ or $a$"]);

        let ors = tokenize("x = $a$ or $a$ or y")
            .into_iter()
            .filter(|t| t.is_word("or"))
            .count();
        assert_eq!(ors, 1);
        assert!(!references_column("$$deleted$$ = note", "deleted", None));
    }

    #[test]
    fn test_dollar_parameters_stay_words() {
        assert_eq!(
            kinds("id = $1 and body = $$?$$"),
            vec![
                TokenKind::Word,
                TokenKind::Symbol,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Symbol,
                TokenKind::Quoted,
            ]
        );
        assert_eq!(count_placeholders("body = $$ never closed ?"), 0);
    }

    #[test]
    fn test_depth_tracking() {
        let tokens: Vec<_> = tokenize("a or (b or c)")
            .into_iter()
            .filter(|t| t.is_word("or"))
            .map(|t| t.depth)
            .collect();
        assert_eq!(tokens, vec![0, 1]);
    }

    #[test]
    fn test_escaped_question_mark() {
        assert_eq!(
            kinds("data ?? 'k' and id = ?"),
            vec![
                TokenKind::Word,
                TokenKind::EscapedQuestion,
                TokenKind::Quoted,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Symbol,
                TokenKind::Placeholder,
            ]
        );
    }

    #[test]
    fn test_comments_hide_placeholders() {
        assert_eq!(count_placeholders("id = ? -- and name = ?\n and age > ?"), 2);
        assert_eq!(count_placeholders("id = ? /* ? */"), 1);
    }

    #[test]
    fn test_column_references() {
        assert!(references_column("deleted = true", "deleted", None));
        assert!(references_column("t1.DELETED = true", "deleted", None));
        assert!(references_column("\"deleted\" = 1", "deleted", None));
        assert!(!references_column("is_deleted = 1", "deleted", None));
        assert!(!references_column("'deleted' = name", "deleted", None));

        assert!(references_column("t2.deleted = true", "deleted", Some("t2")));
        assert!(!references_column("t1.deleted = true", "deleted", Some("t2")));
        assert!(!references_column("deleted = true", "deleted", Some("t2")));
    }
}
