//! Validation module
//!
//! Table, column and alias names are spliced into generated SQL unquoted, so every
//! identifier coming from entity metadata or structured conditions goes through here.

use std::fmt;

/// Validation errors for database identifiers
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Name contains invalid characters (only alphanumeric and underscore allowed)
    InvalidCharacters(String),
    /// Name is too long (PostgreSQL limit is 63 characters)
    TooLong {
        name: String,
        length: usize,
        max_length: usize,
    },
    /// Name is empty
    Empty,
    /// Name starts with invalid character (must start with letter or underscore)
    InvalidStartCharacter(String),
    /// Name is a reserved SQL keyword
    ReservedKeyword(String),
    /// Reserved alias separator (`__`) used inside a join alias
    AliasSeparator(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidCharacters(name) => {
                write!(f, "Invalid characters in name '{}': only alphanumeric characters and underscores are allowed", name)
            }
            ValidationError::TooLong {
                name,
                length,
                max_length,
            } => {
                write!(
                    f,
                    "Name '{}' is too long: {} characters (max {})",
                    name, length, max_length
                )
            }
            ValidationError::Empty => {
                write!(f, "Name cannot be empty")
            }
            ValidationError::InvalidStartCharacter(name) => {
                write!(f, "Name '{}' must start with a letter or underscore", name)
            }
            ValidationError::ReservedKeyword(name) => {
                write!(f, "Name '{}' is a reserved SQL keyword", name)
            }
            ValidationError::AliasSeparator(name) => {
                write!(f, "Join alias '{}' cannot contain '__'", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// PostgreSQL identifier length limit
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Keywords PostgreSQL refuses as bare column or table names
const RESERVED_KEYWORDS: &[&str] = &[
    "ALL",
    "ANALYSE",
    "ANALYZE",
    "AND",
    "ANY",
    "ARRAY",
    "AS",
    "ASC",
    "ASYMMETRIC",
    "BOTH",
    "CASE",
    "CAST",
    "CHECK",
    "COLLATE",
    "COLUMN",
    "CONSTRAINT",
    "CREATE",
    "CURRENT_DATE",
    "CURRENT_ROLE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "CURRENT_USER",
    "DEFAULT",
    "DEFERRABLE",
    "DESC",
    "DISTINCT",
    "DO",
    "ELSE",
    "END",
    "EXCEPT",
    "FALSE",
    "FETCH",
    "FOR",
    "FOREIGN",
    "FROM",
    "GRANT",
    "GROUP",
    "HAVING",
    "IN",
    "INITIALLY",
    "INTERSECT",
    "INTO",
    "LATERAL",
    "LEADING",
    "LIMIT",
    "LOCALTIME",
    "LOCALTIMESTAMP",
    "NOT",
    "NULL",
    "OFFSET",
    "ON",
    "ONLY",
    "OR",
    "ORDER",
    "PLACING",
    "PRIMARY",
    "REFERENCES",
    "RETURNING",
    "SELECT",
    "SESSION_USER",
    "SOME",
    "SYMMETRIC",
    "TABLE",
    "THEN",
    "TO",
    "TRAILING",
    "TRUE",
    "UNION",
    "UNIQUE",
    "USER",
    "USING",
    "VARIADIC",
    "WHEN",
    "WHERE",
    "WINDOW",
    "WITH",
    // Join and predicate keywords the condition rewriter splits on
    "BETWEEN",
    "FULL",
    "INNER",
    "JOIN",
    "LEFT",
    "LIKE",
    "ILIKE",
    "OUTER",
    "RIGHT",
    "IS",
];

/// A validated SQL identifier (table, column or join alias)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedIdentifier(String);

impl ValidatedIdentifier {
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        validate_identifier(name)?;
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ValidatedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Common validation logic for SQL identifiers
pub fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    let first_char = name.chars().next().ok_or(ValidationError::Empty)?;

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            name: name.to_string(),
            length: name.len(),
            max_length: MAX_IDENTIFIER_LENGTH,
        });
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(ValidationError::InvalidStartCharacter(name.to_string()));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidCharacters(name.to_string()));
    }

    if is_reserved_keyword(name) {
        return Err(ValidationError::ReservedKeyword(name.to_string()));
    }

    Ok(())
}

/// Join aliases are identifiers that must not contain the projection separator
pub fn validate_alias(alias: &str) -> Result<(), ValidationError> {
    validate_identifier(alias)?;
    if alias.contains(type_mapping::row::ALIAS_SEPARATOR) {
        return Err(ValidationError::AliasSeparator(alias.to_string()));
    }
    Ok(())
}

/// Column reference as used in structured conditions: `column` or `alias.column`
pub fn validate_column_reference(reference: &str) -> Result<(), ValidationError> {
    match reference.split_once('.') {
        Some((qualifier, column)) => {
            validate_identifier(qualifier)?;
            validate_identifier(column)
        }
        None => validate_identifier(reference),
    }
}

pub fn is_reserved_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS.contains(&name.to_ascii_uppercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        let long = "a".repeat(63);
        let valid_names = [
            "t_student",
            "user_profiles",
            "UserProfiles",
            "_private_table",
            "table123",
            "a",
            // type names are usable as column names in PostgreSQL
            "date",
            "text",
            "name",
            long.as_str(),
        ];

        for name in valid_names {
            assert!(
                validate_identifier(name).is_ok(),
                "Should accept valid name: {}",
                name
            );
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        let test_cases = [
            ("", ValidationError::Empty),
            (
                "123table",
                ValidationError::InvalidStartCharacter("123table".to_string()),
            ),
            (
                "user-name",
                ValidationError::InvalidCharacters("user-name".to_string()),
            ),
            (
                "id; drop table t",
                ValidationError::InvalidCharacters("id; drop table t".to_string()),
            ),
            (
                "select",
                ValidationError::ReservedKeyword("select".to_string()),
            ),
            ("Order", ValidationError::ReservedKeyword("Order".to_string())),
        ];

        for (name, expected_error) in test_cases {
            assert_eq!(validate_identifier(name), Err(expected_error), "{}", name);
        }
    }

    #[test]
    fn test_too_long_name() {
        let long_name = "a".repeat(64);
        match validate_identifier(&long_name) {
            Err(ValidationError::TooLong {
                length, max_length, ..
            }) => {
                assert_eq!(length, 64);
                assert_eq!(max_length, 63);
            }
            other => panic!("Expected TooLong error, got {:?}", other),
        }
    }

    #[test]
    fn test_column_references() {
        assert!(validate_column_reference("t1.deleted").is_ok());
        assert!(validate_column_reference("deleted").is_ok());
        assert!(validate_column_reference("t1.").is_err());
        assert!(validate_column_reference("t1.a.b").is_err());
    }

    #[test]
    fn test_alias_separator_rejected() {
        assert!(validate_alias("t1").is_ok());
        assert_eq!(
            validate_alias("t__1"),
            Err(ValidationError::AliasSeparator("t__1".to_string()))
        );
    }

    #[test]
    fn test_display() {
        let name = ValidatedIdentifier::new("t_student").unwrap();
        assert_eq!(format!("{}", name), "t_student");
    }
}
