//! SQL type conversion utilities
//!
//! This module maps Rust type names onto logical column types. It runs at macro expansion
//! time as well as at runtime, so it works on normalized type strings.

use crate::types::LogicalType;

/// Map a Rust type name to the logical column type used by the metadata layer
pub fn rust_type_to_logical_type(rust_type: &str) -> LogicalType {
    // Normalize type string by removing all whitespace for consistent matching
    let normalized = rust_type.replace(' ', "");
    let inner = strip_option(&normalized);

    if inner.starts_with("Json<") || inner.contains("::Json<") {
        return LogicalType::JsonBlob;
    }

    match inner {
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" | "isize" | "usize" | "f32"
        | "f64" => LogicalType::Number,
        "bool" => LogicalType::Boolean,
        "DateTime<Utc>"
        | "chrono::DateTime<Utc>"
        | "chrono::DateTime<chrono::Utc>"
        | "NaiveDateTime"
        | "chrono::NaiveDateTime"
        | "NaiveDate"
        | "chrono::NaiveDate" => LogicalType::Temporal,
        "serde_json::Value" | "Value" | "JsonValue" => LogicalType::JsonBlob,
        _ => LogicalType::String, // default fallback
    }
}

/// Check if a Rust type is Optional (nullable in SQL)
pub fn is_optional_type(rust_type: &str) -> bool {
    let normalized = rust_type.replace(' ', "");
    normalized.starts_with("Option<") || normalized.starts_with("std::option::Option<")
}

fn strip_option(normalized: &str) -> &str {
    let without_path = normalized
        .strip_prefix("std::option::")
        .unwrap_or(normalized);
    without_path
        .strip_prefix("Option<")
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_types() {
        assert_eq!(rust_type_to_logical_type("i64"), LogicalType::Number);
        assert_eq!(rust_type_to_logical_type("Option < i32 >"), LogicalType::Number);
        assert_eq!(rust_type_to_logical_type("bool"), LogicalType::Boolean);
        assert_eq!(
            rust_type_to_logical_type("Option<chrono::DateTime<chrono::Utc>>"),
            LogicalType::Temporal
        );
        assert_eq!(rust_type_to_logical_type("Json<School>"), LogicalType::JsonBlob);
        assert_eq!(
            rust_type_to_logical_type("Option<type_mapping::Json<School>>"),
            LogicalType::JsonBlob
        );
        assert_eq!(rust_type_to_logical_type("String"), LogicalType::String);
        assert_eq!(rust_type_to_logical_type("Uuid"), LogicalType::String);
    }

    #[test]
    fn test_optional_detection() {
        assert!(is_optional_type("Option<String>"));
        assert!(is_optional_type("Option < i64 >"));
        assert!(!is_optional_type("String"));
    }
}
