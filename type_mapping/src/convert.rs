//! Conversions between Rust field types and [`SqlValue`]
//!
//! `ToSqlValue` is used when binding entity fields as statement parameters,
//! `FromSqlValue` when materializing result cells back into fields.

use crate::errors::ValueError;
use crate::temporal;
use crate::types::SqlValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

pub trait ToSqlValue {
    fn to_sql_value(&self) -> Result<SqlValue, ValueError>;
}

pub trait FromSqlValue: Sized {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError>;

    /// Whether the cell should be read as "absent" when the field is optional
    fn null_like(value: &SqlValue) -> bool {
        value.is_null()
    }
}

macro_rules! to_sql_via_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(&self) -> Result<SqlValue, ValueError> {
                    Ok(SqlValue::from(self.clone()))
                }
            }
        )*
    };
}

to_sql_via_from!(
    String,
    bool,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    Uuid,
    DateTime<Utc>,
    NaiveDateTime,
    NaiveDate,
    serde_json::Value,
);

impl ToSqlValue for SqlValue {
    fn to_sql_value(&self) -> Result<SqlValue, ValueError> {
        Ok(self.clone())
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(&self) -> Result<SqlValue, ValueError> {
        match self {
            Some(v) => v.to_sql_value(),
            None => Ok(SqlValue::Null),
        }
    }
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError> {
        Ok(value.clone())
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Text(s) => Ok(s.clone()),
            SqlValue::Uuid(u) => Ok(u.to_string()),
            SqlValue::Json(serde_json::Value::String(s)) => Ok(s.clone()),
            other => Err(ValueError::mismatch("text", other)),
        }
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Bool(b) => Ok(*b),
            SqlValue::Int(0) => Ok(false),
            SqlValue::Int(1) => Ok(true),
            other => Err(ValueError::mismatch("bool", other)),
        }
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Int(i) => Ok(*i),
            SqlValue::Bool(b) => Ok(i64::from(*b)),
            SqlValue::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
            other => Err(ValueError::mismatch("int", other)),
        }
    }
}

macro_rules! narrow_int {
    ($($ty:ty),*) => {
        $(
            impl FromSqlValue for $ty {
                fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError> {
                    let wide = i64::from_sql_value(value)?;
                    <$ty>::try_from(wide).map_err(|_| ValueError::OutOfRange {
                        target: stringify!($ty),
                        value: wide.to_string(),
                    })
                }
            }
        )*
    };
}

narrow_int!(i16, i32, u32);

impl FromSqlValue for f64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Float(f) => Ok(*f),
            SqlValue::Int(i) => Ok(*i as f64),
            other => Err(ValueError::mismatch("float", other)),
        }
    }
}

impl FromSqlValue for f32 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError> {
        f64::from_sql_value(value).map(|f| f as f32)
    }
}

impl FromSqlValue for Uuid {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Uuid(u) => Ok(*u),
            SqlValue::Text(s) => Uuid::parse_str(s).map_err(|_| ValueError::OutOfRange {
                target: "uuid",
                value: s.clone(),
            }),
            other => Err(ValueError::mismatch("uuid", other)),
        }
    }
}

impl FromSqlValue for DateTime<Utc> {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Timestamp(ts) => Ok(*ts),
            SqlValue::Int(millis) => {
                temporal::from_epoch_millis(*millis).ok_or_else(|| ValueError::OutOfRange {
                    target: "timestamp",
                    value: millis.to_string(),
                })
            }
            SqlValue::Text(s) => temporal::parse(s).map_err(|e| ValueError::OutOfRange {
                target: "timestamp",
                value: e.0,
            }),
            other => Err(ValueError::mismatch("timestamp", other)),
        }
    }

    // Blank text in a temporal column reads as absent
    fn null_like(value: &SqlValue) -> bool {
        match value {
            SqlValue::Null => true,
            SqlValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl FromSqlValue for NaiveDateTime {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError> {
        DateTime::<Utc>::from_sql_value(value).map(|dt| dt.naive_utc())
    }

    fn null_like(value: &SqlValue) -> bool {
        DateTime::<Utc>::null_like(value)
    }
}

impl FromSqlValue for NaiveDate {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError> {
        DateTime::<Utc>::from_sql_value(value).map(|dt| dt.date_naive())
    }

    fn null_like(value: &SqlValue) -> bool {
        DateTime::<Utc>::null_like(value)
    }
}

impl FromSqlValue for serde_json::Value {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Json(v) => Ok(v.clone()),
            SqlValue::Null => Ok(serde_json::Value::Null),
            SqlValue::Text(s) => {
                serde_json::from_str(s).map_err(|e| ValueError::Json(e.to_string()))
            }
            other => Err(ValueError::mismatch("json", other)),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError> {
        if T::null_like(value) {
            return Ok(None);
        }
        T::from_sql_value(value).map(Some)
    }

    fn null_like(_value: &SqlValue) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_optional_temporal_reads_blank_as_none() {
        let blank = SqlValue::Text(String::new());
        assert_eq!(Option::<DateTime<Utc>>::from_sql_value(&blank).unwrap(), None);
        assert_eq!(Option::<DateTime<Utc>>::from_sql_value(&SqlValue::Null).unwrap(), None);
        assert!(DateTime::<Utc>::from_sql_value(&blank).is_err());
    }

    #[test]
    fn test_temporal_from_text_and_millis() {
        let expected = Utc.with_ymd_and_hms(2023, 5, 6, 7, 8, 9).unwrap();
        let text = SqlValue::Text("2023-05-06 07:08:09".into());
        let millis = SqlValue::Int(expected.timestamp_millis());
        assert_eq!(DateTime::<Utc>::from_sql_value(&text).unwrap(), expected);
        assert_eq!(DateTime::<Utc>::from_sql_value(&millis).unwrap(), expected);
    }

    #[test]
    fn test_narrowing_checks_range() {
        assert_eq!(i32::from_sql_value(&SqlValue::Int(42)).unwrap(), 42);
        assert!(matches!(
            i16::from_sql_value(&SqlValue::Int(i64::from(i16::MAX) + 1)),
            Err(ValueError::OutOfRange { target: "i16", .. })
        ));
    }

    #[test]
    fn test_mismatch_reports_found_type() {
        let err = bool::from_sql_value(&SqlValue::Text("yes".into())).unwrap_err();
        assert_eq!(
            err,
            ValueError::TypeMismatch {
                expected: "bool",
                found: "text"
            }
        );
    }

    #[test]
    fn test_option_binds_null() {
        assert_eq!(None::<String>.to_sql_value().unwrap(), SqlValue::Null);
        assert_eq!(Some(3i32).to_sql_value().unwrap(), SqlValue::Int(3));
    }
}
