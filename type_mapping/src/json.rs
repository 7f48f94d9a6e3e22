//! JSON column codec
//!
//! JSON columns travel as UTF-8 object text. Decoding is tolerant of producers that emit
//! a bare `null` as an object key: such members are dropped before parsing instead of
//! failing the whole payload.

use crate::convert::{FromSqlValue, ToSqlValue};
use crate::errors::{CodecError, ValueError};
use crate::types::SqlValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::ops::{Deref, DerefMut};

/// Decode a JSON object payload into a key/value mapping
pub fn decode(raw: &str) -> Result<Map<String, Value>, CodecError> {
    let cleaned = strip_null_keys(raw);
    match serde_json::from_str::<Value>(&cleaned)? {
        Value::Object(map) => Ok(map),
        other => Err(CodecError::NotAnObject(value_kind(&other))),
    }
}

/// Decode a JSON payload straight into a typed value
pub fn decode_as<T: DeserializeOwned>(raw: &str) -> Result<T, CodecError> {
    let cleaned = strip_null_keys(raw);
    Ok(serde_json::from_str(&cleaned)?)
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    Ok(serde_json::to_string(value)?)
}

/// Bind any serializable value as a JSON column; a value serializing to `null` binds as
/// SQL NULL
pub fn to_sql<T: Serialize + ?Sized>(value: &T) -> Result<SqlValue, ValueError> {
    match serde_json::to_value(value) {
        Ok(Value::Null) => Ok(SqlValue::Null),
        Ok(json) => Ok(SqlValue::Json(json)),
        Err(e) => Err(ValueError::Json(e.to_string())),
    }
}

/// Read a JSON column into any deserializable type. SQL NULL and blank text read as JSON
/// `null`, so `Option<T>` targets come back as `None`.
pub fn from_sql<T: DeserializeOwned>(value: &SqlValue) -> Result<T, ValueError> {
    let json = match value {
        SqlValue::Null => Value::Null,
        SqlValue::Json(v) => v.clone(),
        SqlValue::Text(s) if s.trim().is_empty() => Value::Null,
        SqlValue::Text(s) => return decode_as(s).map_err(|e| ValueError::Json(e.to_string())),
        other => return Err(ValueError::mismatch("json", other)),
    };
    serde_json::from_value(json).map_err(|e| ValueError::Json(e.to_string()))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

struct Frame {
    object: bool,
    has_entry: bool,
}

/// Remove `null: <value>` members (unquoted `null` keys) from every object in the payload.
///
/// Commas are re-emitted only between surviving members. Input that is not valid JSON is
/// passed through mostly untouched so the parser reports the real error.
fn strip_null_keys(raw: &str) -> Cow<'_, str> {
    if !raw.contains("null") {
        return Cow::Borrowed(raw);
    }

    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut stack: Vec<Frame> = Vec::new();
    let mut expect_key = false;
    let mut pending_comma = false;
    let mut i = 0;

    while i < bytes.len() {
        let in_object = stack.last().is_some_and(|f| f.object);
        match bytes[i] {
            b'"' => {
                let end = skip_string(bytes, i);
                if in_object && expect_key {
                    emit_separator(&mut out, &mut stack, &mut pending_comma);
                    expect_key = false;
                }
                out.push_str(&raw[i..end]);
                i = end;
                continue;
            }
            b'{' | b'[' => {
                stack.push(Frame {
                    object: bytes[i] == b'{',
                    has_entry: false,
                });
                expect_key = bytes[i] == b'{';
                out.push(bytes[i] as char);
            }
            b'}' | b']' => {
                stack.pop();
                pending_comma = false;
                expect_key = false;
                out.push(bytes[i] as char);
            }
            b',' if in_object => {
                pending_comma = true;
                expect_key = true;
            }
            b':' => {
                expect_key = false;
                out.push(':');
            }
            b'n' if in_object && expect_key && raw[i..].starts_with("null") => {
                let colon = skip_whitespace(bytes, i + 4);
                if bytes.get(colon) == Some(&b':') {
                    let value_start = skip_whitespace(bytes, colon + 1);
                    i = skip_value(bytes, value_start);
                    continue;
                }
                emit_separator(&mut out, &mut stack, &mut pending_comma);
                expect_key = false;
                out.push('n');
            }
            b if b.is_ascii_whitespace() => out.push(b as char),
            _ => {
                if in_object && expect_key {
                    emit_separator(&mut out, &mut stack, &mut pending_comma);
                    expect_key = false;
                }
                let ch_len = raw[i..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&raw[i..i + ch_len]);
                i += ch_len;
                continue;
            }
        }
        i += 1;
    }

    Cow::Owned(out)
}

fn emit_separator(out: &mut String, stack: &mut [Frame], pending_comma: &mut bool) {
    if let Some(frame) = stack.last_mut() {
        if *pending_comma && frame.has_entry {
            out.push(',');
        }
        frame.has_entry = true;
    }
    *pending_comma = false;
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_value(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = skip_string(bytes, i);
                if depth == 0 {
                    return i;
                }
                continue;
            }
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                if depth == 0 {
                    return i;
                }
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            b',' if depth == 0 => return i,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Column wrapper storing `T` as a JSON document
///
/// Binds as [`SqlValue::Json`]; reads JSON or textual cells. SQL NULL and blank text are
/// treated as absent when the field is `Option<Json<T>>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> From<T> for Json<T> {
    fn from(value: T) -> Self {
        Json(value)
    }
}

impl<T: Serialize> ToSqlValue for Json<T> {
    fn to_sql_value(&self) -> Result<SqlValue, ValueError> {
        serde_json::to_value(&self.0)
            .map(SqlValue::Json)
            .map_err(|e| ValueError::Json(e.to_string()))
    }
}

impl<T: DeserializeOwned> FromSqlValue for Json<T> {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Json(v) => serde_json::from_value(v.clone())
                .map(Json)
                .map_err(|e| ValueError::Json(e.to_string())),
            SqlValue::Text(s) => decode_as(s)
                .map(Json)
                .map_err(|e| ValueError::Json(e.to_string())),
            other => Err(ValueError::mismatch("json", other)),
        }
    }

    fn null_like(value: &SqlValue) -> bool {
        match value {
            SqlValue::Null | SqlValue::Json(Value::Null) => true,
            SqlValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}
