//! Value types for the fjord PostgreSQL client
//!
//! A closed runtime value representation. Every variant the client can
//! marshal onto the wire lives here; the dispatch table in [`crate::wire`]
//! decides which variants carry a wire-type tag.

use crate::ValueError;
use crate::interval::Interval;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use postgres_types::{IsNull, ToSql, Type, to_sql_checked};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Runtime value passed to and returned from the database.
///
/// `Null` is the explicit null marker; it is special-cased by every
/// conversion path and never reaches the dispatch table. `Json` and
/// `Array` have no wire-type tag on purpose and exercise the binder's
/// miss channel.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Char(char),
    Str(String),
    Bytea(Vec<u8>),
    Uuid(Uuid),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Interval(Interval),
    Json(serde_json::Value),
    Array(Vec<Value>),
}

/// Shape discriminant for a [`Value`], used as the dispatch-table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Decimal,
    Char,
    Str,
    Bytea,
    Uuid,
    Timestamp,
    TimestampTz,
    Interval,
    Json,
    Array,
}

impl Value {
    /// Create a string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        Value::Str(s.into())
    }

    /// Create an I64 value (most common integer type)
    pub fn integer(i: i64) -> Self {
        Value::I64(i)
    }

    /// Create bytes value
    pub fn bytes<B: Into<Vec<u8>>>(b: B) -> Self {
        Value::Bytea(b.into())
    }

    /// Check if value is the explicit null marker
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Shape discriminant of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::I8(_) => ValueKind::I8,
            Value::I16(_) => ValueKind::I16,
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Char(_) => ValueKind::Char,
            Value::Str(_) => ValueKind::Str,
            Value::Bytea(_) => ValueKind::Bytea,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::TimestampTz(_) => ValueKind::TimestampTz,
            Value::Interval(_) => ValueKind::Interval,
            Value::Json(_) => ValueKind::Json,
            Value::Array(_) => ValueKind::Array,
        }
    }

    /// Get the type name of this value, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self.kind() {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::I8 => "i8",
            ValueKind::I16 => "i16",
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
            ValueKind::Decimal => "decimal",
            ValueKind::Char => "char",
            ValueKind::Str => "string",
            ValueKind::Bytea => "bytea",
            ValueKind::Uuid => "uuid",
            ValueKind::Timestamp => "timestamp",
            ValueKind::TimestampTz => "timestamptz",
            ValueKind::Interval => "interval",
            ValueKind::Json => "json",
            ValueKind::Array => "array",
        }
    }

    /// Best-effort wire type for shapes the dispatch table does not cover.
    ///
    /// Used only by the bulk-ingestion fallback path. Shapes with no
    /// sensible inferred representation return `None` and become a hard
    /// error at the pipeline boundary.
    pub fn fallback_type(&self) -> Option<Type> {
        match self {
            Value::Json(_) => Some(Type::JSONB),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        })*
    };
}

value_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    char => Char,
    String => Str,
    Vec<u8> => Bytea,
    Uuid => Uuid,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    Interval => Interval,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

macro_rules! value_try_into {
    ($($ty:ty : $requested:literal => $variant:ident),* $(,)?) => {
        $(impl TryFrom<&Value> for $ty {
            type Error = ValueError;

            fn try_from(value: &Value) -> Result<Self, ValueError> {
                match value {
                    Value::$variant(v) => Ok(v.clone()),
                    other => Err(ValueError::TypeMismatch {
                        requested: $requested,
                        actual: other.type_name(),
                    }),
                }
            }
        })*
    };
}

value_try_into! {
    bool: "bool" => Bool,
    i16: "i16" => I16,
    i32: "i32" => I32,
    f32: "f32" => F32,
    f64: "f64" => F64,
    Decimal: "decimal" => Decimal,
    String: "string" => Str,
    Vec<u8>: "bytea" => Bytea,
    Uuid: "uuid" => Uuid,
    NaiveDateTime: "timestamp" => Timestamp,
    DateTime<Utc>: "timestamptz" => TimestampTz,
    Interval: "interval" => Interval,
}

// i64 additionally accepts the narrower integer widths, since BIGINT
// columns are the common landing place for generated identities.
impl TryFrom<&Value> for i64 {
    type Error = ValueError;

    fn try_from(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::I8(v) => Ok(*v as i64),
            Value::I16(v) => Ok(*v as i64),
            Value::I32(v) => Ok(*v as i64),
            Value::I64(v) => Ok(*v),
            other => Err(ValueError::TypeMismatch {
                requested: "i64",
                actual: other.type_name(),
            }),
        }
    }
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            // i8 maps to the one-byte "char" type in the driver, so widen
            // before encoding: SMALLINT is the tag both widths share.
            Value::I8(v) => (*v as i16).to_sql(ty, out),
            Value::I16(v) => v.to_sql(ty, out),
            Value::I32(v) => v.to_sql(ty, out),
            Value::I64(v) => v.to_sql(ty, out),
            Value::F32(v) => v.to_sql(ty, out),
            Value::F64(v) => v.to_sql(ty, out),
            Value::Decimal(v) => v.to_sql(ty, out),
            Value::Char(v) => v.to_string().to_sql(ty, out),
            Value::Str(v) => v.to_sql(ty, out),
            Value::Bytea(v) => v.to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::TimestampTz(v) => v.to_sql(ty, out),
            Value::Interval(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
            Value::Array(_) => Err(Box::new(ValueError::UnknownType {
                type_name: self.type_name(),
            })),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Dispatch is per-variant at runtime; the binder already agreed
        // the tag with the dispatch table.
        true
    }

    to_sql_checked!();
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(v) => write!(f, "Bool({v:?})"),
            Value::I8(v) => write!(f, "I8({v:?})"),
            Value::I16(v) => write!(f, "I16({v:?})"),
            Value::I32(v) => write!(f, "I32({v:?})"),
            Value::I64(v) => write!(f, "I64({v:?})"),
            Value::F32(v) => write!(f, "F32({v:?})"),
            Value::F64(v) => write!(f, "F64({v:?})"),
            Value::Decimal(v) => write!(f, "Decimal({v:?})"),
            Value::Char(v) => write!(f, "Char({v:?})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            Value::Bytea(v) => write!(f, "Bytea({} bytes)", v.len()),
            Value::Uuid(v) => write!(f, "Uuid({v:?})"),
            Value::Timestamp(v) => write!(f, "Timestamp({v:?})"),
            Value::TimestampTz(v) => write!(f, "TimestampTz({v:?})"),
            Value::Interval(v) => write!(f, "Interval({v:?})"),
            Value::Json(v) => write!(f, "Json({v:?})"),
            Value::Array(v) => write!(f, "Array({v:?})"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Bytea(v) => write!(f, "<{} bytes>", v.len()),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{v}"),
            Value::TimestampTz(v) => write!(f, "{v}"),
            Value::Interval(v) => write!(f, "{v}"),
            Value::Json(v) => write!(f, "{v}"),
            Value::Array(_) => write!(f, "{self:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_marker_is_distinct() {
        assert!(Value::Null.is_null());
        assert!(!Value::Str(String::new()).is_null());
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn kind_is_shape_not_content() {
        assert_eq!(Value::integer(0).kind(), Value::integer(i64::MAX).kind());
        assert_ne!(Value::I32(1).kind(), Value::I64(1).kind());
    }

    #[test]
    fn typed_extraction_widens_integers() {
        let v = Value::I16(7);
        assert_eq!(i64::try_from(&v).unwrap(), 7);
        assert!(String::try_from(&v).is_err());
    }

    #[test]
    fn fallback_type_covers_json_only() {
        assert_eq!(
            Value::Json(serde_json::json!({"a": 1})).fallback_type(),
            Some(Type::JSONB)
        );
        assert_eq!(Value::Array(vec![]).fallback_type(), None);
        assert_eq!(Value::integer(1).fallback_type(), None);
    }
}
