//! Wire-type tags and the shape dispatch table
//!
//! [`WireType`] is the closed set of type discriminators the client
//! attaches to outgoing parameters so the engine never has to infer
//! them. [`TypeMap`] is the single source of truth for which runtime
//! shape carries which tag; it is built once and shared by reference
//! into every binder instance.

use crate::types::{Value, ValueKind};
use postgres_types::Type;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Wire-level type tag understood by the database engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Uuid,
    Varchar,
    Integer,
    Boolean,
    TimestampTz,
    Double,
    Numeric,
    Bytea,
    Interval,
    Timestamp,
    Smallint,
    Real,
    Char,
    Bigint,
    /// No declared type; the engine infers one. Used for explicit nulls.
    Unknown,
}

impl WireType {
    /// The driver-level type this tag translates to.
    pub fn to_pg(self) -> Type {
        match self {
            WireType::Uuid => Type::UUID,
            WireType::Varchar => Type::VARCHAR,
            WireType::Integer => Type::INT4,
            WireType::Boolean => Type::BOOL,
            WireType::TimestampTz => Type::TIMESTAMPTZ,
            WireType::Double => Type::FLOAT8,
            WireType::Numeric => Type::NUMERIC,
            WireType::Bytea => Type::BYTEA,
            WireType::Interval => Type::INTERVAL,
            WireType::Timestamp => Type::TIMESTAMP,
            WireType::Smallint => Type::INT2,
            WireType::Real => Type::FLOAT4,
            WireType::Char => Type::BPCHAR,
            WireType::Bigint => Type::INT8,
            WireType::Unknown => Type::UNKNOWN,
        }
    }

    /// Reverse lookup from a driver-level type, used when materializing
    /// result cursors. Text-family types all come back as `Varchar`.
    pub fn from_pg(ty: &Type) -> Option<WireType> {
        let tag = if *ty == Type::UUID {
            WireType::Uuid
        } else if *ty == Type::VARCHAR || *ty == Type::TEXT || *ty == Type::NAME {
            WireType::Varchar
        } else if *ty == Type::INT4 {
            WireType::Integer
        } else if *ty == Type::BOOL {
            WireType::Boolean
        } else if *ty == Type::TIMESTAMPTZ {
            WireType::TimestampTz
        } else if *ty == Type::FLOAT8 {
            WireType::Double
        } else if *ty == Type::NUMERIC {
            WireType::Numeric
        } else if *ty == Type::BYTEA {
            WireType::Bytea
        } else if *ty == Type::INTERVAL {
            WireType::Interval
        } else if *ty == Type::TIMESTAMP {
            WireType::Timestamp
        } else if *ty == Type::INT2 {
            WireType::Smallint
        } else if *ty == Type::FLOAT4 {
            WireType::Real
        } else if *ty == Type::BPCHAR {
            WireType::Char
        } else if *ty == Type::INT8 {
            WireType::Bigint
        } else {
            return None;
        };

        Some(tag)
    }
}

/// Immutable shape-to-tag dispatch table.
///
/// Exactly one tag per supported shape. The only intentional union is
/// `I8`/`I16`, which both carry `Smallint`; every other numeric width
/// is distinct. `Null` never reaches the table - callers special-case
/// it first.
#[derive(Debug)]
pub struct TypeMap {
    entries: HashMap<ValueKind, WireType>,
}

impl TypeMap {
    /// Build the standard dispatch table.
    pub fn standard() -> Self {
        let entries = HashMap::from([
            (ValueKind::Uuid, WireType::Uuid),
            (ValueKind::Str, WireType::Varchar),
            (ValueKind::I32, WireType::Integer),
            (ValueKind::Bool, WireType::Boolean),
            (ValueKind::TimestampTz, WireType::TimestampTz),
            (ValueKind::F64, WireType::Double),
            (ValueKind::Decimal, WireType::Numeric),
            (ValueKind::Bytea, WireType::Bytea),
            (ValueKind::Interval, WireType::Interval),
            (ValueKind::Timestamp, WireType::Timestamp),
            (ValueKind::I8, WireType::Smallint),
            (ValueKind::I16, WireType::Smallint),
            (ValueKind::F32, WireType::Real),
            (ValueKind::Char, WireType::Char),
            (ValueKind::I64, WireType::Bigint),
        ]);

        Self { entries }
    }

    /// Process-wide shared table, built on first use.
    pub fn shared() -> Arc<TypeMap> {
        static SHARED: OnceLock<Arc<TypeMap>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(TypeMap::standard())).clone()
    }

    /// Resolve a value's shape to its wire-type tag.
    ///
    /// Total over the supported shape set and never fails: unsupported
    /// shapes report `None` so the caller decides whether absence is
    /// fatal. Dispatch is on shape, never on content.
    pub fn resolve(&self, value: &Value) -> Option<WireType> {
        self.entries.get(&value.kind()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    /// Fixed reference table: one entry per supported shape.
    fn reference_pairs() -> Vec<(Value, WireType)> {
        vec![
            (Value::Uuid(Uuid::nil()), WireType::Uuid),
            (Value::string("x"), WireType::Varchar),
            (Value::I32(1), WireType::Integer),
            (Value::Bool(true), WireType::Boolean),
            (Value::TimestampTz(Utc::now()), WireType::TimestampTz),
            (Value::F64(1.5), WireType::Double),
            (Value::Decimal(Decimal::new(125, 2)), WireType::Numeric),
            (Value::bytes(vec![1, 2, 3]), WireType::Bytea),
            (
                Value::Interval(Interval::from_microseconds(1)),
                WireType::Interval,
            ),
            (
                Value::Timestamp(Utc::now().naive_utc()),
                WireType::Timestamp,
            ),
            (Value::I8(1), WireType::Smallint),
            (Value::I16(1), WireType::Smallint),
            (Value::F32(1.5), WireType::Real),
            (Value::Char('x'), WireType::Char),
            (Value::I64(1), WireType::Bigint),
        ]
    }

    #[test]
    fn resolve_matches_reference_table() {
        let map = TypeMap::standard();
        for (value, expected) in reference_pairs() {
            assert_eq!(
                map.resolve(&value),
                Some(expected),
                "shape {}",
                value.type_name()
            );
        }
    }

    #[test]
    fn resolve_is_none_for_unsupported_shapes() {
        let map = TypeMap::standard();
        assert_eq!(map.resolve(&Value::Json(serde_json::json!(1))), None);
        assert_eq!(map.resolve(&Value::Array(vec![Value::I32(1)])), None);
    }

    #[test]
    fn small_integers_alias_all_other_widths_distinct() {
        let map = TypeMap::standard();
        assert_eq!(map.resolve(&Value::I8(0)), map.resolve(&Value::I16(0)));
        assert_ne!(map.resolve(&Value::I16(0)), map.resolve(&Value::I32(0)));
        assert_ne!(map.resolve(&Value::I32(0)), map.resolve(&Value::I64(0)));
        assert_ne!(map.resolve(&Value::F32(0.0)), map.resolve(&Value::F64(0.0)));
    }

    #[test]
    fn shared_table_is_a_single_instance() {
        assert!(Arc::ptr_eq(&TypeMap::shared(), &TypeMap::shared()));
    }

    #[test]
    fn pg_type_roundtrip() {
        for (value, tag) in reference_pairs() {
            let _ = value;
            assert_eq!(WireType::from_pg(&tag.to_pg()), Some(tag));
        }
        assert_eq!(WireType::from_pg(&Type::JSONB), None);
    }
}
