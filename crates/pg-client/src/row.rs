//! Row materialization
//!
//! Converts driver-level result rows into immutable, named-column rows
//! with typed accessors. Materialization dispatches on each column's
//! declared type; it never validates values against a schema of its own.

use crate::error::{Error, Result};
use fjord_value::{Interval, Value, WireType};
use std::collections::HashMap;
use std::ops::Index;
use tokio_postgres::types::Type;

/// One column of a materialized row.
#[derive(Debug, Clone)]
pub struct TableColumn {
    name: String,
    value: Value,
    declared_type: Type,
}

impl TableColumn {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cell value; `Value::Null` for SQL NULL regardless of the
    /// declared type.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn declared_type(&self) -> &Type {
        &self.declared_type
    }
}

/// An immutable row with unique column names.
///
/// Owned solely by the caller that received it. Name lookup goes
/// through an index built once at materialization time.
#[derive(Debug, Clone)]
pub struct TableRow {
    columns: Vec<TableColumn>,
    by_name: HashMap<String, usize>,
}

impl TableRow {
    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Value by column name, `None` when the row has no such column.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.by_name.get(name).map(|&i| self.columns[i].value())
    }

    /// Typed accessor over [`TryFrom<&Value>`].
    pub fn column<'a, T>(&'a self, name: &str) -> Result<T>
    where
        T: TryFrom<&'a Value, Error = fjord_value::ValueError>,
    {
        let value = self.get(name).ok_or(Error::UnknownValueType(
            fjord_value::ValueError::TypeMismatch {
                requested: "named column",
                actual: "missing column",
            },
        ))?;
        Ok(T::try_from(value)?)
    }

    pub(crate) fn materialize(row: &tokio_postgres::Row) -> Result<TableRow> {
        let mut columns = Vec::with_capacity(row.len());
        let mut by_name = HashMap::with_capacity(row.len());

        for (index, column) in row.columns().iter().enumerate() {
            let declared_type = column.type_().clone();
            let value = read_cell(row, index, &declared_type)?;

            by_name.entry(column.name().to_string()).or_insert(index);
            columns.push(TableColumn {
                name: column.name().to_string(),
                value,
                declared_type,
            });
        }

        Ok(TableRow { columns, by_name })
    }
}

impl Index<&str> for TableRow {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        match self.get(name) {
            Some(value) => value,
            None => panic!("no column named {name:?}"),
        }
    }
}

fn read_cell(row: &tokio_postgres::Row, index: usize, ty: &Type) -> Result<Value> {
    let context = || format!("reading column {index} ({ty})");

    macro_rules! cell {
        ($rust:ty, $variant:expr) => {
            row.try_get::<_, Option<$rust>>(index)
                .map(|v| v.map($variant).unwrap_or(Value::Null))
                .map_err(|e| Error::query(context(), e))
        };
    }

    match WireType::from_pg(ty) {
        Some(WireType::Boolean) => cell!(bool, Value::Bool),
        Some(WireType::Smallint) => cell!(i16, Value::I16),
        Some(WireType::Integer) => cell!(i32, Value::I32),
        Some(WireType::Bigint) => cell!(i64, Value::I64),
        Some(WireType::Real) => cell!(f32, Value::F32),
        Some(WireType::Double) => cell!(f64, Value::F64),
        Some(WireType::Numeric) => cell!(rust_decimal::Decimal, Value::Decimal),
        Some(WireType::Uuid) => cell!(uuid::Uuid, Value::Uuid),
        Some(WireType::Bytea) => cell!(Vec<u8>, Value::Bytea),
        Some(WireType::Timestamp) => cell!(chrono::NaiveDateTime, Value::Timestamp),
        Some(WireType::TimestampTz) => cell!(chrono::DateTime<chrono::Utc>, Value::TimestampTz),
        Some(WireType::Interval) => cell!(Interval, Value::Interval),
        Some(WireType::Varchar) | Some(WireType::Char) => cell!(String, Value::Str),
        Some(WireType::Unknown) | None => {
            if *ty == Type::JSON || *ty == Type::JSONB {
                cell!(serde_json::Value, Value::Json)
            } else {
                // Last resort: let the driver hand the cell over as text.
                cell!(String, Value::Str)
            }
        }
    }
}
