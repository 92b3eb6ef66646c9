//! Parameter binding
//!
//! The binder is the single conversion chokepoint between runtime values
//! and wire parameters. Both the single-statement write path and the
//! bulk-ingestion pipeline go through it; result materialization never
//! does.

use crate::wire::{TypeMap, WireType};
use crate::{Value, ValueError};
use std::sync::Arc;

/// A value paired with its resolved wire-type tag.
///
/// Created per call, immutable, discarded once the statement executes.
#[derive(Debug, Clone)]
pub struct BoundParam {
    value: Value,
    wire_type: WireType,
}

impl BoundParam {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }
}

/// Turns runtime values into bound wire parameters.
///
/// Holds shared ownership of the dispatch table, so constructing binders
/// is cheap and never rebuilds the table.
#[derive(Debug, Clone)]
pub struct Binder {
    map: Arc<TypeMap>,
}

impl Binder {
    pub fn new(map: Arc<TypeMap>) -> Self {
        Self { map }
    }

    /// Binder over the process-wide standard dispatch table.
    pub fn standard() -> Self {
        Self::new(TypeMap::shared())
    }

    /// Non-failing bind.
    ///
    /// Reports a dispatch miss through the `None` channel only; the
    /// `debug!` line is advisory and not part of the contract. Explicit
    /// nulls bind to [`WireType::Unknown`] without touching the table.
    pub fn try_bind(&self, value: &Value) -> Option<BoundParam> {
        if value.is_null() {
            return Some(BoundParam {
                value: Value::Null,
                wire_type: WireType::Unknown,
            });
        }

        match self.map.resolve(value) {
            Some(wire_type) => Some(BoundParam {
                value: value.clone(),
                wire_type,
            }),
            None => {
                tracing::debug!(shape = value.type_name(), "no wire type for value shape");
                None
            }
        }
    }

    /// Failing bind, built atop [`Self::try_bind`].
    pub fn bind(&self, value: &Value) -> crate::Result<BoundParam> {
        self.try_bind(value).ok_or(ValueError::UnknownType {
            type_name: value.type_name(),
        })
    }

    /// Bind a statement's whole parameter list, failing on the first
    /// unmappable value.
    pub fn bind_many(&self, values: &[Value]) -> crate::Result<Vec<BoundParam>> {
        values.iter().map(|v| self.bind(v)).collect()
    }
}

impl Default for Binder {
    fn default() -> Self {
        Self::standard()
    }
}
