//! Fjord Value - runtime value model for the fjord PostgreSQL client
//!
//! This crate provides:
//! - A closed [`Value`] enum covering every runtime shape the client
//!   understands, including an explicit null marker
//! - The [`TypeMap`] dispatch table resolving a value's shape to the
//!   [`WireType`] tag attached to outgoing parameters
//! - The [`Binder`], the single conversion chokepoint turning values into
//!   bound wire parameters for every write path
//!
//! Everything here is pure: no I/O, no connection state.

pub mod bind;
pub mod interval;
pub mod types;
pub mod wire;

pub use bind::{Binder, BoundParam};
pub use interval::Interval;
pub use types::{Value, ValueKind};
pub use wire::{TypeMap, WireType};

use thiserror::Error;

/// Errors raised by value conversion and binding
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("unknown value type: {type_name}")]
    UnknownType { type_name: &'static str },

    #[error("cannot read {actual} value as {requested}")]
    TypeMismatch {
        requested: &'static str,
        actual: &'static str,
    },
}

/// Result type for value operations
pub type Result<T> = std::result::Result<T, ValueError>;
