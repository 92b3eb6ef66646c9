//! Error types for the client

use fjord_snowflake::SnowflakeError;
use fjord_value::ValueError;
use thiserror::Error;

/// Client error types.
///
/// Nothing here is retried internally; retry policy belongs entirely to
/// the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// A runtime value has no wire-type mapping (or cannot be read as
    /// the requested type). Local, never retried.
    #[error("unmappable value")]
    UnknownValueType(#[from] ValueError),

    /// Bulk input violated the row-shape precondition. Reported before
    /// any network I/O begins.
    #[error("row {row} has {actual} values, expected {expected}")]
    RowShapeMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// The bulk pipeline was driven out of order. A caller bug, not a
    /// data error.
    #[error("invalid pipeline state: expected {expected}, found {actual}")]
    InvalidPipelineState {
        expected: &'static str,
        actual: &'static str,
    },

    /// The connection could not be established.
    #[error("connection failed: {context}")]
    Connection {
        context: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// An engine-reported failure, surfaced verbatim with context.
    #[error("query failed: {context}")]
    Query {
        context: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// A value failed to encode into its wire representation.
    #[error("failed to encode {shape} value")]
    Encode {
        shape: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid machine id")]
    MachineId(#[from] SnowflakeError),
}

impl Error {
    pub(crate) fn query(context: impl Into<String>, source: tokio_postgres::Error) -> Self {
        Error::Query {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn connection(context: impl Into<String>, source: tokio_postgres::Error) -> Self {
        Error::Connection {
            context: context.into(),
            source,
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;
