//! Fjord PostgreSQL client
//!
//! A typed data-access layer between application code and PostgreSQL:
//! parameterized single-row writes, streaming binary COPY bulk
//! ingestion, predicate queries materialized into named-column rows,
//! and coordination-free snowflake identity generation.
//!
//! One [`Client`] owns one logical connection, opened lazily and closed
//! idempotently. Value-to-wire-type translation goes through the
//! dispatch table in [`fjord_value`]; identities come from
//! [`fjord_snowflake`].
//!
//! ```no_run
//! use fjord_pg_client::{BatchInsert, Client, ClientOptions};
//! use fjord_value::Value;
//!
//! # async fn example() -> fjord_pg_client::Result<()> {
//! let mut client = Client::new(ClientOptions::new(
//!     "localhost", "app", "svc", "secret", 1,
//! ))?;
//!
//! let id = client.next_identity();
//! client
//!     .insert(
//!         "INSERT INTO users (id, name, title) VALUES ($1, $2, $3)",
//!         &[Value::I64(id), Value::from("Johnny"), Value::from("User")],
//!     )
//!     .await?;
//!
//! let row = client
//!     .first_or_default("SELECT * FROM users WHERE id = $1", &[Value::I64(id)])
//!     .await?;
//! assert_eq!(row.unwrap()["name"], Value::from("Johnny"));
//!
//! client
//!     .insert_batch(BatchInsert::new(
//!         "users",
//!         ["id", "name", "title"],
//!         vec![
//!             vec![Value::I64(client.next_identity()), Value::from("Fredrik"), Value::from("Owner")],
//!             vec![Value::I64(client.next_identity()), Value::from("Pablo"), Value::Null],
//!         ],
//!     ))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod copy;
pub mod error;
pub mod options;
pub mod row;

mod session;

pub use client::{BatchInsert, Client};
pub use copy::{CopyEncoder, CopyPipeline};
pub use error::{Error, Result};
pub use options::ClientOptions;
pub use row::{TableColumn, TableRow};

// Re-exported so callers construct parameters and read cells without a
// separate dependency.
pub use fjord_snowflake::{MachineId, SnowflakeGenerator};
pub use fjord_value::{Binder, BoundParam, Interval, TypeMap, Value, WireType};
