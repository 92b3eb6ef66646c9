//! The client facade
//!
//! One `Client` owns one logical session plus the binder and identity
//! generator every write path shares. Operations connect lazily, never
//! retry, and serialize on `&mut self`; callers wanting concurrency
//! open one client per session. Cancellation is by dropping the
//! in-flight future - no further rows are written and the session
//! stays closable.

use crate::copy::CopyPipeline;
use crate::error::{Error, Result};
use crate::options::ClientOptions;
use crate::row::TableRow;
use crate::session::Session;
use fjord_snowflake::{MachineId, SnowflakeGenerator};
use fjord_value::{Binder, Value};
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{GenericClient, Transaction};

/// Everything a bulk ingestion needs: target relation, column list and
/// the row matrix.
///
/// Every row must carry exactly one value per column; this is validated
/// at the pipeline boundary before any network I/O, never silently
/// truncated.
#[derive(Debug, Clone)]
pub struct BatchInsert {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl BatchInsert {
    pub fn new(
        table: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for (index, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(Error::RowShapeMismatch {
                    row: index,
                    expected: self.columns.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(())
    }

    fn copy_command(&self) -> String {
        format!(
            "COPY {} ({}) FROM STDIN BINARY",
            self.table,
            self.columns.join(", ")
        )
    }
}

/// A typed data-access client for one PostgreSQL session.
pub struct Client {
    session: Session,
    binder: Binder,
    identities: SnowflakeGenerator,
}

impl Client {
    /// Build a client from options. Does not connect; the first
    /// operation does.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let machine_id = MachineId::new(options.machine_id)?;

        Ok(Self {
            session: Session::new(options.pg_config()),
            binder: Binder::standard(),
            identities: SnowflakeGenerator::new(machine_id),
        })
    }

    /// Next synthetic primary-key value.
    ///
    /// Safe to call from the owner without awaiting; the generator
    /// itself is internally synchronized.
    pub fn next_identity(&self) -> i64 {
        self.identities.next_id()
    }

    /// Open the session. Idempotent; every operation also connects
    /// lazily, so calling this is optional.
    pub async fn connect(&mut self) -> Result<()> {
        self.session.connect().await.map(|_| ())
    }

    /// Close the session. Idempotent and safe when never connected.
    pub async fn close(&mut self) {
        self.session.close().await;
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Begin a transaction on this session.
    ///
    /// Plain driver passthrough: the returned transaction borrows the
    /// session exclusively until committed, rolled back or dropped.
    /// Statements inside it go through [`Client::insert_in`].
    pub async fn transaction(&mut self) -> Result<Transaction<'_>> {
        let client = self.session.connect().await?;
        client
            .transaction()
            .await
            .map_err(|e| Error::query("beginning transaction", e))
    }

    /// Execute a single parameterized write.
    ///
    /// Every value is resolved through the binder first, so an
    /// unmappable value fails before anything reaches the engine.
    pub async fn insert(&mut self, command: &str, values: &[Value]) -> Result<u64> {
        let binder = self.binder.clone();
        let client = self.session.connect().await?;
        execute_insert(client, &binder, command, values).await
    }

    /// [`Client::insert`] against a caller-supplied transaction.
    pub async fn insert_in(tx: &Transaction<'_>, command: &str, values: &[Value]) -> Result<u64> {
        execute_insert(tx, &Binder::standard(), command, values).await
    }

    /// Single parameterized write returning the first column of the
    /// first row, for `INSERT .. RETURNING` style statements.
    ///
    /// A statement returning several rows yields the first and ignores
    /// the rest.
    pub async fn insert_returning(&mut self, command: &str, values: &[Value]) -> Result<Option<Value>> {
        let binder = self.binder.clone();
        let client = self.session.connect().await?;

        let rows = fetch_rows(client, &binder, command, values).await?;
        match rows.first() {
            Some(row) => {
                let materialized = TableRow::materialize(row)?;
                Ok(materialized.columns().first().map(|c| c.value().clone()))
            }
            None => Ok(None),
        }
    }

    /// Stream a whole row set into a relation through binary COPY.
    ///
    /// Row shapes are validated before any I/O - including before the
    /// session opens - so a malformed batch never starts a partial
    /// transfer. A failure mid-stream aborts the entire operation.
    pub async fn insert_batch(&mut self, batch: BatchInsert) -> Result<u64> {
        batch.validate()?;

        let binder = self.binder.clone();
        let client = self.session.connect().await?;
        let command = batch.copy_command();

        let sink = client
            .copy_in(command.as_str())
            .await
            .map_err(|e| Error::query(command.as_str(), e))?;

        let mut pipeline = CopyPipeline::new(sink, batch.columns.len(), binder);
        pipeline.open()?;
        for row in &batch.rows {
            pipeline.write_row(row).await?;
        }
        pipeline.complete().await
    }

    /// Execute a query and materialize the first row, if any.
    ///
    /// Appends a single-row limit when the command has none, purely to
    /// cap how much the server transfers; a command that returns
    /// several rows anyway yields the first and ignores the rest.
    pub async fn first_or_default(
        &mut self,
        command: &str,
        params: &[Value],
    ) -> Result<Option<TableRow>> {
        let command = ensure_limit(command);
        let binder = self.binder.clone();
        let client = self.session.connect().await?;

        let rows = fetch_rows(client, &binder, &command, params).await?;
        rows.first().map(TableRow::materialize).transpose()
    }

    /// Execute a query and realize the full result set in memory.
    ///
    /// Deliberately non-streaming: bounding the result set is the
    /// caller's responsibility.
    pub async fn rows_where(&mut self, command: &str, params: &[Value]) -> Result<Vec<TableRow>> {
        let binder = self.binder.clone();
        let client = self.session.connect().await?;

        let rows = fetch_rows(client, &binder, command, params).await?;
        rows.iter().map(TableRow::materialize).collect()
    }

    /// Like [`Client::rows_where`], but hands each driver row to a
    /// caller projection instead of building a generic row.
    pub async fn rows_where_map<T, F>(
        &mut self,
        command: &str,
        params: &[Value],
        mut map: F,
    ) -> Result<Vec<T>>
    where
        F: FnMut(&tokio_postgres::Row) -> Result<T>,
    {
        let binder = self.binder.clone();
        let client = self.session.connect().await?;

        let rows = fetch_rows(client, &binder, command, params).await?;
        rows.iter().map(&mut map).collect()
    }
}

async fn prepare<C: GenericClient>(
    conn: &C,
    binder: &Binder,
    command: &str,
    values: &[Value],
) -> Result<tokio_postgres::Statement> {
    let bound = binder.bind_many(values)?;
    let types: Vec<Type> = bound.iter().map(|b| b.wire_type().to_pg()).collect();

    conn.prepare_typed(command, &types)
        .await
        .map_err(|e| Error::query(command, e))
}

async fn execute_insert<C: GenericClient>(
    conn: &C,
    binder: &Binder,
    command: &str,
    values: &[Value],
) -> Result<u64> {
    let statement = prepare(conn, binder, command, values).await?;
    conn.execute(&statement, &to_sql_refs(values))
        .await
        .map_err(|e| Error::query(command, e))
}

async fn fetch_rows<C: GenericClient>(
    conn: &C,
    binder: &Binder,
    command: &str,
    params: &[Value],
) -> Result<Vec<tokio_postgres::Row>> {
    let statement = prepare(conn, binder, command, params).await?;
    conn.query(&statement, &to_sql_refs(params))
        .await
        .map_err(|e| Error::query(command, e))
}

fn to_sql_refs(values: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

/// Append ` LIMIT 1` unless the command already carries a limit clause.
///
/// Matches `LIMIT` as a standalone word so identifiers like
/// `rate_limit` do not count.
fn ensure_limit(command: &str) -> String {
    let has_limit = command
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .any(|word| word.eq_ignore_ascii_case("limit"));
    if has_limit {
        command.to_string()
    } else {
        format!("{command} LIMIT 1")
    }
}
