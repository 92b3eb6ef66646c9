//! Streaming binary COPY ingestion
//!
//! Transfers large row sets into a target relation through the binary
//! COPY protocol instead of one statement per row. [`CopyEncoder`] is
//! the pure framing/state-machine half; [`CopyPipeline`] drives the
//! encoded frames into the driver's copy sink.
//!
//! Lifecycle is strict: exactly one `open`, any number of complete
//! rows, exactly one `complete`. Driving it out of order is a caller
//! bug and reports [`Error::InvalidPipelineState`]. There is no
//! mid-stream rollback: any failure aborts the whole transfer, and a
//! caller needing partial-success semantics must pre-chunk its rows
//! into several pipeline runs.

use crate::error::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use fjord_value::{Binder, Value, ValueError};
use futures_util::SinkExt;
use std::pin::Pin;
use tokio_postgres::CopyInSink;
use tokio_postgres::types::{IsNull, ToSql, Type};

/// Binary COPY signature: "PGCOPY\n\377\r\n\0".
const SIGNATURE: &[u8; 11] = b"PGCOPY\n\xff\r\n\0";

/// Flush to the sink once this much frame data has accumulated.
const FLUSH_WATERMARK: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Unopened,
    Open,
    RowOpen,
    Completed,
}

impl PipelineState {
    fn name(self) -> &'static str {
        match self {
            PipelineState::Unopened => "unopened",
            PipelineState::Open => "open",
            PipelineState::RowOpen => "row open",
            PipelineState::Completed => "completed",
        }
    }
}

/// Pure binary COPY framer.
///
/// Produces the exact byte stream the engine expects: signature header,
/// per row an i16 column count, per cell an i32 length (-1 for null)
/// followed by the cell's binary image, and an i16 -1 trailer. No I/O
/// happens here, which keeps the whole lifecycle unit-testable.
pub struct CopyEncoder {
    state: PipelineState,
    columns: usize,
    cells_written: usize,
    rows: u64,
    buf: BytesMut,
    binder: Binder,
}

impl CopyEncoder {
    pub fn new(columns: usize, binder: Binder) -> Self {
        Self {
            state: PipelineState::Unopened,
            columns,
            cells_written: 0,
            rows: 0,
            buf: BytesMut::new(),
            binder,
        }
    }

    fn require(&self, expected: PipelineState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidPipelineState {
                expected: expected.name(),
                actual: self.state.name(),
            })
        }
    }

    /// Write the stream header. Callable exactly once.
    pub fn open(&mut self) -> Result<()> {
        self.require(PipelineState::Unopened)?;
        self.buf.put_slice(SIGNATURE);
        self.buf.put_i32(0); // flags
        self.buf.put_i32(0); // header extension length
        self.state = PipelineState::Open;
        Ok(())
    }

    pub fn start_row(&mut self) -> Result<()> {
        self.require(PipelineState::Open)?;
        self.buf.put_i16(self.columns as i16);
        self.cells_written = 0;
        self.state = PipelineState::RowOpen;
        Ok(())
    }

    /// Write one cell of the open row.
    ///
    /// Explicit nulls become null cells. Otherwise the value's shape is
    /// resolved through the binder; on a dispatch miss the cell falls
    /// back to the value's inferred representation - this is deliberate,
    /// advisory-logged behavior, and shapes with no inferred
    /// representation are a hard error instead of silent data loss.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        self.require(PipelineState::RowOpen)?;

        if self.cells_written == self.columns {
            return Err(Error::RowShapeMismatch {
                row: self.rows as usize,
                expected: self.columns,
                actual: self.cells_written + 1,
            });
        }

        if value.is_null() {
            self.buf.put_i32(-1);
            self.cells_written += 1;
            return Ok(());
        }

        let ty = self.resolve_cell_type(value)?;
        self.encode_cell(value, &ty)?;
        self.cells_written += 1;
        Ok(())
    }

    fn resolve_cell_type(&self, value: &Value) -> Result<Type> {
        if let Some(bound) = self.binder.try_bind(value) {
            return Ok(bound.wire_type().to_pg());
        }

        match value.fallback_type() {
            Some(ty) => {
                tracing::warn!(
                    shape = value.type_name(),
                    inferred = %ty,
                    "no wire type for value shape; writing inferred representation"
                );
                Ok(ty)
            }
            None => Err(Error::UnknownValueType(ValueError::UnknownType {
                type_name: value.type_name(),
            })),
        }
    }

    fn encode_cell(&mut self, value: &Value, ty: &Type) -> Result<()> {
        let len_at = self.buf.len();
        self.buf.put_i32(0);

        match value.to_sql(ty, &mut self.buf) {
            Ok(IsNull::No) => {
                let len = (self.buf.len() - len_at - 4) as i32;
                self.buf[len_at..len_at + 4].copy_from_slice(&len.to_be_bytes());
                Ok(())
            }
            Ok(IsNull::Yes) => {
                self.buf.truncate(len_at);
                self.buf.put_i32(-1);
                Ok(())
            }
            Err(source) => {
                self.buf.truncate(len_at);
                Err(Error::Encode {
                    shape: value.type_name(),
                    source,
                })
            }
        }
    }

    /// Close the open row, checking it carried exactly one cell per
    /// declared column.
    pub fn finish_row(&mut self) -> Result<()> {
        self.require(PipelineState::RowOpen)?;

        if self.cells_written != self.columns {
            return Err(Error::RowShapeMismatch {
                row: self.rows as usize,
                expected: self.columns,
                actual: self.cells_written,
            });
        }

        self.rows += 1;
        self.state = PipelineState::Open;
        Ok(())
    }

    /// Write the stream trailer. Callable exactly once, and only with
    /// no row open.
    pub fn complete(&mut self) -> Result<u64> {
        self.require(PipelineState::Open)?;
        self.buf.put_i16(-1);
        self.state = PipelineState::Completed;
        Ok(self.rows)
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Hand over everything framed so far.
    pub fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

/// Drives a [`CopyEncoder`] into the driver's copy sink.
///
/// Dropping the pipeline before [`complete`](Self::complete) aborts the
/// in-flight transfer; the engine discards everything streamed so far.
/// Dropping the future mid-`write_row` behaves the same way - no
/// further rows are written and the session stays closable.
pub struct CopyPipeline {
    sink: Pin<Box<CopyInSink<Bytes>>>,
    encoder: CopyEncoder,
}

impl CopyPipeline {
    pub(crate) fn new(sink: CopyInSink<Bytes>, columns: usize, binder: Binder) -> Self {
        Self {
            sink: Box::pin(sink),
            encoder: CopyEncoder::new(columns, binder),
        }
    }

    pub fn open(&mut self) -> Result<()> {
        self.encoder.open()
    }

    /// Frame one row and flush to the engine past the buffer watermark.
    pub async fn write_row(&mut self, row: &[Value]) -> Result<()> {
        self.encoder.start_row()?;
        for value in row {
            self.encoder.write_value(value)?;
        }
        self.encoder.finish_row()?;

        if self.encoder.buffered() >= FLUSH_WATERMARK {
            self.flush().await?;
        }
        Ok(())
    }

    /// Finish the transfer and return the engine-reported row count.
    pub async fn complete(mut self) -> Result<u64> {
        let framed = self.encoder.complete()?;
        self.flush().await?;

        let reported = self
            .sink
            .as_mut()
            .finish()
            .await
            .map_err(|e| Error::query("completing binary copy", e))?;

        if reported != framed {
            tracing::debug!(framed, reported, "engine row count differs from framed count");
        }
        Ok(reported)
    }

    async fn flush(&mut self) -> Result<()> {
        if self.encoder.buffered() == 0 {
            return Ok(());
        }
        let chunk = self.encoder.take();
        self.sink
            .send(chunk)
            .await
            .map_err(|e| Error::query("streaming copy data", e))
    }
}
