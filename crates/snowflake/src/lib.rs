//! Snowflake identity generation.
//!
//! Synthetic primary keys must be assignable by the writer without a
//! round trip to the database, so bulk ingestion never waits on
//! pre-fetched key ranges. Identifiers are 64-bit, time-ordered, and
//! partitioned by a machine identifier so independently configured
//! generators never collide.
//!
//! Layout, high to low: 41 bits of milliseconds since the fjord epoch,
//! 10 bits of machine id, 12 bits of per-millisecond sequence. The sign
//! bit stays zero, keeping every id a positive BIGINT.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Milliseconds from the Unix epoch to 2020-01-01T00:00:00Z.
const EPOCH_OFFSET_MS: u64 = 1_577_836_800_000;

const SEQUENCE_BITS: u32 = 12;
const MACHINE_BITS: u32 = 10;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Errors raised by identity configuration
#[derive(Debug, Error)]
pub enum SnowflakeError {
    #[error("machine id {0} out of range (0..1024)")]
    MachineIdOutOfRange(u16),
}

/// Machine identifier partitioning the id space.
///
/// Two generators configured with distinct machine ids can never
/// produce the same identifier, with no coordination between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MachineId(u16);

impl MachineId {
    pub fn new(id: u16) -> Result<Self, SnowflakeError> {
        if u32::from(id) >= (1 << MACHINE_BITS) {
            return Err(SnowflakeError::MachineIdOutOfRange(id));
        }
        Ok(MachineId(id))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lock-free generator of monotonically non-decreasing identifiers.
///
/// All concurrent callers share one instance; synchronization is
/// internal and callers never lock. State is a single packed word
/// (`millis << 12 | sequence`) advanced by compare-exchange, so no two
/// calls over the generator's lifetime return the same id. The only
/// blocking is a brief spin when a millisecond's 4096 sequence slots
/// are exhausted.
pub struct SnowflakeGenerator {
    machine_id: MachineId,
    /// Packed `last_millis << SEQUENCE_BITS | sequence`.
    state: AtomicU64,
}

impl SnowflakeGenerator {
    pub fn new(machine_id: MachineId) -> Self {
        Self {
            machine_id,
            state: AtomicU64::new(0),
        }
    }

    pub fn machine_id(&self) -> MachineId {
        self.machine_id
    }

    /// Next identifier.
    ///
    /// Non-decreasing in any single caller's call order, and distinct
    /// across all callers. A wall clock stepping backwards is absorbed:
    /// the generator keeps issuing from its last observed millisecond
    /// rather than ever going back.
    pub fn next_id(&self) -> i64 {
        loop {
            let now = clock_millis();
            let current = self.state.load(Ordering::Acquire);
            let last_millis = current >> SEQUENCE_BITS;

            let candidate = if now > last_millis {
                now << SEQUENCE_BITS
            } else {
                let sequence = (current & SEQUENCE_MASK) + 1;
                if sequence > SEQUENCE_MASK {
                    // Sequence exhausted for this millisecond.
                    std::hint::spin_loop();
                    continue;
                }
                (last_millis << SEQUENCE_BITS) | sequence
            };

            if self
                .state
                .compare_exchange(current, candidate, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return self.pack(candidate);
            }
        }
    }

    fn pack(&self, state: u64) -> i64 {
        let millis = state >> SEQUENCE_BITS;
        let sequence = state & SEQUENCE_MASK;
        let machine = u64::from(self.machine_id.0);

        ((millis << (MACHINE_BITS + SEQUENCE_BITS)) | (machine << SEQUENCE_BITS) | sequence) as i64
    }
}

fn clock_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
        .saturating_sub(EPOCH_OFFSET_MS)
}
