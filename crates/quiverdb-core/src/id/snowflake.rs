//! Time-ordered numeric ids.
//!
//! A Snowflake id packs a millisecond timestamp, a datacenter id, a worker id
//! and a per-millisecond sequence into one 64-bit integer:
//!
//! ```text
//! | 41 bits timestamp | 5 bits datacenter | 5 bits worker | 12 bits sequence |
//! ```
//!
//! The timestamp counts milliseconds since 2017-01-01T00:00:00Z. Ids from one
//! worker strictly increase as long as the clock does not move backwards.

use std::sync::{Arc, Mutex};

use tracing::{error, info};

use super::clock::{Clock, SystemClock};
use super::IdGenerator;
use crate::error::{CoreError, CoreResult};
use crate::schema::SchemaElement;
use crate::types::{Id, IdKind};

/// Custom epoch, 2017-01-01T00:00:00Z in Unix milliseconds.
pub const EPOCH_MILLIS: i64 = 1_483_228_800_000;

const WORKER_ID_BITS: u32 = 5;
const DATACENTER_ID_BITS: u32 = 5;
const SEQUENCE_BITS: u32 = 12;

/// Largest valid worker id.
pub const MAX_WORKER_ID: i64 = !(-1_i64 << WORKER_ID_BITS);
/// Largest valid datacenter id.
pub const MAX_DATACENTER_ID: i64 = !(-1_i64 << DATACENTER_ID_BITS);

const SEQUENCE_MASK: i64 = !(-1_i64 << SEQUENCE_BITS);
const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;
const DATACENTER_ID_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS + DATACENTER_ID_BITS;

/// The fields packed into a Snowflake id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnowflakeParts {
    /// Milliseconds since [`EPOCH_MILLIS`].
    pub timestamp: i64,
    /// The issuing datacenter.
    pub datacenter_id: i64,
    /// The issuing worker.
    pub worker_id: i64,
    /// The sequence within the millisecond.
    pub sequence: i64,
}

impl SnowflakeParts {
    /// Unpacks a Snowflake id.
    #[must_use]
    pub const fn from_id(id: i64) -> Self {
        Self {
            timestamp: id >> TIMESTAMP_SHIFT,
            datacenter_id: (id >> DATACENTER_ID_SHIFT) & MAX_DATACENTER_ID,
            worker_id: (id >> WORKER_ID_SHIFT) & MAX_WORKER_ID,
            sequence: id & SEQUENCE_MASK,
        }
    }
}

#[derive(Debug)]
struct WorkerState {
    sequence: i64,
    last_timestamp: i64,
}

/// The mutable Snowflake worker.
///
/// [`IdWorker::next_id`] is serialized by an internal mutex, so one worker can
/// be shared across threads.
#[derive(Debug)]
pub struct IdWorker {
    worker_id: i64,
    datacenter_id: i64,
    clock: Arc<dyn Clock>,
    state: Mutex<WorkerState>,
}

impl IdWorker {
    /// Creates a worker reading the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if either id is outside `[0, 31]`.
    pub fn new(worker_id: i64, datacenter_id: i64) -> CoreResult<Self> {
        Self::with_clock(worker_id, datacenter_id, Arc::new(SystemClock))
    }

    /// Creates a worker reading the given clock.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if either id is outside `[0, 31]`.
    pub fn with_clock(
        worker_id: i64,
        datacenter_id: i64,
        clock: Arc<dyn Clock>,
    ) -> CoreResult<Self> {
        if !(0..=MAX_WORKER_ID).contains(&worker_id) {
            return Err(CoreError::invalid(format!(
                "worker id can't be greater than {MAX_WORKER_ID} or less than 0, got {worker_id}"
            )));
        }
        if !(0..=MAX_DATACENTER_ID).contains(&datacenter_id) {
            return Err(CoreError::invalid(format!(
                "datacenter id can't be greater than {MAX_DATACENTER_ID} or less than 0, got {datacenter_id}"
            )));
        }

        info!(
            worker_id,
            datacenter_id,
            timestamp_shift = TIMESTAMP_SHIFT,
            datacenter_id_bits = DATACENTER_ID_BITS,
            worker_id_bits = WORKER_ID_BITS,
            sequence_bits = SEQUENCE_BITS,
            "id worker starting"
        );

        Ok(Self {
            worker_id,
            datacenter_id,
            clock,
            state: Mutex::new(WorkerState { sequence: 0, last_timestamp: -1 }),
        })
    }

    /// Returns the worker id.
    #[must_use]
    pub const fn worker_id(&self) -> i64 {
        self.worker_id
    }

    /// Returns the datacenter id.
    #[must_use]
    pub const fn datacenter_id(&self) -> i64 {
        self.datacenter_id
    }

    /// Issues the next id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ClockRegression`] if the clock reads earlier than
    /// the last issued id, and [`CoreError::LockPoisoned`] if a previous
    /// caller panicked while holding the worker lock.
    pub fn next_id(&self) -> CoreResult<i64> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| CoreError::LockPoisoned(format!("failed to acquire id worker lock: {e}")))?;

        let mut timestamp = self.clock.now_millis();
        if timestamp < state.last_timestamp {
            error!(
                last = state.last_timestamp,
                now = timestamp,
                "clock is moving backwards, rejecting requests until {}",
                state.last_timestamp
            );
            return Err(CoreError::ClockRegression { last: state.last_timestamp, now: timestamp });
        }

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                timestamp = self.til_next_millis(state.last_timestamp);
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        Ok(((timestamp - EPOCH_MILLIS) << TIMESTAMP_SHIFT)
            | (self.datacenter_id << DATACENTER_ID_SHIFT)
            | (self.worker_id << WORKER_ID_SHIFT)
            | state.sequence)
    }

    fn til_next_millis(&self, last_timestamp: i64) -> i64 {
        let mut timestamp = self.clock.now_millis();
        while timestamp <= last_timestamp {
            std::hint::spin_loop();
            timestamp = self.clock.now_millis();
        }
        timestamp
    }
}

/// Id generator issuing a fresh Snowflake id for every element.
#[derive(Debug)]
pub struct SnowflakeIdGenerator {
    worker: IdWorker,
    kind: IdKind,
}

impl SnowflakeIdGenerator {
    /// Creates a generator around a worker.
    #[must_use]
    pub fn new(worker: IdWorker, kind: IdKind) -> Self {
        Self { worker, kind }
    }

    /// Returns the underlying worker.
    #[must_use]
    pub const fn worker(&self) -> &IdWorker {
        &self.worker
    }

    fn next(&self) -> CoreResult<Id> {
        self.worker.next_id().map(|n| self.kind.from_i64(n))
    }
}

impl IdGenerator for SnowflakeIdGenerator {
    fn kind(&self) -> IdKind {
        self.kind
    }

    fn is_deterministic(&self) -> bool {
        false
    }

    fn schema_id(&self, _element: &dyn SchemaElement) -> CoreResult<Id> {
        self.next()
    }

    fn vertex_id(&self, _label: &str, _name: &str) -> CoreResult<Id> {
        self.next()
    }

    fn edge_id(&self, _source: &Id, _label: &str, _name: &str, _target: &Id) -> CoreResult<Id> {
        self.next()
    }

    fn split(&self, id: &Id) -> CoreResult<Vec<Id>> {
        Err(CoreError::unsupported(format!("snowflake id '{id}' can't be split")))
    }
}
