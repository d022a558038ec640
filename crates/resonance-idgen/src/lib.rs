//! 64-bit, roughly time-ordered, globally unique `msg_id` generation.
//!
//! Layout (Snowflake-style), most to least significant bit:
//!
//! ```text
//! 1 bit   unused (always 0, keeps the value non-negative as an i64)
//! 41 bits milliseconds since `EPOCH_MS`            (good for ~69 years)
//! 10 bits worker id                                (0..=1023)
//! 12 bits per-millisecond sequence counter          (0..=4095)
//! ```
//!
//! A single `IdGenerator` is monotonic for its own worker id: within one
//! millisecond, the sequence counter increments; once it wraps, the
//! generator busy-waits for the next millisecond. A clock that moves
//! backwards (NTP step) is treated as a fatal misconfiguration rather than
//! silently reused, since reusing a millisecond after a warped-back clock
//! could repeat an id already handed out.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Custom epoch: 2024-01-01T00:00:00Z, in milliseconds since the Unix epoch.
/// Keeps the 41-bit timestamp field from running out before ~2093.
pub const EPOCH_MS: u64 = 1_704_067_200_000;

const WORKER_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const MAX_WORKER_ID: u64 = (1 << WORKER_BITS) - 1;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdGenError {
    #[error("worker_id {0} exceeds the maximum of {MAX_WORKER_ID}")]
    WorkerIdOutOfRange(u64),
    #[error("system clock moved backwards by {delta_ms}ms relative to the last generated id")]
    ClockMovedBackwards { delta_ms: u64 },
}

struct GeneratorState {
    last_ts_ms: u64,
    sequence: u64,
}

/// A `msg_id` generator bound to one worker id. Clone is intentionally not
/// derived: each process should own exactly one generator per worker slot it
/// has been assigned (e.g. via a config-supplied `LOGIC_WORKER_ID`).
pub struct IdGenerator {
    worker_id: u64,
    state: Mutex<GeneratorState>,
}

impl IdGenerator {
    pub fn new(worker_id: u64) -> Result<Self, IdGenError> {
        if worker_id > MAX_WORKER_ID {
            return Err(IdGenError::WorkerIdOutOfRange(worker_id));
        }
        Ok(Self {
            worker_id,
            state: Mutex::new(GeneratorState {
                last_ts_ms: 0,
                sequence: 0,
            }),
        })
    }

    /// Produce the next `msg_id`. Never repeats for this generator, and is
    /// monotonically non-decreasing as observed by a single caller.
    pub fn next_id(&self) -> Result<i64, IdGenError> {
        let mut state = self.state.lock().expect("idgen mutex poisoned");
        let mut now_ms = current_millis();

        if now_ms < state.last_ts_ms {
            let delta_ms = state.last_ts_ms - now_ms;
            return Err(IdGenError::ClockMovedBackwards { delta_ms });
        }

        if now_ms == state.last_ts_ms {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                // Sequence space exhausted for this millisecond; spin to the next one.
                now_ms = wait_for_next_millis(state.last_ts_ms);
                state.last_ts_ms = now_ms;
            }
        } else {
            state.sequence = 0;
            state.last_ts_ms = now_ms;
        }

        let ts_component = state.last_ts_ms - EPOCH_MS;
        let id = (ts_component << (WORKER_BITS + SEQUENCE_BITS))
            | (self.worker_id << SEQUENCE_BITS)
            | state.sequence;
        Ok(id as i64)
    }
}

fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before the Unix epoch")
        .as_millis() as u64
}

fn wait_for_next_millis(last_ts_ms: u64) -> u64 {
    let mut now = current_millis();
    while now <= last_ts_ms {
        std::thread::yield_now();
        now = current_millis();
    }
    now
}
