// Rust guideline compliant 2026-10-12

//! Shared counters and per-worker logs, guarded by one lock.
//!
//! Incrementing a counter and appending to the matching worker log happen in
//! a single critical section, so readers never see a count without its log
//! entry. The lock is never held across an await point.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{LedgerError, WorkerId};

/// Point-in-time copy of the shared counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Items counted by producers.
    pub produced: u64,
    /// Non-defective items accepted by consumers.
    pub consumed: u64,
    /// Items a consumer dequeued and rejected as defective.
    pub discarded: u64,
}

impl Counts {
    /// `produced - consumed`: items not (yet) accepted by any consumer.
    #[must_use]
    pub fn lag(&self) -> u64 {
        self.produced.saturating_sub(self.consumed)
    }

    /// `true` once every produced item was either accepted or discarded.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.consumed + self.discarded >= self.produced
    }
}

/// Copy of every worker log, keyed by worker number in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerLogs {
    /// Values each producer counted, in production order.
    pub producers: BTreeMap<u32, Vec<u32>>,
    /// Values each consumer accepted, in acceptance order.
    pub consumers: BTreeMap<u32, Vec<u32>>,
}

#[derive(Debug, Default)]
struct Books {
    counts: Counts,
    logs: WorkerLogs,
}

/// Process-wide bookkeeping shared by all workers.
///
/// Worker logs are pre-allocated for producers `1..=producers` and consumers
/// `1..=consumers`; recording against any other id fails.
#[derive(Debug)]
pub struct Ledger {
    books: Mutex<Books>,
}

impl Ledger {
    /// Create a ledger with empty logs for the given worker counts.
    #[must_use]
    pub fn new(producers: u32, consumers: u32) -> Self {
        let logs = WorkerLogs {
            producers: (1..=producers).map(|id| (id, Vec::new())).collect(),
            consumers: (1..=consumers).map(|id| (id, Vec::new())).collect(),
        };
        Self {
            books: Mutex::new(Books { counts: Counts::default(), logs }),
        }
    }

    // A worker that panicked mid-update cannot leave the books half-written:
    // every mutation below is a push plus an increment with nothing fallible between.
    fn lock(&self) -> MutexGuard<'_, Books> {
        self.books.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one produced item and append `value` to the producer's log.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownWorker`] if `producer` has no log entry.
    pub fn record_produced(&self, producer: u32, value: u32) -> Result<(), LedgerError> {
        let mut books = self.lock();
        let log = books
            .logs
            .producers
            .get_mut(&producer)
            .ok_or(LedgerError::UnknownWorker { worker: WorkerId::producer(producer) })?;
        log.push(value);
        books.counts.produced += 1;
        Ok(())
    }

    /// Count one accepted item and append `value` to the consumer's log.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownWorker`] if `consumer` has no log entry.
    pub fn record_consumed(&self, consumer: u32, value: u32) -> Result<(), LedgerError> {
        let mut books = self.lock();
        let log = books
            .logs
            .consumers
            .get_mut(&consumer)
            .ok_or(LedgerError::UnknownWorker { worker: WorkerId::consumer(consumer) })?;
        log.push(value);
        books.counts.consumed += 1;
        Ok(())
    }

    /// Count one item that will never be accepted.
    pub fn record_discarded(&self) {
        self.lock().counts.discarded += 1;
    }

    /// Current counters.
    #[must_use]
    pub fn counts(&self) -> Counts {
        self.lock().counts
    }

    /// Copy of all worker logs.
    #[must_use]
    pub fn worker_logs(&self) -> WorkerLogs {
        self.lock().logs.clone()
    }
}
