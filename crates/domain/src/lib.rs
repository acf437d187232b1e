// Rust guideline compliant 2026-10-12

//! Shared domain types for the producer-consumer pipeline.
//!
//! Defines `Item`, the in-band `QueueMessage`, `WorkerId`, the `Ledger`
//! (shared counters plus per-worker logs), and the hexagonal queue ports:
//! `ItemSink`, `ItemSource`, and `QueueProbe`.
//! All pipeline components depend on this crate; no other workspace crate is imported here.

mod ledger;

pub use ledger::{Counts, Ledger, WorkerLogs};

use std::fmt;

/// Values strictly above this threshold are generated with priority 1.
pub const HIGH_PRIORITY_THRESHOLD: u32 = 80;

/// Run-log prefix for events not attributed to a single worker.
pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// A single item generated by a producer.
///
/// Immutable after creation. `priority` is derived from `value` and only
/// influences consumer pacing; the queue stays strictly FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    /// `1` when `value > HIGH_PRIORITY_THRESHOLD`, otherwise `0`.
    pub priority: u8,
    /// Payload, range `[1, 100]` when generated by a producer.
    pub value: u32,
    /// `true` if the item must be discarded by whichever consumer dequeues it.
    pub defective: bool,
}

impl Item {
    /// Build an item, deriving `priority` from `value`.
    #[must_use]
    pub fn new(value: u32, defective: bool) -> Self {
        let priority = u8::from(value > HIGH_PRIORITY_THRESHOLD);
        Self { priority, value, defective }
    }
}

/// Element type carried by the queue: either real work or a termination signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMessage {
    /// An item to process.
    Item(Item),
    /// Tells exactly one consumer to stop after everything enqueued before it.
    Shutdown,
}

/// Kind of worker owning a `WorkerId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    /// Generates items.
    Producer,
    /// Drains items.
    Consumer,
}

/// Identity of one worker; numbers start at 1 within each role.
///
/// Displays as the run-log prefix (`PRODUCENT 3`, `KONSUMENT 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId {
    /// Producer or consumer.
    pub role: Role,
    /// 1-based index within the role.
    pub number: u32,
}

impl WorkerId {
    /// Identity of producer `number`.
    #[must_use]
    pub fn producer(number: u32) -> Self {
        Self { role: Role::Producer, number }
    }

    /// Identity of consumer `number`.
    #[must_use]
    pub fn consumer(number: u32) -> Self {
        Self { role: Role::Consumer, number }
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Role::Producer => write!(f, "PRODUCENT {}", self.number),
            Role::Consumer => write!(f, "KONSUMENT {}", self.number),
        }
    }
}

/// Errors that a queue implementation may return.
///
/// The bounded queue never fails under normal operation; this exists so that
/// alternative adapters (and test doubles) can report a broken transport.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueueError {
    /// The transport can no longer move messages.
    #[error("queue unavailable: {reason}")]
    Unavailable {
        /// Human-readable description.
        reason: String,
    },
}

/// Errors from ledger bookkeeping.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    /// The worker id was not allocated when the ledger was created.
    #[error("no ledger entry for {worker}")]
    UnknownWorker {
        /// The offending id.
        worker: WorkerId,
    },
}

/// Hexagonal port: the write side of the shared queue.
///
/// `Producer` and the orchestrator depend exclusively on this trait.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait ItemSink {
    /// Append `message`, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Unavailable` if the transport is broken.
    async fn put(&self, message: QueueMessage) -> Result<(), QueueError>;

    /// Append `message` and run `record` in the same critical section.
    ///
    /// Once space is available, `record` runs under the queue lock; the
    /// message is appended only if it returns `Ok`, so no reader can take a
    /// message whose bookkeeping has not happened yet. A caller cancelled
    /// while waiting for space leaves neither the message nor the record.
    ///
    /// # Errors
    ///
    /// Returns the error of `record`, or `QueueError::Unavailable` converted
    /// into `E` if the transport is broken.
    async fn put_recorded<F, E>(&self, message: QueueMessage, record: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<(), E>,
        E: From<QueueError>;
}

/// Hexagonal port: the read side of the shared queue.
///
/// `Consumer` depends exclusively on this trait. Termination is signaled
/// in-band with `QueueMessage::Shutdown`, never by closing the queue.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait ItemSource {
    /// Remove and return the oldest message, waiting while the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Unavailable` if the transport is broken.
    async fn get(&self) -> Result<QueueMessage, QueueError>;
}

/// Read-only depth probe used for monitoring.
pub trait QueueProbe {
    /// Instantaneous, possibly stale number of queued messages.
    fn size(&self) -> usize;

    /// Maximum number of messages the queue holds.
    fn capacity(&self) -> usize;
}
