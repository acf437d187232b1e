// Rust guideline compliant 2026-10-14

//! Monitor component -- non-mutating observer of the pipeline.
//!
//! [`Monitor`] samples the shared [`Ledger`] and queue depth, keeps a history
//! of persisted snapshots, and writes [`StatsDocument`]s to a [`StatsStore`]
//! port. Sampling is driven by the caller's loop; the monitor owns no timer.

mod document;

pub use document::{RunMetadata, RunStatistics, StatsDocument, WorkerRecord};

use chrono::{DateTime, Local};
use domain::{Counts, Ledger, QueueProbe, WorkerLogs};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

// ---------------------------------------------------------------------------
// StoreError + StatsStore port
// ---------------------------------------------------------------------------

/// Errors from persisting a stats document.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The document could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
    /// The document could not be written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hexagonal port: destination of stats documents.
///
/// Each save replaces the previous document as a whole.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait StatsStore {
    /// Persist `document`, replacing whatever was stored before.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when encoding or writing fails.
    async fn save(&self, document: &StatsDocument) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Derived metrics
// ---------------------------------------------------------------------------

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// `produced / elapsed_seconds`, two decimals; `0` when no time has elapsed.
#[must_use]
#[expect(clippy::cast_precision_loss, reason = "item counts stay far below 2^52")]
pub fn throughput_per_sec(produced: u64, elapsed_seconds: f64) -> f64 {
    if elapsed_seconds <= 0.0 {
        return 0.0;
    }
    round2(produced as f64 / elapsed_seconds)
}

/// `consumed / produced * 100`, two decimals; `0` when nothing was produced.
#[must_use]
#[expect(clippy::cast_precision_loss, reason = "item counts stay far below 2^52")]
pub fn efficiency_percent(produced: u64, consumed: u64) -> f64 {
    if produced == 0 {
        return 0.0;
    }
    round2(consumed as f64 / produced as f64 * 100.0)
}

// ---------------------------------------------------------------------------
// StatsSnapshot
// ---------------------------------------------------------------------------

/// Possibly stale aggregate view; recomputed on demand, never authoritative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Wall-clock time of the sample.
    pub timestamp: DateTime<Local>,
    /// Seconds since the monitor started, two decimals.
    pub elapsed_seconds: f64,
    /// Items produced so far.
    pub produced: u64,
    /// Items accepted so far.
    pub consumed: u64,
    /// Queue depth at sampling time.
    pub queue_size: usize,
    /// Maximum queue depth.
    pub queue_capacity: usize,
    /// `produced / elapsed_seconds`, two decimals.
    pub throughput_per_sec: f64,
    /// `produced - consumed`.
    pub lag: u64,
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// Read-only observer over the ledger and queue depth.
///
/// Generic over the queue probe and the stats store. Persistence failures are
/// logged and swallowed; they never reach the caller.
#[derive(Debug)]
pub struct Monitor<Q, S> {
    ledger: Arc<Ledger>,
    queue: Arc<Q>,
    store: S,
    started: Instant,
    started_at: DateTime<Local>,
    export: bool,
    history: Mutex<Vec<StatsSnapshot>>,
}

impl<Q: QueueProbe, S: StatsStore> Monitor<Q, S> {
    /// Start observing; elapsed time is measured from this call.
    #[must_use]
    pub fn new(ledger: Arc<Ledger>, queue: Arc<Q>, store: S) -> Self {
        Self {
            ledger,
            queue,
            store,
            started: Instant::now(),
            started_at: Local::now(),
            export: true,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Enable or disable writing the final export (interim persists are unaffected).
    #[must_use]
    pub fn with_export(mut self, enabled: bool) -> Self {
        self.export = enabled;
        self
    }

    /// The store snapshots are written to.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn snapshot_from(&self, counts: Counts, elapsed: f64) -> StatsSnapshot {
        StatsSnapshot {
            timestamp: Local::now(),
            elapsed_seconds: round2(elapsed),
            produced: counts.produced,
            consumed: counts.consumed,
            queue_size: self.queue.size(),
            queue_capacity: self.queue.capacity(),
            throughput_per_sec: throughput_per_sec(counts.produced, elapsed),
            lag: counts.lag(),
        }
    }

    fn document_from(&self, counts: Counts, elapsed: f64, logs: &WorkerLogs) -> StatsDocument {
        StatsDocument {
            metadata: RunMetadata {
                total_time_seconds: round2(elapsed),
                start_time: self.started_at,
                end_time: Local::now(),
            },
            statistics: RunStatistics {
                total_produced: counts.produced,
                total_consumed: counts.consumed,
                average_throughput_per_sec: throughput_per_sec(counts.produced, elapsed),
                efficiency_percent: efficiency_percent(counts.produced, counts.consumed),
            },
            producers: document::records(&logs.producers),
            consumers: document::records(&logs.consumers),
        }
    }

    /// Sample counters, queue depth and elapsed time right now.
    #[must_use]
    pub fn sample_now(&self) -> StatsSnapshot {
        let counts = self.ledger.counts();
        self.snapshot_from(counts, self.started.elapsed().as_secs_f64())
    }

    /// Sample, append the snapshot to the history, and write an interim
    /// document with empty worker arrays.
    pub async fn persist_snapshot(&self) -> StatsSnapshot {
        let counts = self.ledger.counts();
        let elapsed = self.started.elapsed().as_secs_f64();
        let snapshot = self.snapshot_from(counts, elapsed);
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot.clone());

        tracing::debug!(
            produced = snapshot.produced,
            consumed = snapshot.consumed,
            queue_size = snapshot.queue_size,
            queue_capacity = snapshot.queue_capacity,
            lag = snapshot.lag,
            "monitor.snapshot"
        );

        let document = self.document_from(counts, elapsed, &WorkerLogs::default());
        if let Err(e) = self.store.save(&document).await {
            tracing::warn!("Nie udało się zapisać statystyk: {e}");
        }
        snapshot
    }

    /// Build the end-of-run document from the current counters and `logs`,
    /// write it if exporting is enabled, and return it.
    pub async fn final_export(&self, logs: &WorkerLogs) -> StatsDocument {
        let counts = self.ledger.counts();
        let document = self.document_from(counts, self.started.elapsed().as_secs_f64(), logs);
        if self.export {
            match self.store.save(&document).await {
                Ok(()) => tracing::info!("Statystyki wyeksportowane"),
                Err(e) => tracing::warn!("Błąd eksportu statystyk: {e}"),
            }
        }
        document
    }

    /// Every snapshot taken by [`persist_snapshot`](Self::persist_snapshot), oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<StatsSnapshot> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
