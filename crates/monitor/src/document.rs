// Rust guideline compliant 2026-10-14

//! Persisted stats document read by the external dashboard.
//!
//! Field names are part of the external contract; do not rename them.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whole-run timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Seconds since the monitor started, two decimals.
    pub total_time_seconds: f64,
    /// When the monitor started.
    pub start_time: DateTime<Local>,
    /// When this document was produced.
    pub end_time: DateTime<Local>,
}

/// Aggregate counters and derived rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Items counted by all producers.
    pub total_produced: u64,
    /// Items accepted by all consumers.
    pub total_consumed: u64,
    /// `total_produced / total_time_seconds`, two decimals.
    pub average_throughput_per_sec: f64,
    /// `total_consumed / total_produced * 100`, two decimals; `0` when nothing was produced.
    pub efficiency_percent: f64,
}

/// One worker's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    /// 1-based worker number.
    pub id: u32,
    /// `items.len()`.
    pub count: usize,
    /// Values in the order the worker handled them.
    pub items: Vec<u32>,
}

/// The stats file: metadata, statistics and per-worker logs sorted by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsDocument {
    /// Run timing.
    pub metadata: RunMetadata,
    /// Totals and rates.
    pub statistics: RunStatistics,
    /// Producer logs, ascending id. Empty in interim snapshots.
    pub producers: Vec<WorkerRecord>,
    /// Consumer logs, ascending id. Empty in interim snapshots.
    pub consumers: Vec<WorkerRecord>,
}

/// Convert a log map into records; `BTreeMap` iteration keeps ids ascending.
pub(crate) fn records(logs: &BTreeMap<u32, Vec<u32>>) -> Vec<WorkerRecord> {
    logs.iter()
        .map(|(&id, items)| WorkerRecord { id, count: items.len(), items: items.clone() })
        .collect()
}
