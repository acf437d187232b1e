// Rust guideline compliant 2026-10-19

//! Run configuration.
//!
//! [`PipelineConfig`] is read once at startup from an optional JSON file,
//! patched with command-line overrides, validated, and then turned into the
//! per-worker [`ProducerConfig`] / [`ConsumerConfig`] values and the
//! [`RunLogConfig`]. Every field has a default, so an empty JSON object is a
//! complete configuration.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use consumer::{ConsumerConfig, ConsumerError, Pacing};
use logger::RunLogConfig;
use producer::{ProducerConfig, ProducerError};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;

/// Offset between the producer and consumer seed ranges derived from `seed`.
const CONSUMER_SEED_OFFSET: u64 = 1_000;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// Requested file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// The configuration file is not valid JSON for [`PipelineConfig`].
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        /// Offending file.
        path: PathBuf,
        /// The underlying decode error.
        source: serde_json::Error,
    },
    /// A value is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// A producer configuration was rejected by its builder.
    #[error(transparent)]
    Producer(#[from] ProducerError),
    /// A consumer configuration was rejected by its builder.
    #[error(transparent)]
    Consumer(#[from] ConsumerError),
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { reason: reason.into() }
}

// ---------------------------------------------------------------------------
// SleepRange
// ---------------------------------------------------------------------------

/// Pause bounds in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SleepRange {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl SleepRange {
    /// Bounds in seconds.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn durations(self, what: &str) -> Result<(Duration, Duration), ConfigError> {
        let min = seconds(self.min, what)?;
        let max = seconds(self.max, what)?;
        if min > max {
            return Err(invalid(format!("{what}: min ({}) exceeds max ({})", self.min, self.max)));
        }
        Ok((min, max))
    }
}

fn seconds(value: f64, what: &str) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| invalid(format!("{what}: {value} is not a valid number of seconds ({e})")))
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Complete run configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Maximum number of queued messages.
    pub queue_capacity: usize,
    /// Number of producers.
    pub producers: u32,
    /// Number of consumers.
    pub consumers: u32,
    /// Items each producer generates.
    pub items_per_producer: u64,
    /// Producer pause after each item.
    pub producer_sleep: SleepRange,
    /// Consumer pause bounds.
    pub consumer_sleep: SleepRange,
    /// Per-consumer uniform pause bounds, keyed by consumer id.
    pub consumer_speeds: BTreeMap<u32, SleepRange>,
    /// Defect rate for producers absent from `defect_rates`.
    pub defect_rate: f64,
    /// Per-producer defect rate, keyed by producer id.
    pub defect_rates: BTreeMap<u32, f64>,
    /// Scale consumer pauses by item priority.
    pub priority_pacing: bool,
    /// Bound on each shutdown phase, in seconds.
    pub shutdown_timeout_secs: f64,
    /// Interval between persisted stats snapshots, in seconds.
    pub monitor_interval_secs: f64,
    /// Stats document destination.
    pub stats_file: PathBuf,
    /// Write the final stats document.
    pub export_stats: bool,
    /// Run-log file.
    pub log_file: PathBuf,
    /// Write the run log to `log_file`.
    pub log_to_file: bool,
    /// Write the run log to stdout.
    pub log_to_console: bool,
    /// Minimum level (`error`, `warn`, `info`, `debug`, `trace`, `off`).
    pub log_level: String,
    /// Base seed for reproducible runs; worker RNGs derive from it.
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 5,
            producers: 3,
            consumers: 2,
            items_per_producer: 6,
            producer_sleep: SleepRange::new(0.2, 0.6),
            consumer_sleep: SleepRange::new(0.7, 1.2),
            consumer_speeds: BTreeMap::new(),
            defect_rate: 0.0,
            defect_rates: BTreeMap::new(),
            priority_pacing: true,
            shutdown_timeout_secs: 30.0,
            monitor_interval_secs: 1.0,
            stats_file: PathBuf::from("stats.json"),
            export_stats: true,
            log_file: PathBuf::from("system.log"),
            log_to_file: true,
            log_to_console: true,
            log_level: "info".to_owned(),
            seed: None,
        }
    }
}

impl PipelineConfig {
    /// Read the configuration from `path`, or use the defaults when `None`.
    ///
    /// Fields missing from the file keep their defaults. The result is not
    /// validated yet; call [`Self::validate`] after applying overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Parse a JSON document; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns the decode error for malformed JSON or unknown fields.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Check every value that cannot be expressed by the types alone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(invalid("queue_capacity must be at least 1"));
        }
        if self.consumers == 0 {
            return Err(invalid("consumers must be at least 1"));
        }
        self.producer_sleep.durations("producer_sleep")?;
        self.consumer_sleep.durations("consumer_sleep")?;
        check_rate(self.defect_rate, "defect_rate")?;
        for (&id, &rate) in &self.defect_rates {
            check_id(id, self.producers, "defect_rates", "producer")?;
            check_rate(rate, &format!("defect_rates[{id}]"))?;
        }
        for (&id, range) in &self.consumer_speeds {
            check_id(id, self.consumers, "consumer_speeds", "consumer")?;
            range.durations(&format!("consumer_speeds[{id}]"))?;
        }
        self.shutdown_timeout()?;
        if self.monitor_interval()?.is_zero() {
            return Err(invalid("monitor_interval_secs must be greater than 0"));
        }
        self.log_level()?;
        Ok(())
    }

    /// Bound on each shutdown phase.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for negative or non-finite values.
    pub fn shutdown_timeout(&self) -> Result<Duration, ConfigError> {
        seconds(self.shutdown_timeout_secs, "shutdown_timeout_secs")
    }

    /// Interval between persisted snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for negative or non-finite values.
    pub fn monitor_interval(&self) -> Result<Duration, ConfigError> {
        seconds(self.monitor_interval_secs, "monitor_interval_secs")
    }

    /// Parsed `log_level`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the level name is unknown.
    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level
            .parse::<LevelFilter>()
            .map_err(|e| invalid(format!("log_level {:?}: {e}", self.log_level)))
    }

    /// Defect rate of producer `number`.
    #[must_use]
    pub fn defect_rate_for(&self, number: u32) -> f64 {
        self.defect_rates.get(&number).copied().unwrap_or(self.defect_rate)
    }

    /// Configuration of producer `number` (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the sleep range or defect rate is invalid.
    pub fn producer_config(&self, number: u32) -> Result<ProducerConfig, ConfigError> {
        let (min, max) = self.producer_sleep.durations("producer_sleep")?;
        let mut builder = ProducerConfig::builder(self.items_per_producer)
            .sleep_range(min, max)
            .defect_rate(self.defect_rate_for(number));
        if let Some(seed) = self.seed {
            builder = builder.seed(seed.wrapping_add(u64::from(number)));
        }
        Ok(builder.build()?)
    }

    /// Configuration of consumer `number` (1-based).
    ///
    /// Consumers listed in `consumer_speeds` pace uniformly within their own
    /// range; the others follow `consumer_sleep`, scaled by priority when
    /// `priority_pacing` is on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a sleep range is invalid.
    pub fn consumer_config(&self, number: u32) -> Result<ConsumerConfig, ConfigError> {
        let pacing = if let Some(range) = self.consumer_speeds.get(&number) {
            let (min, max) = range.durations(&format!("consumer_speeds[{number}]"))?;
            Pacing::Uniform { min, max }
        } else {
            let (min, max) = self.consumer_sleep.durations("consumer_sleep")?;
            if self.priority_pacing {
                Pacing::ByPriority { min, max }
            } else {
                Pacing::Uniform { min, max }
            }
        };
        let mut builder = ConsumerConfig::builder().pacing(pacing);
        if let Some(seed) = self.seed {
            builder = builder.seed(seed.wrapping_add(CONSUMER_SEED_OFFSET + u64::from(number)));
        }
        Ok(builder.build()?)
    }

    /// Sinks and level of the run log.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the level name is unknown.
    pub fn run_log_config(&self) -> Result<RunLogConfig, ConfigError> {
        let mut builder = RunLogConfig::builder()
            .console(self.log_to_console)
            .level(self.log_level()?);
        if self.log_to_file {
            builder = builder.file(&self.log_file);
        }
        Ok(builder.build())
    }
}

fn check_rate(rate: f64, what: &str) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&rate) {
        Ok(())
    } else {
        Err(invalid(format!("{what}: {rate} is outside [0, 1]")))
    }
}

fn check_id(id: u32, count: u32, table: &str, role: &str) -> Result<(), ConfigError> {
    if (1..=count).contains(&id) {
        Ok(())
    } else {
        Err(invalid(format!("{table}: no {role} with id {id} (configured: {count})")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
