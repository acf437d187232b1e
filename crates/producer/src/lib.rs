// Rust guideline compliant 2026-10-12

//! Producer component -- generates a fixed number of items, flags some as
//! defective, and pushes them to an `ItemSink` hexagonal port.
//!
//! Entry points: [`Producer::generate`], [`Producer::produce_once`],
//! [`Producer::run`]. Configuration via [`ProducerConfig::builder`].

use domain::{Item, ItemSink, Ledger, LedgerError, QueueError, QueueMessage, WorkerId};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Inclusive range of generated item values.
const VALUE_RANGE: std::ops::RangeInclusive<u32> = 1..=100;

// ---------------------------------------------------------------------------
// ProducerError
// ---------------------------------------------------------------------------

/// Errors that can occur during item production.
#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    /// The supplied configuration is invalid.
    #[error("invalid producer configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// The item could not be counted; it was not enqueued either.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    /// The item could not be enqueued; it was not counted either.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

// ---------------------------------------------------------------------------
// ProducerConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for a [`Producer`].
///
/// Construct via [`ProducerConfig::builder`].
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Number of items to generate before exiting.
    pub items_count: u64,
    /// Lower bound of the pause after each item.
    pub sleep_min: Duration,
    /// Upper bound of the pause after each item.
    pub sleep_max: Duration,
    /// Probability in `[0, 1]` that a generated item is defective.
    pub defect_rate: f64,
    /// Optional RNG seed for reproducible items. `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Builder for [`ProducerConfig`].
///
/// Obtain via [`ProducerConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct ProducerConfigBuilder {
    items_count: u64,
    sleep_min: Duration,
    sleep_max: Duration,
    defect_rate: f64,
    seed: Option<u64>,
}

impl ProducerConfig {
    /// Create a builder. `items_count` is the only required parameter.
    ///
    /// Default values: sleep `200..=600 ms`, `defect_rate = 0.0`, `seed = None`.
    #[must_use]
    pub fn builder(items_count: u64) -> ProducerConfigBuilder {
        ProducerConfigBuilder {
            items_count,
            sleep_min: Duration::from_millis(200),
            sleep_max: Duration::from_millis(600),
            defect_rate: 0.0,
            seed: None,
        }
    }
}

impl ProducerConfigBuilder {
    /// Override the pause drawn uniformly from `[min, max]` after each item.
    #[must_use]
    pub fn sleep_range(mut self, min: Duration, max: Duration) -> Self {
        self.sleep_min = min;
        self.sleep_max = max;
        self
    }

    /// Probability that a generated item is flagged defective.
    #[must_use]
    pub fn defect_rate(mut self, rate: f64) -> Self {
        self.defect_rate = rate;
        self
    }

    /// Fix the RNG seed for deterministic output (useful in tests).
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::InvalidConfig`] when `defect_rate` is outside
    /// `[0, 1]` or the sleep range is inverted.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<ProducerConfig, ProducerError> {
        if !(0.0..=1.0).contains(&self.defect_rate) {
            return Err(ProducerError::InvalidConfig {
                reason: format!("defect_rate must be in [0, 1], got {}", self.defect_rate),
            });
        }
        if self.sleep_min > self.sleep_max {
            return Err(ProducerError::InvalidConfig {
                reason: "sleep_min must be <= sleep_max".to_owned(),
            });
        }
        Ok(ProducerConfig {
            items_count: self.items_count,
            sleep_min: self.sleep_min,
            sleep_max: self.sleep_max,
            defect_rate: self.defect_rate,
            seed: self.seed,
        })
    }
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

/// Outcome of a finished production loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerReport {
    /// Items counted and enqueued.
    pub produced: u64,
    /// Iterations skipped because of a fault.
    pub skipped: u64,
    /// Enqueued items flagged defective.
    pub defective: u64,
}

/// Generates items and forwards them to an [`ItemSink`] port.
///
/// Generic over `Q: ItemSink` for zero-cost static dispatch. Holds no queue
/// reference -- the queue and ledger are injected per call.
#[derive(Debug)]
pub struct Producer {
    id: WorkerId,
    config: ProducerConfig,
    /// Interior mutability required because all public methods take `&self`;
    /// `Mutex` keeps the producer `Sync` so it can run on a multi-threaded runtime.
    rng: Mutex<StdRng>,
}

impl Producer {
    /// Create producer number `number` (1-based) from `config`.
    ///
    /// Seeds the RNG from `config.seed` if set, otherwise from the OS.
    #[must_use]
    pub fn new(number: u32, config: ProducerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            id: WorkerId::producer(number),
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Identity used in the ledger and in run-log lines.
    #[must_use]
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Draw one item: value uniform in `[1, 100]`, defective with `defect_rate`.
    #[must_use]
    pub fn generate(&self) -> Item {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let value = rng.random_range(VALUE_RANGE);
        let defective = rng.random_bool(self.config.defect_rate);
        Item::new(value, defective)
    }

    /// Pause drawn uniformly from the configured sleep range.
    fn pause(&self) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_range(self.config.sleep_min..=self.config.sleep_max)
    }

    /// Generate one item, then enqueue and count it in one step.
    ///
    /// The ledger entry is written under the queue lock as the item is
    /// appended, so an item is counted exactly when it enters the queue and no
    /// consumer can accept it first. A task aborted while waiting for space
    /// leaves no trace in the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::Ledger`] if the item could not be counted, or
    /// [`ProducerError::Queue`] if the put failed. Either way nothing was enqueued.
    pub async fn produce_once<Q: ItemSink>(
        &self,
        queue: &Q,
        ledger: &Ledger,
    ) -> Result<Item, ProducerError> {
        let item = self.generate();
        let number = self.id.number;
        queue
            .put_recorded(QueueMessage::Item(item), || {
                ledger.record_produced(number, item.value).map_err(ProducerError::from)
            })
            .await?;
        Ok(item)
    }

    /// Run the production loop for `config.items_count` iterations.
    ///
    /// A fault in one iteration is logged and that iteration is skipped; the
    /// loop always proceeds to the next item. Sleeps after every successful
    /// item without holding any lock.
    pub async fn run<Q: ItemSink>(&self, queue: &Q, ledger: &Ledger) -> ProducerReport {
        let actor = self.id;
        let total = self.config.items_count;
        let mut report = ProducerReport::default();
        tracing::info!(%actor, "Rozpoczęto produkcję");

        for n in 1..=total {
            match self.produce_once(queue, ledger).await {
                Ok(item) => {
                    report.produced += 1;
                    report.defective += u64::from(item.defective);
                    tracing::info!(
                        %actor,
                        "Wyprodukowano: {} (priorytet: {}, postęp: {n}/{total}{})",
                        item.value,
                        item.priority,
                        if item.defective { ", WADLIWY" } else { "" },
                    );
                    tokio::time::sleep(self.pause()).await;
                }
                Err(e) => {
                    report.skipped += 1;
                    tracing::error!(%actor, "Błąd: {e}");
                }
            }
        }

        tracing::info!(%actor, produced = report.produced, "Zakończył pracę");
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
