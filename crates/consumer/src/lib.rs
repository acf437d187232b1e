// Rust guideline compliant 2026-10-13

//! Consumer component -- drains an `ItemSource` until it receives its shutdown
//! message, discards defective items, and records accepted ones in the ledger.
//!
//! Entry points: [`Consumer::consume_once`], [`Consumer::run`].
//! Configuration via [`ConsumerConfig::builder`].
//!
//! Unlike the producer, a consumer is fail-fast: the first fault ends the
//! worker and is returned to the caller.

use domain::{Item, ItemSource, Ledger, LedgerError, QueueError, QueueMessage, WorkerId};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConsumerError
// ---------------------------------------------------------------------------

/// Errors that can occur during item consumption.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// The supplied configuration is invalid.
    #[error("invalid consumer configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// Reading from the queue failed.
    #[error("queue read error: {0}")]
    Read(#[from] QueueError),
    /// The accepted item could not be recorded.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

// ---------------------------------------------------------------------------
// Pacing
// ---------------------------------------------------------------------------

/// How long a consumer pauses after accepting an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// `min + (max - min) * priority / 2`: high-priority items take longer.
    ByPriority {
        /// Pause for priority 0.
        min: Duration,
        /// Upper reference bound; priority 2 would reach it.
        max: Duration,
    },
    /// Pause drawn uniformly from `[min, max]`, independent of the item.
    Uniform {
        /// Lower bound.
        min: Duration,
        /// Upper bound.
        max: Duration,
    },
}

impl Pacing {
    fn bounds(self) -> (Duration, Duration) {
        match self {
            Self::ByPriority { min, max } | Self::Uniform { min, max } => (min, max),
        }
    }
}

// ---------------------------------------------------------------------------
// ConsumerConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for a [`Consumer`].
///
/// Construct via [`ConsumerConfig::builder`].
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Pause policy applied after every accepted item.
    pub pacing: Pacing,
    /// Optional RNG seed for reproducible uniform pauses. `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Builder for [`ConsumerConfig`].
///
/// Obtain via [`ConsumerConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct ConsumerConfigBuilder {
    pacing: Pacing,
    seed: Option<u64>,
}

impl ConsumerConfig {
    /// Create a builder.
    ///
    /// Default values: `Pacing::ByPriority { min: 700 ms, max: 1200 ms }`, `seed = None`.
    #[must_use]
    pub fn builder() -> ConsumerConfigBuilder {
        ConsumerConfigBuilder {
            pacing: Pacing::ByPriority {
                min: Duration::from_millis(700),
                max: Duration::from_millis(1200),
            },
            seed: None,
        }
    }
}

impl ConsumerConfigBuilder {
    /// Override the pause policy.
    #[must_use]
    pub fn pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Fix the RNG seed for deterministic pauses (useful in tests).
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::InvalidConfig`] when the pacing bounds are inverted.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<ConsumerConfig, ConsumerError> {
        let (min, max) = self.pacing.bounds();
        if min > max {
            return Err(ConsumerError::InvalidConfig {
                reason: "pacing min must be <= max".to_owned(),
            });
        }
        Ok(ConsumerConfig { pacing: self.pacing, seed: self.seed })
    }
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

/// Result of handling one dequeued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The item was recorded as consumed.
    Accepted(Item),
    /// The item was defective and dropped.
    Rejected(Item),
    /// The shutdown message was received.
    Shutdown,
}

/// Outcome of a consumption loop that ended on its shutdown message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    /// Items accepted and recorded in the ledger.
    pub accepted: u64,
    /// Defective items dropped by this consumer.
    pub rejected: u64,
}

/// Drains an [`ItemSource`] port, recording accepted items in a [`Ledger`].
///
/// Generic over `Q: ItemSource` for zero-cost static dispatch. Holds no queue
/// reference -- the queue and ledger are injected per call.
#[derive(Debug)]
pub struct Consumer {
    id: WorkerId,
    config: ConsumerConfig,
    /// Interior mutability required because all public methods take `&self`.
    rng: Mutex<StdRng>,
}

impl Consumer {
    /// Create consumer number `number` (1-based) from `config`.
    ///
    /// Seeds the RNG from `config.seed` if set, otherwise from the OS.
    #[must_use]
    pub fn new(number: u32, config: ConsumerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            id: WorkerId::consumer(number),
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Identity used in the ledger and in run-log lines.
    #[must_use]
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Pause to apply after accepting `item`.
    #[must_use]
    pub fn pause_for(&self, item: &Item) -> Duration {
        match self.config.pacing {
            Pacing::ByPriority { min, max } => {
                min + (max - min).mul_f64(f64::from(item.priority) / 2.0)
            }
            Pacing::Uniform { min, max } => self
                .rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .random_range(min..=max),
        }
    }

    /// Take one message from `queue` and handle it.
    ///
    /// Defective items are counted as discarded in the ledger but never touch
    /// the consumed counter or this consumer's log.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Read`] on queue failure, or
    /// [`ConsumerError::Ledger`] if the accepted item could not be recorded.
    pub async fn consume_once<Q: ItemSource>(
        &self,
        queue: &Q,
        ledger: &Ledger,
    ) -> Result<Step, ConsumerError> {
        let item = match queue.get().await? {
            QueueMessage::Shutdown => return Ok(Step::Shutdown),
            QueueMessage::Item(item) => item,
        };
        if item.defective {
            ledger.record_discarded();
            return Ok(Step::Rejected(item));
        }
        ledger.record_consumed(self.id.number, item.value)?;
        Ok(Step::Accepted(item))
    }

    /// Run the consumption loop until this consumer receives a shutdown message.
    ///
    /// Sleeps after every accepted item according to the configured
    /// [`Pacing`]; rejected items are skipped without pausing.
    ///
    /// # Errors
    ///
    /// The first [`ConsumerError`] ends the loop immediately (no retry); it is
    /// logged here and returned to the caller.
    pub async fn run<Q: ItemSource>(
        &self,
        queue: &Q,
        ledger: &Ledger,
    ) -> Result<ConsumerReport, ConsumerError> {
        let actor = self.id;
        let mut report = ConsumerReport::default();
        tracing::info!(%actor, "Rozpoczęto konsumpcję");

        loop {
            match self.consume_once(queue, ledger).await {
                Ok(Step::Shutdown) => {
                    tracing::info!(%actor, "Otrzymano sygnał STOP");
                    break;
                }
                Ok(Step::Rejected(item)) => {
                    report.rejected += 1;
                    tracing::info!(
                        %actor,
                        "ODRZUCONO WADLIWY: {} (odrzuconych: {})",
                        item.value,
                        report.rejected,
                    );
                }
                Ok(Step::Accepted(item)) => {
                    report.accepted += 1;
                    tracing::info!(
                        %actor,
                        "Przetwarzam: {} (priorytet: {}, przetworzonych: {})",
                        item.value,
                        item.priority,
                        report.accepted,
                    );
                    tokio::time::sleep(self.pause_for(&item)).await;
                }
                Err(e) => {
                    tracing::error!(%actor, "Błąd: {e}");
                    tracing::info!(%actor, "Zakończył pracę (przetworzył: {})", report.accepted);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            %actor,
            rejected = report.rejected,
            "Zakończył pracę (przetworzył: {})",
            report.accepted,
        );
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{Consumer, ConsumerConfig, ConsumerError, Pacing, Step};
    use domain::{Item, ItemSource, Ledger, LedgerError, QueueError, QueueMessage, WorkerId};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    // ------------------------------------------------------------------
    // Test helpers
    // ------------------------------------------------------------------

    /// Pre-loaded source; fails with `Unavailable` once drained.
    struct ScriptedSource {
        messages: Mutex<VecDeque<QueueMessage>>,
    }

    impl ScriptedSource {
        fn new(messages: Vec<QueueMessage>) -> Self {
            Self { messages: Mutex::new(VecDeque::from(messages)) }
        }

        fn remaining(&self) -> usize {
            self.messages.lock().unwrap().len()
        }
    }

    impl ItemSource for ScriptedSource {
        async fn get(&self) -> Result<QueueMessage, QueueError> {
            self.messages
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(QueueError::Unavailable { reason: "script exhausted".to_owned() })
        }
    }

    fn item(value: u32) -> QueueMessage {
        QueueMessage::Item(Item::new(value, false))
    }

    fn defective(value: u32) -> QueueMessage {
        QueueMessage::Item(Item::new(value, true))
    }

    fn instant_consumer(number: u32) -> Consumer {
        let config = ConsumerConfig::builder()
            .pacing(Pacing::ByPriority { min: Duration::ZERO, max: Duration::ZERO })
            .build()
            .unwrap();
        Consumer::new(number, config)
    }

    // ------------------------------------------------------------------
    // Configuration + pacing
    // ------------------------------------------------------------------

    #[test]
    fn config_defaults_to_priority_pacing() {
        let config = ConsumerConfig::builder().build().unwrap();
        assert_eq!(
            config.pacing,
            Pacing::ByPriority {
                min: Duration::from_millis(700),
                max: Duration::from_millis(1200),
            }
        );
    }

    #[test]
    fn config_rejects_inverted_bounds() {
        let result = ConsumerConfig::builder()
            .pacing(Pacing::Uniform { min: Duration::from_secs(1), max: Duration::ZERO })
            .build();
        assert!(matches!(result, Err(ConsumerError::InvalidConfig { .. })));
    }

    #[test]
    fn priority_pacing_formula() {
        let config = ConsumerConfig::builder()
            .pacing(Pacing::ByPriority {
                min: Duration::from_millis(700),
                max: Duration::from_millis(1100),
            })
            .build()
            .unwrap();
        let consumer = Consumer::new(1, config);
        assert_eq!(consumer.pause_for(&Item::new(10, false)), Duration::from_millis(700));
        assert_eq!(consumer.pause_for(&Item::new(90, false)), Duration::from_millis(900));
    }

    #[test]
    fn uniform_pacing_stays_in_bounds() {
        let min = Duration::from_millis(10);
        let max = Duration::from_millis(20);
        let config = ConsumerConfig::builder()
            .pacing(Pacing::Uniform { min, max })
            .seed(5)
            .build()
            .unwrap();
        let consumer = Consumer::new(1, config);
        for value in 1..=100 {
            let pause = consumer.pause_for(&Item::new(value, false));
            assert!((min..=max).contains(&pause), "pause {pause:?} out of range");
        }
    }

    // ------------------------------------------------------------------
    // consume_once
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn accepted_item_is_recorded() {
        let consumer = instant_consumer(1);
        let ledger = Ledger::new(1, 1);
        let source = ScriptedSource::new(vec![item(42)]);

        let step = consumer.consume_once(&source, &ledger).await.unwrap();

        assert_eq!(step, Step::Accepted(Item::new(42, false)));
        assert_eq!(ledger.counts().consumed, 1);
        assert_eq!(ledger.worker_logs().consumers[&1], vec![42]);
    }

    #[tokio::test]
    async fn defective_item_leaves_consumed_untouched() {
        let consumer = instant_consumer(1);
        let ledger = Ledger::new(1, 1);
        let source = ScriptedSource::new(vec![defective(13)]);

        let step = consumer.consume_once(&source, &ledger).await.unwrap();

        assert_eq!(step, Step::Rejected(Item::new(13, true)));
        let counts = ledger.counts();
        assert_eq!(counts.consumed, 0);
        assert_eq!(counts.discarded, 1);
        assert!(ledger.worker_logs().consumers[&1].is_empty());
    }

    // ------------------------------------------------------------------
    // run loop
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn run_drains_items_before_its_shutdown() {
        let consumer = instant_consumer(1);
        let ledger = Ledger::new(1, 1);
        let source = ScriptedSource::new(vec![
            item(1),
            defective(2),
            item(3),
            QueueMessage::Shutdown,
            item(4),
        ]);

        let report = consumer.run(&source, &ledger).await.unwrap();

        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected, 1);
        assert_eq!(ledger.worker_logs().consumers[&1], vec![1, 3]);
        // Exactly one shutdown is consumed; later messages stay queued.
        assert_eq!(source.remaining(), 1);
    }

    #[tokio::test]
    async fn all_defective_items_are_rejected() {
        let consumer = instant_consumer(1);
        let ledger = Ledger::new(1, 1);
        let source = ScriptedSource::new(vec![
            defective(90),
            defective(5),
            defective(50),
            QueueMessage::Shutdown,
        ]);

        let report = consumer.run(&source, &ledger).await.unwrap();

        assert_eq!(report.accepted, 0);
        assert_eq!(report.rejected, 3);
        assert_eq!(ledger.counts().consumed, 0);
    }

    #[tokio::test]
    async fn read_fault_terminates_immediately() {
        let consumer = instant_consumer(1);
        let ledger = Ledger::new(1, 1);
        // No shutdown message: the source fails after two items.
        let source = ScriptedSource::new(vec![item(1), item(2)]);

        let result = consumer.run(&source, &ledger).await;

        assert!(matches!(result, Err(ConsumerError::Read(QueueError::Unavailable { .. }))));
        assert_eq!(ledger.counts().consumed, 2);
    }

    #[tokio::test]
    async fn ledger_fault_terminates_without_retry() {
        // Consumer 2 has no ledger entry in a single-consumer ledger.
        let consumer = instant_consumer(2);
        let ledger = Ledger::new(1, 1);
        let source = ScriptedSource::new(vec![item(1), item(2), QueueMessage::Shutdown]);

        let result = consumer.run(&source, &ledger).await;

        assert!(matches!(
            result,
            Err(ConsumerError::Ledger(LedgerError::UnknownWorker { worker }))
                if worker == WorkerId::consumer(2)
        ));
        // Fail-fast: the remaining messages are left untouched.
        assert_eq!(source.remaining(), 2);
    }
}
