// Rust guideline compliant 2026-10-19

//! Run lifecycle: Init, Running, DrainingProducers, WaitingForConsumption,
//! Shutdown, DrainingConsumers, Terminal.
//!
//! Workers run as tokio tasks in two `JoinSet`s, one per role. The
//! orchestrator's own loop polls them, persists monitor snapshots on the
//! configured interval, and force-aborts whatever is still alive when a
//! shutdown phase exceeds its timeout. An interrupt future raced against the
//! whole lifecycle aborts every worker and still runs the final export.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use consumer::{Consumer, ConsumerError, ConsumerReport};
use domain::{Counts, ItemSink as _, Ledger, QueueMessage, Role, WorkerId};
use logger::RunLog;
use monitor::{Monitor, StatsDocument, StatsSnapshot};
use producer::{Producer, ProducerReport};
use tokio::task::{self, JoinError, JoinSet};
use tokio::time::{Instant, sleep, sleep_until, timeout_at};

use crate::adapters::bounded_queue::BoundedQueue;
use crate::adapters::json_file_store::JsonFileStore;
use crate::config::{ConfigError, PipelineConfig};

/// Granularity of every wait loop.
const DRAIN_POLL: Duration = Duration::from_millis(100);

type Queue = BoundedQueue<QueueMessage>;
type PipelineMonitor = Monitor<Queue, JsonFileStore>;

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

/// Everything known about a finished (or interrupted) run.
#[derive(Debug)]
pub struct RunReport {
    /// The final stats document, as exported.
    pub document: StatsDocument,
    /// Ledger counters at the end of the run.
    pub counts: Counts,
    /// Messages left in the queue.
    pub queue_size: usize,
    /// Reports of producers that finished on their own, by id.
    pub producers: BTreeMap<u32, ProducerReport>,
    /// Reports of consumers that stopped on their shutdown message, by id.
    pub consumers: BTreeMap<u32, ConsumerReport>,
    /// Workers that ended on a fault or a panic.
    pub failed: Vec<WorkerId>,
    /// Workers aborted by a timeout or by the interrupt.
    pub forced: Vec<WorkerId>,
    /// `true` when the interrupt fired before the run completed.
    pub interrupted: bool,
    /// Every snapshot persisted during the run, oldest first.
    pub snapshots: Vec<StatsSnapshot>,
}

impl RunReport {
    /// Defective items dropped by consumers that finished normally.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.consumers.values().map(|r| r.rejected).sum()
    }
}

// ---------------------------------------------------------------------------
// Crew: one JoinSet per role
// ---------------------------------------------------------------------------

/// What a worker task hands back when it ends on its own.
#[derive(Debug)]
enum Exit {
    Producer(ProducerReport),
    Consumer(Result<ConsumerReport, ConsumerError>),
}

/// Live worker tasks of one role, keyed back to their worker ids.
#[derive(Debug)]
struct Crew {
    tasks: JoinSet<Exit>,
    members: HashMap<task::Id, WorkerId>,
}

impl Crew {
    fn new() -> Self {
        Self { tasks: JoinSet::new(), members: HashMap::new() }
    }

    fn spawn<F>(&mut self, worker: WorkerId, future: F)
    where
        F: Future<Output = Exit> + Send + 'static,
    {
        let handle = self.tasks.spawn(future);
        self.members.insert(handle.id(), worker);
    }

    fn len(&self) -> usize {
        self.members.len()
    }

    fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Wait for the next task to end. Cancel safe.
    async fn next(&mut self) -> Option<(WorkerId, Result<Exit, JoinError>)> {
        loop {
            let (task, joined) = match self.tasks.join_next_with_id().await? {
                Ok((task, exit)) => (task, Ok(exit)),
                Err(e) => (e.id(), Err(e)),
            };
            if let Some(worker) = self.members.remove(&task) {
                return Some((worker, joined));
            }
        }
    }

    /// Abort every remaining task and return their ids; call [`Self::unwind`] next.
    fn abort_all(&mut self) -> Vec<WorkerId> {
        self.tasks.abort_all();
        let mut aborted: Vec<WorkerId> = self.members.drain().map(|(_, worker)| worker).collect();
        aborted.sort_unstable();
        aborted
    }

    /// Wait for aborted tasks to finish unwinding.
    async fn unwind(&mut self) {
        self.tasks.shutdown().await;
    }
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Running,
    DrainingProducers,
    WaitingForConsumption,
    Shutdown,
    DrainingConsumers,
    Terminal,
}

fn enter(phase: Phase) {
    tracing::debug!(?phase, "orchestrator.phase");
}

#[derive(Debug)]
enum Event {
    Exited(WorkerId, Result<Exit, JoinError>),
    Tick,
    Deadline,
}

/// Mutable state of one run, shared by every phase.
#[derive(Debug)]
struct Run {
    queue: Arc<Queue>,
    ledger: Arc<Ledger>,
    producers: Crew,
    consumers: Crew,
    producer_reports: BTreeMap<u32, ProducerReport>,
    consumer_reports: BTreeMap<u32, ConsumerReport>,
    failed: Vec<WorkerId>,
    forced: Vec<WorkerId>,
    last_persist: Instant,
}

impl Run {
    fn new(queue: Arc<Queue>, ledger: Arc<Ledger>) -> Self {
        Self {
            queue,
            ledger,
            producers: Crew::new(),
            consumers: Crew::new(),
            producer_reports: BTreeMap::new(),
            consumer_reports: BTreeMap::new(),
            failed: vec![],
            forced: vec![],
            last_persist: Instant::now(),
        }
    }

    fn spawn_producer(&mut self, producer: Producer, log: &RunLog) {
        let worker = producer.id();
        let queue = Arc::clone(&self.queue);
        let ledger = Arc::clone(&self.ledger);
        self.producers.spawn(
            worker,
            log.attach(async move { Exit::Producer(producer.run(queue.as_ref(), &ledger).await) }),
        );
        tracing::info!("Uruchomiono {worker}");
    }

    fn spawn_consumer(&mut self, consumer: Consumer, log: &RunLog) {
        let worker = consumer.id();
        let queue = Arc::clone(&self.queue);
        let ledger = Arc::clone(&self.ledger);
        self.consumers.spawn(
            worker,
            log.attach(async move { Exit::Consumer(consumer.run(queue.as_ref(), &ledger).await) }),
        );
        tracing::info!("Uruchomiono {worker}");
    }

    /// Wait for a worker to end, the poll interval, or `deadline`.
    async fn next_event(&mut self, deadline: Option<Instant>) -> Event {
        let producers_live = !self.producers.is_empty();
        let consumers_live = !self.consumers.is_empty();
        let deadline = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            Some((worker, joined)) = self.producers.next(), if producers_live => {
                Event::Exited(worker, joined)
            }
            Some((worker, joined)) = self.consumers.next(), if consumers_live => {
                Event::Exited(worker, joined)
            }
            () = sleep(DRAIN_POLL) => Event::Tick,
            () = deadline => Event::Deadline,
        }
    }

    fn settle(&mut self, worker: WorkerId, joined: Result<Exit, JoinError>) {
        match joined {
            Ok(Exit::Producer(report)) => {
                self.producer_reports.insert(worker.number, report);
            }
            Ok(Exit::Consumer(Ok(report))) => {
                self.consumer_reports.insert(worker.number, report);
            }
            Ok(Exit::Consumer(Err(_))) => {
                tracing::warn!(actor = %worker, "Zakończył pracę z powodu błędu");
                self.failed.push(worker);
            }
            Err(e) if e.is_panic() => {
                tracing::error!(actor = %worker, "Zadanie zakończone paniką");
                self.failed.push(worker);
            }
            Err(_) => self.forced.push(worker),
        }
    }

    async fn abort(&mut self, role: Role, message: &str) {
        let crew = match role {
            Role::Producer => &mut self.producers,
            Role::Consumer => &mut self.consumers,
        };
        for worker in crew.abort_all() {
            tracing::warn!(actor = %worker, "{message}");
            self.forced.push(worker);
        }
        crew.unwind().await;
    }

    async fn persist(&mut self, monitor: &PipelineMonitor) {
        monitor.persist_snapshot().await;
        self.last_persist = Instant::now();
    }

    async fn persist_if_due(&mut self, monitor: &PipelineMonitor, interval: Duration) {
        if self.last_persist.elapsed() >= interval {
            self.persist(monitor).await;
        }
    }

    /// Phases DrainingProducers through DrainingConsumers.
    async fn drive(
        &mut self,
        monitor: &PipelineMonitor,
        timeout: Duration,
        interval: Duration,
    ) -> anyhow::Result<()> {
        self.persist(monitor).await;

        enter(Phase::DrainingProducers);
        let deadline = Instant::now() + timeout;
        while !self.producers.is_empty() {
            match self.next_event(Some(deadline)).await {
                Event::Exited(worker, joined) => self.settle(worker, joined),
                Event::Tick => {}
                Event::Deadline => {
                    self.abort(Role::Producer, "Nie zakończył pracy w wyznaczonym czasie - wymuszone zakończenie")
                        .await;
                }
            }
            self.persist_if_due(monitor, interval).await;
        }
        tracing::info!("Wszyscy producenci zakończyli pracę");

        enter(Phase::WaitingForConsumption);
        loop {
            let counts = self.ledger.counts();
            if counts.is_settled() {
                break;
            }
            if self.consumers.is_empty() {
                tracing::warn!(
                    produced = counts.produced,
                    consumed = counts.consumed,
                    discarded = counts.discarded,
                    "Brak aktywnych konsumentów - pozostałe elementy nie zostaną przetworzone"
                );
                break;
            }
            if let Event::Exited(worker, joined) = self.next_event(None).await {
                self.settle(worker, joined);
            }
            self.persist_if_due(monitor, interval).await;
        }

        enter(Phase::Shutdown);
        let deadline = Instant::now() + timeout;
        let live = self.consumers.len();
        tracing::info!("Wysyłanie sygnałów STOP do konsumentów: {live}");
        for sent in 0..live {
            match timeout_at(deadline, self.queue.put(QueueMessage::Shutdown)).await {
                Ok(result) => result.context("failed to enqueue shutdown message")?,
                Err(_) => {
                    tracing::warn!("Nie wysłano wszystkich sygnałów STOP w wyznaczonym czasie ({sent}/{live})");
                    break;
                }
            }
        }

        enter(Phase::DrainingConsumers);
        while !self.consumers.is_empty() {
            match self.next_event(Some(deadline)).await {
                Event::Exited(worker, joined) => self.settle(worker, joined),
                Event::Tick => {}
                Event::Deadline => {
                    self.abort(Role::Consumer, "Nie zakończył pracy w wyznaczonym czasie - wymuszone zakończenie")
                        .await;
                }
            }
            self.persist_if_due(monitor, interval).await;
        }
        tracing::info!("Wszyscy konsumenci zakończyli pracę");
        Ok(())
    }

    async fn abort_everything(&mut self) {
        self.abort(Role::Producer, "Przerwano pracę").await;
        self.abort(Role::Consumer, "Przerwano pracę").await;
        self.queue.close();
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Owns the configuration and the run log, and drives one run.
#[derive(Debug)]
pub struct Orchestrator {
    config: PipelineConfig,
    log: RunLog,
}

impl Orchestrator {
    /// Prepare a run; nothing starts until [`run`](Self::run).
    #[must_use]
    pub fn new(config: PipelineConfig, log: RunLog) -> Self {
        Self { config, log }
    }

    /// Execute the whole lifecycle, logging through this orchestrator's run log.
    ///
    /// When `interrupt` completes first, every live worker is aborted and the
    /// final export still runs; the report then has `interrupted` set.
    /// Timeouts and worker faults are reported in the [`RunReport`], not as
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid (before anything
    /// starts) or when a shutdown message cannot be enqueued. In the latter
    /// case all workers are aborted first.
    pub async fn run<I>(&self, interrupt: I) -> anyhow::Result<RunReport>
    where
        I: Future<Output = ()>,
    {
        self.log.attach(self.execute(interrupt)).await
    }

    fn announce(&self) {
        let config = &self.config;
        let rule = "=".repeat(60);
        tracing::info!("{rule}");
        tracing::info!("Uruchamianie systemu producent-konsument");
        tracing::info!("Producenci: {}, Konsumenci: {}", config.producers, config.consumers);
        tracing::info!("Elementy per producent: {}", config.items_per_producer);
        tracing::info!("Rozmiar kolejki: {}", config.queue_capacity);
        tracing::info!("{rule}");
    }

    async fn execute<I>(&self, interrupt: I) -> anyhow::Result<RunReport>
    where
        I: Future<Output = ()>,
    {
        let config = &self.config;
        config.validate().context("invalid configuration")?;
        let timeout = config.shutdown_timeout()?;
        let interval = config.monitor_interval()?;
        let producers = (1..=config.producers)
            .map(|n| Ok(Producer::new(n, config.producer_config(n)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let consumers = (1..=config.consumers)
            .map(|n| Ok(Consumer::new(n, config.consumer_config(n)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        enter(Phase::Init);
        self.announce();
        let queue = Arc::new(BoundedQueue::new(config.queue_capacity));
        let ledger = Arc::new(Ledger::new(config.producers, config.consumers));
        let monitor = Monitor::new(
            Arc::clone(&ledger),
            Arc::clone(&queue),
            JsonFileStore::new(&config.stats_file),
        )
        .with_export(config.export_stats);
        tracing::info!("Monitor uruchomiony ({})", monitor.store().path().display());

        enter(Phase::Running);
        let mut run = Run::new(queue, ledger);
        for producer in producers {
            run.spawn_producer(producer, &self.log);
        }
        for consumer in consumers {
            run.spawn_consumer(consumer, &self.log);
        }

        let outcome = tokio::select! {
            result = run.drive(&monitor, timeout, interval) => Some(result),
            () = interrupt => None,
        };
        let interrupted = match outcome {
            Some(Ok(())) => false,
            Some(Err(e)) => {
                tracing::error!("Błąd krytyczny: {e:#}");
                run.abort_everything().await;
                return Err(e);
            }
            None => {
                tracing::warn!("Otrzymano sygnał przerwania");
                tracing::info!("Zamykanie systemu...");
                run.abort_everything().await;
                true
            }
        };

        enter(Phase::Terminal);
        let queue_size = run.queue.len();
        if !run.queue.is_empty() {
            tracing::warn!("W kolejce pozostały elementy: {queue_size}");
        }
        let document = monitor.final_export(&run.ledger.worker_logs()).await;
        Ok(RunReport {
            document,
            counts: run.ledger.counts(),
            queue_size,
            producers: run.producer_reports,
            consumers: run.consumer_reports,
            failed: run.failed,
            forced: run.forced,
            interrupted,
            snapshots: monitor.history(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{Exit, Orchestrator, Run, RunReport};
    use crate::adapters::bounded_queue::BoundedQueue;
    use crate::config::{PipelineConfig, SleepRange};
    use domain::{Ledger, Role, WorkerId};
    use logger::RunLog;
    use std::io;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tracing::level_filters::LevelFilter;

    // ------------------------------------------------------------------
    // Test helpers
    // ------------------------------------------------------------------

    /// Fast, seeded configuration writing its stats file into `dir`.
    fn quick(dir: &Path, producers: u32, consumers: u32, items: u64, capacity: usize) -> PipelineConfig {
        PipelineConfig {
            queue_capacity: capacity,
            producers,
            consumers,
            items_per_producer: items,
            producer_sleep: SleepRange::new(0.0, 0.002),
            consumer_sleep: SleepRange::new(0.0, 0.002),
            shutdown_timeout_secs: 5.0,
            monitor_interval_secs: 0.01,
            stats_file: dir.join("stats.json"),
            log_to_file: false,
            log_to_console: false,
            seed: Some(7),
            ..PipelineConfig::default()
        }
    }

    async fn run(config: PipelineConfig) -> RunReport {
        Orchestrator::new(config, RunLog::disabled())
            .run(std::future::pending())
            .await
            .unwrap()
    }

    fn read_stats(dir: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(dir.join("stats.json")).unwrap()).unwrap()
    }

    fn flatten(records: &[monitor::WorkerRecord]) -> Vec<u32> {
        let mut all: Vec<u32> = records.iter().flat_map(|r| r.items.iter().copied()).collect();
        all.sort_unstable();
        all
    }

    /// Shared in-memory sink for captured run-log lines.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn assert_snapshot_invariants(report: &RunReport, capacity: usize) {
        assert!(!report.snapshots.is_empty());
        for snapshot in &report.snapshots {
            assert!(snapshot.consumed <= snapshot.produced, "{snapshot:?}");
            assert_eq!(snapshot.queue_capacity, capacity);
            assert!(snapshot.queue_size <= snapshot.queue_capacity, "{snapshot:?}");
        }
    }

    // ------------------------------------------------------------------
    // Scenarios
    // ------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn single_pair_moves_every_item() {
        let dir = tempfile::tempdir().unwrap();
        let report = run(quick(dir.path(), 1, 1, 5, 5)).await;

        assert_eq!(report.counts.produced, 5);
        assert_eq!(report.counts.consumed, 5);
        assert_eq!(report.rejected(), 0);
        assert_eq!(report.queue_size, 0);
        assert!(report.forced.is_empty());
        assert!(!report.interrupted);
        assert!((report.document.statistics.efficiency_percent - 100.0).abs() < f64::EPSILON);
        assert_snapshot_invariants(&report, 5);

        let json = read_stats(dir.path());
        assert_eq!(json["statistics"]["total_produced"], 5);
        assert_eq!(json["producers"][0]["count"], 5);
        assert_eq!(json["consumers"][0]["count"], 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn all_defective_items_are_rejected_and_run_still_ends() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quick(dir.path(), 1, 1, 3, 5);
        config.defect_rate = 1.0;

        let report = run(config).await;

        assert_eq!(report.counts.produced, 3);
        assert_eq!(report.counts.consumed, 0);
        assert_eq!(report.counts.discarded, 3);
        assert_eq!(report.consumers[&1].rejected, 3);
        assert_eq!(report.producers[&1].defective, 3);
        assert!(report.document.statistics.efficiency_percent.abs() < f64::EPSILON);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn single_slot_queue_loses_and_duplicates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quick(dir.path(), 2, 1, 2, 1);
        config.producer_sleep = SleepRange::new(0.005, 0.01);
        config.defect_rates.insert(2, 0.5);

        let report = run(config).await;

        let produced = flatten(&report.document.producers);
        let consumed = flatten(&report.document.consumers);
        assert_eq!(produced.len(), 4);
        let defective: u64 = report.producers.values().map(|r| r.defective).sum();
        assert_eq!(consumed.len() as u64, 4 - defective);
        assert_eq!(report.rejected(), defective);
        for value in &consumed {
            assert!(produced.contains(value));
        }
        assert_snapshot_invariants(&report, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn zero_items_exports_empty_worker_logs() {
        let dir = tempfile::tempdir().unwrap();
        let report = run(quick(dir.path(), 2, 2, 0, 3)).await;

        assert_eq!(report.counts.produced, 0);
        assert!(report.document.statistics.efficiency_percent.abs() < f64::EPSILON);
        let json = read_stats(dir.path());
        assert_eq!(json["producers"].as_array().unwrap().len(), 2);
        for side in ["producers", "consumers"] {
            for record in json[side].as_array().unwrap() {
                assert_eq!(record["count"], 0);
                assert_eq!(record["items"].as_array().unwrap().len(), 0);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn every_consumer_stops_on_exactly_one_shutdown_message() {
        let dir = tempfile::tempdir().unwrap();
        let report = run(quick(dir.path(), 2, 3, 4, 2)).await;

        assert_eq!(report.consumers.len(), 3);
        assert!(report.failed.is_empty());
        assert_eq!(report.queue_size, 0, "no shutdown message may be left over");
        let accepted: u64 = report.consumers.values().map(|r| r.accepted).sum();
        assert_eq!(accepted, report.counts.consumed);
        assert_eq!(report.counts.consumed, 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn no_producers_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        let report = run(quick(dir.path(), 0, 2, 5, 2)).await;

        assert_eq!(report.counts.produced, 0);
        assert_eq!(report.consumers.len(), 2);
        assert!(report.document.producers.is_empty());
    }

    // ------------------------------------------------------------------
    // Timeouts, interrupt, configuration
    // ------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stuck_workers_are_forced_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quick(dir.path(), 2, 1, 2, 1);
        config.priority_pacing = false;
        config.consumer_sleep = SleepRange::new(0.3, 0.3);
        config.shutdown_timeout_secs = 0.05;

        let report = run(config).await;

        assert!(report.forced.iter().any(|w| w.role == Role::Producer), "{:?}", report.forced);
        assert!(report.counts.is_settled(), "{:?}", report.counts);
        assert!(report.counts.consumed <= report.counts.produced);
        assert!(!report.interrupted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn forced_producer_exports_only_enqueued_items() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quick(dir.path(), 1, 1, 5, 1);
        config.priority_pacing = false;
        config.consumer_sleep = SleepRange::new(0.3, 0.3);
        config.shutdown_timeout_secs = 0.5;

        let report = run(config).await;

        assert_eq!(report.forced, vec![WorkerId::producer(1)]);
        let produced = &report.document.producers[0].items;
        let accounted = report.counts.consumed + report.rejected() + report.queue_size as u64;
        assert_eq!(produced.len() as u64, accounted, "{report:?}");
        assert_eq!(report.counts.produced, report.counts.consumed);
        assert_eq!(produced, &report.document.consumers[0].items);
        assert!((report.document.statistics.efficiency_percent - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn aborted_workers_are_recorded_before_unwinding_finishes() {
        let mut run = Run::new(Arc::new(BoundedQueue::new(1)), Arc::new(Ledger::new(1, 1)));
        run.producers.spawn(WorkerId::producer(1), std::future::pending::<Exit>());

        let finished = tokio::select! {
            biased;
            () = run.abort(Role::Producer, "stop") => true,
            () = std::future::ready(()) => false,
        };

        assert!(!finished, "the aborted task cannot have unwound yet");
        assert_eq!(run.forced, vec![WorkerId::producer(1)]);
        run.abort_everything().await;
        assert_eq!(run.forced, vec![WorkerId::producer(1)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn interrupt_aborts_workers_and_still_exports() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quick(dir.path(), 2, 1, 50, 2);
        config.priority_pacing = false;
        config.consumer_sleep = SleepRange::new(0.5, 0.5);

        let report = Orchestrator::new(config, RunLog::disabled())
            .run(tokio::time::sleep(Duration::from_millis(100)))
            .await
            .unwrap();

        assert!(report.interrupted);
        assert!(report.forced.len() >= 2, "{:?}", report.forced);
        assert!(report.counts.produced < 100);
        let json = read_stats(dir.path());
        assert_eq!(json["statistics"]["total_produced"], report.counts.produced);
    }

    #[tokio::test]
    async fn invalid_configuration_fails_before_starting() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig { queue_capacity: 0, ..quick(dir.path(), 1, 1, 1, 1) };

        let result = Orchestrator::new(config, RunLog::disabled()).run(std::future::pending()).await;

        assert!(result.is_err());
        assert!(!dir.path().join("stats.json").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn disabled_export_keeps_interim_snapshots_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quick(dir.path(), 1, 1, 2, 2);
        config.export_stats = false;

        let report = run(config).await;

        assert_eq!(report.document.producers[0].count, 2);
        let json = read_stats(dir.path());
        assert_eq!(json["producers"].as_array().unwrap().len(), 0, "final export must be skipped");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_log_carries_worker_and_system_lines() {
        let dir = tempfile::tempdir().unwrap();
        let capture = Capture::default();
        let sink = capture.clone();
        let log = RunLog::with_writer(LevelFilter::INFO, move || sink.clone());

        Orchestrator::new(quick(dir.path(), 1, 1, 2, 2), log)
            .run(std::future::pending())
            .await
            .unwrap();

        let text = capture.text();
        assert!(text.contains("[INFO  SYSTEM] Uruchamianie systemu producent-konsument"), "{text}");
        assert!(text.contains("[INFO  PRODUCENT 1] Wyprodukowano: "), "{text}");
        assert!(text.contains("[INFO  KONSUMENT 1] Przetwarzam: "), "{text}");
        assert!(text.contains("Wszyscy konsumenci zakończyli pracę"), "{text}");
        assert!(!text.contains("orchestrator.phase"), "debug lines must be filtered at INFO");
    }
}
