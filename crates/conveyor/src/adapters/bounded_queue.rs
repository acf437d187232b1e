// Rust guideline compliant 2026-10-19

//! Fixed-capacity FIFO adapter for the `ItemSink`, `ItemSource` and
//! `QueueProbe` ports.
//!
//! Two counting semaphores gate the ring: `slots` starts at the capacity and
//! is taken by `put`, `items` starts at zero and is taken by `get`. Each side
//! hands its permit to the other after touching the deque, so a producer
//! suspends while the queue is full and a consumer suspends while it is empty.
//! The deque lock is never held across an await point.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use domain::{ItemSink, ItemSource, QueueError, QueueMessage, QueueProbe};
use tokio::sync::Semaphore;

// ---------------------------------------------------------------------------
// BoundedQueue
// ---------------------------------------------------------------------------

/// Multi-producer multi-consumer FIFO holding at most `capacity` entries.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    entries: Mutex<VecDeque<T>>,
    slots: Semaphore,
    items: Semaphore,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create an empty queue able to hold `capacity` entries.
    ///
    /// A zero capacity is rejected by configuration validation before a queue
    /// is ever built; here it yields a queue on which every `put` waits.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            slots: Semaphore::new(capacity),
            items: Semaphore::new(0),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `entry` at the tail, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Unavailable`] if the queue has been closed.
    pub async fn push(&self, entry: T) -> Result<(), QueueError> {
        self.push_with(entry, || Ok(())).await
    }

    /// Append `entry` once `record` succeeds, both under the deque lock.
    ///
    /// The only suspension point is the wait for a free slot. If `record`
    /// fails, the slot is released and nothing is queued.
    ///
    /// # Errors
    ///
    /// Returns the error of `record`, or [`QueueError::Unavailable`] if the
    /// queue has been closed.
    pub async fn push_with<F, E>(&self, entry: T, record: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<(), E>,
        E: From<QueueError>,
    {
        let permit = self.slots.acquire().await.map_err(|e| unavailable(&e))?;
        {
            let mut entries = self.lock();
            record()?;
            entries.push_back(entry);
        }
        permit.forget();
        self.items.add_permits(1);
        Ok(())
    }

    /// Remove the head entry, waiting while the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Unavailable`] if the queue has been closed.
    pub async fn pop(&self) -> Result<T, QueueError> {
        let permit = self.items.acquire().await.map_err(|e| unavailable(&e))?;
        permit.forget();
        let entry = self.lock().pop_front();
        self.slots.add_permits(1);
        entry.ok_or_else(|| QueueError::Unavailable { reason: "queue state out of sync".to_owned() })
    }

    /// Wake every waiter with an error; later calls fail immediately.
    ///
    /// Entries still queued are kept and remain visible through [`Self::len`].
    pub fn close(&self) {
        self.slots.close();
        self.items.close();
    }

    /// Current number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// `true` when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn unavailable(error: &tokio::sync::AcquireError) -> QueueError {
    QueueError::Unavailable { reason: error.to_string() }
}

impl ItemSink for BoundedQueue<QueueMessage> {
    async fn put(&self, message: QueueMessage) -> Result<(), QueueError> {
        self.push(message).await
    }

    async fn put_recorded<F, E>(&self, message: QueueMessage, record: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<(), E>,
        E: From<QueueError>,
    {
        self.push_with(message, record).await
    }
}

impl ItemSource for BoundedQueue<QueueMessage> {
    async fn get(&self) -> Result<QueueMessage, QueueError> {
        self.pop().await
    }
}

impl QueueProbe for BoundedQueue<QueueMessage> {
    fn size(&self) -> usize {
        self.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::BoundedQueue;
    use domain::{Item, ItemSink as _, ItemSource as _, QueueError, QueueMessage, QueueProbe as _};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const SHORT: Duration = Duration::from_millis(30);

    fn item(value: u32) -> QueueMessage {
        QueueMessage::Item(Item::new(value, false))
    }

    #[tokio::test]
    async fn entries_come_out_in_insertion_order() {
        let queue = BoundedQueue::new(3);
        for v in [90, 10, 55] {
            queue.put(item(v)).await.unwrap();
        }

        let mut out = vec![];
        for _ in 0..3 {
            if let QueueMessage::Item(i) = queue.get().await.unwrap() {
                out.push(i.value);
            }
        }
        assert_eq!(out, vec![90, 10, 55], "priority must not reorder the queue");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn size_and_capacity_are_reported() {
        let queue = BoundedQueue::new(4);
        queue.put(item(1)).await.unwrap();
        queue.put(QueueMessage::Shutdown).await.unwrap();

        assert_eq!(queue.size(), 2);
        assert_eq!(queue.capacity(), 4);
    }

    #[tokio::test]
    async fn put_waits_while_full() {
        let queue = BoundedQueue::new(1);
        queue.put(item(1)).await.unwrap();

        assert!(timeout(SHORT, queue.put(item(2))).await.is_err(), "second put must block");
        assert_eq!(queue.size(), 1);
    }

    #[tokio::test]
    async fn get_waits_while_empty() {
        let queue: BoundedQueue<QueueMessage> = BoundedQueue::new(2);

        assert!(timeout(SHORT, queue.get()).await.is_err(), "get on empty queue must block");
    }

    #[tokio::test]
    async fn blocked_put_resumes_after_get() {
        let queue = Arc::new(BoundedQueue::new(1));
        queue.put(item(1)).await.unwrap();

        let writer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.put(item(2)).await })
        };
        tokio::time::sleep(SHORT).await;
        assert!(!writer.is_finished());

        assert_eq!(queue.get().await.unwrap(), item(1));
        writer.await.unwrap().unwrap();
        assert_eq!(queue.get().await.unwrap(), item(2));
    }

    #[tokio::test]
    async fn failed_record_queues_nothing_and_frees_the_slot() {
        let queue = BoundedQueue::new(1);

        let refused: Result<(), QueueError> = queue
            .put_recorded(item(1), || Err(QueueError::Unavailable { reason: "no entry".to_owned() }))
            .await;

        assert!(refused.is_err());
        assert!(queue.is_empty());
        queue.put_recorded(item(2), || Ok::<(), QueueError>(())).await.unwrap();
        assert_eq!(queue.get().await.unwrap(), item(2));
    }

    #[tokio::test]
    async fn cancelled_put_runs_no_record() {
        let queue = BoundedQueue::new(1);
        queue.put(item(1)).await.unwrap();
        let recorded = std::cell::Cell::new(false);

        let waited = timeout(
            SHORT,
            queue.put_recorded(item(2), || {
                recorded.set(true);
                Ok::<(), QueueError>(())
            }),
        )
        .await;

        assert!(waited.is_err(), "put into a full queue must block");
        assert!(!recorded.get());
        assert_eq!(queue.size(), 1);
    }

    #[tokio::test]
    async fn close_wakes_waiting_reader() {
        let queue: Arc<BoundedQueue<QueueMessage>> = Arc::new(BoundedQueue::new(1));
        let reader = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.get().await })
        };
        tokio::time::sleep(SHORT).await;

        queue.close();

        let result = reader.await.unwrap();
        assert!(matches!(result, Err(QueueError::Unavailable { .. })));
        assert!(queue.put(item(3)).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn size_never_exceeds_capacity_under_contention() {
        let queue = Arc::new(BoundedQueue::new(3));
        let mut tasks = tokio::task::JoinSet::new();
        for p in 0..4_u32 {
            let queue = Arc::clone(&queue);
            tasks.spawn(async move {
                for v in 0..50 {
                    queue.put(item(p * 100 + v)).await.unwrap();
                    assert!(queue.size() <= 3);
                }
            });
        }

        let mut received = 0;
        while received < 200 {
            queue.get().await.unwrap();
            assert!(queue.size() <= 3);
            received += 1;
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }
        assert!(queue.is_empty());
    }
}
