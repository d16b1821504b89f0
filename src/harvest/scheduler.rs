//! Priority scheduler for the job graph
//!
//! This module handles:
//! - Priority queue management for pending jobs
//! - A fixed pool of worker tasks draining the queue
//! - Deduplication of submissions through the claim index
//! - Drain detection via a counted submitted-minus-completed barrier
//!
//! Jobs are discovered dynamically: a running job may submit further jobs
//! from its worker. The queue and the claim index therefore carry their own
//! synchronization, independent of the pool's execution loop. Priority is a
//! soft hint under concurrency; the only guarantee is that the queue always
//! offers the lowest available priority value next.

use crate::dedup::DedupIndex;
use crate::HarvestError;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;

/// The boxed action a worker executes for one job
pub type JobAction = Pin<Box<dyn Future<Output = Result<(), HarvestError>> + Send>>;

/// A unit of work: deterministic key, priority, and an executable action
///
/// Once submitted, the scheduler exclusively owns the job until it
/// completes. Action failures are logged by the worker, never escalated.
pub struct Job {
    pub key: String,
    pub priority: u32,
    pub action: JobAction,
}

impl Job {
    /// Creates a job from any sendable future
    pub fn new(
        key: impl Into<String>,
        priority: u32,
        action: impl Future<Output = Result<(), HarvestError>> + Send + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            priority,
            action: Box::pin(action),
        }
    }
}

/// A job inside the queue, with its submission sequence number
struct QueuedJob {
    priority: u32,
    seq: u64,
    job: Job,
}

// Lower priority values are served first; ties go to the earlier
// submission. The reversed comparison turns the max-heap into a min-queue.
impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedJob {}

/// Counters for one scheduler's lifetime
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerStats {
    /// Jobs accepted into the queue
    pub submitted: u64,
    /// Jobs whose action finished (successfully or not)
    pub completed: u64,
    /// Submissions dropped because their key was already claimed
    pub duplicates: u64,
}

struct QueueState {
    heap: BinaryHeap<QueuedJob>,
    next_seq: u64,
}

struct Shared {
    queue: Mutex<QueueState>,
    /// One permit per queued job; workers block here when the queue is empty.
    items: Semaphore,
    dedup: DedupIndex,
    /// Jobs submitted but not yet completed (queued plus executing).
    pending: watch::Sender<usize>,
    submitted: AtomicU64,
    completed: AtomicU64,
    duplicates: AtomicU64,
}

/// Bounded pool of workers draining a priority-ordered job queue
///
/// Workers pop the lowest-priority entry, execute its action, and signal
/// completion to the drain barrier. The scheduler is reusable: submitting
/// after a drain and draining again works.
pub struct PriorityScheduler {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl PriorityScheduler {
    /// Creates a scheduler and spawns its worker pool
    ///
    /// Must be called from within a tokio runtime. The pool size is fixed
    /// for the scheduler's lifetime.
    pub fn new(workers: usize) -> Self {
        let (pending, _) = watch::channel(0usize);
        let shared = Arc::new(Shared {
            queue: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_seq: 0,
            }),
            items: Semaphore::new(0),
            dedup: DedupIndex::new(),
            pending,
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
        });

        let handles = (0..workers)
            .map(|worker_id| {
                let shared = Arc::clone(&shared);
                tokio::spawn(worker_loop(worker_id, shared))
            })
            .collect();

        Self {
            shared,
            workers: handles,
        }
    }

    /// Submits a job, gated through the deduplication index
    ///
    /// The first submission for a key is accepted; every later one is
    /// silently dropped. The pending counter is raised before the job
    /// becomes visible to workers, so a drain cannot slip through between
    /// acceptance and enqueueing.
    pub fn submit(&self, job: Job) {
        if !self.shared.dedup.try_claim(&job.key) {
            tracing::debug!(key = %job.key, "duplicate submission dropped");
            self.shared.duplicates.fetch_add(1, AtomicOrdering::Relaxed);
            return;
        }

        self.shared.pending.send_modify(|pending| *pending += 1);
        self.shared.submitted.fetch_add(1, AtomicOrdering::Relaxed);

        {
            let mut queue = self.shared.queue.lock().unwrap();
            let seq = queue.next_seq;
            queue.next_seq += 1;
            tracing::debug!(key = %job.key, priority = job.priority, "job queued");
            queue.heap.push(QueuedJob {
                priority: job.priority,
                seq,
                job,
            });
        }

        self.shared.items.add_permits(1);
    }

    /// Blocks until the queue is empty and no job is executing
    ///
    /// The barrier is the pending counter (submitted minus completed)
    /// reaching zero; jobs spawned dynamically during execution extend the
    /// wait. Returns immediately if nothing is pending.
    pub async fn await_drain(&self) {
        let mut rx = self.shared.pending.subscribe();
        // The sender lives inside the scheduler, so the channel cannot close
        // while we hold &self.
        let _ = rx.wait_for(|pending| *pending == 0).await;
    }

    /// Returns the scheduler's lifetime counters
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.shared.submitted.load(AtomicOrdering::Relaxed),
            completed: self.shared.completed.load(AtomicOrdering::Relaxed),
            duplicates: self.shared.duplicates.load(AtomicOrdering::Relaxed),
        }
    }

    /// Returns the number of jobs waiting in the queue
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().unwrap().heap.len()
    }
}

impl Drop for PriorityScheduler {
    fn drop(&mut self) {
        for handle in &self.workers {
            handle.abort();
        }
    }
}

/// One worker: block for an item, pop the lowest priority, execute, signal
async fn worker_loop(worker_id: usize, shared: Arc<Shared>) {
    loop {
        let permit = match shared.items.acquire().await {
            Ok(permit) => permit,
            // Closed semaphore means the scheduler is shutting down.
            Err(_) => return,
        };
        permit.forget();

        let queued = shared.queue.lock().unwrap().heap.pop();
        let Some(queued) = queued else { continue };

        let key = queued.job.key;
        tracing::debug!(worker = worker_id, key = %key, priority = queued.priority, "job start");

        if let Err(error) = queued.job.action.await {
            tracing::warn!(worker = worker_id, key = %key, %error, "job failed");
        }

        shared.completed.fetch_add(1, AtomicOrdering::Relaxed);
        shared.pending.send_modify(|pending| *pending -= 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn recording_job(
        key: &str,
        priority: u32,
        log: &Arc<StdMutex<Vec<u32>>>,
    ) -> Job {
        let log = Arc::clone(log);
        Job::new(key, priority, async move {
            log.lock().unwrap().push(priority);
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_priority_order_with_single_worker() {
        let scheduler = PriorityScheduler::new(1);
        let log = Arc::new(StdMutex::new(Vec::new()));

        // Submitted before the worker gets to run on the current-thread
        // test runtime, so the queue decides the order.
        scheduler.submit(recording_job("a", 50, &log));
        scheduler.submit(recording_job("b", 10, &log));
        scheduler.submit(recording_job("c", 30, &log));

        scheduler.await_drain().await;
        assert_eq!(*log.lock().unwrap(), vec![10, 30, 50]);
    }

    #[tokio::test]
    async fn test_equal_priorities_run_in_submission_order() {
        let scheduler = PriorityScheduler::new(1);
        let log = Arc::new(StdMutex::new(Vec::new()));
        for (i, key) in ["x", "y", "z"].iter().enumerate() {
            let log = Arc::clone(&log);
            scheduler.submit(Job::new(*key, 20, async move {
                log.lock().unwrap().push(i as u32);
                Ok(())
            }));
        }

        scheduler.await_drain().await;
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_await_drain_with_nothing_pending_returns() {
        let scheduler = PriorityScheduler::new(2);
        scheduler.await_drain().await;
        assert_eq!(scheduler.stats().submitted, 0);
    }

    #[tokio::test]
    async fn test_scheduler_is_reusable_after_drain() {
        let scheduler = PriorityScheduler::new(2);
        let log = Arc::new(StdMutex::new(Vec::new()));

        scheduler.submit(recording_job("first", 1, &log));
        scheduler.await_drain().await;
        assert_eq!(log.lock().unwrap().len(), 1);

        scheduler.submit(recording_job("second", 1, &log));
        scheduler.await_drain().await;
        assert_eq!(log.lock().unwrap().len(), 2);
        assert_eq!(scheduler.stats().completed, 2);
    }

    #[tokio::test]
    async fn test_duplicate_keys_execute_once() {
        let scheduler = PriorityScheduler::new(4);
        let log = Arc::new(StdMutex::new(Vec::new()));

        for _ in 0..5 {
            scheduler.submit(recording_job("same-key", 10, &log));
        }

        scheduler.await_drain().await;
        assert_eq!(log.lock().unwrap().len(), 1);

        let stats = scheduler.stats();
        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.duplicates, 4);
    }

    #[tokio::test]
    async fn test_jobs_spawned_mid_execution_extend_the_drain() {
        let scheduler = Arc::new(PriorityScheduler::new(3));
        let log = Arc::new(StdMutex::new(Vec::new()));

        let children: Vec<Job> = (0..3)
            .map(|i| recording_job(&format!("child-{}", i), 5, &log))
            .collect();

        let inner = Arc::clone(&scheduler);
        scheduler.submit(Job::new("parent", 1, async move {
            for child in children {
                inner.submit(child);
            }
            Ok(())
        }));

        scheduler.await_drain().await;
        assert_eq!(log.lock().unwrap().len(), 3);
        assert_eq!(scheduler.stats().completed, 4);
        assert_eq!(scheduler.queued(), 0);
    }

    #[tokio::test]
    async fn test_failing_job_does_not_stop_the_drain() {
        let scheduler = PriorityScheduler::new(2);
        let log = Arc::new(StdMutex::new(Vec::new()));

        scheduler.submit(Job::new("broken", 1, async {
            Err(HarvestError::Bootstrap("boom".to_string()))
        }));
        scheduler.submit(recording_job("healthy", 2, &log));

        scheduler.await_drain().await;
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(scheduler.stats().completed, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_discovery_of_one_key_executes_once() {
        let scheduler = Arc::new(PriorityScheduler::new(4));
        let log = Arc::new(StdMutex::new(Vec::new()));

        // Several parents race to discover the same dependency.
        for i in 0..8 {
            let inner = Arc::clone(&scheduler);
            let log = Arc::clone(&log);
            scheduler.submit(Job::new(format!("parent-{}", i), 1, async move {
                inner.submit(recording_job("shared-dependency", 2, &log));
                Ok(())
            }));
        }

        scheduler.await_drain().await;
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(scheduler.stats().duplicates, 7);
    }
}
