//! Fixed-size worker pool that runs production tasks and feeds the queue

use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::metrics::MetricsTracker;
use crate::queue::ItemQueue;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// One unit of production work, run exactly once by a worker.
pub type ProductionTask<T> = Box<dyn FnOnce() -> Result<T, String> + Send + 'static>;

struct Shared<T> {
    queue: ItemQueue<T>,
    metrics: Arc<MetricsTracker>,
    closed: AtomicBool,
    /// Tasks queued or executing
    outstanding: AtomicUsize,
    /// Items in the queue plus outstanding tasks
    supply: AtomicUsize,
}

impl<T> Shared<T> {
    /// Run a task once. Returns whether an item was queued.
    fn execute(&self, task: ProductionTask<T>) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(item)) => {
                self.queue.put(item);
                MetricsTracker::incr(&self.metrics.items_produced);
                true
            }
            Ok(Err(reason)) => {
                MetricsTracker::incr(&self.metrics.production_failures);
                warn!(error = %reason, "production task failed");
                false
            }
            Err(payload) => {
                MetricsTracker::incr(&self.metrics.production_panics);
                error!(panic = panic_message(&*payload), "producer panicked");
                false
            }
        }
    }

    /// Account for a task leaving the scheduler. A produced item keeps its
    /// unit of supply; anything else gives it back.
    fn settle(&self, produced: bool) {
        if !produced {
            self.supply.fetch_sub(1, Ordering::AcqRel);
        }
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

fn run_worker<T: Send + 'static>(shared: Arc<Shared<T>>, tasks: Receiver<ProductionTask<T>>) {
    while let Ok(task) = tasks.recv() {
        if shared.closed.load(Ordering::Acquire) {
            MetricsTracker::incr(&shared.metrics.tasks_discarded);
            shared.settle(false);
            continue;
        }
        let produced = shared.execute(task);
        shared.settle(produced);
    }
    debug!("refill worker exiting");
}

/// Runs production tasks on a fixed number of worker threads.
///
/// Submitted tasks wait in an unbounded internal queue until a worker is
/// free, so at most `worker_count` producer calls run at once. A task's only
/// visible effect is an item put into the [`ItemQueue`]; failures and panics
/// are counted and logged, never propagated. A failed task is not retried
/// here; resubmitting is up to the caller.
///
/// # Examples
///
/// ```
/// use refill_objectpool::{ItemQueue, RefillScheduler};
/// use std::time::Duration;
///
/// let queue = ItemQueue::<i32>::new();
/// let scheduler = RefillScheduler::new(2, queue.clone()).unwrap();
///
/// scheduler.submit(Box::new(|| Ok(1))).unwrap();
/// scheduler.submit(Box::new(|| Err("boom".to_string()))).unwrap();
///
/// assert_eq!(queue.take(Duration::from_secs(5)), Some(1));
/// scheduler.shutdown();
/// assert!(scheduler.submit(Box::new(|| Ok(2))).is_err());
/// ```
pub struct RefillScheduler<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    sender: Mutex<Option<Sender<ProductionTask<T>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl<T: Send + 'static> RefillScheduler<T> {
    /// Start `worker_count` workers with default naming
    pub fn new(worker_count: usize, queue: ItemQueue<T>) -> PoolResult<Self> {
        let config = PoolConfiguration::new().with_worker_count(worker_count);
        Self::from_config(&config, queue)
    }

    /// Start workers as described by `config`; only the worker count and
    /// thread name prefix are used here.
    pub fn from_config(config: &PoolConfiguration, queue: ItemQueue<T>) -> PoolResult<Self> {
        config.validate()?;
        Self::start(config, queue, Arc::new(MetricsTracker::new()))
    }

    pub(crate) fn start(
        config: &PoolConfiguration,
        queue: ItemQueue<T>,
        metrics: Arc<MetricsTracker>,
    ) -> PoolResult<Self> {
        let shared = Arc::new(Shared {
            queue,
            metrics,
            closed: AtomicBool::new(false),
            outstanding: AtomicUsize::new(0),
            supply: AtomicUsize::new(0),
        });
        let (sender, receiver) = channel::unbounded();

        let mut workers = Vec::with_capacity(config.worker_count);
        for index in 0..config.worker_count {
            let shared = Arc::clone(&shared);
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name_prefix, index))
                .spawn(move || run_worker(shared, receiver))
                .map_err(|e| PoolError::WorkerSpawn(e.to_string()))?;
            workers.push(handle);
        }
        debug!(workers = config.worker_count, "refill scheduler started");

        Ok(Self {
            shared,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            worker_count: config.worker_count,
        })
    }

    /// Enqueue one production task
    pub fn submit(&self, task: ProductionTask<T>) -> PoolResult<()> {
        self.shared.supply.fetch_add(1, Ordering::AcqRel);
        self.dispatch(task)
    }

    /// Enqueue a task only if the supply is below `limit`.
    ///
    /// Returns `Ok(false)` when the limit was reached and nothing was queued.
    pub fn submit_within(&self, limit: usize, task: ProductionTask<T>) -> PoolResult<bool> {
        if self.is_shut_down() {
            return Err(PoolError::ShutDown);
        }
        let reserved = self
            .shared
            .supply
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |supply| {
                (supply < limit).then_some(supply + 1)
            })
            .is_ok();
        if !reserved {
            return Ok(false);
        }
        self.dispatch(task).map(|()| true)
    }

    fn dispatch(&self, task: ProductionTask<T>) -> PoolResult<()> {
        let sender = self.sender.lock();
        let sent = match sender.as_ref() {
            Some(sender) if !self.shared.closed.load(Ordering::Acquire) => {
                self.shared.outstanding.fetch_add(1, Ordering::AcqRel);
                if sender.send(task).is_ok() {
                    true
                } else {
                    self.shared.outstanding.fetch_sub(1, Ordering::AcqRel);
                    false
                }
            }
            _ => false,
        };

        if sent {
            MetricsTracker::incr(&self.shared.metrics.tasks_scheduled);
            Ok(())
        } else {
            self.shared.supply.fetch_sub(1, Ordering::AcqRel);
            Err(PoolError::ShutDown)
        }
    }

    /// Record that one produced item has left the queue through the pool
    pub(crate) fn note_consumed(&self) {
        let _ = self
            .shared
            .supply
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |supply| supply.checked_sub(1));
    }

    /// Tasks queued or executing
    pub fn outstanding(&self) -> usize {
        self.shared.outstanding.load(Ordering::Acquire)
    }

    /// Items produced but not yet consumed, plus outstanding tasks.
    ///
    /// Only an [`ExpensiveObjectPool`](crate::ExpensiveObjectPool) records
    /// consumption, so on a standalone scheduler this only grows:
    ///
    /// ```compile_fail
    /// use refill_objectpool::{ItemQueue, RefillScheduler};
    ///
    /// let scheduler = RefillScheduler::new(1, ItemQueue::<u8>::new()).unwrap();
    /// scheduler.note_consumed();
    /// ```
    pub fn supply(&self) -> usize {
        self.shared.supply.load(Ordering::Acquire)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub(crate) fn metrics(&self) -> &Arc<MetricsTracker> {
        &self.shared.metrics
    }

    /// Stop accepting tasks, discard queued ones, and wait for running tasks
    /// to finish. Safe to call more than once.
    pub fn shutdown(&self) {
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            info!(outstanding = self.outstanding(), "refill scheduler shutting down");
        }
        self.sender.lock().take();

        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        let current = thread::current().id();
        for handle in handles {
            // A producer that shuts down its own pool must not join itself.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("refill worker terminated abnormally");
            }
        }
    }
}

impl<T: Send + 'static> Drop for RefillScheduler<T> {
    fn drop(&mut self) {
        // Signal only; a slow producer must not block the dropping thread.
        self.shared.closed.store(true, Ordering::Release);
        self.sender.get_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_until(limit: Duration, condition: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < limit {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_concurrency_bounded_by_worker_count() {
        let queue = ItemQueue::<i32>::new();
        let scheduler = RefillScheduler::new(2, queue.clone()).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for i in 0..8 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            scheduler
                .submit(Box::new(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(i)
                }))
                .unwrap();
        }

        assert!(wait_until(Duration::from_secs(5), || queue.len() == 8));
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(scheduler.outstanding(), 0);
        assert_eq!(scheduler.supply(), 8);
    }

    #[test]
    fn test_failures_and_panics_do_not_kill_workers() {
        let queue = ItemQueue::<i32>::new();
        let scheduler = RefillScheduler::new(1, queue.clone()).unwrap();

        scheduler.submit(Box::new(|| Err("nope".to_string()))).unwrap();
        scheduler
            .submit(Box::new(|| -> Result<i32, String> { panic!("producer blew up") }))
            .unwrap();
        scheduler.submit(Box::new(|| Ok(3))).unwrap();

        assert_eq!(queue.take(Duration::from_secs(5)), Some(3));
        assert!(wait_until(Duration::from_secs(5), || scheduler.outstanding() == 0));

        let metrics = scheduler.metrics().get_metrics(0, 0, 0);
        assert_eq!(metrics.production_failures, 1);
        assert_eq!(metrics.production_panics, 1);
        assert_eq!(metrics.items_produced, 1);
        assert_eq!(scheduler.supply(), 1);
    }

    #[test]
    fn test_failed_task_runs_once() {
        let queue = ItemQueue::<i32>::new();
        let scheduler = RefillScheduler::new(2, queue.clone()).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        scheduler
            .submit(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("not yet".to_string())
            }))
            .unwrap();

        assert!(wait_until(Duration::from_secs(5), || scheduler.outstanding() == 0));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.supply(), 0);
        let metrics = scheduler.metrics().get_metrics(0, 0, 0);
        assert_eq!(metrics.production_failures, 1);
        assert_eq!(metrics.production_retries, 0);
    }

    #[test]
    fn test_submit_within_respects_limit() {
        let queue = ItemQueue::<i32>::new();
        let scheduler = RefillScheduler::new(1, queue.clone()).unwrap();

        assert!(scheduler.submit_within(2, Box::new(|| Ok(1))).unwrap());
        assert!(scheduler.submit_within(2, Box::new(|| Ok(2))).unwrap());
        assert!(!scheduler.submit_within(2, Box::new(|| Ok(3))).unwrap());

        assert!(queue.take(Duration::from_secs(5)).is_some());
        scheduler.note_consumed();
        assert!(scheduler.submit_within(2, Box::new(|| Ok(4))).unwrap());
    }

    #[test]
    fn test_shutdown_discards_queued_tasks() {
        let queue = ItemQueue::<i32>::new();
        let scheduler = RefillScheduler::new(1, queue.clone()).unwrap();

        scheduler
            .submit(Box::new(|| {
                thread::sleep(Duration::from_millis(100));
                Ok(0)
            }))
            .unwrap();
        for i in 1..5 {
            scheduler.submit(Box::new(move || Ok(i))).unwrap();
        }
        thread::sleep(Duration::from_millis(20));
        scheduler.shutdown();

        assert!(scheduler.is_shut_down());
        assert_eq!(scheduler.outstanding(), 0);
        assert_eq!(queue.len(), 1);
        assert_eq!(scheduler.metrics().get_metrics(0, 0, 0).tasks_discarded, 4);
        assert_eq!(scheduler.submit(Box::new(|| Ok(9))), Err(PoolError::ShutDown));
        scheduler.shutdown();
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = RefillScheduler::<u8>::new(0, ItemQueue::new());
        assert!(matches!(result, Err(PoolError::InvalidConfiguration(_))));
    }
}
