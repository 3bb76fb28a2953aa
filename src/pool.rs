//! The self-refilling pool coordinator

use crate::config::{PoolConfiguration, RefillPolicy};
use crate::errors::PoolResult;
use crate::health::HealthStatus;
use crate::metrics::{MetricsExporter, MetricsTracker, PoolMetrics};
use crate::producer::Produce;
use crate::queue::ItemQueue;
use crate::scheduler::{ProductionTask, RefillScheduler};

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::sync::atomic::Ordering;
use tokio::sync::oneshot;
use tracing::debug;

/// Lifecycle of a pool instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Fewer than `capacity` items have been produced so far
    WarmingUp,

    /// The request/refill cycle is running
    SteadyState,

    /// No further production will be scheduled
    ShutDown,
}

/// A bounded cache of expensive items that refills itself in the background.
///
/// Construction schedules `capacity` production tasks and returns at once;
/// the pool fills asynchronously. Every request waits up to the configured
/// acquisition timeout for an item and then schedules a replacement task
/// according to the [`RefillPolicy`].
///
/// # Examples
///
/// ```
/// use refill_objectpool::{ExpensiveObjectPool, PoolConfiguration};
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use std::time::Duration;
///
/// let counter = AtomicU64::new(0);
/// let config = PoolConfiguration::new()
///     .with_capacity(3)
///     .with_worker_count(2)
///     .with_acquire_timeout(Duration::from_secs(1));
///
/// let pool = ExpensiveObjectPool::new(config, move || {
///     Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst))
/// })
/// .unwrap();
///
/// let first = pool.request_object().expect("warm-up item");
/// let second = pool.request_object().expect("warm-up item");
/// assert_ne!(first, second);
/// pool.shutdown();
/// ```
pub struct ExpensiveObjectPool<P: Produce> {
    producer: Arc<P>,
    queue: ItemQueue<P::Item>,
    scheduler: Arc<RefillScheduler<P::Item>>,
    metrics: Arc<MetricsTracker>,
    config: PoolConfiguration,
}

impl<P: Produce> ExpensiveObjectPool<P> {
    /// Validate `config`, start the workers and schedule the warm-up tasks
    pub fn new(config: PoolConfiguration, producer: P) -> PoolResult<Self> {
        config.validate()?;

        let queue = ItemQueue::new();
        let metrics = Arc::new(MetricsTracker::new());
        let scheduler = Arc::new(RefillScheduler::start(&config, queue.clone(), Arc::clone(&metrics))?);

        let pool = Self {
            producer: Arc::new(producer),
            queue,
            scheduler,
            metrics,
            config,
        };

        for _ in 0..pool.config.capacity {
            pool.scheduler.submit(pool.production_task())?;
        }
        debug!(
            capacity = pool.config.capacity,
            workers = pool.config.worker_count,
            "pool warming up"
        );

        Ok(pool)
    }

    /// Wait up to the acquisition timeout for an item.
    ///
    /// `None` means nothing was available in time. A replacement task is
    /// scheduled either way.
    pub fn request_object(&self) -> Option<P::Item> {
        let item = self.queue.take(self.config.acquire_timeout);
        self.after_request(item.is_some());
        item
    }

    /// Take an item only if one is ready now. Refills like
    /// [`request_object`](Self::request_object).
    pub fn try_request_object(&self) -> Option<P::Item> {
        let item = self.queue.try_take();
        self.after_request(item.is_some());
        item
    }

    /// Async counterpart of [`request_object`](Self::request_object).
    ///
    /// The wait runs on Tokio's blocking pool, so this must be called from
    /// within a Tokio runtime. Dropping the future counts as a miss: an item
    /// already taken for it goes back to the queue and the usual refill step
    /// runs.
    pub async fn request_object_async(&self) -> Option<P::Item> {
        let queue = self.queue.clone();
        let timeout = self.config.acquire_timeout;
        let (tx, rx) = oneshot::channel();

        tokio::task::spawn_blocking(move || {
            if let Some(item) = queue.take(timeout) {
                if let Err(item) = tx.send(item) {
                    queue.put(item);
                }
            }
        });

        let mut pending = PendingRequest {
            pool: self,
            receiver: Some(rx),
        };
        let item = match pending.receiver.as_mut() {
            Some(receiver) => receiver.await.ok(),
            None => None,
        };
        pending.receiver = None;

        self.after_request(item.is_some());
        item
    }

    fn after_request(&self, hit: bool) {
        self.metrics.record_request(hit);
        if hit {
            self.scheduler.note_consumed();
        }
        self.refill();
    }

    fn refill(&self) {
        if self.scheduler.is_shut_down() {
            return;
        }
        let task = self.production_task();
        let result = match self.config.refill_policy {
            RefillPolicy::CappedAtCapacity => self
                .scheduler
                .submit_within(self.config.capacity, task)
                .map(|scheduled| {
                    if !scheduled {
                        debug!(capacity = self.config.capacity, "supply at capacity, refill skipped");
                    }
                }),
            RefillPolicy::OnePerRequest => self.scheduler.submit(task),
        };
        if let Err(e) = result {
            debug!(error = %e, "refill not scheduled");
        }
    }

    fn production_task(&self) -> ProductionTask<P::Item> {
        production_attempt(
            Arc::clone(&self.producer),
            Arc::downgrade(&self.scheduler),
            Arc::clone(&self.metrics),
            self.config.max_production_retries,
        )
    }

    /// Current lifecycle state
    pub fn state(&self) -> PoolState {
        if self.scheduler.is_shut_down() {
            PoolState::ShutDown
        } else if self.metrics.items_produced.load(Ordering::Relaxed) >= self.config.capacity {
            PoolState::SteadyState
        } else {
            PoolState::WarmingUp
        }
    }

    /// Stop scheduling production and join the workers.
    ///
    /// Tasks not yet started are discarded; items already queued can still be
    /// requested.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    /// Items ready to be handed out
    pub fn available_count(&self) -> usize {
        self.queue.len()
    }

    /// Production tasks queued or running
    pub fn in_flight_count(&self) -> usize {
        self.scheduler.outstanding()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn config(&self) -> &PoolConfiguration {
        &self.config
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.metrics.get_metrics(
            self.available_count(),
            self.in_flight_count(),
            self.config.capacity,
        )
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }

    /// Get health status
    pub fn get_health_status(&self) -> HealthStatus {
        HealthStatus::new(&self.get_metrics(), self.scheduler.is_shut_down())
    }
}

/// Build a task that produces one item. On failure, while retries remain, it
/// resubmits a fresh attempt so the worker is free for other refills.
fn production_attempt<P: Produce>(
    producer: Arc<P>,
    scheduler: Weak<RefillScheduler<P::Item>>,
    metrics: Arc<MetricsTracker>,
    retries_left: u32,
) -> ProductionTask<P::Item> {
    Box::new(move || {
        producer.produce().map_err(|e| {
            if retries_left > 0 {
                if let Some(handle) = scheduler.upgrade() {
                    let retry = production_attempt(
                        Arc::clone(&producer),
                        Weak::clone(&scheduler),
                        Arc::clone(&metrics),
                        retries_left - 1,
                    );
                    if handle.submit(retry).is_ok() {
                        MetricsTracker::incr(&metrics.production_retries);
                        debug!(retries_left = retries_left - 1, "production resubmitted");
                    }
                }
            }
            e.to_string()
        })
    })
}

/// Receiving side of an async request. If dropped before completion it
/// returns a delivered item to the queue and settles the request as a miss.
struct PendingRequest<'a, P: Produce> {
    pool: &'a ExpensiveObjectPool<P>,
    receiver: Option<oneshot::Receiver<P::Item>>,
}

impl<P: Produce> Drop for PendingRequest<'_, P> {
    fn drop(&mut self) {
        if let Some(mut receiver) = self.receiver.take() {
            // After close, a late send fails and the blocking side puts the
            // item back itself.
            receiver.close();
            if let Ok(item) = receiver.try_recv() {
                self.pool.queue.put(item);
            }
            debug!("async request cancelled");
            self.pool.after_request(false);
        }
    }
}
