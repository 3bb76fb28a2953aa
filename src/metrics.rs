//! Metrics collection and export for refilling pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Snapshot of a pool's counters
///
/// # Examples
///
/// ```
/// use refill_objectpool::{ExpensiveObjectPool, PoolConfiguration};
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_capacity(1)
///     .with_acquire_timeout(Duration::from_secs(2));
/// let pool = ExpensiveObjectPool::new(config, || Ok::<_, String>(7)).unwrap();
///
/// assert_eq!(pool.request_object(), Some(7));
/// let metrics = pool.get_metrics();
/// assert_eq!(metrics.total_requests, 1);
/// assert_eq!(metrics.hits, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolMetrics {
    /// Requests made by consumers
    pub total_requests: usize,

    /// Requests that received an item
    pub hits: usize,

    /// Requests that timed out with nothing available
    pub misses: usize,

    /// Production tasks submitted, warm-up included
    pub tasks_scheduled: usize,

    /// Items successfully produced and queued
    pub items_produced: usize,

    /// Producer calls that returned an error
    pub production_failures: usize,

    /// Producer calls that panicked
    pub production_panics: usize,

    /// Retry attempts after a failed production
    pub production_retries: usize,

    /// Queued tasks dropped by shutdown before they ran
    pub tasks_discarded: usize,

    /// Items ready in the queue
    pub available_objects: usize,

    /// Production tasks queued or running
    pub in_flight_tasks: usize,

    /// Hit ratio (0.0 to 1.0)
    pub hit_ratio: f64,

    /// Target capacity
    pub capacity: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_requests".to_string(), self.total_requests.to_string());
        metrics.insert("hits".to_string(), self.hits.to_string());
        metrics.insert("misses".to_string(), self.misses.to_string());
        metrics.insert("tasks_scheduled".to_string(), self.tasks_scheduled.to_string());
        metrics.insert("items_produced".to_string(), self.items_produced.to_string());
        metrics.insert("production_failures".to_string(), self.production_failures.to_string());
        metrics.insert("production_panics".to_string(), self.production_panics.to_string());
        metrics.insert("production_retries".to_string(), self.production_retries.to_string());
        metrics.insert("tasks_discarded".to_string(), self.tasks_discarded.to_string());
        metrics.insert("available_objects".to_string(), self.available_objects.to_string());
        metrics.insert("in_flight_tasks".to_string(), self.in_flight_tasks.to_string());
        metrics.insert("hit_ratio".to_string(), format!("{:.2}", self.hit_ratio));
        metrics.insert("capacity".to_string(), self.capacity.to_string());
        metrics
    }

    /// Failed producer calls (errors and panics) over all producer calls
    pub fn failure_ratio(&self) -> f64 {
        let failed = self.production_failures + self.production_panics;
        let attempts = self.items_produced + failed;
        if attempts > 0 {
            failed as f64 / attempts as f64
        } else {
            0.0
        }
    }
}

/// Metrics exporter for Prometheus format
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use refill_objectpool::{ExpensiveObjectPool, PoolConfiguration};
    /// use std::collections::HashMap;
    ///
    /// let config = PoolConfiguration::new().with_capacity(0);
    /// let pool = ExpensiveObjectPool::new(config, || Ok::<_, String>(1u8)).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "signer".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("keys", Some(&tags));
    /// assert!(output.contains("refillpool_objects_available"));
    /// assert!(output.contains("service=\"signer\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let labels = Self::format_labels(pool_name, tags);
        let mut output = String::new();

        let gauges: [(&str, &str, String); 4] = [
            ("refillpool_objects_available", "Items ready in the queue", metrics.available_objects.to_string()),
            ("refillpool_tasks_in_flight", "Production tasks queued or running", metrics.in_flight_tasks.to_string()),
            ("refillpool_capacity", "Target pool capacity", metrics.capacity.to_string()),
            ("refillpool_hit_ratio", "Share of requests that received an item", format!("{:.2}", metrics.hit_ratio)),
        ];
        for (name, help, value) in gauges {
            Self::push_metric(&mut output, name, help, "gauge", &labels, &value);
        }

        let counters: [(&str, &str, usize); 9] = [
            ("refillpool_requests_total", "Requests made by consumers", metrics.total_requests),
            ("refillpool_hits_total", "Requests that received an item", metrics.hits),
            ("refillpool_misses_total", "Requests that timed out", metrics.misses),
            ("refillpool_tasks_scheduled_total", "Production tasks submitted", metrics.tasks_scheduled),
            ("refillpool_items_produced_total", "Items produced", metrics.items_produced),
            ("refillpool_production_failures_total", "Producer errors", metrics.production_failures),
            ("refillpool_production_panics_total", "Producer panics", metrics.production_panics),
            ("refillpool_production_retries_total", "Production retries", metrics.production_retries),
            ("refillpool_tasks_discarded_total", "Tasks discarded at shutdown", metrics.tasks_discarded),
        ];
        for (name, help, value) in counters {
            Self::push_metric(&mut output, name, help, "counter", &labels, &value.to_string());
        }

        output
    }

    fn push_metric(output: &mut String, name: &str, help: &str, kind: &str, labels: &str, value: &str) {
        output.push_str(&format!("# HELP {} {}\n", name, help));
        output.push_str(&format!("# TYPE {} {}\n", name, kind));
        output.push_str(&format!("{}{{{}}} {}\n", name, labels, value));
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            let mut sorted: Vec<_> = tags.iter().collect();
            sorted.sort();
            for (key, value) in sorted {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

/// Internal metrics tracker shared by the coordinator and the workers
#[derive(Default)]
pub(crate) struct MetricsTracker {
    pub total_requests: AtomicUsize,
    pub hits: AtomicUsize,
    pub misses: AtomicUsize,
    pub tasks_scheduled: AtomicUsize,
    pub items_produced: AtomicUsize,
    pub production_failures: AtomicUsize,
    pub production_panics: AtomicUsize,
    pub production_retries: AtomicUsize,
    pub tasks_discarded: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, hit: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn incr(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self, available: usize, in_flight: usize, capacity: usize) -> PoolMetrics {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let hits = self.hits.load(Ordering::Relaxed);
        let hit_ratio = if total_requests > 0 {
            hits as f64 / total_requests as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_requests,
            hits,
            misses: self.misses.load(Ordering::Relaxed),
            tasks_scheduled: self.tasks_scheduled.load(Ordering::Relaxed),
            items_produced: self.items_produced.load(Ordering::Relaxed),
            production_failures: self.production_failures.load(Ordering::Relaxed),
            production_panics: self.production_panics.load(Ordering::Relaxed),
            production_retries: self.production_retries.load(Ordering::Relaxed),
            tasks_discarded: self.tasks_discarded.load(Ordering::Relaxed),
            available_objects: available,
            in_flight_tasks: in_flight,
            hit_ratio,
            capacity,
        }
    }
}
