//! Health monitoring for refilling pools

use crate::metrics::PoolMetrics;

/// Share of failed producer calls above which the pool is reported unhealthy
const FAILURE_RATIO_THRESHOLD: f64 = 0.5;

/// Health status of a refilling pool
///
/// A slow producer and a failing producer both leave the queue empty; the
/// status tells them apart through the failure counters.
///
/// # Examples
///
/// ```
/// use refill_objectpool::{ExpensiveObjectPool, PoolConfiguration};
///
/// let config = PoolConfiguration::new().with_capacity(0);
/// let pool = ExpensiveObjectPool::new(config, || Ok::<_, String>(0)).unwrap();
///
/// let health = pool.get_health_status();
/// assert!(health.is_healthy());
/// assert_eq!(health.available_objects, 0);
/// ```
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Failed producer calls over all producer calls (0.0 to 1.0)
    pub failure_ratio: f64,

    /// Items ready in the queue
    pub available_objects: usize,

    /// Production tasks queued or running
    pub in_flight_tasks: usize,

    /// Target capacity
    pub capacity: usize,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    /// Derive a health status from a metrics snapshot
    pub fn new(metrics: &PoolMetrics, shut_down: bool) -> Self {
        let failure_ratio = metrics.failure_ratio();
        let mut warnings = Vec::new();
        let mut is_healthy = true;

        if failure_ratio > FAILURE_RATIO_THRESHOLD {
            warnings.push(format!(
                "Producer failing: {:.1}% of calls failed",
                failure_ratio * 100.0
            ));
            is_healthy = false;
        }

        if shut_down {
            warnings.push("Pool is shut down".to_string());
            is_healthy = false;
        }

        if metrics.available_objects == 0 && metrics.capacity > 0 {
            if metrics.in_flight_tasks > 0 {
                warnings.push(format!(
                    "Pool is empty, {} tasks in flight",
                    metrics.in_flight_tasks
                ));
            } else {
                warnings.push("Pool is empty".to_string());
            }
        }

        Self {
            is_healthy,
            warning_count: warnings.len(),
            failure_ratio,
            available_objects: metrics.available_objects,
            in_flight_tasks: metrics.in_flight_tasks,
            capacity: metrics.capacity,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsTracker;

    #[test]
    fn test_failing_producer_is_unhealthy() {
        let tracker = MetricsTracker::new();
        for _ in 0..3 {
            MetricsTracker::incr(&tracker.production_failures);
        }
        MetricsTracker::incr(&tracker.items_produced);

        let health = HealthStatus::new(&tracker.get_metrics(0, 2, 4), false);
        assert!(!health.is_healthy());
        assert_eq!(health.warning_count, 2);
        assert!(health.warnings[0].starts_with("Producer failing"));
    }

    #[test]
    fn test_empty_but_producing_is_healthy() {
        let tracker = MetricsTracker::new();
        let health = HealthStatus::new(&tracker.get_metrics(0, 4, 4), false);
        assert!(health.is_healthy());
        assert_eq!(health.warnings, vec!["Pool is empty, 4 tasks in flight".to_string()]);
    }

    #[test]
    fn test_shut_down_is_unhealthy() {
        let tracker = MetricsTracker::new();
        let health = HealthStatus::new(&tracker.get_metrics(1, 0, 1), true);
        assert!(!health.is_healthy());
    }
}
