//! Pool configuration options

use std::time::Duration;

use crate::errors::{PoolError, PoolResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the coordinator decides whether to schedule a replacement task after
/// a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RefillPolicy {
    /// Schedule a task only while queued items plus outstanding tasks are
    /// below the capacity. Supply never exceeds the capacity, and items lost
    /// to failed production are replaced on the next request.
    #[default]
    CappedAtCapacity,

    /// Schedule exactly one task per request, hit or miss. Supply may drift
    /// above the capacity when consumers keep missing.
    OnePerRequest,
}

/// Configuration for a refilling pool. Immutable once the pool is built.
///
/// # Examples
///
/// ```
/// use refill_objectpool::{PoolConfiguration, RefillPolicy};
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_capacity(8)
///     .with_worker_count(4)
///     .with_acquire_timeout(Duration::from_millis(250))
///     .with_refill_policy(RefillPolicy::OnePerRequest);
///
/// assert_eq!(config.capacity, 8);
/// assert_eq!(config.worker_count, 4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfiguration {
    /// Number of items the pool aims to hold; also the warm-up task count
    pub capacity: usize,

    /// Number of worker threads running production tasks
    pub worker_count: usize,

    /// Longest time a request waits for an item
    pub acquire_timeout: Duration,

    /// Refill decision after each request
    pub refill_policy: RefillPolicy,

    /// Times the pool resubmits a production that returned an error.
    /// Panics are not retried.
    pub max_production_retries: u32,

    /// Prefix for worker thread names
    pub thread_name_prefix: String,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            capacity: 10,
            worker_count: 2,
            acquire_timeout: Duration::from_millis(100),
            refill_policy: RefillPolicy::default(),
            max_production_retries: 0,
            thread_name_prefix: "refill-worker".to_string(),
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the number of worker threads
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the acquisition timeout
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn with_refill_policy(mut self, policy: RefillPolicy) -> Self {
        self.refill_policy = policy;
        self
    }

    /// Let the pool resubmit failed productions as fresh tasks
    ///
    /// # Examples
    ///
    /// ```
    /// use refill_objectpool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::new().with_production_retries(3);
    /// assert_eq!(config.max_production_retries, 3);
    /// ```
    pub fn with_production_retries(mut self, retries: u32) -> Self {
        self.max_production_retries = retries;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Check the settings before any worker is started
    pub fn validate(&self) -> PoolResult<()> {
        if self.worker_count == 0 {
            return Err(PoolError::InvalidConfiguration(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(PoolError::InvalidConfiguration(
                "thread_name_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
