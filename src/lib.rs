//! # refill_objectpool
//!
//! A concurrent, self-refilling pool of expensive-to-produce items.
//!
//! Items come from an injected producer and are made ahead of time by a
//! fixed-size set of worker threads. Consumers take ready items with a
//! bounded wait; each request schedules a replacement in the background.
//!
//! ## Features
//!
//! - Generic over the item type, production injected via [`Produce`]
//! - Asynchronous warm-up to a target capacity
//! - Timeout-bounded acquisition, blocking or async
//! - Bounded worker concurrency with queued backpressure
//! - Producer errors and panics contained, counted and logged
//! - Explicit refill policy and optional resubmission of failed productions
//! - Metrics, Prometheus export and health status
//! - Explicit shutdown
//!
//! ## Quick Start
//!
//! ```rust
//! use refill_objectpool::{ExpensiveObjectPool, PoolConfiguration};
//! use std::time::Duration;
//!
//! let config = PoolConfiguration::new()
//!     .with_capacity(2)
//!     .with_acquire_timeout(Duration::from_secs(1));
//!
//! let pool = ExpensiveObjectPool::new(config, || Ok::<_, String>(vec![0u8; 1024])).unwrap();
//!
//! match pool.request_object() {
//!     Some(buffer) => println!("Got {} bytes", buffer.len()),
//!     None => println!("Nothing ready, try again"),
//! }
//! ```

mod config;
mod errors;
mod health;
mod metrics;
mod pool;
mod producer;
mod queue;
mod scheduler;

pub use config::{PoolConfiguration, RefillPolicy};
pub use errors::{PoolError, PoolResult};
pub use health::HealthStatus;
pub use metrics::{MetricsExporter, PoolMetrics};
pub use pool::{ExpensiveObjectPool, PoolState};
pub use producer::Produce;
pub use queue::ItemQueue;
pub use scheduler::{ProductionTask, RefillScheduler};
