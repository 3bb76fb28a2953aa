//! Error types for the refilling pool

use thiserror::Error;

/// Faults surfaced by the pool's own API.
///
/// Acquisition misses and producer failures are deliberately absent: a miss is
/// reported as `None` from the request methods and a producer failure only
/// shows up in the metrics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Invalid pool configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Pool has been shut down")]
    ShutDown,

    #[error("Failed to spawn refill worker: {0}")]
    WorkerSpawn(String),
}

pub type PoolResult<T> = Result<T, PoolError>;
