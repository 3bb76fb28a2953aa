//! Advanced features: refill policies, retries, Prometheus export

use refill_objectpool::{ExpensiveObjectPool, PoolConfiguration, Produce, RefillPolicy};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// A producer with its own state, implemented as a type rather than a closure
struct FlakyKeyGenerator {
    calls: AtomicUsize,
}

impl Produce for FlakyKeyGenerator {
    type Item = String;
    type Error = String;

    fn produce(&self) -> Result<String, String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        if call % 3 == 0 {
            Err(format!("entropy source busy on call {}", call))
        } else {
            Ok(format!("key-{:04}", call))
        }
    }
}

fn main() {
    println!("=== refill_objectpool - Advanced Features ===\n");

    // Example 1: Retrying a flaky producer
    retries();

    // Example 2: Refill policies
    refill_policies();

    // Example 3: Prometheus metrics
    prometheus_export();
}

fn retries() {
    println!("1. Production Retries:");

    let config = PoolConfiguration::new()
        .with_capacity(4)
        .with_worker_count(2)
        .with_production_retries(2)
        .with_acquire_timeout(Duration::from_millis(200));

    let pool = ExpensiveObjectPool::new(config, FlakyKeyGenerator { calls: AtomicUsize::new(0) }).unwrap();

    for _ in 0..4 {
        println!("   Got: {:?}", pool.request_object());
    }

    let metrics = pool.get_metrics();
    println!(
        "   Failures: {}, retries: {}",
        metrics.production_failures, metrics.production_retries
    );
    pool.shutdown();
    println!();
}

fn refill_policies() {
    println!("2. Refill Policies:");

    for policy in [RefillPolicy::CappedAtCapacity, RefillPolicy::OnePerRequest] {
        let config = PoolConfiguration::new()
            .with_capacity(2)
            .with_acquire_timeout(Duration::ZERO)
            .with_refill_policy(policy);
        let pool = ExpensiveObjectPool::new(config, || Ok::<_, String>(())).unwrap();

        for _ in 0..5 {
            let _ = pool.try_request_object();
        }
        thread::sleep(Duration::from_millis(50));
        println!("   {:?}: {} items queued", policy, pool.available_count());
        pool.shutdown();
    }

    println!();
}

fn prometheus_export() {
    println!("3. Prometheus Metrics Export:");

    let config = PoolConfiguration::new().with_capacity(3);
    let pool = ExpensiveObjectPool::new(config, || Ok::<_, String>(1u64)).unwrap();
    let _ = pool.request_object();

    let mut tags = HashMap::new();
    tags.insert("service".to_string(), "example".to_string());
    tags.insert("env".to_string(), "dev".to_string());

    let prometheus_text = pool.export_metrics_prometheus("example_pool", Some(&tags));
    println!("{}", prometheus_text);
    pool.shutdown();
}
