//! Basic usage examples for ExpensiveObjectPool

use refill_objectpool::{ExpensiveObjectPool, PoolConfiguration};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

fn main() {
    println!("=== refill_objectpool - Basic Examples ===\n");

    // Example 1: Warm-up and requests
    simple_pool();

    // Example 2: Draining faster than the workers refill
    slow_producer();

    // Example 3: Metrics and health
    metrics_and_health();
}

fn simple_pool() {
    println!("1. Simple Pool:");
    let counter = AtomicUsize::new(0);
    let config = PoolConfiguration::new()
        .with_capacity(3)
        .with_acquire_timeout(Duration::from_millis(500));

    let pool = ExpensiveObjectPool::new(config, move || {
        Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst))
    })
    .unwrap();

    thread::sleep(Duration::from_millis(50));
    println!("   Available after warm-up: {}", pool.available_count());

    for _ in 0..3 {
        println!("   Got item: {:?}", pool.request_object());
    }

    println!("   State: {:?}\n", pool.state());
}

fn slow_producer() {
    println!("2. Slow Producer:");
    let config = PoolConfiguration::new()
        .with_capacity(5)
        .with_worker_count(1)
        .with_acquire_timeout(Duration::from_millis(30));

    let pool = ExpensiveObjectPool::new(config, || {
        thread::sleep(Duration::from_millis(100));
        Ok::<_, String>("expensive")
    })
    .unwrap();

    for i in 0..5 {
        match pool.request_object() {
            Some(item) => println!("   Request {}: {}", i + 1, item),
            None => println!("   Request {}: unavailable", i + 1),
        }
    }

    pool.shutdown();
    println!();
}

fn metrics_and_health() {
    println!("3. Metrics and Health:");
    let config = PoolConfiguration::new()
        .with_capacity(4)
        .with_acquire_timeout(Duration::from_millis(50));

    let pool = ExpensiveObjectPool::new(config, || Err::<u32, _>("backend down")).unwrap();
    let _ = pool.request_object();

    let health = pool.get_health_status();
    println!("   Health: {}", if health.is_healthy { "Healthy" } else { "Unhealthy" });
    for warning in &health.warnings {
        println!("   Warning: {}", warning);
    }

    let metrics = pool.export_metrics();
    println!("\n   Metrics:");
    for (key, value) in metrics {
        println!("     {}: {}", key, value);
    }
}
